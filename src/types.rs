use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// ISO calendar rendering used for date cells (`yyyy-MM-dd`).
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
/// Alternate (US locale) rendering used for date cells (`MM/dd/yyyy`).
pub const US_DATE_FORMAT: &str = "%m/%d/%Y";

/// Values that can be read from a database row or bound as query parameters.
///
/// ```rust
/// use sql_value_search::prelude::*;
///
/// let params = vec![
///     RowValues::Text("50tender".into()),
///     RowValues::Text("%50tender%".into()),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Exact numeric value, kept in the server's textual form
    Decimal(String),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Calendar date without a time part
    Date(NaiveDate),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Binary data
    Blob(Vec<u8>),
    /// NULL value
    Null,
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Calendar date carried by this value, if any.
    ///
    /// Text is accepted when it starts with an ISO date, which is how some
    /// drivers hand back `date` columns.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RowValues::Date(d) => Some(*d),
            RowValues::Timestamp(ts) => Some(ts.date()),
            RowValues::Text(s) => s
                .get(..10)
                .and_then(|head| NaiveDate::parse_from_str(head, ISO_DATE_FORMAT).ok()),
            _ => None,
        }
    }

    /// Stable textual representation used for containment checks and display.
    ///
    /// Returns `None` for NULL.
    #[must_use]
    pub fn to_display_string(&self) -> Option<String> {
        match self {
            RowValues::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(fl) => write!(f, "{fl}"),
            RowValues::Decimal(d) => f.write_str(d),
            RowValues::Text(s) => f.write_str(s),
            RowValues::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            RowValues::Date(d) => write!(f, "{}", d.format(ISO_DATE_FORMAT)),
            RowValues::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            RowValues::Blob(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
            RowValues::Null => f.write_str("NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_stable_text() {
        assert_eq!(RowValues::Int(42).to_string(), "42");
        assert_eq!(RowValues::Float(3.5).to_string(), "3.5");
        assert_eq!(RowValues::Decimal("10.50".into()).to_string(), "10.50");
        assert_eq!(RowValues::Bool(true).to_string(), "True");
        assert_eq!(RowValues::Blob(vec![0x0a, 0xff]).to_string(), "0x0AFF");
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(RowValues::Date(date).to_string(), "2024-03-05");
        let ts = date.and_hms_opt(13, 4, 5).unwrap();
        assert_eq!(RowValues::Timestamp(ts).to_string(), "2024-03-05 13:04:05");
    }

    #[test]
    fn null_has_no_display_string() {
        assert_eq!(RowValues::Null.to_display_string(), None);
        assert_eq!(
            RowValues::Text("abc".into()).to_display_string().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn dates_are_extracted_from_several_shapes() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(RowValues::Date(date).as_date(), Some(date));
        assert_eq!(
            RowValues::Timestamp(date.and_hms_opt(1, 2, 3).unwrap()).as_date(),
            Some(date)
        );
        assert_eq!(
            RowValues::Text("2024-03-05 00:00:00".into()).as_date(),
            Some(date)
        );
        assert_eq!(RowValues::Text("nope".into()).as_date(), None);
        assert_eq!(RowValues::Int(5).as_date(), None);
    }
}
