//! Builds the type-aware WHERE clause for a table probe.
//!
//! Every predicate references its column through a bracket-quoted identifier
//! taken verbatim from the catalog, and compares against one of two bound
//! parameters: `@P1` carries the exact search value, `@P2` the escaped
//! `%value%` substring pattern. Nothing from the search value is ever spliced
//! into the SQL text.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::SearchError;
use crate::schema::{ColumnInfo, DeclaredType};
use crate::types::RowValues;

/// Placeholder for the exact-value parameter.
pub const EXACT_PARAM: &str = "@P1";
/// Placeholder for the substring pattern parameter.
pub const PATTERN_PARAM: &str = "@P2";
/// Rows requested per table. Only the first row is ever scanned.
pub const PROBE_ROW_LIMIT: u32 = 1;

/// SQL Server's `sysname` length.
const MAX_IDENTIFIER_LENGTH: usize = 128;
/// Widest `decimal`/`numeric` precision.
pub const MAX_DECIMAL_PRECISION: u32 = 38;

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d.%m.%Y"];
const DATETIME_INPUT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonKind {
    /// `[col] LIKE @P2`
    TextLike,
    /// The column converted to `yyyy-mm-dd` (style 23) or `mm/dd/yyyy`
    /// (style 101) text, `LIKE @P2`.
    DateConvertLike,
    /// `[col] = @P1`
    ExactEquals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub kind: ComparisonKind,
}

impl Predicate {
    #[must_use]
    pub fn new(column: impl Into<String>, kind: ComparisonKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }

    /// Render this predicate as SQL.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidIdentifier` if the column name cannot be
    /// quoted safely.
    pub fn to_sql(&self) -> Result<String, SearchError> {
        let col = quote_identifier(&self.column)?;
        Ok(match self.kind {
            ComparisonKind::TextLike => format!("{col} LIKE {PATTERN_PARAM}"),
            ComparisonKind::DateConvertLike => format!(
                "(CONVERT(VARCHAR(10), {col}, 23) LIKE {PATTERN_PARAM} \
                 OR CONVERT(VARCHAR(10), {col}, 101) LIKE {PATTERN_PARAM})"
            ),
            ComparisonKind::ExactEquals => format!("{col} = {EXACT_PARAM}"),
        })
    }
}

/// Derive the predicates for `columns`, in column order.
///
/// An empty result means nothing in the table can be compared with
/// `raw_value`; callers skip the query in that case.
#[must_use]
pub fn build_conditions(columns: &[ColumnInfo], raw_value: &str) -> Vec<Predicate> {
    let as_integer = parse_integer(raw_value);
    let is_decimal = is_decimal_literal(raw_value);
    let date_like = is_date_candidate(raw_value);

    columns
        .iter()
        .filter_map(|column| {
            let kind = match column.declared_type {
                DeclaredType::Text => Some(ComparisonKind::TextLike),
                DeclaredType::Date => date_like.then_some(ComparisonKind::DateConvertLike),
                DeclaredType::Integer => as_integer
                    .filter(|v| fits_integer_column(column, *v))
                    .map(|_| ComparisonKind::ExactEquals),
                DeclaredType::Decimal => (is_decimal && fits_decimal_column(column, raw_value))
                    .then_some(ComparisonKind::ExactEquals),
                DeclaredType::Other => None,
            }?;
            Some(Predicate::new(column.name.clone(), kind))
        })
        .collect()
}

/// A compiled probe query plus its two bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub sql: String,
    pub params: Vec<RowValues>,
}

impl SearchQuery {
    /// Compile the probe query for `table_name`.
    ///
    /// Returns `Ok(None)` when there are no predicates, so no query runs.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidIdentifier` if the table or any column
    /// name cannot be quoted safely.
    pub fn compile(
        table_name: &str,
        columns: &[ColumnInfo],
        predicates: &[Predicate],
        raw_value: &str,
    ) -> Result<Option<Self>, SearchError> {
        if predicates.is_empty() || columns.is_empty() {
            return Ok(None);
        }

        let table = quote_identifier(table_name)?;
        let column_list = columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let where_clause = predicates
            .iter()
            .map(Predicate::to_sql)
            .collect::<Result<Vec<_>, _>>()?
            .join(" OR ");

        let sql = format!(
            "SELECT TOP ({PROBE_ROW_LIMIT}) {column_list} FROM {table} WHERE {where_clause}"
        );

        Ok(Some(Self {
            sql,
            params: vec![
                RowValues::Text(raw_value.to_string()),
                RowValues::Text(substring_pattern(raw_value)),
            ],
        }))
    }
}

/// Bracket-quote an identifier reported by the catalog.
///
/// # Errors
///
/// Returns `SearchError::InvalidIdentifier` for empty, over-long, or
/// control-character names.
pub fn quote_identifier(name: &str) -> Result<String, SearchError> {
    if name.is_empty() {
        return Err(SearchError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(SearchError::InvalidIdentifier(format!(
            "identifier exceeds {MAX_IDENTIFIER_LENGTH} characters: {name}"
        )));
    }
    if let Some(c) = name.chars().find(|c| c.is_control()) {
        return Err(SearchError::InvalidIdentifier(format!(
            "identifier {name:?} contains control character {c:?}"
        )));
    }
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Escape `LIKE` metacharacters so `raw` matches literally.
#[must_use]
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '[' => out.push_str("[[]"),
            '%' => out.push_str("[%]"),
            '_' => out.push_str("[_]"),
            other => out.push(other),
        }
    }
    out
}

/// `%value%` with the value's metacharacters escaped.
#[must_use]
pub fn substring_pattern(raw: &str) -> String {
    format!("%{}%", escape_like(raw))
}

/// Whether `raw` parses as a date, or is long enough to be a year fragment.
#[must_use]
pub fn is_date_candidate(raw: &str) -> bool {
    raw.chars().count() >= 4 || parse_date(raw).is_some()
}

#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_INPUT_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[must_use]
pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok()
}

/// Plain decimal literal: optional sign, digits, at most one point.
#[must_use]
pub fn is_decimal_literal(raw: &str) -> bool {
    let body = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let mut digits = 0usize;
    let mut points = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}

fn fits_integer_column(column: &ColumnInfo, value: i64) -> bool {
    column
        .integer_range()
        .is_none_or(|(min, max)| (min..=max).contains(&value))
}

/// Digit counts of a decimal literal: `(integer digits, fraction digits)`,
/// leading zeros of the integer part not counted.
fn decimal_digits(raw: &str) -> (u32, u32) {
    let body = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let count = |s: &str| u32::try_from(s.len()).unwrap_or(u32::MAX);
    (count(int_part.trim_start_matches('0')), count(frac_part))
}

/// Whether converting `raw` to the column's type stays clear of an
/// arithmetic overflow. Excess fraction digits are rounded by the server.
fn fits_decimal_column(column: &ColumnInfo, raw: &str) -> bool {
    let (int_digits, frac_digits) = decimal_digits(raw);
    int_digits.saturating_add(frac_digits) <= MAX_DECIMAL_PRECISION
        && column
            .integer_digit_limit()
            .is_none_or(|limit| int_digits <= limit)
}
