//! Column introspection through the `INFORMATION_SCHEMA` catalog.

use crate::error::SearchError;
use crate::executor::QueryExecutor;
use crate::types::RowValues;

/// Catalog query returning `(COLUMN_NAME, DATA_TYPE, NUMERIC_PRECISION,
/// NUMERIC_SCALE)` in physical column order.
pub const CATALOG_COLUMNS_QUERY: &str = "SELECT COLUMN_NAME, DATA_TYPE, \
     NUMERIC_PRECISION, NUMERIC_SCALE \
     FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_NAME = @P1 \
     ORDER BY ORDINAL_POSITION";

/// Semantic family of a column's declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Text,
    Date,
    Integer,
    Decimal,
    /// Binary, GUID, XML and everything else the search never filters on.
    Other,
}

impl DeclaredType {
    /// Map a catalog `DATA_TYPE` name onto its semantic family.
    #[must_use]
    pub fn from_sql_type_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "varchar" | "nvarchar" | "char" | "nchar" | "text" | "ntext" => DeclaredType::Text,
            "date" | "datetime" | "datetime2" | "smalldatetime" => DeclaredType::Date,
            "int" | "bigint" | "smallint" | "tinyint" => DeclaredType::Integer,
            "decimal" | "numeric" | "float" | "real" | "money" | "smallmoney" => {
                DeclaredType::Decimal
            }
            _ => DeclaredType::Other,
        }
    }
}

/// One column of a searched table, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Raw catalog type name, e.g. `nvarchar` or `tinyint`.
    pub data_type: String,
    pub declared_type: DeclaredType,
    /// `(precision, scale)` of an exact numeric column.
    pub numeric_precision: Option<(u32, u32)>,
}

impl ColumnInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self {
            name: name.into(),
            declared_type: DeclaredType::from_sql_type_name(&data_type),
            data_type,
            numeric_precision: None,
        }
    }

    #[must_use]
    pub fn with_numeric_precision(mut self, precision: u32, scale: u32) -> Self {
        self.numeric_precision = Some((precision, scale));
        self
    }

    /// Largest number of digits left of the decimal point the column can
    /// hold, for exact numeric types.
    ///
    /// `money` and `smallmoney` fall back to their fixed layout when the
    /// catalog reports no precision; `float` and `real` have no such limit.
    #[must_use]
    pub fn integer_digit_limit(&self) -> Option<u32> {
        let ty = self.data_type.trim().to_ascii_lowercase();
        let (precision, scale) = match (ty.as_str(), self.numeric_precision) {
            ("float" | "real", _) => return None,
            (_, Some(ps)) => ps,
            ("money", None) => (19, 4),
            ("smallmoney", None) => (10, 4),
            _ => return None,
        };
        Some(precision.saturating_sub(scale))
    }

    /// Inclusive value range of an integer column, by its catalog type.
    #[must_use]
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self.data_type.trim().to_ascii_lowercase().as_str() {
            "tinyint" => Some((0, 255)),
            "smallint" => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
            "int" => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
            "bigint" => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

/// Fetch the ordered column list of `table_name`.
///
/// An unknown table or one without columns yields an empty list.
///
/// # Errors
///
/// Returns `SearchError` if the catalog query fails or returns rows of an
/// unexpected shape.
pub async fn get_columns<E>(conn: &mut E, table_name: &str) -> Result<Vec<ColumnInfo>, SearchError>
where
    E: QueryExecutor + ?Sized,
{
    let params = [RowValues::Text(table_name.to_string())];
    let result_set = conn.execute_select(CATALOG_COLUMNS_QUERY, &params).await?;

    let mut columns = Vec::with_capacity(result_set.len());
    for row in &result_set.results {
        let name = row.get_by_index(0).and_then(RowValues::as_text);
        let data_type = row.get_by_index(1).and_then(RowValues::as_text);
        let precision = row.get_by_index(2).and_then(RowValues::as_int);
        let scale = row.get_by_index(3).and_then(RowValues::as_int);
        match (name, data_type) {
            (Some(name), Some(data_type)) => {
                let mut column = ColumnInfo::new(name, data_type);
                if let (Some(p), Some(s)) = (precision, scale)
                    && let (Ok(p), Ok(s)) = (u32::try_from(*p), u32::try_from(*s))
                {
                    column = column.with_numeric_precision(p, s);
                }
                columns.push(column);
            }
            _ => {
                return Err(SearchError::ExecutionError(format!(
                    "Catalog returned an unexpected column row for {table_name}: {:?}",
                    row.rows
                )));
            }
        }
    }

    tracing::debug!(table = table_name, columns = columns.len(), "fetched column list");
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_catalog_type_names() {
        for name in ["varchar", "NVARCHAR", "char", "nchar", "text", "ntext"] {
            assert_eq!(DeclaredType::from_sql_type_name(name), DeclaredType::Text);
        }
        for name in ["date", "datetime", "datetime2", "smalldatetime"] {
            assert_eq!(DeclaredType::from_sql_type_name(name), DeclaredType::Date);
        }
        for name in ["int", "bigint", "smallint", "tinyint"] {
            assert_eq!(DeclaredType::from_sql_type_name(name), DeclaredType::Integer);
        }
        for name in ["decimal", "numeric", "float", "real", "money"] {
            assert_eq!(DeclaredType::from_sql_type_name(name), DeclaredType::Decimal);
        }
        for name in ["varbinary", "uniqueidentifier", "xml", "bit", ""] {
            assert_eq!(DeclaredType::from_sql_type_name(name), DeclaredType::Other);
        }
    }

    #[test]
    fn integer_ranges_follow_width() {
        assert_eq!(ColumnInfo::new("A", "tinyint").integer_range(), Some((0, 255)));
        assert_eq!(
            ColumnInfo::new("A", "smallint").integer_range(),
            Some((-32768, 32767))
        );
        assert_eq!(ColumnInfo::new("A", "nvarchar").integer_range(), None);
    }

    #[test]
    fn integer_digit_limit_uses_precision_and_scale() {
        let price = ColumnInfo::new("PRICE", "decimal").with_numeric_precision(10, 2);
        assert_eq!(price.integer_digit_limit(), Some(8));
        assert_eq!(ColumnInfo::new("M", "money").integer_digit_limit(), Some(15));
        assert_eq!(ColumnInfo::new("M", "smallmoney").integer_digit_limit(), Some(6));
        let ratio = ColumnInfo::new("R", "float").with_numeric_precision(53, 0);
        assert_eq!(ratio.integer_digit_limit(), None);
        assert_eq!(ColumnInfo::new("D", "decimal").integer_digit_limit(), None);
    }
}
