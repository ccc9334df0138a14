//! Single-table search: introspect, compile, probe, confirm.

use std::fmt;

use crate::condition::{SearchQuery, build_conditions};
use crate::error::SearchError;
use crate::executor::QueryExecutor;
use crate::results::CustomDbRow;
use crate::schema::{ColumnInfo, DeclaredType, get_columns};
use crate::types::{ISO_DATE_FORMAT, RowValues, US_DATE_FORMAT};

/// What to look for, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub table_name: String,
    pub raw_value: String,
}

impl SearchRequest {
    #[must_use]
    pub fn new(table_name: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            raw_value: raw_value.into(),
        }
    }
}

/// A column of the probe row whose value contains the search term.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub table_name: String,
    pub column_name: String,
    pub value: RowValues,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} = {}", self.table_name, self.column_name, self.value)
    }
}

/// Search one table for `request.raw_value`.
///
/// Returns an empty list when the table has no columns, when no column type
/// is comparable with the value, or when the probe finds nothing.
///
/// # Errors
///
/// Returns `SearchError` if either query fails or an identifier cannot be
/// quoted.
pub async fn search_table<E>(
    conn: &mut E,
    request: &SearchRequest,
) -> Result<Vec<MatchResult>, SearchError>
where
    E: QueryExecutor + ?Sized,
{
    let table = request.table_name.as_str();
    let columns = get_columns(conn, table).await?;
    if columns.is_empty() {
        tracing::debug!(table, "table has no columns; skipping");
        return Ok(Vec::new());
    }

    let predicates = build_conditions(&columns, &request.raw_value);
    let Some(query) = SearchQuery::compile(table, &columns, &predicates, &request.raw_value)?
    else {
        tracing::debug!(table, "no column can hold the search value; skipping");
        return Ok(Vec::new());
    };

    tracing::debug!(table, predicates = predicates.len(), sql = %query.sql, "probing table");
    let result_set = conn.execute_select(&query.sql, &query.params).await?;

    Ok(result_set
        .first()
        .map(|row| scan_row(table, &columns, row, &request.raw_value))
        .unwrap_or_default())
}

/// Confirm, column by column, which values of `row` contain `raw_value`.
///
/// `row` is expected to carry `columns` in order.
#[must_use]
pub fn scan_row(
    table_name: &str,
    columns: &[ColumnInfo],
    row: &CustomDbRow,
    raw_value: &str,
) -> Vec<MatchResult> {
    let needle = raw_value.to_lowercase();
    columns
        .iter()
        .enumerate()
        .filter_map(|(idx, column)| {
            let value = row.get_by_index(idx)?;
            value_contains(column.declared_type, value, &needle).then(|| MatchResult {
                table_name: table_name.to_string(),
                column_name: column.name.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

/// Case-insensitive containment. `needle` must already be lowercase.
fn value_contains(declared_type: DeclaredType, value: &RowValues, needle: &str) -> bool {
    if value.is_null() {
        return false;
    }

    if declared_type == DeclaredType::Date
        && let Some(date) = value.as_date()
    {
        return [ISO_DATE_FORMAT, US_DATE_FORMAT]
            .iter()
            .any(|fmt| date.format(fmt).to_string().to_lowercase().contains(needle));
    }

    value
        .to_display_string()
        .is_some_and(|text| text.to_lowercase().contains(needle))
}
