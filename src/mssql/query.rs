use std::sync::Arc;

use async_trait::async_trait;
use bb8::PooledConnection;
use bb8_tiberius::ConnectionManager;
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::numeric::Numeric;
use tiberius::{ColumnType, Query, Uuid};

use super::config::MssqlClient;
use crate::error::SearchError;
use crate::executor::QueryExecutor;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Build a result set from a SQL Server query execution
///
/// # Errors
/// Returns `SearchError::ExecutionError` if the query or row decoding fails.
pub async fn build_result_set(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SearchError> {
    let query_builder = bind_query_params(query, params);

    let mut stream = query_builder
        .query(client)
        .await
        .map_err(|e| SearchError::ExecutionError(format!("SQL Server query error: {e}")))?;

    let columns_opt = stream.columns().await.map_err(|e| {
        SearchError::ExecutionError(format!("SQL Server column fetch error: {e}"))
    })?;

    let mut result_set = ResultSet::with_capacity(1);
    // A query that matched nothing may still report no metadata at all.
    let Some(columns) = columns_opt else {
        return Ok(result_set);
    };
    let column_names: Vec<String> = columns.iter().map(|col| col.name().to_string()).collect();
    let col_count = column_names.len();
    result_set.set_column_names(Arc::new(column_names));

    let mut rows_stream = stream.into_row_stream();
    while let Some(row) = rows_stream.try_next().await.map_err(|e| {
        SearchError::ExecutionError(format!("SQL Server row fetch error: {e}"))
    })? {
        let row_values = (0..col_count).map(|i| extract_value(&row, i)).collect();
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Extract a value from a row at a specific index, guided by the column's
/// wire type. Anything that cannot be decoded is reported as NULL.
fn extract_value(row: &tiberius::Row, idx: usize) -> RowValues {
    let Some(column) = row.columns().get(idx) else {
        return RowValues::Null;
    };

    match column.column_type() {
        ColumnType::Bit | ColumnType::Bitn => get(row, idx, RowValues::Bool),
        ColumnType::Int1 => get(row, idx, |v: u8| RowValues::Int(i64::from(v))),
        ColumnType::Int2 => get(row, idx, |v: i16| RowValues::Int(i64::from(v))),
        ColumnType::Int4 => get(row, idx, |v: i32| RowValues::Int(i64::from(v))),
        ColumnType::Int8 => get(row, idx, RowValues::Int),
        ColumnType::Intn => first_of(&[
            get(row, idx, |v: i32| RowValues::Int(i64::from(v))),
            get(row, idx, RowValues::Int),
            get(row, idx, |v: i16| RowValues::Int(i64::from(v))),
            get(row, idx, |v: u8| RowValues::Int(i64::from(v))),
        ]),
        ColumnType::Float4 => get(row, idx, |v: f32| RowValues::Float(f64::from(v))),
        ColumnType::Float8 | ColumnType::Money | ColumnType::Money4 => {
            get(row, idx, RowValues::Float)
        }
        ColumnType::Floatn => first_of(&[
            get(row, idx, RowValues::Float),
            get(row, idx, |v: f32| RowValues::Float(f64::from(v))),
        ]),
        ColumnType::Decimaln | ColumnType::Numericn => {
            get(row, idx, |v: Numeric| RowValues::Decimal(v.to_string()))
        }
        ColumnType::Daten => get(row, idx, RowValues::Date),
        ColumnType::Datetime
        | ColumnType::Datetime4
        | ColumnType::Datetimen
        | ColumnType::Datetime2 => first_of(&[
            get(row, idx, RowValues::Timestamp),
            get(row, idx, |v: DateTime<Utc>| RowValues::Timestamp(v.naive_utc())),
        ]),
        ColumnType::DatetimeOffsetn => get(row, idx, |v: DateTime<FixedOffset>| {
            RowValues::Timestamp(v.naive_local())
        }),
        ColumnType::Timen => get(row, idx, |v: NaiveTime| {
            RowValues::Text(v.format("%H:%M:%S%.f").to_string())
        }),
        ColumnType::Guid => get(row, idx, |v: Uuid| RowValues::Text(v.to_string())),
        ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => {
            match row.try_get::<&[u8], _>(idx) {
                Ok(Some(bytes)) => RowValues::Blob(bytes.to_vec()),
                _ => RowValues::Null,
            }
        }
        _ => match row.try_get::<&str, _>(idx) {
            Ok(Some(text)) => RowValues::Text(text.to_string()),
            _ => RowValues::Null,
        },
    }
}

fn get<T, F>(row: &tiberius::Row, idx: usize, wrap: F) -> RowValues
where
    T: for<'a> tiberius::FromSql<'a>,
    F: FnOnce(T) -> RowValues,
{
    match row.try_get::<T, _>(idx) {
        Ok(Some(value)) => wrap(value),
        _ => RowValues::Null,
    }
}

fn first_of(candidates: &[RowValues]) -> RowValues {
    candidates
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(RowValues::Null)
}

/// Bind parameters directly to the query for SQL Server
/// Return a query builder with parameters already bound
pub fn bind_query_params<'a>(query: &'a str, params: &[RowValues]) -> Query<'a> {
    let mut query_builder = Query::new(query);

    for param in params {
        match param {
            RowValues::Int(i) => query_builder.bind(*i),
            RowValues::Float(f) => query_builder.bind(*f),
            RowValues::Decimal(d) | RowValues::Text(d) => query_builder.bind(d.clone()),
            RowValues::Bool(b) => query_builder.bind(*b),
            RowValues::Date(d) => query_builder.bind(*d),
            RowValues::Timestamp(dt) => query_builder.bind(*dt),
            RowValues::Blob(bytes) => query_builder.bind(bytes.clone()),
            RowValues::Null => query_builder.bind(Option::<String>::None),
        }
    }

    query_builder
}

#[async_trait]
impl QueryExecutor for MssqlClient {
    async fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SearchError> {
        build_result_set(self, query, params).await
    }
}

#[async_trait]
impl QueryExecutor for PooledConnection<'static, ConnectionManager> {
    async fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SearchError> {
        let client: &mut MssqlClient = self;
        build_result_set(client, query, params).await
    }
}

