//! Multi-table search with per-table failure isolation.

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;

use crate::error::SearchError;
use crate::executor::{ConnectionSource, QueryExecutor};
use crate::matcher::{MatchResult, SearchRequest, search_table};

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Tables searched at once, each on its own connection.
    pub concurrency: usize,
    /// Deadline for one table's whole pipeline.
    pub table_timeout: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            table_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// A table whose search failed; it contributed no matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFailure {
    pub table_name: String,
    pub error: String,
}

/// Aggregated outcome of a multi-table search.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    /// Confirmed matches in table order, without duplicates.
    pub matches: Vec<MatchResult>,
    pub failures: Vec<TableFailure>,
    pub tables_searched: usize,
}

impl SearchReport {
    /// Fold one table's outcome into the report.
    pub fn record(&mut self, table_name: &str, outcome: Result<Vec<MatchResult>, SearchError>) {
        self.tables_searched += 1;
        match outcome {
            Ok(found) => {
                for m in found {
                    if !self.matches.contains(&m) {
                        self.matches.push(m);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(table = table_name, error = %err, "table search failed");
                self.failures.push(TableFailure {
                    table_name: table_name.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Search `tables` one after another over a single connection.
///
/// A failing table is logged and recorded; the remaining tables are still
/// searched. A timeout is the exception: the abandoned query may still hold
/// the session, so every table after it is recorded as a failure without
/// touching the connection again.
pub async fn search_tables<E>(
    conn: &mut E,
    tables: &[String],
    raw_value: &str,
    table_timeout: Option<Duration>,
) -> SearchReport
where
    E: QueryExecutor + ?Sized,
{
    let mut report = SearchReport::default();
    let mut timed_out: Option<&str> = None;
    for table in tables {
        if let Some(stuck) = timed_out {
            report.record(
                table,
                Err(SearchError::ConnectionError(format!(
                    "connection abandoned after search of table {stuck} timed out"
                ))),
            );
            continue;
        }
        let request = SearchRequest::new(table.as_str(), raw_value);
        let outcome = with_deadline(table, table_timeout, search_table(&mut *conn, &request)).await;
        if matches!(outcome, Err(SearchError::Timeout { .. })) {
            timed_out = Some(table.as_str());
        }
        report.record(table, outcome);
    }
    log_summary(raw_value, &report);
    report
}

/// Searches a fixed list of tables, drawing one connection per table from a
/// [`ConnectionSource`].
#[derive(Debug, Clone)]
pub struct Searcher<S> {
    source: S,
    tables: Vec<String>,
    options: SearchOptions,
}

impl<S: ConnectionSource> Searcher<S> {
    #[must_use]
    pub fn new(source: S, tables: Vec<String>, options: SearchOptions) -> Self {
        Self {
            source,
            tables,
            options,
        }
    }

    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    #[must_use]
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Search every table for `raw_value`.
    ///
    /// Up to `options.concurrency` tables run at once. The report is built
    /// only after every table has finished or failed, in table order.
    pub async fn search(&self, raw_value: &str) -> SearchReport {
        let outcomes: Vec<_> = stream::iter(self.tables.iter())
            .map(|table| async move { (table, self.search_one(table, raw_value).await) })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut report = SearchReport::default();
        for (table, outcome) in outcomes {
            report.record(table, outcome);
        }
        log_summary(raw_value, &report);
        report
    }

    async fn search_one(
        &self,
        table: &str,
        raw_value: &str,
    ) -> Result<Vec<MatchResult>, SearchError> {
        let request = SearchRequest::new(table, raw_value);
        with_deadline(table, self.options.table_timeout, async {
            let mut conn = self.source.acquire().await?;
            search_table(&mut conn, &request).await
        })
        .await
    }
}

async fn with_deadline<T, F>(
    table: &str,
    deadline: Option<Duration>,
    fut: F,
) -> Result<T, SearchError>
where
    F: Future<Output = Result<T, SearchError>>,
{
    match deadline {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| SearchError::Timeout {
                table: table.to_string(),
                after,
            })?,
        None => fut.await,
    }
}

fn log_summary(raw_value: &str, report: &SearchReport) {
    tracing::info!(
        value = raw_value,
        tables = report.tables_searched,
        matches = report.matches.len(),
        failures = report.failures.len(),
        "search finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    fn hit(table: &str, column: &str, value: &str) -> MatchResult {
        MatchResult {
            table_name: table.into(),
            column_name: column.into(),
            value: RowValues::Text(value.into()),
        }
    }

    #[test]
    fn report_drops_duplicate_matches() {
        let mut report = SearchReport::default();
        report.record("A", Ok(vec![hit("A", "N", "x"), hit("A", "N", "x")]));
        report.record("A", Ok(vec![hit("A", "N", "x"), hit("A", "M", "x")]));
        assert_eq!(report.matches.len(), 2);
        assert_eq!(report.tables_searched, 2);
    }

    #[test]
    fn report_keeps_failures_apart_from_matches() {
        let mut report = SearchReport::default();
        report.record("A", Ok(vec![hit("A", "N", "x")]));
        report.record(
            "B",
            Err(SearchError::ConnectionError("gone".into())),
        );
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.failures[0].table_name, "B");
        assert!(report.failures[0].error.contains("gone"));
    }

    #[tokio::test]
    async fn deadline_turns_into_timeout_error() {
        let res: Result<(), SearchError> = with_deadline(
            "SLOW",
            Some(Duration::from_millis(10)),
            async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(res, Err(SearchError::Timeout { ref table, .. }) if table == "SLOW"));
    }
}
