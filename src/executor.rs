//! Seams between the search core and a live database.
//!
//! The search pipeline only ever needs to run a parameterised SELECT on one
//! session, and (when searching tables in parallel) to obtain a fresh session
//! per worker. Both are async traits so the SQL Server glue and the in-memory
//! test database plug in the same way.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::results::ResultSet;
use crate::types::RowValues;

#[async_trait]
pub trait QueryExecutor: Send {
    /// Executes a single SELECT statement with positional parameters
    /// (`@P1`, `@P2`, ...) and returns the result set.
    async fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SearchError>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Box<E> {
    async fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SearchError> {
        (**self).execute_select(query, params).await
    }
}

/// Hands out database sessions. Every call yields a session that is not
/// shared with any other in-flight operation.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    type Connection: QueryExecutor + Send;

    async fn acquire(&self) -> Result<Self::Connection, SearchError>;
}
