//! Convenient imports for common functionality.

pub use crate::batch::{SearchOptions, SearchReport, Searcher, TableFailure, search_tables};
pub use crate::condition::{ComparisonKind, Predicate, SearchQuery, build_conditions};
pub use crate::config::{DatabaseConfig, SearchConfig};
pub use crate::console::{Console, SessionSummary};
pub use crate::error::{ConfigError, SearchError};
pub use crate::executor::{ConnectionSource, QueryExecutor};
pub use crate::matcher::{MatchResult, SearchRequest, scan_row, search_table};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::schema::{ColumnInfo, DeclaredType, get_columns};
pub use crate::types::RowValues;

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlClient, MssqlOptions, MssqlOptionsBuilder, MssqlPool};
