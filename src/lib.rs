//! Find which columns of which SQL Server tables contain a value.
//!
//! For each table the crate reads the column list from the catalog, builds a
//! type-aware `WHERE` clause with bound parameters, fetches a single probe
//! row, and confirms column by column which values contain the search term.
//!
//! ```rust,no_run
//! # #[cfg(feature = "mssql")]
//! # async fn demo() -> Result<(), sql_value_search::SearchError> {
//! use sql_value_search::prelude::*;
//!
//! let pool = MssqlOptionsBuilder::new(
//!     "db.local".into(),
//!     "stock".into(),
//!     "reader".into(),
//!     "secret".into(),
//! )
//! .build(4)
//! .await?;
//! let searcher = Searcher::new(pool, vec!["STK_STOCK".into()], SearchOptions::default());
//! for m in searcher.search("50tender").await.matches {
//!     println!("{m}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod condition;
pub mod config;
pub mod console;
pub mod error;
pub mod executor;
pub mod matcher;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ConfigError, SearchError};
