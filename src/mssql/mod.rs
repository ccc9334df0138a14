// MSSQL module - SQL Server access for the search pipeline
//
// - config: connection options, builder, and the bb8 pool
// - query: result extraction, parameter binding, and the executor impls

pub mod config;
pub mod query;

pub use config::{MssqlClient, MssqlOptions, MssqlOptionsBuilder, MssqlPool};
pub use query::{bind_query_params, build_result_set};
