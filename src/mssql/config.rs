use std::fmt;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_tiberius::{ConnectionManager, rt};
use tiberius::{AuthMethod, Config as TiberiusConfig};

use crate::error::SearchError;
use crate::executor::ConnectionSource;

/// Type alias for SQL Server client
pub type MssqlClient = rt::Client;

/// Connection settings for SQL Server.
#[derive(Clone)]
pub struct MssqlOptions {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    pub trust_cert: bool,
}

impl fmt::Debug for MssqlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MssqlOptions")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("port", &self.port)
            .field("instance_name", &self.instance_name)
            .field("trust_cert", &self.trust_cert)
            .finish_non_exhaustive()
    }
}

impl MssqlOptions {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            server,
            database,
            user,
            password,
            port: None,
            instance_name: None,
            trust_cert: true,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }
}

/// Fluent builder for MSSQL options.
#[derive(Debug, Clone)]
pub struct MssqlOptionsBuilder {
    opts: MssqlOptions,
}

impl MssqlOptionsBuilder {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            opts: MssqlOptions::new(server, database, user, password),
        }
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn trust_cert(mut self, trust_cert: bool) -> Self {
        self.opts.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlOptions {
        self.opts
    }

    /// Build a connection pool with room for `max_size` sessions.
    ///
    /// # Errors
    ///
    /// Returns `SearchError` if pool creation fails.
    pub async fn build(self, max_size: u32) -> Result<MssqlPool, SearchError> {
        MssqlPool::new(self.finish(), max_size).await
    }
}

/// Pool of SQL Server sessions; each search worker checks out its own.
#[derive(Clone)]
pub struct MssqlPool {
    pool: Pool<ConnectionManager>,
    server: String,
    database: String,
}

impl fmt::Debug for MssqlPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MssqlPool")
            .field("server", &self.server)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl MssqlPool {
    /// Create the pool. No connection is opened until one is requested.
    ///
    /// # Errors
    /// Returns `SearchError::ConnectionError` if manager/pool creation fails.
    pub async fn new(opts: MssqlOptions, max_size: u32) -> Result<Self, SearchError> {
        let config = build_tiberius_config(&opts);

        let manager = ConnectionManager::build(config).map_err(|e| {
            SearchError::ConnectionError(format!("Failed to configure SQL Server manager: {e}"))
        })?;

        let pool = Pool::builder()
            .max_size(max_size.max(1))
            .build(manager)
            .await
            .map_err(|e| {
                SearchError::ConnectionError(format!("Failed to create SQL Server pool: {e}"))
            })?;

        Ok(Self {
            pool,
            server: opts.server,
            database: opts.database,
        })
    }

    /// Open one session to prove the server is reachable and the
    /// credentials work.
    ///
    /// # Errors
    /// Returns `SearchError::PoolError` if no session can be established.
    pub async fn check_connectivity(&self) -> Result<(), SearchError> {
        let _conn = self.pool.get().await?;
        tracing::info!(server = %self.server, database = %self.database, "connected to SQL Server");
        Ok(())
    }
}

#[async_trait]
impl ConnectionSource for MssqlPool {
    type Connection = PooledConnection<'static, ConnectionManager>;

    async fn acquire(&self) -> Result<Self::Connection, SearchError> {
        Ok(self.pool.get_owned().await?)
    }
}

fn build_tiberius_config(opts: &MssqlOptions) -> TiberiusConfig {
    let mut config = TiberiusConfig::new();
    config.host(&opts.server);
    config.database(&opts.database);
    config.port(opts.port.unwrap_or(1433));
    config.authentication(AuthMethod::sql_server(&opts.user, &opts.password));
    if let Some(instance) = &opts.instance_name {
        config.instance_name(instance);
    }
    if opts.trust_cert {
        config.trust_cert();
    }
    config
}
