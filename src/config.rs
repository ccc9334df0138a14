//! JSON configuration: where the database lives and which tables to search.
//!
//! ```json
//! {
//!   "database": { "server": "db.local", "name": "stock", "id": "reader" },
//!   "tables": ["STK_STOCK", "STK_STOCK_2"]
//! }
//! ```
//!
//! The password is never read from this file.

use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(alias = "Server")]
    pub server: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(default, alias = "Port")]
    pub port: Option<u16>,
    #[serde(default, alias = "Instance")]
    pub instance: Option<String>,
    #[serde(default = "default_trust_cert", alias = "TrustCert")]
    pub trust_cert: bool,
}

fn default_trust_cert() -> bool {
    true
}

/// Fully validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub database: DatabaseConfig,
    pub tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default, alias = "Database")]
    database: Option<DatabaseConfig>,
    #[serde(default, alias = "Tables")]
    tables: Option<Vec<String>>,
}

impl SearchConfig {
    /// Load and validate the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// `ConfigError::Missing` when the file, the `database` section, or the
    /// table list is absent; `ConfigError::Unreadable` for other I/O
    /// failures; `ConfigError::Malformed` when the content cannot be used.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConfigError::missing(format!("configuration file {}", path.display()))
            } else {
                ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), tables = config.tables.len(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// See [`SearchConfig::load`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| ConfigError::malformed("json", e.to_string()))?;

        let database = raw
            .database
            .ok_or_else(|| ConfigError::missing("database section"))?;
        for (field, value) in [
            ("database.server", &database.server),
            ("database.name", &database.name),
            ("database.id", &database.id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::malformed(field, "must not be empty"));
            }
        }

        let tables = raw.tables.unwrap_or_default();
        let tables = validate_tables(tables)?;

        Ok(Self { database, tables })
    }

    /// Replace the table list, e.g. from command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the new list is empty or has blank names.
    pub fn with_tables(mut self, tables: Vec<String>) -> Result<Self, ConfigError> {
        self.tables = validate_tables(tables)?;
        Ok(self)
    }
}

fn validate_tables(tables: Vec<String>) -> Result<Vec<String>, ConfigError> {
    if tables.is_empty() {
        return Err(ConfigError::missing("table list"));
    }
    tables
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                Err(ConfigError::malformed(format!("tables[{i}]"), "blank table name"))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_key_styles() {
        let cfg = SearchConfig::from_json(
            r#"{"database": {"Server": "s", "Name": "n", "Id": "u"},
                "tables": ["A", " B "]}"#,
        )
        .unwrap();
        assert_eq!(cfg.database.server, "s");
        assert_eq!(cfg.database.port, None);
        assert!(cfg.database.trust_cert);
        assert_eq!(cfg.tables, ["A", "B"]);
    }

    #[test]
    fn missing_and_malformed_are_distinct() {
        let err = SearchConfig::from_json(r#"{"tables": ["A"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));

        let err = SearchConfig::from_json(
            r#"{"database": {"server": "s", "name": "n", "id": "u"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref what } if what == "table list"));

        let err = SearchConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));

        let err = SearchConfig::from_json(
            r#"{"database": {"server": "s", "name": "n", "id": "u"}, "tables": ["A", ""]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { ref what, .. } if what == "tables[1]"));
    }

    #[test]
    fn blank_database_fields_are_rejected() {
        let err = SearchConfig::from_json(
            r#"{"database": {"server": " ", "name": "n", "id": "u"}, "tables": ["A"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { ref what, .. } if what == "database.server"));
    }
}
