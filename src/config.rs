//! # Loader configuration
//!
//! Connection settings shared by every tool, stored as pretty-printed JSON in
//! `loader_config.json`:
//!
//! ```json
//! {
//!   "server": "localhost",
//!   "port": "1433",
//!   "user": "sa",
//!   "password": "secret",
//!   "database": "NEOs",
//!   "notify_high": false,
//!   "sqlite_path": "neos.db"
//! }
//! ```
//!
//! The SQL Server fields are kept so that [`LoaderConfig::odbc_connection_string`] can feed
//! external tools; this crate itself opens the SQLite file named by `sqlite_path`
//! (`<database>.db` when absent).
//!
//! ## Legacy files
//! -----------------
//! Older installations kept the settings in `ultima_configuracao.cfg`, read by
//! [`LoaderConfig::from_legacy_text`] in this order:
//!
//! 1. one value per line: server, port, user, password, database,
//! 2. a JSON object with localized keys (`Servidor`, `Porta`, `Utilizador`, ...),
//! 3. `key=value` lines with the same keys.
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::NeoDatabase;
use crate::constants::{DEFAULT_LOADER_CONFIG, LEGACY_CONFIG_NAMES};
use crate::loader_errors::LoaderError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Poll for new high-priority alerts
    #[serde(default)]
    pub notify_high: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<Utf8PathBuf>,
}

/// Canonical name of a configuration key, `None` for unknown keys
pub fn normalize_key(key: &str) -> Option<&'static str> {
    match key.trim() {
        "Servidor" | "Servidor (IP/Nome)" | "server" | "host" => Some("server"),
        "Porta" | "Porta (opcional)" | "port" => Some("port"),
        "Utilizador" | "username" | "user" => Some("user"),
        "Password" | "password" | "pwd" => Some("password"),
        "Base de Dados" | "database" | "db" => Some("database"),
        _ => None,
    }
}

impl LoaderConfig {
    /// Read a JSON configuration file
    pub fn load(path: &Utf8Path) -> Result<Self, LoaderError> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        debug!(file = %path, "configuration loaded");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Utf8Path) -> Result<(), LoaderError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(file = %path, "configuration saved");
        Ok(())
    }

    /// Find a configuration in `dir`: `loader_config.json` first, then a legacy file.
    ///
    /// Return
    /// ----------
    /// * The configuration and the file it came from, or
    ///   [`LoaderError::InvalidConfig`] when no usable file exists.
    pub fn discover(dir: &Utf8Path) -> Result<(Self, Utf8PathBuf), LoaderError> {
        let json = dir.join(DEFAULT_LOADER_CONFIG);
        if json.is_file() {
            return Ok((Self::load(&json)?, json));
        }
        for name in LEGACY_CONFIG_NAMES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            if let Some(config) = Self::from_legacy_text(&text) {
                info!(file = %path, "legacy configuration imported");
                return Ok((config, path));
            }
        }
        Err(LoaderError::InvalidConfig(format!(
            "no {DEFAULT_LOADER_CONFIG} nor legacy configuration in {dir}"
        )))
    }

    /// Parse a legacy configuration in any of its three layouts
    pub fn from_legacy_text(text: &str) -> Option<Self> {
        Self::from_legacy_lines(text)
            .or_else(|| Self::from_json_object(text))
            .or_else(|| Self::from_key_values(text))
    }

    /// One value per line: server, port, user, password, database. Missing lines are
    /// empty; server, user and database are required. Text holding a JSON object or a
    /// known `key=value` line is left to the other layouts.
    pub fn from_legacy_lines(text: &str) -> Option<Self> {
        let keyed = text.lines().any(|line| {
            line.split_once('=')
                .is_some_and(|(key, _)| normalize_key(key).is_some())
        });
        if keyed || text.trim_start().starts_with('{') {
            return None;
        }
        let mut lines = text.lines().map(str::trim);
        let mut next = || lines.next().unwrap_or_default().to_string();
        let config = LoaderConfig {
            server: next(),
            port: next(),
            user: next(),
            password: next(),
            database: next(),
            ..Default::default()
        };
        config.has_required_fields().then_some(config)
    }

    fn from_json_object(text: &str) -> Option<Self> {
        let text = text.trim();
        if !(text.starts_with('{') && text.ends_with('}')) {
            return None;
        }
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text).ok()?;
        let pairs = object.into_iter().map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        });
        Self::from_pairs(pairs)
    }

    fn from_key_values(text: &str) -> Option<Self> {
        let pairs = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()));
        Self::from_pairs(pairs)
    }

    fn from_pairs(pairs: impl Iterator<Item = (String, String)>) -> Option<Self> {
        let mut config = LoaderConfig::default();
        let mut any = false;
        for (key, value) in pairs {
            let slot = match normalize_key(&key) {
                Some("server") => &mut config.server,
                Some("port") => &mut config.port,
                Some("user") => &mut config.user,
                Some("password") => &mut config.password,
                Some("database") => &mut config.database,
                _ => continue,
            };
            *slot = value;
            any = true;
        }
        any.then_some(config)
    }

    fn has_required_fields(&self) -> bool {
        [&self.server, &self.user, &self.database]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// ODBC connection string of the SQL Server catalogue (`SERVER=host,port` when a port is
    /// set).
    pub fn odbc_connection_string(&self) -> String {
        let mut server = self.server.trim().to_string();
        let port = self.port.trim();
        if !port.is_empty() {
            server = format!("{server},{port}");
        }
        format!(
            "DRIVER={{ODBC Driver 17 for SQL Server}};SERVER={server};DATABASE={};UID={};PWD={};\
             TrustServerCertificate=yes;",
            self.database.trim(),
            self.user.trim(),
            self.password
        )
    }

    /// SQLite file of the catalogue
    pub fn database_path(&self) -> Result<Utf8PathBuf, LoaderError> {
        if let Some(path) = &self.sqlite_path {
            return Ok(path.clone());
        }
        let database = self.database.trim();
        if database.is_empty() {
            return Err(LoaderError::InvalidConfig(
                "neither sqlite_path nor database is set".into(),
            ));
        }
        Ok(Utf8PathBuf::from(format!("{database}.db")))
    }

    /// Open the catalogue database and seed its reference tables
    pub fn open_database(&self) -> Result<NeoDatabase, LoaderError> {
        let db = NeoDatabase::open(&self.database_path()?)?;
        db.ensure_reference_data()?;
        Ok(db)
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_legacy_lines() {
        let config = LoaderConfig::from_legacy_text("localhost\n\nsa\nsecret\nNEOs\n").unwrap();
        assert_eq!(config.server, "localhost");
        assert_eq!(config.port, "");
        assert_eq!(config.user, "sa");
        assert_eq!(config.database, "NEOs");
        assert!(LoaderConfig::from_legacy_lines("localhost\n1433\nsa\n").is_none());
        assert!(LoaderConfig::from_legacy_lines("server=a\nport=1\nuser=b\npwd=c\ndb=d").is_none());
    }

    #[test]
    fn test_legacy_json_and_key_values() {
        let config = LoaderConfig::from_legacy_text(
            r#"{"Servidor": "db.local", "Porta": 1433, "Utilizador": "sa", "Base de Dados": "NEOs", "other": 1}"#,
        )
        .unwrap();
        assert_eq!(config.server, "db.local");
        assert_eq!(config.port, "1433");

        let config = LoaderConfig::from_legacy_text("host = db.local\npwd=x=y\ndb=NEOs").unwrap();
        assert_eq!(config.server, "db.local");
        assert_eq!(config.password, "x=y");
        assert_eq!(config.database, "NEOs");
        assert!(LoaderConfig::from_legacy_text("nothing useful").is_none());
    }

    #[test]
    fn test_connection_string() {
        let config = LoaderConfig {
            server: " localhost ".into(),
            port: "1433".into(),
            user: "sa".into(),
            password: "p;w".into(),
            database: "NEOs".into(),
            ..Default::default()
        };
        assert_eq!(
            config.odbc_connection_string(),
            "DRIVER={ODBC Driver 17 for SQL Server};SERVER=localhost,1433;DATABASE=NEOs;UID=sa;PWD=p;w;TrustServerCertificate=yes;"
        );
        assert_eq!(config.database_path().unwrap(), Utf8PathBuf::from("NEOs.db"));
        assert!(matches!(
            LoaderConfig::default().database_path(),
            Err(LoaderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_defaults() {
        let config: LoaderConfig = serde_json::from_str(r#"{"server": "h"}"#).unwrap();
        assert!(!config.notify_high);
        assert_eq!(config.sqlite_path, None);
        let text = serde_json::to_string(&config).unwrap();
        assert!(!text.contains("sqlite_path"));
    }
}
