use crate::{ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Application configuration file, only the database section is read.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(alias = "Mysql")]
    pub mysql: DatabaseConfig,
}

impl Configuration {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Could not parse the configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Could not read the configuration file `{}`", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("In the file `{}`", path.display()))
    }
}

/// Connection parameters and pool limits of one database.
///
/// ```rust
/// use dbhelper_core::Configuration;
/// let config = Configuration::from_yaml(
///     "mysql:\n  user: root\n  password: p@ss\n  host: db\n  port: 3307\n  database: blog\n",
/// )
/// .unwrap();
/// assert_eq!(config.mysql.url(), "mysql://root:p%40ss@db:3307/blog");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Connections kept open while idle.
    pub max_idle_conns: usize,
    /// Upper bound of open connections, zero lets the engine decide.
    pub max_open_conns: usize,
    /// Seconds after which a connection is closed, zero means never.
    pub conn_max_lifetime: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "root".into(),
            password: String::new(),
            host: "localhost".into(),
            port: 3306,
            database: String::new(),
            max_idle_conns: 2,
            max_open_conns: 0,
            conn_max_lifetime: 0,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL, user and password are percent encoded.
    pub fn url(&self) -> String {
        let mut url = format!("mysql://{}", urlencoding::encode(&self.user));
        if !self.password.is_empty() {
            url.push(':');
            url.push_str(&urlencoding::encode(&self.password));
        }
        url.push_str(&format!("@{}:{}/{}", self.host, self.port, self.database));
        url
    }

    pub fn conn_max_lifetime(&self) -> Option<Duration> {
        (self.conn_max_lifetime > 0).then(|| Duration::from_secs(self.conn_max_lifetime))
    }
}
