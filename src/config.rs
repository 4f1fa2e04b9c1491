//! Runtime Configuration
//!
//! A small set of named options that clients read with `CONFIG GET` and
//! change with `CONFIG SET`. Values are opaque to the server: `dir` and
//! `dbfilename` are stored as raw bytes and echoed back unchanged, never
//! checked against the filesystem.

use bytes::Bytes;
use parking_lot::RwLock;
use std::fmt;
use std::str::FromStr;

/// A recognized configuration parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigParam {
    /// Directory for snapshot files
    Dir,
    /// Snapshot file name
    DbFilename,
}

impl ConfigParam {
    /// All parameters, in the order they are listed.
    pub const ALL: [ConfigParam; 2] = [ConfigParam::Dir, ConfigParam::DbFilename];

    /// The canonical (lowercase) parameter name.
    pub fn name(self) -> &'static str {
        match self {
            ConfigParam::Dir => "dir",
            ConfigParam::DbFilename => "dbfilename",
        }
    }
}

impl fmt::Display for ConfigParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a parameter name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown config parameter '{0}'")]
pub struct UnknownParam(pub String);

impl FromStr for ConfigParam {
    type Err = UnknownParam;

    /// Parameter names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigParam::ALL
            .into_iter()
            .find(|param| param.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownParam(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Values {
    dir: Bytes,
    dbfilename: Bytes,
}

impl Values {
    fn slot(&mut self, param: ConfigParam) -> &mut Bytes {
        match param {
            ConfigParam::Dir => &mut self.dir,
            ConfigParam::DbFilename => &mut self.dbfilename,
        }
    }
}

/// Process-wide runtime configuration, shared by all connections.
///
/// # Example
///
/// ```
/// use sparkkv::config::{ConfigParam, RuntimeConfig};
///
/// let config = RuntimeConfig::new("/var/lib/sparkkv", "dump.rdb");
/// config.set(ConfigParam::Dir, "/tmp");
/// assert_eq!(config.get(ConfigParam::Dir), "/tmp");
/// assert_eq!(config.get(ConfigParam::DbFilename), "dump.rdb");
/// ```
#[derive(Debug, Default)]
pub struct RuntimeConfig {
    values: RwLock<Values>,
}

impl RuntimeConfig {
    /// Creates the configuration from startup values.
    pub fn new(dir: impl Into<Bytes>, dbfilename: impl Into<Bytes>) -> Self {
        Self {
            values: RwLock::new(Values {
                dir: dir.into(),
                dbfilename: dbfilename.into(),
            }),
        }
    }

    /// Returns the current value of a parameter.
    pub fn get(&self, param: ConfigParam) -> Bytes {
        let values = self.values.read();
        match param {
            ConfigParam::Dir => values.dir.clone(),
            ConfigParam::DbFilename => values.dbfilename.clone(),
        }
    }

    /// Replaces the value of a parameter.
    pub fn set(&self, param: ConfigParam, value: impl Into<Bytes>) {
        *self.values.write().slot(param) = value.into();
    }
}
