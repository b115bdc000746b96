//! Startup configuration loading
//!
//! The gateway is launched as `guacgate guacd_<protocol>.json`; the
//! protocol name picks the sibling `<protocol>_credentials` file. Both live
//! in the base directory given by `script_path`.

use guacgate_proto::{ConfigError, ConnectionConfig, Credentials, GatewayConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const CONFIG_PREFIX: &str = "guacd_";
const CONFIG_SUFFIX: &str = ".json";
const CREDENTIALS_SUFFIX: &str = "_credentials";

/// Fatal startup configuration errors
#[derive(Debug, Error)]
pub enum StartupConfigError {
    #[error("Config file name {0:?} does not match guacd_<protocol>.json")]
    BadFileName(String),

    #[error("Base directory {path:?} is not usable: {reason}")]
    BaseDir { path: PathBuf, reason: String },

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

/// Locations of the two files that make up one gateway's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub protocol: String,
    pub connection: PathBuf,
    pub credentials: PathBuf,
}

impl ConfigPaths {
    pub fn resolve(base_dir: &Path, config_file: &str) -> Result<Self, StartupConfigError> {
        let protocol = protocol_name(config_file)?;
        let credentials = format!("{}{}", protocol, CREDENTIALS_SUFFIX);

        Ok(Self {
            protocol: protocol.to_string(),
            connection: base_dir.join(config_file),
            credentials: base_dir.join(credentials),
        })
    }
}

/// Extract `<protocol>` from `guacd_<protocol>.json`
///
/// Only the final path component is inspected; the protocol must be one or
/// more ASCII word characters.
pub fn protocol_name(config_file: &str) -> Result<&str, StartupConfigError> {
    let bad_name = || StartupConfigError::BadFileName(config_file.to_string());

    let file_name = Path::new(config_file)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(bad_name)?;

    let protocol = file_name
        .strip_prefix(CONFIG_PREFIX)
        .and_then(|rest| rest.strip_suffix(CONFIG_SUFFIX))
        .ok_or_else(bad_name)?;

    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if protocol.is_empty() || !protocol.chars().all(is_word) {
        return Err(bad_name());
    }

    Ok(protocol)
}

/// Canonicalize the base directory, failing unless it is an existing directory
pub fn resolve_base_dir(path: &Path) -> Result<PathBuf, StartupConfigError> {
    let base_dir_error = |reason: String| StartupConfigError::BaseDir {
        path: path.to_path_buf(),
        reason,
    };

    let resolved = path.canonicalize().map_err(|e| base_dir_error(e.to_string()))?;
    if !resolved.is_dir() {
        return Err(base_dir_error("not a directory".to_string()));
    }

    Ok(resolved)
}

/// Load credentials and connection settings
pub fn load(base_dir: &Path, config_file: &str) -> Result<GatewayConfig, StartupConfigError> {
    let paths = ConfigPaths::resolve(base_dir, config_file)?;

    info!("Loading credentials from {}", paths.credentials.display());
    let credentials = Credentials::from_json(&read(&paths.credentials)?).map_err(|source| {
        StartupConfigError::Parse {
            path: paths.credentials.clone(),
            source,
        }
    })?;

    info!("Loading connection configuration from {}", paths.connection.display());
    let connection = ConnectionConfig::from_json(&read(&paths.connection)?).map_err(|source| {
        StartupConfigError::Parse {
            path: paths.connection.clone(),
            source,
        }
    })?;

    info!("Configuration for protocol '{}' loaded", paths.protocol);
    Ok(GatewayConfig::new(credentials, connection))
}

fn read(path: &Path) -> Result<String, StartupConfigError> {
    fs::read_to_string(path).map_err(|source| StartupConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
