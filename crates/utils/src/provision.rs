use std::{fs, io, path::Path};

use thiserror::Error;
use tracing::info;

/// Placeholder routing table written by [`ensure_default_config`], routing
/// every sender through one authenticated submission relay.
pub const DEFAULT_TRANSPORTS: &str = r#"{
    "default": {
        "transport": {
            "host": "smtp.domain.com",
            "port": 587,
            "secure": false,
            "auth": {
                "user": "sender@domain.com",
                "pass": "sender-password"
            }
        }
    }
}
"#;

/// Errors that can occur while provisioning the routing table.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The directory holding the routing table could not be created.
    #[error("Failed to create directory {path}: {source}")]
    Directory { path: String, source: io::Error },

    /// The routing table could not be written.
    #[error("Failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
}

/// Writes the placeholder routing table to the given path unless a file
/// already exists there, creating missing parent directories.
///
/// Returns whether the file was written.
pub fn ensure_default_config(path: &Path) -> Result<bool, ProvisionError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ProvisionError::Directory {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(path, DEFAULT_TRANSPORTS).map_err(|source| ProvisionError::Write {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), "Default routing table written");
    Ok(true)
}
