use std::io;
use std::path::PathBuf;

use chromiumoxide::error::CdpError;
use thiserror::Error;

use crate::bridge::BridgeError;
use crate::browser::BrowserError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to write config {path}: {source}")]
    Write { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("failed to parse browser config {path}: {source}")]
    Toml {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("{0} is missing on configuration")]
    MissingKey(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Run-level failure of an export. Every variant is fatal for the run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0} is missing on configuration")]
    MissingConfigurationKey(String),
    #[error("invalid month: {0:?}")]
    InvalidMonth(String),
    #[error("timeout waiting for {0}")]
    InteractionTimeout(String),
    #[error("download failed: {0}")]
    DownloadFailure(String),
    #[error(transparent)]
    Configuration(ConfigError),
    #[error(transparent)]
    Browser(BrowserError),
    #[error(transparent)]
    TaskBridge(BridgeError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    /// Descriptive name reported to the operator next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::MissingConfigurationKey(_) => "MissingConfigurationKey",
            ExportError::InvalidMonth(_) => "InvalidMonth",
            ExportError::InteractionTimeout(_) => "InteractionTimeout",
            ExportError::DownloadFailure(_) => "DownloadFailure",
            ExportError::Configuration(_) => "Configuration",
            ExportError::Browser(_) => "Browser",
            ExportError::TaskBridge(_) => "TaskBridge",
            ExportError::Io(_) => "Io",
        }
    }
}

impl From<ConfigError> for ExportError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::MissingKey(key) => ExportError::MissingConfigurationKey(key),
            other => ExportError::Configuration(other),
        }
    }
}

impl From<BrowserError> for ExportError {
    fn from(error: BrowserError) -> Self {
        match error {
            BrowserError::Cdp(CdpError::Timeout) => {
                ExportError::InteractionTimeout("browser request".to_string())
            }
            other => ExportError::Browser(other),
        }
    }
}

impl From<BridgeError> for ExportError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Download { url, message } => {
                ExportError::DownloadFailure(format!("{url}: {message}"))
            }
            other => ExportError::TaskBridge(other),
        }
    }
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_keeps_its_name() {
        let error = ExportError::from(ConfigError::MissingKey("password".into()));
        assert_eq!(error.kind(), "MissingConfigurationKey");
        assert_eq!(error.to_string(), "password is missing on configuration");
    }

    #[test]
    fn cdp_timeout_becomes_interaction_timeout() {
        let error = ExportError::from(BrowserError::Cdp(CdpError::Timeout));
        assert!(matches!(error, ExportError::InteractionTimeout(_)));
        assert_eq!(error.kind(), "InteractionTimeout");
        assert_eq!(error.to_string(), "timeout waiting for browser request");
    }

    #[test]
    fn other_cdp_failures_stay_browser_errors() {
        let error = ExportError::from(BrowserError::Cdp(CdpError::NoResponse));
        assert_eq!(error.kind(), "Browser");
        let error = ExportError::from(BrowserError::Script("boom".into()));
        assert_eq!(error.kind(), "Browser");
    }

    #[test]
    fn bridge_download_becomes_download_failure() {
        let error = ExportError::from(BridgeError::Download {
            url: "https://x/file.zip".into(),
            message: "404 Not Found".into(),
        });
        assert_eq!(error.kind(), "DownloadFailure");
        assert!(error.to_string().contains("404"));
    }
}
