#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskboardError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("invalid value for {field}: {msg}")]
    InvalidValue { field: String, msg: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error at {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl TaskboardError {
    pub fn invalid_value(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            msg: msg.into(),
        }
    }
}
