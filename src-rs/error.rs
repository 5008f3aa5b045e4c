use std::path::PathBuf;

use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("{0}")]
    MissingApiKey(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
