use thiserror::Error;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;
use toml::de::Error as TomlError;

#[derive(Error, Debug)]
pub enum MotomiError {
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] TomlError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Completion returned no choices")]
    EmptyCompletion,

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for MotomiError {
    fn from(err: anyhow::Error) -> Self {
        MotomiError::Unknown(err.to_string())
    }
}

impl MotomiError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            MotomiError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            MotomiError::RateLimitExceeded(_) | MotomiError::Timeout(_) => true,
            MotomiError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MotomiError>;
