use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("invalid concurrency: {0}, at least one task must be allowed in flight")]
    InvalidConcurrency(usize),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("conflicting record: {0}")]
    Conflict(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Failures reported by the remote collaborators (mail provider, LLM, profile enrichment).
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("mail provider error: {0}")]
    Mail(String),

    #[error("draft generation error: {0}")]
    Generation(String),

    #[error("enrichment error: {0}")]
    Enrichment(String),

    #[error("Invalid LinkedIn profile URL: {0}")]
    InvalidProfileUrl(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum OutreachError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request that cannot be carried out for the record as it stands.
    #[error("{0}")]
    Invalid(String),

    /// A request that would take a name or address another record holds.
    #[error("{0}")]
    Conflict(String),
}

impl OutreachError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        OutreachError::Invalid(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        OutreachError::Conflict(message.into())
    }
}

pub type Result<T, E = OutreachError> = std::result::Result<T, E>;
