use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Source API credentials are not configured
    #[error("Missing source credentials: {message}")]
    MissingCredentials { message: String },

    /// Configuration is internally inconsistent
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Transport-level failure talking to the source API
    #[error("Source API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source API answered with a non-success status
    #[error("Source API returned {status} for {url}: {body}")]
    UnexpectedStatus { status: u16, url: String, body: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Filesystem failure, with the operation that was attempted
    #[error("Failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Type alias for fallible operations in this crate
pub type Result<T> = std::result::Result<T, Error>;
