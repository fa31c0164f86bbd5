use thiserror::Error;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The referenced container does not exist.
    #[error("container does not exist: {0}")]
    MissingContainer(String),

    /// A container with the same name already exists.
    #[error("container already exists: {0}")]
    ContainerExists(String),

    /// Ambient credential resolution failed.
    #[error("credentials error: {0}")]
    Credentials(#[from] s3::creds::error::CredentialsError),

    /// An error reported by the S3 client.
    #[error("s3 error: {context}")]
    S3 {
        /// What the backend was doing when the client failed.
        context: String,
        /// The underlying client error.
        #[source]
        cause: s3::error::S3Error,
    },

    /// The service answered with an unexpected status code.
    #[error("unexpected status {code}: {context}")]
    Http {
        /// What the backend was doing when the response arrived.
        context: String,
        /// The HTTP status code of the response.
        code: u16,
    },

    /// Any other backend-specific failure.
    #[error("storage backend error: {context}")]
    Generic {
        /// What the backend was doing when the failure occurred.
        context: String,
        /// The underlying cause.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for backend operations.
pub type Result<T, E = BackendError> = std::result::Result<T, E>;
