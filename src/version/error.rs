use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Unauthorized after authentication: {0}")]
    Unauthorized(String),

    #[error("Invalid authentication challenge: {0}")]
    InvalidChallenge(String),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Pagination exceeded {0} pages")]
    PaginationLimit(usize),

    #[error("Pagination revisited {0}")]
    PaginationLoop(String),
}

impl RegistryError {
    /// Returns true for failures below the HTTP layer (DNS, connect, TLS, timeout)
    pub fn is_transport(&self) -> bool {
        matches!(self, RegistryError::Network(_))
    }
}
