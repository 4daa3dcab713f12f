use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not logged in to Spotify")]
    AuthMissing,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Spotify API error: {0}")]
    Upstream(#[from] rspotify::ClientError),

    #[error("Unexpected Spotify response: {0}")]
    MalformedResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether the error came from the external API rather than from us or the user.
    pub fn is_upstream(&self) -> bool {
        matches!(self, AppError::Upstream(_) | AppError::MalformedResponse(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
