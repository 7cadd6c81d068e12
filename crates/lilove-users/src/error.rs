use thiserror::Error;

/// All user-layer errors. Kept separate from LiloveError so the gateway
/// can map them to appropriate WS response codes without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Unknown token")]
    UnknownToken,

    #[error("Invalid resume token: {0}")]
    InvalidResumeToken(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;
