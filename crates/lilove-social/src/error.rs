use thiserror::Error;

/// Errors from the social stores (teams, challenges, scores, feed).
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("challenge is not active: {id}")]
    NotActive { id: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, SocialError>;
