use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiloveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("WebSocket protocol error: {0}")]
    Protocol(String),

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Entitlement required: {entitlement}")]
    EntitlementRequired { entitlement: String },

    #[error("Not a member of {room}")]
    NotAMember { room: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Coach provider error: {0}")]
    Coach(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid params: {0}")]
    InvalidParams(String),
}

impl LiloveError {
    /// Short error code string sent to clients in WS RES frames.
    pub fn code(&self) -> &'static str {
        match self {
            LiloveError::Config(_) => "CONFIG_ERROR",
            LiloveError::AuthFailed(_) => "AUTH_FAILED",
            LiloveError::Protocol(_) => "PROTOCOL_ERROR",
            LiloveError::MethodNotFound { .. } => "METHOD_NOT_FOUND",
            LiloveError::EntitlementRequired { .. } => "ENTITLEMENT_REQUIRED",
            LiloveError::NotAMember { .. } => "NOT_A_MEMBER",
            LiloveError::NotFound { .. } => "NOT_FOUND",
            LiloveError::Database(_) => "DATABASE_ERROR",
            LiloveError::Coach(_) => "COACH_ERROR",
            LiloveError::Serialization(_) => "SERIALIZATION_ERROR",
            LiloveError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            LiloveError::InvalidParams(_) => "INVALID_PARAMS",
        }
    }
}

pub type Result<T> = std::result::Result<T, LiloveError>;
