// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("session expired, please log in again")]
    Unauthorized,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            ClientError::Validation(_) => 2,
            ClientError::Unauthorized | ClientError::NotLoggedIn => 3,
            ClientError::Http(_) | ClientError::Status { .. } => 4,
            ClientError::Decode(_) => 5,
            ClientError::Io(_) => 10,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
