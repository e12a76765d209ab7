use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChoreError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{0}` is not a calendar day (expected YYYY-MM-DD)")]
    InvalidDay(String),
    #[error("invalid time format `{0}`, expected HH:MM")]
    InvalidTime(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(String),
}

pub type Result<T, E = ChoreError> = std::result::Result<T, E>;
