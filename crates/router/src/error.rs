use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not connected to the gateway")]
    NotConnected,

    #[error("request '{action}' timed out")]
    Timeout { action: String },

    #[error("request cancelled by router shutdown")]
    Cancelled,

    #[error("connection to the gateway closed")]
    ConnectionClosed,

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn timeout(action: impl Into<String>) -> Self {
        Self::Timeout {
            action: action.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
