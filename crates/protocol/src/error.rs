use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("frame is neither an event nor a response")]
    UnknownFrame,

    #[error("unknown post_type: {post_type}")]
    UnknownPostType { post_type: String },

    #[error("missing field: {field}")]
    MissingField { field: &'static str },

    #[error("gateway error {retcode}: {message}")]
    Api { retcode: i64, message: String },

    #[error("request '{action}' timed out")]
    Timeout { action: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn unknown_post_type(post_type: impl Into<String>) -> Self {
        Self::UnknownPostType {
            post_type: post_type.into(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

impl kotori_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

kotori_common::impl_context!(Error);
