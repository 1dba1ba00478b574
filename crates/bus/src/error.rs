use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid subscription pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no tokio runtime available for blocking publish")]
    NoRuntime,

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, Error>;
