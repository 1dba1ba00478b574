use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// One registered prefix is a proper prefix of another, which would make
    /// dispatch ambiguous. The framework refuses to dispatch until fixed.
    #[error("prefix conflict: '{a}' is a prefix of '{b}'")]
    PrefixConflict { a: String, b: String },

    /// Two command specs (or aliases) resolve to the same path words.
    #[error("command path conflict: '{path}'")]
    PathConflict { path: String },

    #[error("invalid command spec: {0}")]
    InvalidSpec(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, Error>;
