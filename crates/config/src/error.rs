use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config file not found: {path}")]
    MissingFile { path: String },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "weak ws token on public listener {listen_ip}: tokens need 12+ chars with digit, lower, upper, and special"
    )]
    WeakToken { listen_ip: String },

    #[error("invalid config value: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
