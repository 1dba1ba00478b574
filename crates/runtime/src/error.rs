use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] kotori_config::Error),

    #[error(transparent)]
    Router(#[from] kotori_router::Error),

    #[error(transparent)]
    Rbac(#[from] kotori_rbac::Error),

    #[error(transparent)]
    Command(#[from] kotori_command::Error),

    #[error("startup did not complete within {seconds}s")]
    StartupTimeout { seconds: u64 },

    #[error("connection to the gateway was lost")]
    ConnectionLost,

    #[error("bot is not running")]
    NotRunning,

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, Error>;
