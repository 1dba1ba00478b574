use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("plugin '{plugin}' depends on '{dependency}', which is not installed")]
    DependencyMissing { plugin: String, dependency: String },

    #[error(
        "plugin '{plugin}' requires '{dependency}' {requirement}, but {installed} is installed"
    )]
    VersionUnsatisfied {
        plugin: String,
        dependency: String,
        requirement: String,
        installed: String,
    },

    #[error("dependency cycle involving plugin '{plugin}'")]
    CycleDetected { plugin: String },

    #[error("no factory registered for plugin '{plugin}'")]
    FactoryMissing { plugin: String },

    #[error("plugin '{plugin}' is not loaded")]
    NotLoaded { plugin: String },

    #[error("invalid manifest at {path}: {message}")]
    InvalidManifest { path: String, message: String },

    #[error("plugin '{plugin}' on_load failed: {source}")]
    LoadHook {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn invalid_manifest(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
