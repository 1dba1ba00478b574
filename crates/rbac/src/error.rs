use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("role already exists: {role}")]
    RoleExists { role: String },

    #[error("role not found: {role}")]
    RoleNotFound { role: String },

    #[error("user already exists: {user}")]
    UserExists { user: String },

    #[error("user not found: {user}")]
    UserNotFound { user: String },

    #[error("permission not found: {permission}")]
    PermissionNotFound { permission: String },

    #[error("a role cannot inherit from itself: {role}")]
    SelfInheritance { role: String },

    #[error("inheritance cycle: {role} -> {parent}")]
    InheritanceCycle { role: String, parent: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn role_not_found(role: impl Into<String>) -> Self {
        Self::RoleNotFound { role: role.into() }
    }

    #[must_use]
    pub fn user_not_found(user: impl Into<String>) -> Self {
        Self::UserNotFound { user: user.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
