//! Role-based access control.
//!
//! Permissions are dot-separated paths stored in a trie. Users hold direct
//! white/black lists plus roles; roles inherit from parents in a DAG.
//! Evaluation is black-over-white with default deny.

pub mod error;
pub mod path;
pub mod service;
pub mod store;
pub mod trie;

pub use {
    error::{Error, Result},
    path::PermissionPath,
    service::{ListMode, RbacService, Target},
    store::RbacStore,
    trie::PermissionTrie,
};

/// Built-in role names, seeded with `root` → `admin` → `user` inheritance.
pub mod roles {
    pub const ROOT: &str = "root";
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}
