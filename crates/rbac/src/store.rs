//! Persistent RBAC storage with atomic writes.

use std::path::{Path, PathBuf};

use crate::{Result, service::RbacService};

pub struct RbacStore {
    path: PathBuf,
}

impl RbacStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, or `None` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<RbacService>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)?;
        let service = serde_json::from_str(&data)?;
        Ok(Some(service))
    }

    /// Save via temp file + rename.
    pub fn save(&self, service: &RbacService) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(service)?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{ListMode, Target, roles},
    };

    #[test]
    fn load_missing_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RbacStore::new(tmp.path().join("missing.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RbacStore::new(tmp.path().join("rbac.json"));

        let mut svc = RbacService::new(true, None);
        svc.seed_builtin(Some("100")).unwrap();
        svc.grant(Target::Role, roles::ADMIN, "op.reboot", ListMode::White, true)
            .unwrap();
        svc.assign_role("200", roles::ADMIN, true).unwrap();
        store.save(&svc).unwrap();

        let mut loaded = store.load().unwrap().unwrap();
        assert!(loaded.check("200", "op.reboot").unwrap());
        assert!(loaded.check("100", "anything").unwrap());
        assert!(loaded.permission_exists("op.reboot"));
    }

    #[test]
    fn save_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RbacStore::new(tmp.path().join("nested/dir/rbac.json"));
        store.save(&RbacService::default()).unwrap();
        assert!(store.path().exists());
    }
}
