//! `manifest.toml` parsing.

use std::{collections::BTreeMap, path::Path};

use {
    semver::{Version, VersionReq},
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result};

pub const MANIFEST_FILE: &str = "manifest.toml";

fn default_main() -> String {
    "plugin.rs".to_string()
}

/// Per-plugin metadata declared by the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    /// Semver version string, validated on load.
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relative path of the entry module. Informational for linked-in
    /// plugins; kept for manifest compatibility.
    #[serde(default = "default_main")]
    pub main: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_class: Option<String>,
    /// Dependency name → semver range.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Unknown manifest keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl PluginManifest {
    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::invalid_manifest(path.display().to_string(), e.to_string()))?;
        let manifest: Self = toml::from_str(&raw)
            .map_err(|e| Error::invalid_manifest(path.display().to_string(), e.to_string()))?;

        if manifest.name.trim().is_empty() {
            return Err(Error::invalid_manifest(
                path.display().to_string(),
                "'name' must not be empty",
            ));
        }
        manifest
            .parsed_version()
            .map_err(|e| Error::invalid_manifest(path.display().to_string(), e.to_string()))?;
        Ok(manifest)
    }

    pub fn parsed_version(&self) -> std::result::Result<Version, semver::Error> {
        Version::parse(&self.version)
    }

    /// Parsed dependency ranges; invalid ranges surface the offending name.
    pub fn dependency_reqs(&self) -> Result<BTreeMap<String, VersionReq>> {
        let mut reqs = BTreeMap::new();
        for (name, range) in &self.dependencies {
            let req = VersionReq::parse(range).map_err(|e| {
                Error::Message(format!(
                    "plugin '{}': invalid range '{range}' for dependency '{name}': {e}",
                    self.name
                ))
            })?;
            reqs.insert(name.clone(), req);
        }
        Ok(reqs)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn minimal_manifest_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_manifest(tmp.path(), "name = \"echo\"\nversion = \"1.2.3\"\n");

        let m = PluginManifest::load(&path).unwrap();
        assert_eq!(m.name, "echo");
        assert_eq!(m.parsed_version().unwrap(), Version::new(1, 2, 3));
        assert_eq!(m.main, "plugin.rs");
        assert!(m.dependencies.is_empty());
        assert_eq!(m.author, None);
    }

    #[test]
    fn full_manifest_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
name = "backup"
version = "0.3.0"
author = "someone"
description = "scheduled backups"
main = "backup.rs"
entry_class = "BackupPlugin"
homepage = "https://example.org"

[dependencies]
storage = ">=1.0, <2.0"
notify = "^0.2"
"#,
        );

        let m = PluginManifest::load(&path).unwrap();
        assert_eq!(m.entry_class.as_deref(), Some("BackupPlugin"));
        assert_eq!(m.dependencies["storage"], ">=1.0, <2.0");
        // Unknown keys survive.
        assert_eq!(
            m.extra["homepage"].as_str(),
            Some("https://example.org")
        );

        let reqs = m.dependency_reqs().unwrap();
        assert!(reqs["storage"].matches(&Version::new(1, 3, 0)));
        assert!(!reqs["storage"].matches(&Version::new(2, 0, 0)));
        assert!(reqs["notify"].matches(&Version::new(0, 2, 9)));
    }

    #[test]
    fn bad_version_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_manifest(tmp.path(), "name = \"x\"\nversion = \"not-semver\"\n");
        assert!(matches!(
            PluginManifest::load(&path),
            Err(Error::InvalidManifest { .. })
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_manifest(tmp.path(), "name = \" \"\nversion = \"1.0.0\"\n");
        assert!(matches!(
            PluginManifest::load(&path),
            Err(Error::InvalidManifest { .. })
        ));
    }

    #[test]
    fn invalid_dependency_range_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_manifest(
            tmp.path(),
            "name = \"x\"\nversion = \"1.0.0\"\n[dependencies]\ny = \"what\"\n",
        );
        let m = PluginManifest::load(&path).unwrap();
        assert!(m.dependency_reqs().is_err());
    }
}
