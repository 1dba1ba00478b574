//! Dependency graph resolution: topological load order with semver
//! validation. A plugin with an unsatisfiable dependency fails without
//! dragging unrelated plugins down; failures cascade only to dependents.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::{Error, manifest::PluginManifest};

/// Outcome of resolving a set of discovered manifests.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Plugins that can load, in dependency order (dependencies first).
    pub order: Vec<String>,
    /// Plugins that cannot load, with the reason.
    pub failures: BTreeMap<String, Error>,
}

/// Resolve load order for `manifests`.
///
/// Validation happens before any instantiation: missing dependencies,
/// unsatisfied version ranges, and cycles all land in `failures`; a plugin
/// whose dependency failed fails too.
#[must_use]
pub fn resolve(manifests: &BTreeMap<String, PluginManifest>) -> Resolution {
    let mut resolution = Resolution::default();

    // Phase 1: per-plugin dependency validation.
    for (name, manifest) in manifests {
        if let Err(error) = validate_dependencies(name, manifest, manifests) {
            warn!(plugin = %name, error = %error, "plugin failed dependency validation");
            resolution.failures.insert(name.clone(), error);
        }
    }

    // Phase 2: cascade failures to dependents, to a fixed point.
    loop {
        let mut newly_failed = Vec::new();
        for (name, manifest) in manifests {
            if resolution.failures.contains_key(name) {
                continue;
            }
            if let Some(dependency) = manifest
                .dependencies
                .keys()
                .find(|d| resolution.failures.contains_key(*d))
            {
                newly_failed.push((name.clone(), dependency.clone()));
            }
        }
        if newly_failed.is_empty() {
            break;
        }
        for (name, dependency) in newly_failed {
            warn!(plugin = %name, dependency = %dependency, "plugin disabled by failed dependency");
            resolution
                .failures
                .insert(name.clone(), Error::DependencyMissing {
                    plugin: name,
                    dependency,
                });
        }
    }

    // Phase 3: Kahn's algorithm over the healthy remainder. Iterating
    // BTreeMaps keeps the order deterministic.
    let healthy: BTreeSet<&String> = manifests
        .keys()
        .filter(|n| !resolution.failures.contains_key(*n))
        .collect();

    let mut in_degree: BTreeMap<&String, usize> = BTreeMap::new();
    for name in &healthy {
        let count = manifests[*name]
            .dependencies
            .keys()
            .filter(|d| healthy.contains(d))
            .count();
        in_degree.insert(*name, count);
    }

    let mut ready: Vec<&String> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    ready.sort();
    ready.reverse();

    while let Some(name) = ready.pop() {
        resolution.order.push(name.clone());
        let mut unblocked = Vec::new();
        for other in &healthy {
            if manifests[*other].dependencies.contains_key(name)
                && let Some(degree) = in_degree.get_mut(other)
            {
                *degree -= 1;
                if *degree == 0 {
                    unblocked.push(*other);
                }
            }
        }
        // Keep deterministic ordering among newly unblocked plugins.
        unblocked.sort();
        for u in unblocked.into_iter().rev() {
            ready.push(u);
        }
        ready.sort();
        ready.reverse();
    }

    // Anything healthy but unordered sits on a cycle.
    for name in healthy {
        if !resolution.order.contains(name) {
            warn!(plugin = %name, "plugin is part of a dependency cycle");
            resolution.failures.insert(name.clone(), Error::CycleDetected {
                plugin: name.clone(),
            });
        }
    }
    resolution
        .order
        .retain(|n| !resolution.failures.contains_key(n));

    resolution
}

fn validate_dependencies(
    name: &str,
    manifest: &PluginManifest,
    manifests: &BTreeMap<String, PluginManifest>,
) -> crate::Result<()> {
    let reqs = manifest.dependency_reqs()?;
    for (dependency, requirement) in reqs {
        let Some(installed) = manifests.get(&dependency) else {
            return Err(Error::DependencyMissing {
                plugin: name.to_string(),
                dependency,
            });
        };
        let installed_version = installed
            .parsed_version()
            .map_err(|e| Error::Message(format!("dependency '{dependency}': {e}")))?;
        if !requirement.matches(&installed_version) {
            return Err(Error::VersionUnsatisfied {
                plugin: name.to_string(),
                dependency,
                requirement: requirement.to_string(),
                installed: installed_version.to_string(),
            });
        }
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, version: &str, deps: &[(&str, &str)]) -> PluginManifest {
        PluginManifest {
            name: name.into(),
            version: version.into(),
            author: None,
            description: None,
            main: "plugin.rs".into(),
            entry_class: None,
            dependencies: deps
                .iter()
                .map(|(n, r)| (n.to_string(), r.to_string()))
                .collect(),
            extra: BTreeMap::new(),
        }
    }

    fn set(entries: Vec<PluginManifest>) -> BTreeMap<String, PluginManifest> {
        entries.into_iter().map(|m| (m.name.clone(), m)).collect()
    }

    #[test]
    fn dependencies_order_before_dependents() {
        let resolution = resolve(&set(vec![
            manifest("app", "1.0.0", &[("lib", ">=1.0")]),
            manifest("lib", "1.5.0", &[]),
        ]));
        assert!(resolution.failures.is_empty());
        assert_eq!(resolution.order, vec!["lib", "app"]);
    }

    #[test]
    fn satisfied_and_unsatisfied_ranges() {
        // A wants B in [1.0, 2.0); B is 1.3.0 → fine.
        // C wants B at ^2.0 → unmet; A and B stay loadable.
        let resolution = resolve(&set(vec![
            manifest("a", "1.0.0", &[("b", ">=1.0, <2.0")]),
            manifest("b", "1.3.0", &[]),
            manifest("c", "1.0.0", &[("b", "^2.0")]),
        ]));

        assert_eq!(resolution.order, vec!["b", "a"]);
        assert!(matches!(
            resolution.failures.get("c"),
            Some(Error::VersionUnsatisfied { .. })
        ));
    }

    #[test]
    fn missing_dependency_fails_only_its_dependents() {
        let resolution = resolve(&set(vec![
            manifest("standalone", "1.0.0", &[]),
            manifest("orphan", "1.0.0", &[("ghost", "*")]),
            manifest("grandchild", "1.0.0", &[("orphan", "*")]),
        ]));

        assert_eq!(resolution.order, vec!["standalone"]);
        assert!(matches!(
            resolution.failures.get("orphan"),
            Some(Error::DependencyMissing { .. })
        ));
        // The failure cascades one level further.
        assert!(resolution.failures.contains_key("grandchild"));
    }

    #[test]
    fn cycles_fail_their_members_only() {
        let resolution = resolve(&set(vec![
            manifest("x", "1.0.0", &[("y", "*")]),
            manifest("y", "1.0.0", &[("x", "*")]),
            manifest("z", "1.0.0", &[]),
        ]));

        assert_eq!(resolution.order, vec!["z"]);
        assert!(matches!(
            resolution.failures.get("x"),
            Some(Error::CycleDetected { .. })
        ));
        assert!(resolution.failures.contains_key("y"));
    }

    #[test]
    fn order_is_deterministic() {
        let build = || {
            resolve(&set(vec![
                manifest("m1", "1.0.0", &[]),
                manifest("m2", "1.0.0", &[]),
                manifest("m3", "1.0.0", &[("m1", "*"), ("m2", "*")]),
            ]))
        };
        let first = build().order;
        for _ in 0..5 {
            assert_eq!(build().order, first);
        }
        assert_eq!(first.last().map(String::as_str), Some("m3"));
    }
}
