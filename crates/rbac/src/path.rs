//! Permission path parsing and component-wise pattern matching.

/// A dot-separated permission path, e.g. `plugin.backup.run`.
///
/// As a pattern, `*` matches exactly one component and a trailing `**`
/// matches any remaining suffix (including the empty one). Literals match
/// only themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPath {
    components: Vec<String>,
    raw: String,
}

impl PermissionPath {
    #[must_use]
    pub fn parse(raw: &str, case_sensitive: bool) -> Self {
        let normalized = if case_sensitive {
            raw.to_string()
        } else {
            raw.to_lowercase()
        };
        let components = normalized
            .split('.')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            components,
            raw: normalized,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Match `self` (as a pattern) against a concrete path, left to right.
    #[must_use]
    pub fn matches(&self, path: &PermissionPath) -> bool {
        let pattern = &self.components;
        let target = &path.components;

        let mut i = 0;
        for component in pattern {
            if component == "**" {
                // Suffix wildcard swallows whatever is left.
                return true;
            }
            let Some(actual) = target.get(i) else {
                return false;
            };
            if component != "*" && component != actual {
                return false;
            }
            i += 1;
        }
        i == target.len()
    }
}
