//! Component trie holding the set of registered permission paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TrieNode {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<String, TrieNode>,
    /// A registered path ends here.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    terminal: bool,
}

impl TrieNode {
    fn prune(&mut self) {
        self.children.retain(|_, child| {
            child.prune();
            child.terminal || !child.children.is_empty()
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionTrie {
    root: TrieNode,
    case_sensitive: bool,
}

impl PermissionTrie {
    #[must_use]
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            root: TrieNode::default(),
            case_sensitive,
        }
    }

    #[must_use]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn components(&self, path: &str) -> Vec<String> {
        let path = if self.case_sensitive {
            path.to_string()
        } else {
            path.to_lowercase()
        };
        path.split('.')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Register a path. Adding twice is a no-op.
    pub fn add(&mut self, path: &str) {
        let components = self.components(path);
        let mut node = &mut self.root;
        for component in components {
            node = node.children.entry(component).or_default();
        }
        node.terminal = true;
    }

    /// Remove a registered path; dangling branches are pruned.
    pub fn remove(&mut self, path: &str) {
        let components = self.components(path);
        let mut node = &mut self.root;
        for component in &components {
            match node.children.get_mut(component) {
                Some(child) => node = child,
                None => return,
            }
        }
        node.terminal = false;
        self.root.prune();
    }

    /// Whether `path` is registered verbatim.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let mut node = &self.root;
        for component in self.components(path) {
            match node.children.get(&component) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal
    }

    /// All registered paths, in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect(&self.root, &mut Vec::new(), &mut out);
        out
    }
}

fn collect(node: &TrieNode, stack: &mut Vec<String>, out: &mut Vec<String>) {
    if node.terminal && !stack.is_empty() {
        out.push(stack.join("."));
    }
    for (component, child) in &node.children {
        stack.push(component.clone());
        collect(child, stack, out);
        stack.pop();
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_contains_remove() {
        let mut trie = PermissionTrie::new(true);
        trie.add("plugin.backup.run");
        trie.add("plugin.backup.list");
        trie.add("op.*");

        assert!(trie.contains("plugin.backup.run"));
        assert!(trie.contains("op.*"));
        assert!(!trie.contains("plugin.backup"));

        trie.remove("plugin.backup.run");
        assert!(!trie.contains("plugin.backup.run"));
        assert!(trie.contains("plugin.backup.list"));
    }

    #[test]
    fn intermediate_nodes_are_not_terminal() {
        let mut trie = PermissionTrie::new(true);
        trie.add("a.b.c");
        assert!(!trie.contains("a"));
        assert!(!trie.contains("a.b"));

        trie.add("a.b");
        assert!(trie.contains("a.b"));
    }

    #[test]
    fn paths_lists_everything_sorted() {
        let mut trie = PermissionTrie::new(true);
        trie.add("b.y");
        trie.add("a.x");
        trie.add("a.x.deep");
        assert_eq!(trie.paths(), vec!["a.x", "a.x.deep", "b.y"]);
    }

    #[test]
    fn case_insensitive_trie_folds_paths() {
        let mut trie = PermissionTrie::new(false);
        trie.add("Op.Reboot");
        assert!(trie.contains("op.reboot"));
        assert!(trie.contains("OP.REBOOT"));
    }

    #[test]
    fn serde_roundtrip() {
        let mut trie = PermissionTrie::new(true);
        trie.add("a.b");
        trie.add("c");
        let json = serde_json::to_string(&trie).unwrap();
        let back: PermissionTrie = serde_json::from_str(&json).unwrap();
        assert_eq!(trie, back);
    }
}
