//! Path-prefix dispatch: builds the command index and resolves token
//! streams to command specs.

use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    Error, Result,
    lexer::{Token, TokenKind},
    spec::CommandSpec,
};

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The prefix that introduced the command (may be empty).
    pub prefix: String,
    pub spec: Arc<CommandSpec>,
    /// How many leading positional elements are path words.
    pub consumed: usize,
}

/// Immutable dispatch index, rebuilt lazily after registry mutations.
#[derive(Debug)]
pub struct CommandIndex {
    /// Non-empty prefixes, longest first.
    prefixes: Vec<String>,
    /// Whether the empty prefix is registered.
    allow_bare: bool,
    dispatch: HashMap<Vec<String>, Arc<CommandSpec>>,
    max_path_len: usize,
    generation: u64,
}

impl CommandIndex {
    /// Build the index: collect prefixes, enforce prefix-freedom, and insert
    /// every command path and alias into the dispatch table.
    pub fn build(commands: &[Arc<CommandSpec>], generation: u64) -> Result<Self> {
        let mut prefixes: Vec<String> = Vec::new();
        let mut allow_bare = false;
        for command in commands {
            for prefix in &command.prefixes {
                if prefix.is_empty() {
                    allow_bare = true;
                } else if !prefixes.contains(prefix) {
                    prefixes.push(prefix.clone());
                }
            }
        }

        // The prefix set must be prefix-free under string containment, or
        // longest-match dispatch would be ambiguous.
        for a in &prefixes {
            for b in &prefixes {
                if a != b && b.starts_with(a.as_str()) {
                    return Err(Error::PrefixConflict {
                        a: a.clone(),
                        b: b.clone(),
                    });
                }
            }
        }
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut dispatch: HashMap<Vec<String>, Arc<CommandSpec>> = HashMap::new();
        let mut max_path_len = 0;
        for command in commands {
            let paths = std::iter::once(&command.path).chain(command.aliases.iter());
            for path in paths {
                max_path_len = max_path_len.max(path.len());
                if dispatch
                    .insert(path.clone(), Arc::clone(command))
                    .is_some()
                {
                    return Err(Error::PathConflict {
                        path: path.join(" "),
                    });
                }
            }
        }

        debug!(
            commands = commands.len(),
            paths = dispatch.len(),
            prefixes = prefixes.len(),
            "command index built"
        );

        Ok(Self {
            prefixes,
            allow_bare,
            dispatch,
            max_path_len,
            generation,
        })
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolve a lexed token stream to a command.
    ///
    /// The first word is split as `(prefix, first_word)` by longest prefix
    /// match (the empty prefix, when registered, matches bare words). The
    /// longest registered path starting with `first_word` wins.
    #[must_use]
    pub fn resolve(&self, tokens: &[Token]) -> Option<Resolved> {
        let words: Vec<&str> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Word | TokenKind::Quoted))
            .map(|t| t.text.as_str())
            .collect();
        let first = *words.first()?;

        let (prefix, first_word) = self.split_prefix(first)?;

        let limit = self.max_path_len.min(words.len());
        for length in (1..=limit).rev() {
            let mut candidate: Vec<String> = Vec::with_capacity(length);
            candidate.push(first_word.to_string());
            candidate.extend(words[1..length].iter().map(|w| (*w).to_string()));

            if let Some(spec) = self.dispatch.get(&candidate) {
                // The command must accept the prefix that introduced it.
                if !spec.prefixes.iter().any(|p| p == prefix) {
                    continue;
                }
                return Some(Resolved {
                    prefix: prefix.to_string(),
                    spec: Arc::clone(spec),
                    consumed: length,
                });
            }
        }
        None
    }

    /// Longest-match split of the first token into `(prefix, word)`.
    fn split_prefix<'a>(&'a self, first: &'a str) -> Option<(&'a str, &'a str)> {
        for prefix in &self.prefixes {
            if let Some(word) = first.strip_prefix(prefix.as_str())
                && !word.is_empty()
            {
                return Some((prefix.as_str(), word));
            }
        }
        if self.allow_bare {
            return Some(("", first));
        }
        None
    }
}
