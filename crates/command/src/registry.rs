//! Shared command registry with a generation counter for lazy index
//! rebuilds.

use std::sync::{Arc, RwLock};

use crate::spec::CommandSpec;

#[derive(Default)]
struct RegistryState {
    commands: Vec<Arc<CommandSpec>>,
    generation: u64,
}

/// The registry. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Conflicts are detected at index build time, not
    /// here, so registration order never matters.
    pub fn register(&self, spec: CommandSpec) -> Arc<CommandSpec> {
        let spec = Arc::new(spec);
        let mut state = self.write_state();
        state.commands.push(Arc::clone(&spec));
        state.generation += 1;
        spec
    }

    /// Drop every command owned by `owner`; returns how many were removed.
    pub fn revoke_owner(&self, owner: &str) -> usize {
        let mut state = self.write_state();
        let before = state.commands.len();
        state
            .commands
            .retain(|c| c.owner.as_deref() != Some(owner));
        let removed = before - state.commands.len();
        if removed > 0 {
            state.generation += 1;
        }
        removed
    }

    #[must_use]
    pub fn owner_command_count(&self, owner: &str) -> usize {
        self.read_state()
            .commands
            .iter()
            .filter(|c| c.owner.as_deref() == Some(owner))
            .count()
    }

    /// Current commands plus the generation they belong to.
    #[must_use]
    pub fn snapshot(&self) -> (Vec<Arc<CommandSpec>>, u64) {
        let state = self.read_state();
        (state.commands.clone(), state.generation)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.read_state().generation
    }

    #[allow(clippy::unwrap_used)]
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::spec::{CommandSpec, handler},
    };

    fn spec(path: &str, owner: &str) -> CommandSpec {
        CommandSpec::builder(path)
            .owner(owner)
            .build(handler(|_| async { Ok(()) }))
            .unwrap()
    }

    #[test]
    fn registration_bumps_generation() {
        let registry = CommandRegistry::new();
        let g0 = registry.generation();
        registry.register(spec("ping", "core"));
        assert!(registry.generation() > g0);
    }

    #[test]
    fn revoke_owner_removes_only_theirs() {
        let registry = CommandRegistry::new();
        registry.register(spec("a", "p1"));
        registry.register(spec("b", "p1"));
        registry.register(spec("c", "p2"));

        assert_eq!(registry.owner_command_count("p1"), 2);
        assert_eq!(registry.revoke_owner("p1"), 2);
        assert_eq!(registry.owner_command_count("p1"), 0);
        assert_eq!(registry.owner_command_count("p2"), 1);

        // Revoking again is a no-op and does not bump the generation.
        let g = registry.generation();
        assert_eq!(registry.revoke_owner("p1"), 0);
        assert_eq!(registry.generation(), g);
    }
}
