//! The dispatch pipeline: resolve → filter → bind → invoke.

use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, error, warn};

use {kotori_protocol::Event, kotori_rbac::RbacService};

use crate::{
    Result,
    binder::bind,
    lexer::tokenize,
    parser::parse,
    registry::CommandRegistry,
    resolver::CommandIndex,
    spec::CommandCall,
};

/// What happened to one message.
#[derive(Debug)]
pub enum Dispatch {
    /// The message did not resolve to any command.
    NotACommand,
    /// A filter in the chain denied the sender.
    FilterDenied { command: String },
    /// Binding failed; the caller publishes this as a bind-failure event.
    BindFailed { command: String, message: String },
    /// The handler ran (its own errors are logged, not surfaced).
    Invoked { command: String },
}

/// Command engine with a lazily rebuilt dispatch index.
///
/// The index is rebuilt on the first dispatch after any registry mutation;
/// rebuilds are idempotent, and under concurrent dispatches the last build
/// wins.
pub struct CommandEngine {
    registry: CommandRegistry,
    index: RwLock<Option<Arc<CommandIndex>>>,
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new(CommandRegistry::new())
    }
}

impl CommandEngine {
    #[must_use]
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            index: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Current index, rebuilding if the registry moved on. Build errors
    /// (prefix or path conflicts) are fatal for dispatch until corrected.
    fn index(&self) -> Result<Arc<CommandIndex>> {
        let generation = self.registry.generation();

        if let Some(index) = self.read_index().as_ref()
            && index.generation() == generation
        {
            return Ok(Arc::clone(index));
        }

        let (commands, generation) = self.registry.snapshot();
        let index = Arc::new(CommandIndex::build(&commands, generation)?);
        *self.write_index() = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Run one message event through the pipeline.
    pub async fn dispatch(
        &self,
        event: Arc<Event>,
        rbac: &Mutex<RbacService>,
    ) -> Result<Dispatch> {
        let Some(message) = event.message() else {
            return Ok(Dispatch::NotACommand);
        };
        let Some(text) = message.first_text().map(str::trim) else {
            return Ok(Dispatch::NotACommand);
        };
        if text.is_empty() {
            return Ok(Dispatch::NotACommand);
        }

        let index = self.index()?;
        let tokens = tokenize(text);
        let Some(resolved) = index.resolve(&tokens) else {
            return Ok(Dispatch::NotACommand);
        };
        let spec = resolved.spec;
        debug!(command = %spec.name, prefix = %resolved.prefix, "command resolved");

        if let Some(filter) = &spec.filter {
            let allowed = {
                #[allow(clippy::unwrap_used)]
                let mut rbac = rbac.lock().unwrap();
                filter.allows(&event, &mut rbac)
            };
            if !allowed {
                debug!(command = %spec.name, user = ?event.user_id(), "filter denied");
                return Ok(Dispatch::FilterDenied {
                    command: spec.name.clone(),
                });
            }
        }

        let parsed = parse(&tokens);
        let args = match bind(&spec, &parsed, resolved.consumed) {
            Ok(args) => args,
            Err(e) => {
                warn!(command = %spec.name, error = %e, "argument binding failed");
                return Ok(Dispatch::BindFailed {
                    command: spec.name.clone(),
                    message: e.to_string(),
                });
            },
        };

        let call = CommandCall { event, args };
        if let Err(e) = (spec.handler)(call).await {
            error!(command = %spec.name, error = %e, "command handler failed");
        }
        Ok(Dispatch::Invoked {
            command: spec.name.clone(),
        })
    }

    #[allow(clippy::unwrap_used)]
    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<CommandIndex>>> {
        self.index.read().unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<CommandIndex>>> {
        self.index.write().unwrap()
    }
}
