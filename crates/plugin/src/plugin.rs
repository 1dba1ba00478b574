//! The plugin trait and the context injected into lifecycle hooks.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use {async_trait::async_trait, tokio::task::JoinHandle, tracing::debug};

use {
    kotori_api::BotApi,
    kotori_bus::{EventBus, Handler, SubscribeOpts, SubscriptionId},
    kotori_command::{CommandRegistry, CommandSpec},
    kotori_rbac::RbacService,
};

use crate::manifest::PluginManifest;

/// Lifecycle position of one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Discovered,
    Resolved,
    Instantiated,
    Initialized,
    Running,
    Closing,
    Unloaded,
}

/// A loadable plugin. Construction must stay lightweight (no IO); blocking
/// work belongs in `on_load`.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called once the workspace directory exists and the persisted config
    /// has been loaded into the context.
    async fn on_load(&mut self, _ctx: &mut PluginContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during unload, after the plugin's subscriptions and commands
    /// have been revoked. The context config is persisted afterwards.
    async fn on_close(&mut self, _ctx: &mut PluginContext) -> anyhow::Result<()> {
        Ok(())
    }
}

struct NamedTask {
    name: String,
    handle: JoinHandle<()>,
}

/// Everything a plugin gets injected: framework handles, its manifest
/// metadata, its workspace, and its persisted config.
pub struct PluginContext {
    pub name: String,
    pub manifest: PluginManifest,
    pub bus: EventBus,
    pub api: BotApi,
    pub rbac: Arc<Mutex<RbacService>>,
    pub commands: CommandRegistry,
    /// Per-plugin data directory; exists before `on_load` runs and persists
    /// after `on_close`.
    pub workspace: PathBuf,
    /// Directory the manifest was discovered in.
    pub source_dir: PathBuf,
    pub debug: bool,
    /// YAML config document, loaded before `on_load` and saved after
    /// `on_close`. Mutate freely.
    pub config: serde_yaml::Value,
    tasks: Vec<NamedTask>,
}

impl PluginContext {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        manifest: PluginManifest,
        bus: EventBus,
        api: BotApi,
        rbac: Arc<Mutex<RbacService>>,
        commands: CommandRegistry,
        workspace: PathBuf,
        source_dir: PathBuf,
        debug: bool,
        config: serde_yaml::Value,
    ) -> Self {
        Self {
            name: manifest.name.clone(),
            manifest,
            bus,
            api,
            rbac,
            commands,
            workspace,
            source_dir,
            debug,
            config,
            tasks: Vec::new(),
        }
    }

    /// Subscribe on the bus with this plugin recorded as the owner, so the
    /// subscription dies with the plugin.
    pub fn subscribe(
        &self,
        pattern: &str,
        handler: Handler,
        opts: SubscribeOpts,
    ) -> kotori_bus::Result<SubscriptionId> {
        self.bus.subscribe(pattern, handler, opts.owner(&self.name))
    }

    /// Register a command owned by this plugin.
    pub fn register_command(&self, mut spec: CommandSpec) {
        spec.owner = Some(self.name.clone());
        self.commands.register(spec);
    }

    /// Spawn a named background task owned by this plugin; it is aborted
    /// when the plugin unloads.
    pub fn spawn_task<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(plugin = %self.name, task = %name, "spawning plugin task");
        self.tasks.push(NamedTask {
            name,
            handle: tokio::spawn(future),
        });
    }

    /// Names of the live background tasks.
    #[must_use]
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| !t.handle.is_finished())
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Abort every background task this plugin spawned.
    pub fn cancel_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            if !task.handle.is_finished() {
                debug!(plugin = %self.name, task = %task.name, "cancelling plugin task");
                task.handle.abort();
            }
        }
    }
}
