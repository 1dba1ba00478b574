//! Plugin loader: discovery, ordered loading, unload, and reload.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use tracing::{error, info, warn};

use {
    kotori_api::BotApi,
    kotori_bus::EventBus,
    kotori_command::CommandRegistry,
    kotori_rbac::RbacService,
};

use crate::{
    Error, Result,
    manifest::{MANIFEST_FILE, PluginManifest},
    plugin::{Plugin, PluginContext, PluginState},
    resolver,
};

/// Constructor for a linked-in plugin, registered by name.
pub type PluginFactory = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

struct LoadedPlugin {
    instance: Box<dyn Plugin>,
    ctx: PluginContext,
    state: PluginState,
}

/// What `load_all` accomplished.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully loaded plugins, in load order.
    pub loaded: Vec<String>,
    /// Plugin name → reason it did not load.
    pub failed: BTreeMap<String, String>,
}

pub struct PluginLoader {
    plugins_dir: PathBuf,
    data_dir: PathBuf,
    bus: EventBus,
    api: BotApi,
    rbac: Arc<Mutex<RbacService>>,
    commands: CommandRegistry,
    debug: bool,
    whitelist: Option<BTreeSet<String>>,
    blacklist: BTreeSet<String>,
    factories: BTreeMap<String, PluginFactory>,
    loaded: BTreeMap<String, LoadedPlugin>,
    /// Load order, for reverse-order unload.
    order: Vec<String>,
}

impl PluginLoader {
    #[must_use]
    pub fn new(
        plugins_dir: PathBuf,
        data_dir: PathBuf,
        bus: EventBus,
        api: BotApi,
        rbac: Arc<Mutex<RbacService>>,
        commands: CommandRegistry,
    ) -> Self {
        Self {
            plugins_dir,
            data_dir,
            bus,
            api,
            rbac,
            commands,
            debug: false,
            whitelist: None,
            blacklist: BTreeSet::new(),
            factories: BTreeMap::new(),
            loaded: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Restrict loading to the named plugins.
    #[must_use]
    pub fn whitelist(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.whitelist = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn blacklist(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.blacklist = names.into_iter().map(Into::into).collect();
        self
    }

    /// Register the constructor for a plugin name. The loader only loads
    /// plugins whose manifest has a matching factory.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    // ── Discovery ────────────────────────────────────────────────────────

    /// Scan the plugin directory for `manifest.toml` candidates, applying
    /// the whitelist/blacklist. Unparseable manifests are skipped with a
    /// warning.
    pub fn discover(&self) -> BTreeMap<String, (PluginManifest, PathBuf)> {
        let mut found = BTreeMap::new();

        let entries = match std::fs::read_dir(&self.plugins_dir) {
            Ok(entries) => entries,
            Err(_) => {
                info!(dir = %self.plugins_dir.display(), "plugin directory missing, nothing to load");
                return found;
            },
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let manifest_path = dir.join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            let manifest = match PluginManifest::load(&manifest_path) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %manifest_path.display(), error = %e, "skipping bad manifest");
                    continue;
                },
            };

            if let Some(whitelist) = &self.whitelist
                && !whitelist.contains(&manifest.name)
            {
                info!(plugin = %manifest.name, "not on the whitelist, skipping");
                continue;
            }
            if self.blacklist.contains(&manifest.name) {
                info!(plugin = %manifest.name, "blacklisted, skipping");
                continue;
            }

            found.insert(manifest.name.clone(), (manifest, dir));
        }

        found
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Discover, resolve, and load everything. A plugin's `on_load` begins
    /// only after every declared dependency's `on_load` has returned.
    pub async fn load_all(&mut self) -> LoadReport {
        let discovered = self.discover();
        let manifests: BTreeMap<String, PluginManifest> = discovered
            .iter()
            .map(|(name, (manifest, _))| (name.clone(), manifest.clone()))
            .collect();

        let resolution = resolver::resolve(&manifests);
        let mut report = LoadReport::default();
        for (name, error) in &resolution.failures {
            report.failed.insert(name.clone(), error.to_string());
        }

        for name in &resolution.order {
            let (manifest, dir) = discovered[name].clone();
            match self.load_one(manifest, dir).await {
                Ok(()) => report.loaded.push(name.clone()),
                Err(e) => {
                    error!(plugin = %name, error = %e, "plugin failed to load");
                    report.failed.insert(name.clone(), e.to_string());
                },
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "plugin loading finished"
        );
        report
    }

    /// Instantiate and initialize one plugin. On `on_load` failure the
    /// partially initialized plugin is unregistered again.
    ///
    /// The factory is looked up by the manifest's `entry_class` when one is
    /// declared and registered, falling back to the plugin name.
    async fn load_one(&mut self, manifest: PluginManifest, source_dir: PathBuf) -> Result<()> {
        let name = manifest.name.clone();
        let factory = manifest
            .entry_class
            .as_ref()
            .and_then(|entry| self.factories.get(entry))
            .or_else(|| self.factories.get(&name))
            .ok_or_else(|| Error::FactoryMissing {
                plugin: name.clone(),
            })?;

        // Construction is the lightweight phase.
        let mut instance = factory();

        let workspace = self.data_dir.join(&name);
        std::fs::create_dir_all(&workspace)?;
        let config = self.read_config(&name)?;

        let mut ctx = PluginContext::new(
            manifest,
            self.bus.clone(),
            self.api.clone(),
            Arc::clone(&self.rbac),
            self.commands.clone(),
            workspace,
            source_dir,
            self.debug,
            config,
        );

        info!(plugin = %name, version = %ctx.manifest.version, "loading plugin");
        if let Err(source) = instance.on_load(&mut ctx).await {
            // Roll back whatever the hook managed to register.
            ctx.cancel_tasks();
            self.bus.unsubscribe_owner(&name);
            self.commands.revoke_owner(&name);
            return Err(Error::LoadHook {
                plugin: name,
                source,
            });
        }

        self.loaded.insert(name.clone(), LoadedPlugin {
            instance,
            ctx,
            state: PluginState::Running,
        });
        self.order.push(name);
        Ok(())
    }

    // ── Unloading ────────────────────────────────────────────────────────

    /// Unload one plugin: revoke its subscriptions, commands, and tasks,
    /// run `on_close`, and persist its config. `on_close` failures are
    /// logged, never propagated.
    pub async fn unload(&mut self, name: &str) -> Result<()> {
        let mut plugin = self.loaded.remove(name).ok_or_else(|| Error::NotLoaded {
            plugin: name.to_string(),
        })?;
        plugin.state = PluginState::Closing;
        info!(plugin = %name, "unloading plugin");

        plugin.ctx.cancel_tasks();
        let subscriptions = self.bus.unsubscribe_owner(name);
        let commands = self.commands.revoke_owner(name);
        info!(plugin = %name, subscriptions, commands, "plugin registrations revoked");

        if let Err(e) = plugin.instance.on_close(&mut plugin.ctx).await {
            error!(plugin = %name, error = %e, "on_close failed");
        }

        if let Err(e) = self.write_config(name, &plugin.ctx.config) {
            error!(plugin = %name, error = %e, "failed to persist plugin config");
        }

        self.order.retain(|n| n != name);
        Ok(())
    }

    /// Unload everything in reverse load order. Failures in one plugin do
    /// not abort the rest.
    pub async fn unload_all(&mut self) {
        for name in self.order.clone().into_iter().rev() {
            if let Err(e) = self.unload(&name).await {
                error!(plugin = %name, error = %e, "unload failed");
            }
        }
    }

    /// Unload then load one plugin, preserving its persisted config. The
    /// manifest is re-read so a changed version takes effect.
    pub async fn reload(&mut self, name: &str) -> Result<()> {
        let source_dir = self
            .loaded
            .get(name)
            .map(|p| p.ctx.source_dir.clone())
            .ok_or_else(|| Error::NotLoaded {
                plugin: name.to_string(),
            })?;

        self.unload(name).await?;
        let manifest = PluginManifest::load(&source_dir.join(MANIFEST_FILE))?;
        self.load_one(manifest, source_dir).await?;
        info!(plugin = %name, "plugin reloaded");
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    #[must_use]
    pub fn loaded_plugins(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    #[must_use]
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.loaded.get(name).map(|p| p.state)
    }

    #[must_use]
    pub fn manifest(&self, name: &str) -> Option<&PluginManifest> {
        self.loaded.get(name).map(|p| &p.ctx.manifest)
    }

    // ── Config persistence ───────────────────────────────────────────────

    fn config_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name).join(format!("{name}.yaml"))
    }

    fn read_config(&self, name: &str) -> Result<serde_yaml::Value> {
        let path = self.config_path(name);
        if !path.exists() {
            return Ok(serde_yaml::Value::Mapping(Default::default()));
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    fn write_config(&self, name: &str, config: &serde_yaml::Value) -> Result<()> {
        let config = match config {
            serde_yaml::Value::Null => &serde_yaml::Value::Mapping(Default::default()),
            other => other,
        };
        let raw = serde_yaml::to_string(config)?;
        std::fs::write(self.config_path(name), raw)?;
        Ok(())
    }
}
