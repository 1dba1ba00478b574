//! The bot client: wires config, router, dispatcher, bus, RBAC, services,
//! and the plugin loader together, and exposes the two run modes.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::sync::Notify,
    tracing::{error, info, warn},
};

use {
    kotori_api::{ApiTransport, BotApi},
    kotori_bus::{EventBus, SubscribeOpts, handler},
    kotori_command::{CommandEngine, CommandRegistry},
    kotori_common::time::now_ms,
    kotori_config::BotConfig,
    kotori_plugin::{Plugin, PluginLoader},
    kotori_protocol::{ApiResponse, Event, names},
    kotori_rbac::{RbacService, RbacStore},
    kotori_router::Router,
};

use crate::{
    CommandService, Error, Result, ServiceManager,
    dispatcher::spawn_dispatcher,
};

/// How long back mode waits for the gateway's lifecycle event.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(90);

/// Adapts the router's send capability to the API facade.
struct RouterTransport {
    router: Router,
}

#[async_trait]
impl ApiTransport for RouterTransport {
    async fn send(
        &self,
        action: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> kotori_protocol::Result<ApiResponse> {
        self.router
            .send(action, params, timeout)
            .await
            .map_err(|e| match e {
                kotori_router::Error::Timeout { action } => {
                    kotori_protocol::Error::Timeout { action }
                },
                other => kotori_protocol::Error::transport(other.to_string()),
            })
    }
}

type FactoryEntry = (String, Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>);

pub struct BotClient {
    config: BotConfig,
    bus: EventBus,
    commands: CommandRegistry,
    engine: Arc<CommandEngine>,
    rbac: Arc<Mutex<RbacService>>,
    rbac_store: RbacStore,
    services: ServiceManager,
    factories: Vec<FactoryEntry>,
    router: Option<Router>,
    loader: Option<PluginLoader>,
    api: Option<BotApi>,
}

impl BotClient {
    /// Validate the config and assemble the (not yet connected) client.
    /// The RBAC store is loaded here and seeded with the built-in roles;
    /// the configured root account gets the `root` role.
    pub fn new(mut config: BotConfig) -> Result<Self> {
        config.validate(false)?;

        let commands = CommandRegistry::new();
        let engine = Arc::new(CommandEngine::new(commands.clone()));

        let rbac_store = RbacStore::new(PathBuf::from(&config.plugin.data_dir).join("rbac.json"));
        let mut rbac = rbac_store
            .load()?
            .unwrap_or_else(|| RbacService::new(true, None));
        rbac.seed_builtin((!config.root.is_empty()).then_some(config.root.as_str()))?;

        Ok(Self {
            config,
            bus: EventBus::new(),
            commands,
            engine,
            rbac: Arc::new(Mutex::new(rbac)),
            rbac_store,
            services: ServiceManager::new(),
            factories: Vec::new(),
            router: None,
            loader: None,
            api: None,
        })
    }

    /// Register the constructor for a plugin the binary links in. Must be
    /// called before the client starts.
    pub fn register_plugin<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.push((name.into(), Box::new(factory)));
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    #[must_use]
    pub fn rbac(&self) -> &Arc<Mutex<RbacService>> {
        &self.rbac
    }

    #[must_use]
    pub fn api(&self) -> Option<&BotApi> {
        self.api.as_ref()
    }

    /// Connect to the gateway and bring everything up: router, dispatcher,
    /// services, plugins. Returns the API handle.
    pub async fn start(&mut self) -> Result<BotApi> {
        let started = now_ms();
        let napcat = &self.config.napcat;
        let token = (!napcat.ws_token.is_empty()).then_some(napcat.ws_token.as_str());
        let (router, frames) = Router::connect(&napcat.ws_uri, token).await?;

        let api = BotApi::new(
            Arc::new(RouterTransport {
                router: router.clone(),
            }),
            Duration::from_secs(self.config.ws_timeout_secs),
        );

        self.services.register(Box::new(CommandService::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.rbac),
            self.bus.clone(),
        )));
        self.services.load_all().await;

        let mut loader = PluginLoader::new(
            PathBuf::from(&self.config.plugin.plugins_dir),
            PathBuf::from(&self.config.plugin.data_dir),
            self.bus.clone(),
            api.clone(),
            Arc::clone(&self.rbac),
            self.commands.clone(),
        )
        .debug(self.config.debug)
        .blacklist(self.config.plugin.blacklist.iter().cloned());
        if !self.config.plugin.whitelist.is_empty() {
            loader = loader.whitelist(self.config.plugin.whitelist.iter().cloned());
        }
        for (name, factory) in self.factories.drain(..) {
            loader.register_factory(name, factory);
        }

        if self.config.plugin.skip_plugin_load {
            info!("plugin loading skipped by config");
        } else {
            let report = loader.load_all().await;
            for (name, reason) in &report.failed {
                warn!(plugin = %name, reason = %reason, "plugin not loaded");
            }
        }

        // Frames buffered so far start flowing only now that every service
        // and plugin subscription is in place.
        spawn_dispatcher(frames, self.bus.clone(), api.clone());

        info!(
            bot = %self.config.bt_uin,
            startup_ms = now_ms().saturating_sub(started),
            "bot started"
        );
        self.router = Some(router);
        self.loader = Some(loader);
        self.api = Some(api.clone());
        Ok(api)
    }

    /// Orderly teardown: shutdown event, plugins, services, RBAC store,
    /// then the router (which cancels all pending requests).
    pub async fn shutdown(&mut self) {
        info!("shutting down");

        self.bus
            .publish(Arc::new(Event::Custom {
                name: names::SHUTDOWN_EVENT.to_string(),
                data: serde_json::Value::Null,
            }))
            .await;

        if let Some(mut loader) = self.loader.take() {
            loader.unload_all().await;
        }
        self.services.close_all().await;

        {
            #[allow(clippy::unwrap_used)]
            let rbac = self.rbac.lock().unwrap();
            if let Err(e) = self.rbac_store.save(&rbac) {
                error!(error = %e, "failed to persist rbac store");
            }
        }

        if let Some(router) = self.router.take() {
            router.close();
        }
        self.api = None;
        info!("shutdown complete");
    }

    /// Front mode: blocks until interrupt or connection loss, then shuts
    /// down in order. Connection loss is fatal and reported as an error.
    pub async fn run_front(mut self) -> Result<()> {
        self.start().await?;
        let router = self.router.clone().ok_or(Error::NotRunning)?;
        let mut lost = router.shutdown_signal();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                self.shutdown().await;
                Ok(())
            },
            _ = lost.changed() => {
                warn!("gateway connection lost");
                self.shutdown().await;
                Err(Error::ConnectionLost)
            },
        }
    }

    /// Back mode: hosts the event loop on a worker thread and blocks only
    /// until startup completes, signaled by the gateway's lifecycle event.
    /// Returns the API handle for the calling thread.
    pub fn run_back(self) -> Result<BotApi> {
        self.run_back_with_timeout(DEFAULT_STARTUP_TIMEOUT)
    }

    pub fn run_back_with_timeout(self, timeout: Duration) -> Result<BotApi> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<BotApi>>();

        let _worker = std::thread::Builder::new()
            .name("kotori-runtime".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(Error::Message(e.to_string())));
                        return;
                    },
                };
                runtime.block_on(back_mode_body(self, ready_tx));
            })
            .map_err(|e| Error::Message(e.to_string()))?;

        ready_rx
            .recv_timeout(timeout)
            .map_err(|_| Error::StartupTimeout {
                seconds: timeout.as_secs(),
            })?
    }
}

/// The worker-thread body of back mode: start, wait for the startup event,
/// hand the API handle back, then host the loop until the connection dies.
async fn back_mode_body(
    mut client: BotClient,
    ready_tx: std::sync::mpsc::Sender<Result<BotApi>>,
) {
    let startup = Arc::new(Notify::new());
    let notify = Arc::clone(&startup);
    let subscribed = client.bus.subscribe(
        names::STARTUP_EVENT,
        handler(move |_event| {
            let notify = Arc::clone(&notify);
            async move {
                notify.notify_one();
            }
        }),
        SubscribeOpts::default().priority(i32::MAX),
    );
    if let Err(e) = subscribed {
        let _ = ready_tx.send(Err(Error::Message(e.to_string())));
        return;
    }

    match client.start().await {
        Ok(api) => {
            startup.notified().await;
            info!("startup event received, releasing caller");
            let _ = ready_tx.send(Ok(api));

            if let Some(router) = client.router.clone() {
                let mut lost = router.shutdown_signal();
                let _ = lost.changed().await;
                warn!("gateway connection lost");
            }
            client.shutdown().await;
        },
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        },
    }
}
