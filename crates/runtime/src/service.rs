//! Named services with ordered startup and reverse-order shutdown.

use {async_trait::async_trait, tracing::{error, info}};

/// A long-lived framework service. Services load in registration order and
/// close in reverse order.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    async fn on_load(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct ServiceManager {
    services: Vec<Box<dyn Service>>,
}

impl ServiceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: Box<dyn Service>) {
        self.services.push(service);
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// Run `on_load` in registration order. A failing service is reported
    /// and skipped; the rest still load.
    pub async fn load_all(&mut self) -> Vec<(String, anyhow::Error)> {
        let mut failures = Vec::new();
        for service in &mut self.services {
            let name = service.name().to_string();
            match service.on_load().await {
                Ok(()) => info!(service = %name, "service loaded"),
                Err(e) => {
                    error!(service = %name, error = %e, "service failed to load");
                    failures.push((name, e));
                },
            }
        }
        failures
    }

    /// Run `on_close` in reverse order. Failures never block the cleanup of
    /// the remaining services.
    pub async fn close_all(&mut self) {
        for service in self.services.iter_mut().rev() {
            let name = service.name().to_string();
            if let Err(e) = service.on_close().await {
                error!(service = %name, error = %e, "service failed to close");
            } else {
                info!(service = %name, "service closed");
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::{Arc, Mutex},
    };

    struct Probe {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_load: bool,
        fail_close: bool,
    }

    #[async_trait]
    impl Service for Probe {
        fn name(&self) -> &str {
            self.tag
        }

        async fn on_load(&mut self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("{}:load", self.tag));
            if self.fail_load {
                anyhow::bail!("load boom");
            }
            Ok(())
        }

        async fn on_close(&mut self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("{}:close", self.tag));
            if self.fail_close {
                anyhow::bail!("close boom");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn load_forward_close_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new();
        for tag in ["first", "second", "third"] {
            manager.register(Box::new(Probe {
                tag,
                log: Arc::clone(&log),
                fail_load: false,
                fail_close: false,
            }));
        }

        assert!(manager.load_all().await.is_empty());
        manager.close_all().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first:load",
                "second:load",
                "third:load",
                "third:close",
                "second:close",
                "first:close",
            ]
        );
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new();
        manager.register(Box::new(Probe {
            tag: "bad",
            log: Arc::clone(&log),
            fail_load: true,
            fail_close: true,
        }));
        manager.register(Box::new(Probe {
            tag: "good",
            log: Arc::clone(&log),
            fail_load: false,
            fail_close: false,
        }));

        let failures = manager.load_all().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");

        manager.close_all().await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["bad:load", "good:load", "good:close", "bad:close"]
        );
    }
}
