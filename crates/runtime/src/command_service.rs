//! The command engine as a bus-subscribed service.

use std::sync::{Arc, Mutex};

use {async_trait::async_trait, tracing::error};

use {
    kotori_bus::{EventBus, SubscribeOpts, SubscriptionId, handler},
    kotori_command::{CommandEngine, Dispatch},
    kotori_protocol::{BindFailure, Event, names},
    kotori_rbac::RbacService,
};

use crate::service::Service;

/// Priority of the command pipeline among message subscribers. Runs ahead
/// of default-priority plugin handlers.
const COMMAND_PRIORITY: i32 = 100;

/// Subscribes the dispatch pipeline to message events. Binding failures
/// are republished as a bind-failure event so plugins can render help;
/// they are never surfaced as handler errors.
pub struct CommandService {
    engine: Arc<CommandEngine>,
    rbac: Arc<Mutex<RbacService>>,
    bus: EventBus,
    subscriptions: Vec<SubscriptionId>,
}

impl CommandService {
    #[must_use]
    pub fn new(engine: Arc<CommandEngine>, rbac: Arc<Mutex<RbacService>>, bus: EventBus) -> Self {
        Self {
            engine,
            rbac,
            bus,
            subscriptions: Vec::new(),
        }
    }

    fn message_handler(&self) -> kotori_bus::Handler {
        let engine = Arc::clone(&self.engine);
        let rbac = Arc::clone(&self.rbac);
        let bus = self.bus.clone();

        handler(move |event: Arc<Event>| {
            let engine = Arc::clone(&engine);
            let rbac = Arc::clone(&rbac);
            let bus = bus.clone();
            async move {
                match engine.dispatch(event, &rbac).await {
                    Ok(Dispatch::BindFailed { command, message }) => {
                        bus.publish_nowait(Arc::new(Event::BindFailure(BindFailure {
                            command,
                            message,
                        })));
                    },
                    Ok(_) => {},
                    // Registry conflicts: dispatch stays refused until the
                    // offending registration is corrected.
                    Err(e) => error!(error = %e, "command dispatch unavailable"),
                }
            }
        })
    }
}

#[async_trait]
impl Service for CommandService {
    fn name(&self) -> &str {
        "command_engine"
    }

    async fn on_load(&mut self) -> anyhow::Result<()> {
        for event_type in [names::GROUP_MESSAGE_EVENT, names::PRIVATE_MESSAGE_EVENT] {
            let id = self.bus.subscribe(
                event_type,
                self.message_handler(),
                SubscribeOpts::default().priority(COMMAND_PRIORITY),
            )?;
            self.subscriptions.push(id);
        }
        Ok(())
    }

    async fn on_close(&mut self) -> anyhow::Result<()> {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        kotori_command::{
            CommandSpec, ParamKind, ParamSpec,
            spec::handler as command_handler,
        },
        kotori_protocol::{GroupMessageEvent, MessageArray, Sender},
        std::time::Duration,
    };

    fn group_message(text: &str) -> Arc<Event> {
        Arc::new(Event::GroupMessage(GroupMessageEvent {
            time: 0,
            self_id: "1".into(),
            sub_type: "normal".into(),
            message_id: "2".into(),
            user_id: "10".into(),
            group_id: "3".into(),
            message: MessageArray::new().text(text),
            raw_message: text.into(),
            sender: Sender::default(),
            anonymous: None,
            api: Default::default(),
        }))
    }

    #[tokio::test]
    async fn commands_fire_from_bus_messages() {
        let bus = EventBus::new();
        let engine = Arc::new(CommandEngine::default());
        let rbac = Arc::new(Mutex::new(RbacService::default()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.registry().register(
            CommandSpec::builder("echo")
                .param(ParamSpec::new("what", ParamKind::String))
                .build(command_handler(move |call| {
                    let sink = Arc::clone(&sink);
                    async move {
                        let what = call.args.get("what").unwrap().as_str().unwrap().to_string();
                        sink.lock().unwrap().push(what);
                        Ok(())
                    }
                }))
                .unwrap(),
        );

        let mut service = CommandService::new(engine, rbac, bus.clone());
        service.on_load().await.unwrap();

        bus.publish(group_message("/echo hello")).await;
        bus.publish(group_message("not a command")).await;
        assert_eq!(*seen.lock().unwrap(), vec!["hello"]);

        service.on_close().await.unwrap();
        bus.publish(group_message("/echo again")).await;
        assert_eq!(*seen.lock().unwrap(), vec!["hello"]);
    }

    #[tokio::test]
    async fn bind_failures_are_published_as_events() {
        let bus = EventBus::new();
        let engine = Arc::new(CommandEngine::default());
        let rbac = Arc::new(Mutex::new(RbacService::default()));

        engine.registry().register(
            CommandSpec::builder("sum")
                .param(ParamSpec::new("n", ParamKind::Int))
                .build(command_handler(|_| async { Ok(()) }))
                .unwrap(),
        );

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        bus.subscribe(
            names::PARAM_BIND_FAILED,
            handler(move |event| {
                let sink = Arc::clone(&sink);
                async move {
                    if let Event::BindFailure(failure) = event.as_ref() {
                        sink.lock().unwrap().push(failure.clone());
                    }
                }
            }),
            SubscribeOpts::default(),
        )
        .unwrap();

        let mut service = CommandService::new(engine, rbac, bus.clone());
        service.on_load().await.unwrap();

        bus.publish(group_message("/sum nope")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].command, "sum");
        assert!(failures[0].message.contains("int"));
    }
}
