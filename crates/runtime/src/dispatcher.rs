//! Event dispatcher: raw frames → typed events → bus.

use std::sync::Arc;

use {
    serde_json::Value,
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::{debug, warn},
};

use {
    kotori_api::BotApi,
    kotori_bus::EventBus,
    kotori_protocol::{ApiPort, Event, port::ApiHandle},
};

/// Consume raw event frames from the router and publish typed events
/// fire-and-forget, so slow handlers never backpressure the read loop.
///
/// Message events get the API handle bound so handlers can call
/// `event.reply(...)`. Malformed frames are logged and dropped; decoding
/// never takes the dispatcher down.
pub fn spawn_dispatcher(
    mut frames: mpsc::UnboundedReceiver<Value>,
    bus: EventBus,
    api: BotApi,
) -> JoinHandle<()> {
    let port: Arc<dyn ApiPort> = Arc::new(api);
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let mut event = match Event::decode(&frame) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "dropping undecodable event frame");
                    continue;
                },
            };

            let handle = ApiHandle::new(Arc::clone(&port));
            match &mut event {
                Event::GroupMessage(e) => e.api = handle,
                Event::PrivateMessage(e) => e.api = handle,
                Event::MessageSent(e) => e.api = handle,
                _ => {},
            }

            debug!(event_type = %event.event_type(), "dispatching event");
            bus.publish_nowait(Arc::new(event));
        }
        debug!("dispatcher channel closed");
    })
}
