//! WebSocket message router.
//!
//! Maintains the single connection to the gateway and correlates outbound
//! [`ApiRequest`]s with their responses by echo id. Frames that carry no
//! known echo are upstream events; they are handed off to the event channel
//! fire-and-forget so the read loop never blocks on slow consumers.
//!
//! The router does not reconnect. When the socket dies, every pending
//! request is failed and the shutdown watch flips; upper layers treat that
//! as fatal.

pub mod error;

use std::{sync::Arc, time::Duration};

use {
    dashmap::DashMap,
    futures::{SinkExt, stream::StreamExt},
    serde_json::Value,
    tokio::sync::{mpsc, oneshot, watch},
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tracing::{debug, info, warn},
};

use kotori_protocol::{ApiRequest, ApiResponse, InboundFrame};

pub use error::{Error, Result};

type PendingSlot = oneshot::Sender<Result<ApiResponse>>;

/// Default deadline for [`Router::send`] when the caller has no opinion.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);

struct RouterInner {
    /// Live pending requests, keyed by echo id.
    pending: DashMap<String, PendingSlot>,
    write_tx: mpsc::UnboundedSender<Message>,
    shutdown_tx: watch::Sender<bool>,
}

impl RouterInner {
    /// Fail every pending request with `make_err` and clear the table.
    fn cancel_all(&self, make_err: fn() -> Error) {
        let echoes: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for echo in echoes {
            if let Some((_, slot)) = self.pending.remove(&echo) {
                let _ = slot.send(Err(make_err()));
            }
        }
    }
}

/// Handle to the gateway connection. Cheap to clone.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Open the WebSocket and spawn the read/write loops.
    ///
    /// `token`, when set, is appended as an `access_token` query parameter.
    /// Returns the router plus the channel on which uncorrelated (event)
    /// frames arrive.
    pub async fn connect(
        uri: &str,
        token: Option<&str>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
        let uri = authenticated_uri(uri, token);
        info!(uri = %uri.split('?').next().unwrap_or(&uri), "connecting to gateway");

        let (ws_stream, _response) = connect_async(uri.as_str()).await?;
        let (mut ws_sink, mut ws_reader) = ws_stream.split();

        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Value>();
        let (shutdown_tx, _) = watch::channel(false);

        let inner = Arc::new(RouterInner {
            pending: DashMap::new(),
            write_tx,
            shutdown_tx,
        });

        // Write loop: the single writer. Concurrent `send` calls serialize
        // here, at the encode/write step, not at their await points.
        tokio::spawn(async move {
            while let Some(msg) = write_rx.recv().await {
                if ws_sink.send(msg).await.is_err() {
                    debug!("write loop closed");
                    break;
                }
            }
            let _ = ws_sink.send(Message::Close(None)).await;
        });

        // Read loop: decode frames, settle pending slots, forward events.
        let reader_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                let text = match msg {
                    Ok(Message::Text(t)) => t.to_string(),
                    Ok(Message::Ping(data)) => {
                        let _ = reader_inner.write_tx.send(Message::Pong(data));
                        continue;
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "read error");
                        break;
                    },
                };

                let value: Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "invalid JSON frame");
                        continue;
                    },
                };

                match InboundFrame::classify(value) {
                    Ok(InboundFrame::Response(response)) => {
                        let Some(echo) = response.echo.clone() else {
                            debug!("response frame without echo dropped");
                            continue;
                        };
                        match reader_inner.pending.remove(&echo) {
                            Some((_, slot)) => {
                                let _ = slot.send(Ok(response));
                            },
                            // Caller already timed out or was cancelled.
                            None => debug!(echo = %echo, "late response dropped"),
                        }
                    },
                    Ok(InboundFrame::Event(event)) => {
                        let _ = event_tx.send(event);
                    },
                    Err(e) => warn!(error = %e, "unclassifiable frame dropped"),
                }
            }

            info!("gateway connection closed");
            reader_inner.cancel_all(|| Error::ConnectionClosed);
            reader_inner.shutdown_tx.send_replace(true);
        });

        Ok((Self { inner }, event_rx))
    }

    /// Issue an API call and wait for the correlated response.
    ///
    /// On timeout the pending slot is removed, so a response arriving later
    /// is dropped silently by the read loop.
    pub async fn send(&self, action: &str, params: Value, timeout: Duration) -> Result<ApiResponse> {
        if *self.inner.shutdown_tx.borrow() {
            return Err(Error::NotConnected);
        }

        let request = ApiRequest::new(action, params);
        let echo = request.echo.clone();
        let payload = serde_json::to_string(&request)?;

        let (slot_tx, slot_rx) = oneshot::channel();
        self.inner.pending.insert(echo.clone(), slot_tx);

        if self
            .inner
            .write_tx
            .send(Message::Text(payload.into()))
            .is_err()
        {
            self.inner.pending.remove(&echo);
            return Err(Error::NotConnected);
        }

        match tokio::time::timeout(timeout, slot_rx).await {
            Ok(Ok(result)) => result,
            // Slot dropped without a verdict: the router went away.
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                self.inner.pending.remove(&echo);
                debug!(action = %request.action, "request timed out");
                Err(Error::timeout(request.action))
            },
        }
    }

    /// Cancel all pending requests and close the socket.
    pub fn close(&self) {
        self.inner.cancel_all(|| Error::Cancelled);
        let _ = self.inner.write_tx.send(Message::Close(None));
        self.inner.shutdown_tx.send_replace(true);
    }

    /// Watch that flips to `true` when the connection is gone.
    #[must_use]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.inner.shutdown_tx.subscribe()
    }

    /// Number of requests currently awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }
}

/// Append the `access_token` query parameter when a token is configured.
fn authenticated_uri(uri: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => {
            let sep = if uri.contains('?') { '&' } else { '?' };
            format!(
                "{}{sep}access_token={}",
                uri.trim_end_matches('/'),
                urlencoding::encode(token)
            )
        },
        _ => uri.trim_end_matches('/').to_string(),
    }
}
