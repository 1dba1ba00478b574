//! The outbound request capability, as seen from event values.
//!
//! Message events carry an [`ApiHandle`] so handlers can call
//! `event.reply(...)` without threading a client through every signature.
//! The handle is bound by the dispatcher for the handler's scope and is
//! never serialized.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{Error, Result};

/// A single request capability against the gateway: `call(action, params)`.
///
/// The concrete implementation lives with the API facade; this trait keeps
/// event types free of any transport dependency.
#[async_trait]
pub trait ApiPort: Send + Sync {
    async fn call(&self, action: &str, params: Value) -> Result<Value>;
}

/// An optional, cloneable reference to an [`ApiPort`].
#[derive(Clone, Default)]
pub struct ApiHandle(Option<Arc<dyn ApiPort>>);

impl ApiHandle {
    #[must_use]
    pub fn new(port: Arc<dyn ApiPort>) -> Self {
        Self(Some(port))
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.0.is_some()
    }

    /// Issue a request through the bound port.
    pub async fn call(&self, action: &str, params: Value) -> Result<Value> {
        match &self.0 {
            Some(port) => port.call(action, params).await,
            None => Err(Error::Message("no api handle bound to this event".into())),
        }
    }
}

impl std::fmt::Debug for ApiHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_bound() {
            "ApiHandle(bound)"
        } else {
            "ApiHandle(unbound)"
        })
    }
}

// Handles never participate in event equality.
impl PartialEq for ApiHandle {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}
