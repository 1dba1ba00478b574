//! Outbound API facade.
//!
//! The contract against the gateway is a single capability:
//! `send(action, params) → response`. [`BotApi`] owns that capability as a
//! transport trait object, converts failed responses (`retcode != 0`) into
//! structured errors, and layers the handful of endpoint helpers the rest
//! of the framework needs. Everything else is gateway-defined schema the
//! caller drives through [`BotApi::send`].

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tracing::debug,
};

use kotori_protocol::{ApiPort, ApiResponse, Error, MessageArray, Result};

/// The wire-level request capability the facade sits on.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, action: &str, params: Value, timeout: Duration) -> Result<ApiResponse>;
}

/// Transport used before the router is wired in; every call fails.
pub struct NoopTransport;

#[async_trait]
impl ApiTransport for NoopTransport {
    async fn send(&self, _action: &str, _params: Value, _timeout: Duration) -> Result<ApiResponse> {
        Err(Error::transport("api transport not configured"))
    }
}

/// Gateway API handle. Cheap to clone; all clones share the transport.
#[derive(Clone)]
pub struct BotApi {
    transport: Arc<dyn ApiTransport>,
    timeout: Duration,
}

impl BotApi {
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    #[must_use]
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopTransport), Duration::from_secs(15))
    }

    /// Call an arbitrary endpoint; returns the response `data` on success.
    pub async fn send(&self, action: &str, params: Value) -> Result<Value> {
        self.send_with_timeout(action, params, self.timeout).await
    }

    pub async fn send_with_timeout(
        &self,
        action: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value> {
        debug!(action = %action, "api call");
        let response = self.transport.send(action, params, timeout).await?;
        response.into_data()
    }

    // ── Message endpoints ────────────────────────────────────────────────

    /// Send a message array to a group; returns the new message id.
    pub async fn send_group_msg(&self, group_id: &str, message: MessageArray) -> Result<String> {
        let data = self
            .send(
                "send_group_msg",
                json!({ "group_id": group_id, "message": message }),
            )
            .await?;
        extract_message_id(&data)
    }

    /// Send a message array to a user; returns the new message id.
    pub async fn send_private_msg(&self, user_id: &str, message: MessageArray) -> Result<String> {
        let data = self
            .send(
                "send_private_msg",
                json!({ "user_id": user_id, "message": message }),
            )
            .await?;
        extract_message_id(&data)
    }

    /// Plain-text convenience over [`Self::send_group_msg`].
    pub async fn send_group_text(&self, group_id: &str, text: &str) -> Result<String> {
        self.send_group_msg(group_id, MessageArray::new().text(text))
            .await
    }

    pub async fn send_private_text(&self, user_id: &str, text: &str) -> Result<String> {
        self.send_private_msg(user_id, MessageArray::new().text(text))
            .await
    }

    /// Fetch a message by id.
    pub async fn get_msg(&self, message_id: &str) -> Result<Value> {
        self.send("get_msg", json!({ "message_id": message_id }))
            .await
    }

    /// Recall a message.
    pub async fn delete_msg(&self, message_id: &str) -> Result<Value> {
        self.send("delete_msg", json!({ "message_id": message_id }))
            .await
    }

    // ── Group administration ─────────────────────────────────────────────

    pub async fn set_group_kick(&self, group_id: &str, user_id: &str) -> Result<Value> {
        self.send(
            "set_group_kick",
            json!({ "group_id": group_id, "user_id": user_id }),
        )
        .await
    }

    /// Mute a member for `duration` seconds; zero lifts the ban.
    pub async fn set_group_ban(
        &self,
        group_id: &str,
        user_id: &str,
        duration: u64,
    ) -> Result<Value> {
        self.send(
            "set_group_ban",
            json!({ "group_id": group_id, "user_id": user_id, "duration": duration }),
        )
        .await
    }

    // ── Requests ─────────────────────────────────────────────────────────

    /// Approve or reject a friend request by its flag.
    pub async fn set_friend_add_request(
        &self,
        flag: &str,
        approve: bool,
        remark: Option<&str>,
    ) -> Result<Value> {
        self.send(
            "set_friend_add_request",
            json!({ "flag": flag, "approve": approve, "remark": remark }),
        )
        .await
    }

    /// Approve or reject a group-join request by its flag.
    pub async fn set_group_add_request(
        &self,
        flag: &str,
        approve: bool,
        reason: Option<&str>,
    ) -> Result<Value> {
        self.send(
            "set_group_add_request",
            json!({ "flag": flag, "approve": approve, "reason": reason }),
        )
        .await
    }

    // ── Account ──────────────────────────────────────────────────────────

    pub async fn get_login_info(&self) -> Result<Value> {
        self.send("get_login_info", json!({})).await
    }
}

#[async_trait]
impl ApiPort for BotApi {
    async fn call(&self, action: &str, params: Value) -> Result<Value> {
        self.send(action, params).await
    }
}

/// Gateways report `message_id` as either a number or a string.
fn extract_message_id(data: &Value) -> Result<String> {
    match data.get("message_id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::MissingField {
            field: "message_id",
        }),
    }
}
