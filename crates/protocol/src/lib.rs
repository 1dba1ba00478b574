//! OneBot wire protocol definitions.
//!
//! All communication with the gateway uses JSON frames over a single
//! WebSocket. There are exactly two inbound frame shapes:
//!
//! - **event frames** carry a `post_type` discriminator and describe
//!   something that happened on the account (message, notice, request,
//!   meta event),
//! - **response frames** carry an `echo` correlation id and answer a
//!   previously written [`ApiRequest`].
//!
//! Outbound frames are always `{action, params, echo}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod error;
pub mod event;
pub mod ids;
pub mod message;
pub mod port;
pub mod segment;

pub use {
    error::{Error, Result},
    event::{
        BindFailure, Event, GroupMessageEvent, MessageSentEvent, MetaEvent, NoticeEvent,
        PrivateMessageEvent, RequestEvent, Sender, names,
    },
    message::MessageArray,
    port::ApiPort,
    segment::Segment,
};

// ── Constants ────────────────────────────────────────────────────────────────

/// Namespace prefix for all bus event type strings.
pub const EVENT_NAMESPACE: &str = "kotori";

/// `retcode` value the gateway uses for success.
pub const RETCODE_OK: i64 = 0;

// ── Outbound request ─────────────────────────────────────────────────────────

/// Framework → gateway API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    pub action: String,
    pub params: Value,
    pub echo: String,
}

impl ApiRequest {
    /// Build a request with a fresh echo id. A leading `/` on the action is
    /// stripped; the gateway addresses endpoints by bare name.
    pub fn new(action: &str, params: Value) -> Self {
        Self {
            action: action.trim_start_matches('/').to_string(),
            params,
            echo: uuid::Uuid::new_v4().to_string(),
        }
    }
}

// ── Inbound response ─────────────────────────────────────────────────────────

/// Gateway → framework answer to an [`ApiRequest`], matched by `echo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub status: String,
    pub retcode: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub echo: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.retcode == RETCODE_OK
    }

    /// Convert a failed response into [`Error::Api`]; `Ok(data)` otherwise.
    pub fn into_data(self) -> Result<Value> {
        if self.is_ok() {
            Ok(self.data)
        } else {
            Err(Error::Api {
                retcode: self.retcode,
                message: self.message,
            })
        }
    }
}

// ── Frame classification ─────────────────────────────────────────────────────

/// A decoded inbound frame, before event typing.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// An event frame (`post_type` present). The raw value is kept so the
    /// dispatcher can select the decoder variant.
    Event(Value),
    /// A response to a pending request (`echo` present, no `post_type`).
    Response(ApiResponse),
}

impl InboundFrame {
    /// Classify a raw JSON frame. Absence of `post_type` combined with the
    /// presence of `echo` marks a response; anything else is unknown.
    pub fn classify(value: Value) -> Result<Self> {
        if value.get("post_type").is_some() {
            return Ok(Self::Event(value));
        }
        if value.get("echo").is_some() {
            let response = serde_json::from_value(value)?;
            return Ok(Self::Response(response));
        }
        Err(Error::UnknownFrame)
    }
}
