//! Typed upstream events and the bus payload union.

mod message;
mod meta;
mod notice;
mod request;

pub use {
    message::{GroupMessageEvent, MessageSentEvent, PrivateMessageEvent, Sender},
    meta::MetaEvent,
    notice::{EmojiLike, NoticeEvent, NoticeFile},
    request::RequestEvent,
};

use serde_json::Value;

use crate::{Error, Result};

/// Bus event type strings. Everything the framework publishes lives under
/// the [`crate::EVENT_NAMESPACE`] prefix.
pub mod names {
    pub const GROUP_MESSAGE_EVENT: &str = "kotori.group_message_event";
    pub const PRIVATE_MESSAGE_EVENT: &str = "kotori.private_message_event";
    pub const MESSAGE_SENT_EVENT: &str = "kotori.message_sent_event";
    pub const NOTICE_EVENT: &str = "kotori.notice_event";
    pub const REQUEST_EVENT: &str = "kotori.request_event";
    pub const STARTUP_EVENT: &str = "kotori.startup_event";
    pub const SHUTDOWN_EVENT: &str = "kotori.shutdown_event";
    pub const HEARTBEAT_EVENT: &str = "kotori.heartbeat_event";
    /// Lifecycle frames other than `connect` (`enable`, `disable`).
    pub const LIFECYCLE_EVENT: &str = "kotori.lifecycle_event";
    pub const PARAM_BIND_FAILED: &str = "kotori.param_bind_failed";
}

/// Published when command argument binding fails, so plugins can render
/// usage help instead of the handler receiving an error.
#[derive(Debug, Clone, PartialEq)]
pub struct BindFailure {
    /// The resolved command name (joined path words).
    pub command: String,
    /// Human-readable description of what could not be bound.
    pub message: String,
}

/// The union of everything that travels on the event bus.
#[derive(Debug, Clone)]
pub enum Event {
    GroupMessage(GroupMessageEvent),
    PrivateMessage(PrivateMessageEvent),
    MessageSent(MessageSentEvent),
    Notice(NoticeEvent),
    Request(RequestEvent),
    Meta(MetaEvent),
    BindFailure(BindFailure),
    /// Plugin-defined events: arbitrary name, arbitrary JSON payload.
    Custom { name: String, data: Value },
}

impl Event {
    /// Decode a raw event frame into its typed variant.
    pub fn decode(value: &Value) -> Result<Self> {
        let post_type = value
            .get("post_type")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField { field: "post_type" })?;

        match post_type {
            "message" => {
                let message_type = value
                    .get("message_type")
                    .and_then(Value::as_str)
                    .ok_or(Error::MissingField {
                        field: "message_type",
                    })?;
                match message_type {
                    "group" => Ok(Self::GroupMessage(serde_json::from_value(value.clone())?)),
                    "private" => Ok(Self::PrivateMessage(serde_json::from_value(value.clone())?)),
                    other => Err(Error::Message(format!("unknown message_type: {other}"))),
                }
            },
            "message_sent" => Ok(Self::MessageSent(serde_json::from_value(value.clone())?)),
            "notice" => Ok(Self::Notice(serde_json::from_value(value.clone())?)),
            "request" => Ok(Self::Request(serde_json::from_value(value.clone())?)),
            "meta_event" => Ok(Self::Meta(serde_json::from_value(value.clone())?)),
            other => Err(Error::unknown_post_type(other)),
        }
    }

    /// The bus event type string this event publishes under.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::GroupMessage(_) => names::GROUP_MESSAGE_EVENT,
            Self::PrivateMessage(_) => names::PRIVATE_MESSAGE_EVENT,
            Self::MessageSent(_) => names::MESSAGE_SENT_EVENT,
            Self::Notice(_) => names::NOTICE_EVENT,
            Self::Request(_) => names::REQUEST_EVENT,
            Self::Meta(meta) if meta.is_heartbeat() => names::HEARTBEAT_EVENT,
            // Only the gateway's connect handshake counts as startup;
            // enable/disable lifecycle frames stay on their own type.
            Self::Meta(meta) if meta.is_connect() => names::STARTUP_EVENT,
            Self::Meta(_) => names::LIFECYCLE_EVENT,
            Self::BindFailure(_) => names::PARAM_BIND_FAILED,
            Self::Custom { name, .. } => name,
        }
    }

    /// Sender user id, for message events.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::GroupMessage(e) => Some(&e.user_id),
            Self::PrivateMessage(e) => Some(&e.user_id),
            Self::MessageSent(e) => Some(&e.user_id),
            Self::Notice(e) => e.user_id.as_deref(),
            Self::Request(e) => e.user_id.as_deref(),
            _ => None,
        }
    }

    /// Group id, for group-scoped events.
    #[must_use]
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Self::GroupMessage(e) => Some(&e.group_id),
            Self::MessageSent(e) => e.group_id.as_deref(),
            Self::Notice(e) => e.group_id.as_deref(),
            Self::Request(e) => e.group_id.as_deref(),
            _ => None,
        }
    }

    /// The message array, for message events.
    #[must_use]
    pub fn message(&self) -> Option<&crate::MessageArray> {
        match self {
            Self::GroupMessage(e) => Some(&e.message),
            Self::PrivateMessage(e) => Some(&e.message),
            Self::MessageSent(e) => Some(&e.message),
            _ => None,
        }
    }

    /// Group sender block, when the event carries one.
    #[must_use]
    pub fn sender(&self) -> Option<&Sender> {
        match self {
            Self::GroupMessage(e) => Some(&e.sender),
            Self::PrivateMessage(e) => Some(&e.sender),
            Self::MessageSent(e) => e.sender.as_ref(),
            _ => None,
        }
    }
}
