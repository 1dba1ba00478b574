//! Lifecycle and heartbeat meta events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ids, segment::Extra};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(with = "ids::string_or_int")]
    pub self_id: String,
    /// `heartbeat` or `lifecycle`.
    pub meta_event_type: String,
    /// `enable`, `disable`, or `connect` on lifecycle events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// Heartbeat interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl MetaEvent {
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.meta_event_type == "heartbeat"
    }

    /// A `lifecycle/connect` event: the gateway finished wiring the account.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        self.meta_event_type == "lifecycle" && self.sub_type.as_deref() == Some("connect")
    }
}
