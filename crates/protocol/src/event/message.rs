//! Message events: group, private, and self-sent.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    MessageArray, Result,
    ids,
    port::ApiHandle,
    segment::Extra,
};

/// The `sender` block of a message event. Group messages populate the
/// role/card fields; private messages carry only the basics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default, with = "ids::opt_string_or_int")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    /// `owner`, `admin`, or `member` for group senders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Sender {
    /// Group owner or administrator.
    #[must_use]
    pub fn is_group_admin(&self) -> bool {
        matches!(self.role.as_deref(), Some("admin") | Some("owner"))
    }

    #[must_use]
    pub fn is_group_owner(&self) -> bool {
        self.role.as_deref() == Some("owner")
    }

    /// Display name: the group card when set, else the nickname.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.card.as_deref() {
            Some(card) if !card.is_empty() => card,
            _ => &self.nickname,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessageEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(with = "ids::string_or_int")]
    pub self_id: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(with = "ids::string_or_int")]
    pub message_id: String,
    #[serde(with = "ids::string_or_int")]
    pub user_id: String,
    #[serde(with = "ids::string_or_int")]
    pub group_id: String,
    pub message: MessageArray,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<Value>,
    #[serde(skip)]
    pub api: ApiHandle,
}

impl GroupMessageEvent {
    /// Reply in the group, quoting this message and at-mentioning the sender.
    pub async fn reply(&self, text: &str) -> Result<Value> {
        let message = MessageArray::new()
            .reply(&self.message_id)
            .at(&self.user_id)
            .text(format!(" {text}"));
        self.reply_message(message).await
    }

    /// Reply with a prebuilt message array, quoting this message.
    pub async fn reply_message(&self, message: MessageArray) -> Result<Value> {
        self.api
            .call(
                "send_group_msg",
                json!({ "group_id": self.group_id, "message": message }),
            )
            .await
    }

    /// Recall this message.
    pub async fn delete(&self) -> Result<Value> {
        self.api
            .call("delete_msg", json!({ "message_id": self.message_id }))
            .await
    }

    /// Mute the sender for `duration` seconds.
    pub async fn ban(&self, duration: u64) -> Result<Value> {
        self.api
            .call(
                "set_group_ban",
                json!({
                    "group_id": self.group_id,
                    "user_id": self.user_id,
                    "duration": duration,
                }),
            )
            .await
    }

    /// Remove the sender from the group.
    pub async fn kick(&self) -> Result<Value> {
        self.api
            .call(
                "set_group_kick",
                json!({ "group_id": self.group_id, "user_id": self.user_id }),
            )
            .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessageEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(with = "ids::string_or_int")]
    pub self_id: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(with = "ids::string_or_int")]
    pub message_id: String,
    #[serde(with = "ids::string_or_int")]
    pub user_id: String,
    pub message: MessageArray,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub sender: Sender,
    #[serde(skip)]
    pub api: ApiHandle,
}

impl PrivateMessageEvent {
    /// Reply to the sender, quoting this message.
    pub async fn reply(&self, text: &str) -> Result<Value> {
        let message = MessageArray::new().reply(&self.message_id).text(text);
        self.reply_message(message).await
    }

    pub async fn reply_message(&self, message: MessageArray) -> Result<Value> {
        self.api
            .call(
                "send_private_msg",
                json!({ "user_id": self.user_id, "message": message }),
            )
            .await
    }
}

/// A message this account sent itself (echoed back by the gateway).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSentEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(with = "ids::string_or_int")]
    pub self_id: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(with = "ids::string_or_int")]
    pub message_id: String,
    #[serde(with = "ids::string_or_int")]
    pub user_id: String,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub message: MessageArray,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_sent_type: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub real_seq: Option<String>,
    #[serde(skip)]
    pub api: ApiHandle,
}

impl MessageSentEvent {
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.message_type == "group"
    }

    /// Follow up in the same conversation, quoting the sent message.
    pub async fn reply(&self, text: &str) -> Result<Value> {
        let message = MessageArray::new().reply(&self.message_id).text(text);
        if let Some(group_id) = &self.group_id {
            self.api
                .call(
                    "send_group_msg",
                    json!({ "group_id": group_id, "message": message }),
                )
                .await
        } else {
            let target = self.target_id.as_deref().unwrap_or(&self.user_id);
            self.api
                .call(
                    "send_private_msg",
                    json!({ "user_id": target, "message": message }),
                )
                .await
        }
    }
}
