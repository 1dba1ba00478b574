//! Notice events: group membership changes, bans, recalls, pokes, and the
//! rest of the gateway's `notice_type` taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ids, segment::Extra};

/// The `file` block of a `group_upload` notice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoticeFile {
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busid: Option<i64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One entry of the `likes` list on a `group_msg_emoji_like` notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiLike {
    #[serde(with = "ids::string_or_int")]
    pub emoji_id: String,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(with = "ids::string_or_int")]
    pub self_id: String,
    pub notice_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Who performed the action (kick, ban, recall, …).
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Ban duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<NoticeFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_old: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_new: Option<String>,
    /// `talkative`, `performer`, or `emotion` on `notify/honor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<Vec<EmojiLike>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_add: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl NoticeEvent {
    #[must_use]
    pub fn is_group_notice(&self) -> bool {
        self.group_id.is_some()
    }

    /// The emoji id of a single-reaction `group_msg_emoji_like` notice.
    #[must_use]
    pub fn emoji_like_id(&self) -> Option<&str> {
        match self.likes.as_deref() {
            Some([like]) => Some(&like.emoji_id),
            _ => None,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn group_upload_carries_file_block() {
        let n: NoticeEvent = serde_json::from_value(json!({
            "time": 1,
            "self_id": 1,
            "notice_type": "group_upload",
            "group_id": 100,
            "user_id": 200,
            "file": {"id": "f-1", "name": "notes.txt", "size": 512, "busid": 102},
        }))
        .unwrap();
        assert!(n.is_group_notice());
        let file = n.file.unwrap();
        assert_eq!(file.name.as_deref(), Some("notes.txt"));
        assert_eq!(file.size, Some(512));
    }

    #[test]
    fn emoji_like_id_from_single_entry() {
        let n: NoticeEvent = serde_json::from_value(json!({
            "time": 1,
            "self_id": 1,
            "notice_type": "group_msg_emoji_like",
            "group_id": 100,
            "user_id": 200,
            "message_id": 300,
            "likes": [{"emoji_id": 128077, "count": 1}],
        }))
        .unwrap();
        assert_eq!(n.emoji_like_id(), Some("128077"));

        let n: NoticeEvent = serde_json::from_value(json!({
            "time": 1, "self_id": 1, "notice_type": "group_msg_emoji_like",
            "likes": [
                {"emoji_id": 1, "count": 1},
                {"emoji_id": 2, "count": 1},
            ],
        }))
        .unwrap();
        assert_eq!(n.emoji_like_id(), None);
    }

    #[test]
    fn unknown_notice_fields_are_kept() {
        let v = json!({
            "time": 1,
            "self_id": 1,
            "notice_type": "notify",
            "sub_type": "poke",
            "group_id": 100,
            "user_id": 200,
            "target_id": 300,
            "raw_info": [{"type": "qq"}],
            "poke_detail": {"action": "拍了拍"},
        });
        let n: NoticeEvent = serde_json::from_value(v).unwrap();
        assert!(n.extra.contains_key("poke_detail"));
        let out = serde_json::to_value(&n).unwrap();
        assert_eq!(out["poke_detail"]["action"], "拍了拍");
    }
}
