//! Friend and group-join requests.

use serde::{Deserialize, Serialize};

use crate::{ids, segment::Extra};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(with = "ids::string_or_int")]
    pub self_id: String,
    /// `friend` or `group`.
    pub request_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// Free-form verification message from the requester.
    #[serde(default)]
    pub comment: String,
    /// Opaque token passed back when approving or rejecting.
    #[serde(default)]
    pub flag: String,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, with = "ids::opt_string_or_int", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl RequestEvent {
    #[must_use]
    pub fn is_friend_request(&self) -> bool {
        self.request_type == "friend"
    }

    #[must_use]
    pub fn is_group_request(&self) -> bool {
        self.request_type == "group"
    }
}
