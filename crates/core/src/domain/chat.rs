use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::group::GroupId;
use crate::domain::member::MemberId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatMessageId(pub i64);

/// Append-only group chat entry. `member_id` is empty for assistant replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub group_id: GroupId,
    pub member_id: Option<MemberId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewChatMessage {
    pub member_id: Option<MemberId>,
    pub message: String,
}
