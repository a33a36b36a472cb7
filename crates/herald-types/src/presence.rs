//! Membership events for the watched voice channel.

use serde::{Deserialize, Serialize};

/// A guild member as seen in a voice-state update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub username: String,
    /// Role ids held by the member.
    #[serde(default)]
    pub roles: Vec<u64>,
}

impl Member {
    pub fn has_role(&self, role_id: u64) -> bool {
        self.roles.contains(&role_id)
    }
}

/// A member moved between voice channels (or joined/left voice entirely).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub member: Member,
    /// Channel the member was in before the update, if any.
    pub old_channel: Option<u64>,
    /// Channel the member is in after the update, if any.
    pub new_channel: Option<u64>,
}

impl MembershipEvent {
    /// Returns `true` if this update moved the member into `channel_id` from
    /// somewhere else.
    pub fn is_join(&self, channel_id: u64) -> bool {
        self.new_channel == Some(channel_id) && self.old_channel != Some(channel_id)
    }
}
