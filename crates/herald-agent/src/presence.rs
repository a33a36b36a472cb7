//! Turns voice-state updates into announcements.

use crate::greeting::GreetingConfig;
use herald_types::MembershipEvent;
use herald_voice::{ConnectionHandle, CoordinatorHandle};
use tracing::{debug, info};

/// Watches one channel and greets whoever joins it.
#[derive(Clone)]
pub struct PresenceWatcher {
    channel_id: u64,
    self_id: u64,
    greetings: GreetingConfig,
    coordinator: CoordinatorHandle,
    connection: ConnectionHandle,
}

impl PresenceWatcher {
    pub fn new(
        channel_id: u64,
        self_id: u64,
        greetings: GreetingConfig,
        coordinator: CoordinatorHandle,
        connection: ConnectionHandle,
    ) -> Self {
        Self {
            channel_id,
            self_id,
            greetings,
            coordinator,
            connection,
        }
    }

    /// Handles one membership update. Returns the announcement text if the
    /// update was a join that gets greeted.
    pub async fn handle(&self, event: &MembershipEvent) -> Option<String> {
        if !event.is_join(self.channel_id) {
            return None;
        }
        let member = &event.member;
        if member.id == self.self_id {
            debug!("ignoring own voice state update");
            return None;
        }

        self.connection.ensure_connected();

        let staff = self.greetings.is_staff(member);
        info!(user = %member.username, staff, "member joined watched channel");
        let text = self.greetings.greeting_for(member);
        self.coordinator.speak(text.clone()).await;
        Some(text)
    }
}
