//! Connection supervision for the watched voice channel.
//!
//! The [`ConnectionManager`] joins the channel, reports each live session to
//! the coordinator, watches for the session to drop, and re-joins after a
//! fixed delay. Attempts never stop and the delay never grows.

use crate::coordinator::CoordinatorHandle;
use crate::gateway::{VoiceGateway, VoiceSession};
use herald_types::{ChannelRef, ConnectionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Joins the channel and keeps it joined.
pub struct ConnectionManager {
    gateway: Arc<dyn VoiceGateway>,
    channel: ChannelRef,
    coordinator: CoordinatorHandle,
    reconnect_delay: Duration,
    wake: Arc<Notify>,
    current: watch::Sender<Option<VoiceSession>>,
    generation: u64,
}

/// Lets other components observe or hurry the connection manager.
#[derive(Clone)]
pub struct ConnectionHandle {
    wake: Arc<Notify>,
    current: watch::Receiver<Option<VoiceSession>>,
}

impl ConnectionHandle {
    /// The most recent live session, if it is still connected.
    pub fn session(&self) -> Option<VoiceSession> {
        self.current
            .borrow()
            .as_ref()
            .filter(|session| session.is_connected())
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.session().is_some()
    }

    /// Cuts a pending reconnect delay short if there is no live session.
    ///
    /// A request made while a join or handshake is already under way is
    /// satisfied by that attempt and does not shorten any later delay.
    pub fn ensure_connected(&self) {
        if !self.is_connected() {
            info!("no live voice session; reconnecting now");
            self.wake.notify_one();
        }
    }
}

impl ConnectionManager {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        channel: ChannelRef,
        coordinator: CoordinatorHandle,
        reconnect_delay: Duration,
    ) -> (Self, ConnectionHandle) {
        let wake = Arc::new(Notify::new());
        let (current, current_rx) = watch::channel(None);
        let manager = Self {
            gateway,
            channel,
            coordinator,
            reconnect_delay,
            wake: wake.clone(),
            current,
            generation: 0,
        };
        (
            manager,
            ConnectionHandle {
                wake,
                current: current_rx,
            },
        )
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Joins the channel once.
    ///
    /// Failures are logged and reported as `None`: no session yet, not a
    /// fatal error.
    pub async fn connect(&mut self) -> Option<VoiceSession> {
        self.generation += 1;
        info!(channel = %self.channel, generation = self.generation, "joining voice channel");
        match self.gateway.join(self.channel).await {
            Ok(connection) => Some(VoiceSession::new(self.generation, self.channel, connection)),
            Err(e) => {
                error!(channel = %self.channel, error = %e, "failed to join voice channel");
                None
            }
        }
    }

    /// Supervises the connection forever.
    pub async fn run(mut self) {
        loop {
            self.discard_wake_requests();
            if let Some(session) = self.connect().await {
                self.supervise(session).await;
            }

            info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "scheduling voice reconnect"
            );
            tokio::select! {
                () = tokio::time::sleep(self.reconnect_delay) => {}
                () = self.wake.notified() => {}
            }
        }
    }

    /// Runs one session from handshake to disconnect.
    async fn supervise(&mut self, session: VoiceSession) {
        let generation = session.generation();
        let mut state = session.watch_state();

        let settled = state
            .wait_for(|s| *s != ConnectionState::Connecting)
            .await
            .map(|s| *s)
            .unwrap_or(ConnectionState::Disconnected);
        if settled != ConnectionState::Connected {
            warn!(generation, "voice session never connected");
            return;
        }

        // Requests made during the handshake are answered by this session.
        self.discard_wake_requests();
        self.current.send_replace(Some(session.clone()));
        self.coordinator.session_up(session).await;

        // A dropped state sender means the connection is gone too.
        let _ = state
            .wait_for(|s| *s == ConnectionState::Disconnected)
            .await;

        warn!(generation, "voice session disconnected");
        self.current.send_replace(None);
        self.coordinator.session_down(generation).await;
    }

    /// Drops a wake-up stored by `ensure_connected` while nobody was waiting.
    fn discard_wake_requests(&self) {
        let pending = self.wake.notified();
        tokio::pin!(pending);
        if pending.as_mut().enable() {
            debug!("discarding reconnect request made during a connection attempt");
        }
    }
}
