//! Startup wiring: builds the playback core and keeps its tasks.

use crate::config::{Config, ConfigError};
use crate::console::ConsoleCommand;
use crate::presence::PresenceWatcher;
use herald_voice::{
    ConnectionHandle, ConnectionManager, Coordinator, CoordinatorHandle, LoopbackGateway,
    LoopbackSink, SpeechFetcher, VoiceError,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

/// A running agent wired to the loopback platform.
pub struct Agent {
    coordinator: CoordinatorHandle,
    connection: ConnectionHandle,
    presence: PresenceWatcher,
    gateway: Arc<LoopbackGateway>,
    coordinator_task: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl Agent {
    /// Validates `config`, starts the coordinator and connection manager,
    /// and schedules the first ambient loop after the startup delay.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &Config) -> Result<Self, AgentError> {
        config.validate()?;

        let speech = Arc::new(SpeechFetcher::new(&config.speech)?);
        let sink = Arc::new(LoopbackSink::default());
        let (coordinator, coordinator_handle) = Coordinator::new(
            sink,
            speech,
            config.playback.clone(),
            config.timing.clone(),
        );
        let coordinator_task = coordinator.spawn();

        let gateway = Arc::new(LoopbackGateway::new());
        let (manager, connection) = ConnectionManager::new(
            gateway.clone(),
            config.voice.channel(),
            coordinator_handle.clone(),
            config.timing.reconnect_delay(),
        );
        let manager_task = manager.spawn();

        let startup_delay = config.timing.startup_delay();
        let ambient = coordinator_handle.clone();
        let startup_task = tokio::spawn(async move {
            tokio::time::sleep(startup_delay).await;
            ambient.start_ambient().await;
        });

        let presence = PresenceWatcher::new(
            config.voice.channel_id,
            config.voice.self_id,
            config.greetings.clone(),
            coordinator_handle.clone(),
            connection.clone(),
        );

        info!(channel = %config.voice.channel(), "herald agent started");

        Ok(Self {
            coordinator: coordinator_handle,
            connection,
            presence,
            gateway,
            coordinator_task,
            background: vec![manager_task, startup_task],
        })
    }

    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn presence(&self) -> &PresenceWatcher {
        &self.presence
    }

    /// Executes one console command.
    pub async fn execute(&self, command: ConsoleCommand) -> ControlFlow<()> {
        match command {
            ConsoleCommand::Membership(event) => {
                self.presence.handle(&event).await;
            }
            ConsoleCommand::Say(text) => self.coordinator.speak(text).await,
            ConsoleCommand::Drop => {
                if !self.gateway.drop_connection() {
                    info!("no voice connection to drop");
                }
            }
            ConsoleCommand::Status => {
                let generation = self.connection.session().map(|s| s.generation());
                info!(
                    mode = self.coordinator.mode().label(),
                    connected = generation.is_some(),
                    generation,
                    "status"
                );
            }
            ConsoleCommand::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Stops playback, releases scratch files, and ends all tasks.
    pub async fn shutdown(self) {
        for task in &self.background {
            task.abort();
        }
        self.coordinator.shutdown().await;
        if let Err(e) = self.coordinator_task.await {
            tracing::error!("coordinator task join error: {}", e);
        }
        info!("herald agent shut down");
    }
}
