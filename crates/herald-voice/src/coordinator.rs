//! Playback coordinator: the single owner of the audio sink.
//!
//! All state lives in one [`Coordinator`] that runs as a dedicated task.
//! External requests arrive through a [`CoordinatorHandle`]; sink idle
//! notifications, fetch results and timers are fed back to the same task as
//! internal events, so transitions never interleave. Network fetches and
//! delays run in spawned tasks and never hold coordinator state.

use crate::config::{PlaybackConfig, TimingConfig};
use crate::error::VoiceError;
use crate::gateway::VoiceSession;
use crate::scratch::{Janitor, ScratchFile};
use crate::sink::{AudioSink, Track};
use crate::speech::SpeechSource;
use herald_types::{PlaybackMode, TrackKind};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Capacity of the external command queue.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// A queued intent to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementRequest {
    /// Arrival order, starting at 1.
    pub seq: u64,
    pub text: String,
}

#[derive(Debug)]
enum Command {
    StartAmbient,
    Speak(String),
    SessionUp(VoiceSession),
    SessionDown { generation: u64 },
    Shutdown,
}

#[derive(Debug)]
enum Event {
    SinkIdle(u64),
    Fetched {
        token: u64,
        result: Result<ScratchFile, VoiceError>,
    },
    TimerFired(u64),
}

#[derive(Debug)]
enum AmbientStage {
    Playing(u64),
    /// Waiting out the loop delay before the next iteration.
    Waiting(u64),
}

#[derive(Debug)]
enum AnnounceStage {
    Fetching(u64),
    Playing { clip: ScratchFile, playback: u64 },
    /// Clip deleted, waiting out the settle delay.
    Settling(u64),
}

#[derive(Debug)]
enum Phase {
    Idle,
    Ambient(AmbientStage),
    Announcing {
        request: AnnouncementRequest,
        stage: AnnounceStage,
    },
}

impl Phase {
    fn mode(&self) -> PlaybackMode {
        match self {
            Phase::Idle => PlaybackMode::Idle,
            Phase::Ambient(_) => PlaybackMode::AmbientLoop,
            Phase::Announcing { request, stage } => PlaybackMode::Announcing {
                text: request.text.clone(),
                scratch_file: match stage {
                    AnnounceStage::Playing { clip, .. } => Some(clip.path().to_path_buf()),
                    _ => None,
                },
            },
        }
    }
}

/// Cloneable front door to a running [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
    mode: watch::Receiver<PlaybackMode>,
}

impl CoordinatorHandle {
    /// Starts the ambient loop, or arms it to start once a session is up.
    pub async fn start_ambient(&self) {
        self.send(Command::StartAmbient).await;
    }

    /// Queues an announcement. Announcements play one at a time in the
    /// order they were submitted.
    pub async fn speak(&self, text: impl Into<String>) {
        self.send(Command::Speak(text.into())).await;
    }

    /// Hands a freshly connected session to the coordinator.
    pub async fn session_up(&self, session: VoiceSession) {
        self.send(Command::SessionUp(session)).await;
    }

    /// Reports that the session with `generation` has disconnected.
    pub async fn session_down(&self, generation: u64) {
        self.send(Command::SessionDown { generation }).await;
    }

    /// Stops playback, releases any scratch file and ends the coordinator.
    pub async fn shutdown(&self) {
        self.send(Command::Shutdown).await;
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode.borrow().clone()
    }

    pub fn watch_mode(&self) -> watch::Receiver<PlaybackMode> {
        self.mode.clone()
    }

    async fn send(&self, command: Command) {
        if let Err(e) = self.tx.send(command).await {
            debug!(command = ?e.0, "coordinator is not running; dropping command");
        }
    }
}

/// Owns the sink and decides which source plays through it.
pub struct Coordinator {
    sink: Arc<dyn AudioSink>,
    speech: Arc<dyn SpeechSource>,
    playback: PlaybackConfig,
    timing: TimingConfig,
    session: Option<VoiceSession>,
    phase: Phase,
    queue: VecDeque<AnnouncementRequest>,
    /// Ambient resumes on its own only after it has been requested once.
    ambient_armed: bool,
    /// Playback token currently owning the sink.
    active: Option<u64>,
    next_token: u64,
    next_seq: u64,
    /// In-flight speech fetches, stale ones included.
    fetches: JoinSet<()>,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    mode_tx: watch::Sender<PlaybackMode>,
}

impl Coordinator {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        speech: Arc<dyn SpeechSource>,
        playback: PlaybackConfig,
        timing: TimingConfig,
    ) -> (Self, CoordinatorHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (events_tx, events) = mpsc::unbounded_channel();
        let (mode_tx, mode) = watch::channel(PlaybackMode::Idle);

        let coordinator = Self {
            sink,
            speech,
            playback,
            timing,
            session: None,
            phase: Phase::Idle,
            queue: VecDeque::new(),
            ambient_armed: false,
            active: None,
            next_token: 0,
            next_seq: 0,
            fetches: JoinSet::new(),
            commands,
            events_tx,
            events,
            mode_tx,
        };
        (coordinator, CoordinatorHandle { tx, mode })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Processes commands and events until shut down or every handle is
    /// dropped.
    pub async fn run(mut self) {
        info!("playback coordinator started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.events.recv() => self.handle_event(event).await,
                Some(joined) = self.fetches.join_next(), if !self.fetches.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "speech fetch task failed");
                    }
                }
            }
            self.publish_mode();
        }
        self.shutdown().await;
        info!("playback coordinator stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartAmbient => {
                self.ambient_armed = true;
                if matches!(self.phase, Phase::Idle) {
                    self.advance();
                }
            }
            Command::Speak(text) => {
                self.next_seq += 1;
                let request = AnnouncementRequest {
                    seq: self.next_seq,
                    text,
                };
                debug!(seq = request.seq, queued = self.queue.len(), "announcement requested");
                self.queue.push_back(request);

                match self.phase {
                    Phase::Idle | Phase::Ambient(_) => self.advance(),
                    Phase::Announcing { .. } => {}
                }
            }
            Command::SessionUp(session) => {
                info!(
                    generation = session.generation(),
                    channel = %session.channel(),
                    "voice session available"
                );
                self.session = Some(session);
                if matches!(self.phase, Phase::Idle) {
                    self.advance();
                }
            }
            Command::SessionDown { generation } => self.on_session_down(generation).await,
            Command::Shutdown => {}
        }
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::SinkIdle(token) => self.on_sink_idle(token).await,
            Event::TimerFired(token) => self.on_timer(token),
            Event::Fetched { token, result } => self.on_fetched(token, result).await,
        }
    }

    async fn on_session_down(&mut self, generation: u64) {
        match &self.session {
            Some(session) if session.generation() == generation => {}
            _ => {
                debug!(generation, "ignoring disconnect of a superseded session");
                return;
            }
        }
        info!(generation, "voice session lost; suspending playback");
        self.session = None;
        self.active = None;
        self.sink.stop();

        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Announcing {
                request,
                stage: AnnounceStage::Fetching(_),
            } => {
                // The in-flight result will be discarded; fetch again later.
                debug!(seq = request.seq, "announcement deferred until reconnect");
                self.queue.push_front(request);
            }
            Phase::Announcing {
                stage: AnnounceStage::Playing { clip, .. },
                ..
            } => Janitor::cleanup(clip).await,
            _ => {}
        }
    }

    async fn on_sink_idle(&mut self, token: u64) {
        if self.active != Some(token) {
            return;
        }
        self.active = None;

        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Ambient(AmbientStage::Playing(playback)) if playback == token => {
                if self.queue.is_empty() {
                    let timer = self.schedule(self.timing.ambient_loop_delay());
                    self.phase = Phase::Ambient(AmbientStage::Waiting(timer));
                } else {
                    self.advance();
                }
            }
            Phase::Announcing {
                request,
                stage: AnnounceStage::Playing { clip, playback },
            } if playback == token => {
                debug!(seq = request.seq, "announcement clip finished");
                Janitor::cleanup(clip).await;
                let timer = self.schedule(self.timing.announcement_settle_delay());
                self.phase = Phase::Announcing {
                    request,
                    stage: AnnounceStage::Settling(timer),
                };
            }
            other => self.phase = other,
        }
    }

    fn on_timer(&mut self, token: u64) {
        let due = match &self.phase {
            Phase::Ambient(AmbientStage::Waiting(timer)) => *timer == token,
            Phase::Announcing {
                stage: AnnounceStage::Settling(timer),
                request,
            } if *timer == token => {
                info!(seq = request.seq, "announcement complete");
                true
            }
            _ => false,
        };
        if due {
            self.advance();
        }
    }

    async fn on_fetched(&mut self, token: u64, result: Result<ScratchFile, VoiceError>) {
        let current = matches!(
            &self.phase,
            Phase::Announcing { stage: AnnounceStage::Fetching(t), .. } if *t == token
        );
        if !current {
            if let Ok(clip) = result {
                debug!(path = %clip.path().display(), "discarding stale announcement clip");
                Janitor::cleanup(clip).await;
            }
            return;
        }

        let Phase::Announcing { request, .. } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return;
        };

        match result {
            Ok(clip) if !self.is_connected() => {
                // The drop has not been reported yet; treat it as if it had.
                debug!(seq = request.seq, "session lost mid-fetch; deferring announcement");
                Janitor::cleanup(clip).await;
                self.queue.push_front(request);
                self.advance();
            }
            Ok(clip) => {
                let track = Track::new(
                    TrackKind::Announcement,
                    clip.path(),
                    self.playback.announcement_volume,
                );
                match self.play(track) {
                    Ok(playback) => {
                        info!(seq = request.seq, text = %request.text, "announcing");
                        self.phase = Phase::Announcing {
                            request,
                            stage: AnnounceStage::Playing { clip, playback },
                        };
                    }
                    Err(e) => {
                        warn!(seq = request.seq, error = %e, "announcement playback failed");
                        Janitor::cleanup(clip).await;
                        self.advance();
                    }
                }
            }
            Err(e) => {
                warn!(seq = request.seq, error = %e, "announcement fetch failed; skipping");
                self.advance();
            }
        }
    }

    /// Hands the free sink to the next owner: the oldest queued
    /// announcement, else the ambient loop, else nobody.
    fn advance(&mut self) {
        if !self.is_connected() {
            self.stop_sink();
            self.phase = Phase::Idle;
            return;
        }
        if let Some(request) = self.queue.pop_front() {
            self.begin_announcement(request);
        } else if self.ambient_armed {
            self.start_ambient();
        } else {
            self.phase = Phase::Idle;
        }
    }

    fn begin_announcement(&mut self, request: AnnouncementRequest) {
        // Whatever was looping before, ambient comes back afterwards.
        self.ambient_armed = true;
        self.stop_sink();

        let token = self.next_token();
        let speech = self.speech.clone();
        let tx = self.events_tx.clone();
        let text = request.text.clone();
        self.fetches.spawn(async move {
            let result = speech.fetch(&text).await;
            if let Err(mpsc::error::SendError(Event::Fetched {
                result: Ok(clip), ..
            })) = tx.send(Event::Fetched { token, result })
            {
                Janitor::cleanup(clip).await;
            }
        });

        debug!(seq = request.seq, "fetching announcement");
        self.phase = Phase::Announcing {
            request,
            stage: AnnounceStage::Fetching(token),
        };
    }

    fn start_ambient(&mut self) {
        let track = Track::new(
            TrackKind::Ambient,
            self.playback.ambient_track.clone(),
            self.playback.ambient_volume,
        );
        match self.play(track) {
            Ok(playback) => self.phase = Phase::Ambient(AmbientStage::Playing(playback)),
            Err(e) => {
                warn!(error = %e, "ambient playback failed");
                self.phase = Phase::Idle;
            }
        }
    }

    fn play(&mut self, track: Track) -> Result<u64, VoiceError> {
        let session = match &self.session {
            Some(session) if session.is_connected() => session.clone(),
            _ => return Err(VoiceError::Sink("no live voice session".to_string())),
        };
        self.stop_sink();

        session.subscribe(self.sink.clone());
        let handle = self.sink.play(track)?;
        let token = self.next_token();
        self.active = Some(token);

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            handle.finished().await;
            let _ = tx.send(Event::SinkIdle(token));
        });
        Ok(token)
    }

    fn stop_sink(&mut self) {
        if self.active.take().is_some() {
            self.sink.stop();
        }
    }

    fn schedule(&mut self, delay: Duration) -> u64 {
        let token = self.next_token();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::TimerFired(token));
        });
        token
    }

    fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(VoiceSession::is_connected)
    }

    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn publish_mode(&self) {
        let mode = self.phase.mode();
        self.mode_tx.send_if_modified(|current| {
            if *current == mode {
                false
            } else {
                debug!(mode = mode.label(), "playback mode changed");
                *current = mode;
                true
            }
        });
    }

    async fn shutdown(&mut self) {
        self.active = None;
        self.sink.stop();

        // Cancelled downloads remove their own partial files; finished ones
        // may still be waiting in the event queue.
        self.fetches.shutdown().await;
        while let Ok(event) = self.events.try_recv() {
            if let Event::Fetched {
                result: Ok(clip), ..
            } = event
            {
                Janitor::cleanup(clip).await;
            }
        }

        if let Phase::Announcing {
            stage: AnnounceStage::Playing { clip, .. },
            ..
        } = std::mem::replace(&mut self.phase, Phase::Idle)
        {
            Janitor::cleanup(clip).await;
        }
        self.queue.clear();
        self.publish_mode();
    }
}
