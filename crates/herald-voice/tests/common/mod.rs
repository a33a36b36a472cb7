//! Test doubles shared by the herald-voice integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use herald_types::{ChannelRef, ConnectionState, TrackKind};
use herald_voice::{
    playback_channel, AudioSink, IdleNotifier, PlaybackConfig, PlaybackHandle, ScratchFile,
    SpeechSource, TimingConfig, Track, VoiceConnection, VoiceError, VoiceGateway, VoiceSession,
};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, watch, Semaphore};

pub const AMBIENT_PATH: &str = "ambient.mp3";
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub fn channel() -> ChannelRef {
    ChannelRef::new(100, 200)
}

pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        ambient_loop_delay_ms: 20,
        announcement_settle_delay_ms: 30,
        reconnect_delay_ms: 50,
        startup_delay_ms: 0,
    }
}

pub fn playback() -> PlaybackConfig {
    PlaybackConfig {
        ambient_track: PathBuf::from(AMBIENT_PATH),
        ambient_volume: 0.5,
        announcement_volume: 1.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Play(Track),
    Stop,
}

/// Sink that records calls and only finishes tracks when told to.
pub struct RecordingSink {
    calls_tx: mpsc::UnboundedSender<SinkCall>,
    log: Mutex<Vec<SinkCall>>,
    current: Mutex<Option<IdleNotifier>>,
    overlaps: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SinkCall>) {
        let (calls_tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            calls_tx,
            log: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            overlaps: AtomicUsize::new(0),
        });
        (sink, rx)
    }

    /// Ends the current track as if it reached end of stream.
    pub fn finish(&self) -> bool {
        match self.current.lock().unwrap().take() {
            Some(notifier) => {
                notifier.notify();
                true
            }
            None => false,
        }
    }

    /// Number of times `play` was called while another track still owned
    /// the sink.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, call: SinkCall) {
        self.log.lock().unwrap().push(call.clone());
        let _ = self.calls_tx.send(call);
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, track: Track) -> Result<PlaybackHandle, VoiceError> {
        let (notifier, handle) = playback_channel();
        {
            let mut current = self.current.lock().unwrap();
            if current.is_some() {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            *current = Some(notifier);
        }
        self.record(SinkCall::Play(track));
        Ok(handle)
    }

    fn stop(&self) {
        // Dropping the notifier releases the handle.
        self.current.lock().unwrap().take();
        self.record(SinkCall::Stop);
    }
}

pub async fn next_call(rx: &mut mpsc::UnboundedReceiver<SinkCall>) -> SinkCall {
    tokio::time::timeout(CALL_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a sink call")
        .expect("sink call channel closed")
}

/// Skips `Stop` calls and returns the next played track.
pub async fn next_play(rx: &mut mpsc::UnboundedReceiver<SinkCall>) -> Track {
    loop {
        if let SinkCall::Play(track) = next_call(rx).await {
            return track;
        }
    }
}

/// Asserts that no `Play` arrives within `window`.
pub async fn assert_no_play(rx: &mut mpsc::UnboundedReceiver<SinkCall>, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Err(_) => return,
            Ok(Some(SinkCall::Stop)) => continue,
            Ok(Some(SinkCall::Play(track))) => panic!("unexpected play: {:?}", track),
            Ok(None) => return,
        }
    }
}

pub fn assert_ambient(track: &Track) {
    assert_eq!(track.kind, TrackKind::Ambient, "expected ambient, got {:?}", track);
    assert_eq!(track.path, Path::new(AMBIENT_PATH));
}

/// Reads back the text a [`FakeSpeech`] clip was generated for.
pub fn clip_text(track: &Track) -> String {
    assert_eq!(track.kind, TrackKind::Announcement, "expected announcement, got {:?}", track);
    std::fs::read_to_string(&track.path).expect("announcement clip should exist while playing")
}

/// Speech source that writes the requested text into a clip file.
pub struct FakeSpeech {
    dir: PathBuf,
    counter: AtomicU64,
    failing: Mutex<HashSet<String>>,
    gate: Option<Arc<Semaphore>>,
    requests: Mutex<Vec<String>>,
    created: Mutex<Vec<PathBuf>>,
}

impl FakeSpeech {
    pub fn new(dir: &Path) -> Arc<Self> {
        Arc::new(Self::build(dir, None))
    }

    /// Every fetch waits for a permit from [`FakeSpeech::release`].
    pub fn gated(dir: &Path) -> Arc<Self> {
        Arc::new(Self::build(dir, Some(Arc::new(Semaphore::new(0)))))
    }

    fn build(dir: &Path, gate: Option<Arc<Semaphore>>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            counter: AtomicU64::new(0),
            failing: Mutex::new(HashSet::new()),
            gate,
            requests: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<PathBuf> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSource for FakeSpeech {
    async fn fetch(&self, text: &str) -> Result<ScratchFile, VoiceError> {
        self.requests.lock().unwrap().push(text.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.failing.lock().unwrap().contains(text) {
            return Err(VoiceError::Network("simulated outage".to_string()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("clip_{}.mp3", n));
        std::fs::write(&path, text).map_err(|source| VoiceError::Write {
            path: path.clone(),
            source,
        })?;
        self.created.lock().unwrap().push(path.clone());
        Ok(ScratchFile::adopt(path))
    }
}

/// Connection whose state the test drives directly.
pub struct TestConnection {
    state: watch::Sender<ConnectionState>,
}

impl TestConnection {
    pub fn connected() -> Arc<Self> {
        Self::starting_in(ConnectionState::Connected)
    }

    /// A connection still in its handshake.
    pub fn connecting() -> Arc<Self> {
        Self::starting_in(ConnectionState::Connecting)
    }

    fn starting_in(state: ConnectionState) -> Arc<Self> {
        let (state, _) = watch::channel(state);
        Arc::new(Self { state })
    }

    pub fn complete_handshake(&self) {
        self.state.send_replace(ConnectionState::Connected);
    }

    pub fn disconnect(&self) {
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

impl VoiceConnection for TestConnection {
    fn subscribe(&self, _sink: Arc<dyn AudioSink>) {}

    fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

/// Gateway whose joins return connections that are still handshaking.
#[derive(Default)]
pub struct HandshakeGateway {
    joined: Mutex<Vec<Arc<TestConnection>>>,
}

impl HandshakeGateway {
    pub fn join_count(&self) -> usize {
        self.joined.lock().unwrap().len()
    }

    pub fn latest(&self) -> Arc<TestConnection> {
        self.joined.lock().unwrap().last().cloned().expect("no join yet")
    }
}

#[async_trait]
impl VoiceGateway for HandshakeGateway {
    async fn join(&self, _channel: ChannelRef) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        let connection = TestConnection::connecting();
        self.joined.lock().unwrap().push(connection.clone());
        Ok(connection)
    }
}

pub fn session(generation: u64) -> (VoiceSession, Arc<TestConnection>) {
    let connection = TestConnection::connected();
    (
        VoiceSession::new(generation, channel(), connection.clone()),
        connection,
    )
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + CALL_TIMEOUT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Number of entries in `dir`, zero if it does not exist.
pub fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|read| read.count()).unwrap_or(0)
}

/// A speech endpoint that announces a large body, sends a few bytes of it,
/// then never sends the rest.
pub async fn stalled_speech_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\npartial")
                    .await;
                // Keep the connection open with the body unfinished.
                std::future::pending::<()>().await;
                drop(socket);
            });
        }
    });
    addr
}
