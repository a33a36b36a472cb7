//! Speech synthesis over HTTP.
//!
//! [`SpeechFetcher`] sends normalized text to the synthesis endpoint as a
//! query parameter and streams the audio body into a fresh scratch file.

use crate::config::SpeechConfig;
use crate::error::VoiceError;
use crate::normalize::normalize;
use crate::scratch::{PartialClip, ScratchDir, ScratchFile};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// Maximum text input size for a speech request (4 KiB). Keeps the query
/// string well under common URL length limits.
const MAX_SPEECH_INPUT_BYTES: usize = 4 * 1024;

/// Produces an announcement clip on disk for a piece of text.
#[async_trait]
pub trait SpeechSource: Send + Sync {
    async fn fetch(&self, text: &str) -> Result<ScratchFile, VoiceError>;
}

/// Fetches synthesized speech over HTTP and stages it in the scratch
/// directory.
#[derive(Debug, Clone)]
pub struct SpeechFetcher {
    client: reqwest::Client,
    endpoint: Url,
    text_param: String,
    scratch: ScratchDir,
}

impl SpeechFetcher {
    pub fn new(config: &SpeechConfig) -> Result<Self, VoiceError> {
        config.validate()?;
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| VoiceError::Config(format!("invalid speech endpoint: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            text_param: config.text_param.clone(),
            scratch: ScratchDir::new(&config.scratch_dir, &config.extension),
        })
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Builds the request URL for already-normalized text.
    pub fn request_url(&self, text: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(&self.text_param, text);
        url
    }

    async fn download(&self, url: Url, path: &Path) -> Result<(), VoiceError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(VoiceError::network)?
            .error_for_status()
            .map_err(VoiceError::network)?;

        let write_err = |source: std::io::Error| VoiceError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(path).await.map_err(write_err)?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await.map_err(VoiceError::network)? {
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len();
        }
        file.flush().await.map_err(write_err)?;

        debug!(path = %path.display(), bytes = written, "speech clip written");
        Ok(())
    }
}

#[async_trait]
impl SpeechSource for SpeechFetcher {
    async fn fetch(&self, text: &str) -> Result<ScratchFile, VoiceError> {
        let text = normalize(text);
        if text.len() > MAX_SPEECH_INPUT_BYTES {
            return Err(VoiceError::InvalidInput(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_SPEECH_INPUT_BYTES
            )));
        }

        self.scratch.ensure().await?;
        // Removed on error or cancellation; a partial clip never reaches playback.
        let clip = PartialClip::new(self.scratch.allocate());
        info!(text = %text, path = %clip.path().display(), "fetching speech");

        self.download(self.request_url(&text), clip.path()).await?;
        Ok(clip.complete())
    }
}
