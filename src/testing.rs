// In-memory collaborators
//
// Stand-ins for ffmpeg and the remote services, used to exercise the pipeline
// and the HTTP surface without external binaries or network access. Every fake
// is cheaply cloneable and clones share their call records.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::media::{MediaError, MediaTool};
use crate::speech::{SpeechError, SpeechRecognizer};
use crate::translate::{TranslationError, Translator};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Media tool that writes placeholder files instead of running ffmpeg
#[derive(Clone, Default)]
pub struct FakeMedia {
    duration: Option<Duration>,
    fail_extraction: bool,
    fail_mux: bool,
    calls: Arc<Mutex<Vec<&'static str>>>,
    videos: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeMedia {
    /// Probing fails unless a duration is set with [`FakeMedia::with_duration`]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn failing_extraction(mut self) -> Self {
        self.fail_extraction = true;
        self
    }

    pub fn failing_mux(mut self) -> Self {
        self.fail_mux = true;
        self
    }

    /// Names of the operations invoked so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    /// Videos audio was extracted from, in order
    pub fn videos(&self) -> Vec<PathBuf> {
        lock(&self.videos).clone()
    }

    fn record(&self, call: &'static str) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl MediaTool for FakeMedia {
    async fn extract_audio(&self, video: &Path, audio_out: &Path) -> Result<(), MediaError> {
        self.record("extract_audio");
        lock(&self.videos).push(video.to_path_buf());
        if self.fail_extraction {
            return Err(MediaError::Failed {
                program: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("{}: Invalid data found when processing input", video.display()),
            });
        }
        tokio::fs::write(audio_out, b"RIFF....WAVE")
            .await
            .map_err(|source| MediaError::Spawn {
                program: "ffmpeg".to_string(),
                source,
            })
    }

    async fn probe_duration(&self, _video: &Path) -> Result<Duration, MediaError> {
        self.record("probe_duration");
        self.duration
            .ok_or_else(|| MediaError::InvalidOutput("no duration in 'N/A'".to_string()))
    }

    async fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> Result<(), MediaError> {
        self.record("burn_subtitles");
        if self.fail_mux {
            return Err(MediaError::Failed {
                program: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Unable to open subtitles".to_string(),
            });
        }
        let to_io = |source| MediaError::Spawn {
            program: "ffmpeg".to_string(),
            source,
        };
        let mut muxed = tokio::fs::read(video).await.map_err(to_io)?;
        muxed.extend_from_slice(&tokio::fs::read(subtitles).await.map_err(to_io)?);
        tokio::fs::write(output, muxed).await.map_err(to_io)
    }
}

#[derive(Clone)]
enum SpeechReply {
    Text(String),
    Silent,
    Unreachable,
}

/// Speech recognizer with a fixed reply
#[derive(Clone)]
pub struct FakeSpeech {
    reply: SpeechReply,
    calls: Arc<Mutex<usize>>,
}

impl FakeSpeech {
    fn with_reply(reply: SpeechReply) -> Self {
        Self {
            reply,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::with_reply(SpeechReply::Text(text.into()))
    }

    /// Behaves like audio with no intelligible speech
    pub fn silent() -> Self {
        Self::with_reply(SpeechReply::Silent)
    }

    pub fn unreachable() -> Self {
        Self::with_reply(SpeechReply::Unreachable)
    }

    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl SpeechRecognizer for FakeSpeech {
    async fn recognize(&self, audio: &Path, _language: &str) -> Result<String, SpeechError> {
        *lock(&self.calls) += 1;
        tokio::fs::metadata(audio).await?;
        match &self.reply {
            SpeechReply::Text(text) => Ok(text.clone()),
            SpeechReply::Silent => Err(SpeechError::Unrecognized),
            SpeechReply::Unreachable => Err(SpeechError::Unreachable(
                "error sending request: connection refused".to_string(),
            )),
        }
    }
}

/// Translator with a fixed reply that records every request
#[derive(Clone)]
pub struct FakeTranslator {
    reply: Option<String>,
    requests: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl FakeTranslator {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            reply: Some(text.into()),
            requests: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            requests: Arc::default(),
        }
    }

    /// `(text, source, target)` of every request so far
    pub fn requests(&self) -> Vec<(String, String, String)> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        lock(&self.requests).push((text.to_string(), source.to_string(), target.to_string()));
        self.reply
            .clone()
            .ok_or_else(|| TranslationError::Request("connection refused".to_string()))
    }
}
