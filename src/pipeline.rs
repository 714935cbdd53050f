//! Video translation pipeline
//!
//! Runs the five stages strictly in order for one request:
//! extract audio, transcribe, translate, build the subtitle file, burn it in.
//! The first failing stage ends the run with a classified [`PipelineError`];
//! nothing produced before that point is returned.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::error::{ErrorKind, PipelineError};
use crate::file_utils::ScratchDir;
use crate::media::MediaTool;
use crate::metrics::Metrics;
use crate::speech::{SpeechError, SpeechRecognizer};
use crate::subtitle::{SubtitleTimestamp, SubtitleTrack};
use crate::translate::Translator;

/// Operation that can fail while serving a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Store,
    ExtractAudio,
    Transcribe,
    Translate,
    BuildSubtitle,
    Mux,
    Respond,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Store => "store",
            Stage::ExtractAudio => "extract_audio",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::BuildSubtitle => "build_subtitle",
            Stage::Mux => "mux",
            Stage::Respond => "respond",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Stored,
    AudioExtracted,
    Transcribed,
    Translated,
    SubtitleBuilt,
    Muxed,
    Responded,
    Failed(ErrorKind),
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Responded | RequestState::Failed(_))
    }

    /// The state reached when `self` completes successfully
    fn successor(&self) -> Option<RequestState> {
        match self {
            RequestState::Received => Some(RequestState::Stored),
            RequestState::Stored => Some(RequestState::AudioExtracted),
            RequestState::AudioExtracted => Some(RequestState::Transcribed),
            RequestState::Transcribed => Some(RequestState::Translated),
            RequestState::Translated => Some(RequestState::SubtitleBuilt),
            RequestState::SubtitleBuilt => Some(RequestState::Muxed),
            RequestState::Muxed => Some(RequestState::Responded),
            RequestState::Responded | RequestState::Failed(_) => None,
        }
    }
}

/// Lifecycle of a single request, only moves forward
#[derive(Debug)]
pub struct RequestLifecycle {
    id: String,
    state: RequestState,
}

impl RequestLifecycle {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            state: RequestState::Received,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Move to the next state; does nothing once terminal
    pub fn advance(&mut self) {
        if let Some(next) = self.state.successor() {
            debug!("[{}] {:?} -> {:?}", self.id, self.state, next);
            self.state = next;
        }
    }

    /// Enter `Failed(kind)`; does nothing once terminal
    pub fn fail(&mut self, kind: ErrorKind) {
        if !self.state.is_terminal() {
            debug!("[{}] {:?} -> Failed({})", self.id, self.state, kind);
            self.state = RequestState::Failed(kind);
        }
    }
}

/// Artifacts of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub video: PathBuf,
    pub transcript: String,
    pub translation: String,
    pub subtitle_end: SubtitleTimestamp,
}

/// The collaborators and settings a run needs
#[derive(Clone)]
pub struct Pipeline {
    media: Arc<dyn MediaTool>,
    speech: Arc<dyn SpeechRecognizer>,
    translator: Arc<dyn Translator>,
    target_language: String,
    fallback_duration: Duration,
    metrics: Metrics,
}

impl Pipeline {
    pub fn new(
        media: Arc<dyn MediaTool>,
        speech: Arc<dyn SpeechRecognizer>,
        translator: Arc<dyn Translator>,
        target_language: String,
        fallback_duration: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            media,
            speech,
            translator,
            target_language,
            fallback_duration,
            metrics,
        }
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Run every stage on the stored upload `video`
    ///
    /// `lifecycle` must be in the `Stored` state; it ends in `Muxed` on success
    /// and `Failed(kind)` otherwise.
    pub async fn run(
        &self,
        lifecycle: &mut RequestLifecycle,
        scratch: &ScratchDir,
        video: &Path,
        source_language: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();
        let result = self
            .run_stages(lifecycle, scratch, video, source_language)
            .await;

        let outcome = match &result {
            Ok(_) => {
                info!(
                    "[{}] Pipeline completed in {:.2}s",
                    lifecycle.id(),
                    start.elapsed().as_secs_f64()
                );
                "success"
            }
            Err(e) => {
                lifecycle.fail(e.kind);
                if e.kind.is_client_error() {
                    warn!("[{}] {} failed ({}): {}", lifecycle.id(), e.stage, e.kind, e);
                } else {
                    error!("[{}] {} failed ({}): {}", lifecycle.id(), e.stage, e.kind, e);
                }
                e.kind.as_str()
            }
        };
        self.metrics
            .record_pipeline_completed(source_language, start.elapsed().as_secs_f64(), outcome)
            .await;

        result
    }

    async fn run_stages(
        &self,
        lifecycle: &mut RequestLifecycle,
        scratch: &ScratchDir,
        video: &Path,
        source_language: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        let audio = scratch.audio_path();
        self.timed(Stage::ExtractAudio, self.media.extract_audio(video, &audio))
            .await
            .map_err(|e| {
                PipelineError::new(
                    ErrorKind::AudioExtractionFailed,
                    Stage::ExtractAudio,
                    format!("Audio extraction failed: {}", e),
                )
            })?;
        lifecycle.advance();

        let transcript = self
            .timed(
                Stage::Transcribe,
                self.speech.recognize(&audio, source_language),
            )
            .await
            .map_err(transcription_error)?;
        info!(
            "[{}] Transcribed {} characters",
            lifecycle.id(),
            transcript.chars().count()
        );
        debug!("[{}] Transcript: {:?}", lifecycle.id(), transcript);
        lifecycle.advance();

        let translation = self
            .timed(
                Stage::Translate,
                self.translator
                    .translate(&transcript, source_language, &self.target_language),
            )
            .await
            .map_err(|e| {
                PipelineError::new(
                    ErrorKind::TranslationFailed,
                    Stage::Translate,
                    format!("Translation failed: {}", e),
                )
            })?;
        lifecycle.advance();

        let subtitle_end = self.subtitle_end(lifecycle.id(), video).await;
        let subtitles = scratch.subtitle_path();
        self.timed(
            Stage::BuildSubtitle,
            SubtitleTrack::single(translation.clone(), subtitle_end).write_srt(&subtitles),
        )
        .await
        .map_err(|e| {
            PipelineError::new(
                ErrorKind::Unexpected,
                Stage::BuildSubtitle,
                format!("Failed to write subtitle file: {}", e),
            )
        })?;
        lifecycle.advance();

        let output = scratch.output_path();
        self.timed(
            Stage::Mux,
            self.media.burn_subtitles(video, &subtitles, &output),
        )
        .await
        .map_err(|e| {
            PipelineError::new(
                ErrorKind::MuxFailed,
                Stage::Mux,
                format!("Subtitle muxing failed: {}", e),
            )
        })?;
        ensure_non_empty(&output).await?;
        lifecycle.advance();

        Ok(PipelineOutput {
            video: output,
            transcript,
            translation,
            subtitle_end,
        })
    }

    /// End of the single cue: the probed video duration, or the fallback
    async fn subtitle_end(&self, request_id: &str, video: &Path) -> SubtitleTimestamp {
        match self.media.probe_duration(video).await {
            Ok(duration) => SubtitleTimestamp::from(duration),
            Err(e) => {
                // The cue may end far from the real video end in this case
                warn!(
                    "[{}] Could not probe video duration ({}), using fallback of {}s",
                    request_id,
                    e,
                    self.fallback_duration.as_secs()
                );
                SubtitleTimestamp::from(self.fallback_duration)
            }
        }
    }

    async fn timed<T, E, F>(&self, stage: Stage, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = future.await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        self.metrics
            .record_stage(stage.as_str(), start.elapsed().as_secs_f64(), outcome)
            .await;
        result
    }
}

fn transcription_error(error: SpeechError) -> PipelineError {
    match error {
        SpeechError::Unrecognized => PipelineError::new(
            ErrorKind::UnrecognizedSpeech,
            Stage::Transcribe,
            "Could not understand the audio",
        ),
        SpeechError::Unreachable(detail) => PipelineError::new(
            ErrorKind::ServiceUnreachable,
            Stage::Transcribe,
            format!("Speech recognition service error: {}", detail),
        ),
        SpeechError::Audio(e) => PipelineError::new(
            ErrorKind::Unexpected,
            Stage::Transcribe,
            format!("Failed to read extracted audio: {}", e),
        ),
    }
}

async fn ensure_non_empty(output: &Path) -> Result<(), PipelineError> {
    match tokio::fs::metadata(output).await {
        Ok(metadata) if metadata.len() > 0 => Ok(()),
        Ok(_) => Err(PipelineError::new(
            ErrorKind::MuxFailed,
            Stage::Mux,
            "Subtitle muxing produced an empty video",
        )),
        Err(e) => Err(PipelineError::new(
            ErrorKind::MuxFailed,
            Stage::Mux,
            format!("Subtitle muxing produced no video: {}", e),
        )),
    }
}
