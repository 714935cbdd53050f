// Media processing through ffmpeg and ffprobe
//
// The pipeline only talks to the MediaTool trait; FfmpegTool is the
// production implementation shelling out to the binaries.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use thiserror::Error;
use tokio::process::Command;

use crate::config::MediaConfig;

/// Number of trailing stderr characters kept in error messages
const STDERR_TAIL_CHARS: usize = 600;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {seconds} seconds")]
    Timeout { program: String, seconds: u64 },

    #[error("unexpected output: {0}")]
    InvalidOutput(String),
}

/// External media tool used by the pipeline
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Down-mix the audio track of `video` to mono 16kHz PCM at `audio_out`
    async fn extract_audio(&self, video: &Path, audio_out: &Path) -> Result<(), MediaError>;

    /// Container duration of `video`
    async fn probe_duration(&self, video: &Path) -> Result<Duration, MediaError>;

    /// Burn `subtitles` into `video`, writing the re-encoded result to `output`
    async fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> Result<(), MediaError>;
}

/// MediaTool backed by the ffmpeg and ffprobe executables
pub struct FfmpegTool {
    config: MediaConfig,
}

impl FfmpegTool {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Arguments for the audio extraction call
    pub fn extract_audio_args(video: &Path, audio_out: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-i".into(),
            video.display().to_string(),
            "-vn".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ar".into(),
            "16000".into(),
            "-ac".into(),
            "1".into(),
            audio_out.display().to_string(),
        ]
    }

    /// Arguments for the subtitle burn-in call
    pub fn burn_subtitles_args(&self, video: &Path, subtitles: &Path, output: &Path) -> Vec<String> {
        let filter = format!(
            "subtitles={}:force_style='{}'",
            escape_filter_path(&subtitles.display().to_string()),
            self.config.style.force_style()
        );
        vec![
            "-y".into(),
            "-i".into(),
            video.display().to_string(),
            "-vf".into(),
            filter,
            "-c:v".into(),
            self.config.encoder.codec.clone(),
            "-crf".into(),
            self.config.encoder.crf.to_string(),
            "-preset".into(),
            self.config.encoder.preset.clone(),
            "-c:a".into(),
            "aac".into(),
            output.display().to_string(),
        ]
    }

    pub fn probe_duration_args(video: &Path) -> Vec<String> {
        vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            video.display().to_string(),
        ]
    }

    /// Run a program to completion, bounded by the configured timeout
    async fn run(&self, program: &str, args: &[String]) -> Result<Output, MediaError> {
        debug!("Executing {} {:?}", program, args);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let seconds = self.config.timeout_seconds;
        let output = tokio::time::timeout(Duration::from_secs(seconds), child.wait_with_output())
            .await
            .map_err(|_| MediaError::Timeout {
                program: program.to_string(),
                seconds,
            })?
            .map_err(|source| MediaError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn extract_audio(&self, video: &Path, audio_out: &Path) -> Result<(), MediaError> {
        info!(
            "Extracting audio from {} to {}",
            video.display(),
            audio_out.display()
        );
        self.run(
            &self.config.ffmpeg_path,
            &Self::extract_audio_args(video, audio_out),
        )
        .await?;
        Ok(())
    }

    async fn probe_duration(&self, video: &Path) -> Result<Duration, MediaError> {
        let output = self
            .run(&self.config.ffprobe_path, &Self::probe_duration_args(video))
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_duration(&stdout)
            .ok_or_else(|| MediaError::InvalidOutput(format!("no duration in '{}'", stdout.trim())))
    }

    async fn burn_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> Result<(), MediaError> {
        info!(
            "Burning subtitles from {} into {} -> {}",
            subtitles.display(),
            video.display(),
            output.display()
        );
        self.run(
            &self.config.ffmpeg_path,
            &self.burn_subtitles_args(video, subtitles, output),
        )
        .await?;
        Ok(())
    }
}

/// Parse ffprobe's `format=duration` output (seconds, or `N/A`)
pub fn parse_probe_duration(stdout: &str) -> Option<Duration> {
    let seconds: f64 = stdout.lines().next()?.trim().parse().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds))
}

/// Escape a path for use as a filter option value inside a `-vf` filtergraph
///
/// ffmpeg unescapes the text twice: once when splitting the graph, once when
/// parsing the filter options.
pub fn escape_filter_path(path: &str) -> String {
    let option_value = escape_chars(path, &['\\', '\'', ':']);
    escape_chars(&option_value, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        text.to_string()
    } else {
        text.chars().skip(count - STDERR_TAIL_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(
            parse_probe_duration("10.500000\n"),
            Some(Duration::from_millis(10_500))
        );
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration(""), None);
        assert_eq!(parse_probe_duration("0.000000"), None);
        assert_eq!(parse_probe_duration("-1"), None);
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path("/tmp/job/subtitles.srt"),
            "/tmp/job/subtitles.srt"
        );
        assert_eq!(
            escape_filter_path("/tmp/a:b/subtitles.srt"),
            r"/tmp/a\\:b/subtitles.srt"
        );
        assert_eq!(
            escape_filter_path("C:\\tmp\\it's,[a].srt"),
            r"C\\:\\\\tmp\\\\it\\\'s\,\[a\].srt"
        );
    }

    #[test]
    fn test_extract_audio_args_resample_to_mono_16k() {
        let args = FfmpegTool::extract_audio_args(
            &PathBuf::from("/s/input.mp4"),
            &PathBuf::from("/s/audio.wav"),
        );
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -i /s/input.mp4"));
        assert!(joined.contains("-acodec pcm_s16le -ar 16000 -ac 1"));
        assert!(joined.ends_with("/s/audio.wav"));
    }

    #[test]
    fn test_burn_subtitles_args_use_style_and_encoder() {
        let tool = FfmpegTool::new(MediaConfig::default());
        let args = tool.burn_subtitles_args(
            &PathBuf::from("/s/input.mp4"),
            &PathBuf::from("/s/subtitles.srt"),
            &PathBuf::from("/s/output.mp4"),
        );
        assert!(args.contains(
            &"subtitles=/s/subtitles.srt:force_style='FontName=Noto Sans Arabic,FontSize=24,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000'"
                .to_string()
        ));
        let joined = args.join(" ");
        assert!(joined.contains("-c:v libx264 -crf 23 -preset medium"));
        assert!(joined.ends_with("/s/output.mp4"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let tool = FfmpegTool::new(MediaConfig {
            ffmpeg_path: "/nonexistent/ffmpeg-binary".to_string(),
            ..MediaConfig::default()
        });
        let err = tool
            .extract_audio(&PathBuf::from("in.mp4"), &PathBuf::from("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_process_times_out() {
        let tool = FfmpegTool::new(MediaConfig {
            timeout_seconds: 1,
            ..MediaConfig::default()
        });
        let start = std::time::Instant::now();
        let err = tool.run("sleep", &["30".to_string()]).await.unwrap_err();
        assert!(matches!(err, MediaError::Timeout { seconds: 1, .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_a_failure() {
        let tool = FfmpegTool::new(MediaConfig {
            ffmpeg_path: "false".to_string(),
            ..MediaConfig::default()
        });
        let err = tool
            .extract_audio(&PathBuf::from("in.mp4"), &PathBuf::from("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Failed { ref program, .. } if program == "false"));
    }

    #[test]
    fn test_stderr_tail_keeps_end() {
        let long = "x".repeat(1000) + "END";
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.chars().count(), STDERR_TAIL_CHARS);
        assert!(tail.ends_with("END"));
    }
}
