// Subtitle model and SRT rendering
//
// A track is an ordered list of cues. The pipeline only ever builds a
// single-cue track covering the whole video, but rendering works for any number.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use log::info;

/// Point in time within the video, millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubtitleTimestamp {
    millis: u64,
}

impl SubtitleTimestamp {
    pub const ZERO: SubtitleTimestamp = SubtitleTimestamp { millis: 0 };

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Negative and NaN inputs clamp to zero
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds.is_nan() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self {
            millis: (seconds * 1000.0).round() as u64,
        }
    }
}

impl From<Duration> for SubtitleTimestamp {
    fn from(duration: Duration) -> Self {
        Self::from_millis(duration.as_millis() as u64)
    }
}

/// SRT format: HH:MM:SS,mmm
impl fmt::Display for SubtitleTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.millis / 3_600_000;
        let minutes = (self.millis % 3_600_000) / 60_000;
        let secs = (self.millis % 60_000) / 1_000;
        let millis = self.millis % 1_000;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

/// A single subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub start: SubtitleTimestamp,
    pub end: SubtitleTimestamp,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtitleTrack {
    cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// One cue from the start of the video up to `end`
    pub fn single<S: Into<String>>(text: S, end: SubtitleTimestamp) -> Self {
        let mut track = Self::new();
        track.push(SubtitleCue {
            start: SubtitleTimestamp::ZERO,
            end,
            text: text.into(),
        });
        track
    }

    pub fn push(&mut self, cue: SubtitleCue) {
        self.cues.push(cue);
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Render as SRT
    ///
    /// Blank lines inside cue text are dropped, SRT uses them to separate cues.
    pub fn to_srt(&self) -> String {
        let mut srt_content = String::new();
        for (index, cue) in self.cues.iter().enumerate() {
            if index > 0 {
                srt_content.push('\n');
            }
            srt_content.push_str(&format!(
                "{}\n{} --> {}\n{}\n",
                index + 1,
                cue.start,
                cue.end,
                srt_text(&cue.text)
            ));
        }
        srt_content
    }

    /// Write the SRT rendering as UTF-8
    pub async fn write_srt(&self, output_path: &Path) -> std::io::Result<()> {
        tokio::fs::write(output_path, self.to_srt()).await?;
        info!(
            "Wrote {} subtitle cue(s) to {}",
            self.len(),
            output_path.display()
        );
        Ok(())
    }
}

fn srt_text(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
