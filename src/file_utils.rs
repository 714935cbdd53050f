// File utilities for the Video Subtitle API
//
// Per-request scratch directories, upload filename handling and the fixed names
// of the intermediate artifacts a pipeline run produces.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;
use uuid::Uuid;

pub const AUDIO_FILENAME: &str = "audio.wav";
pub const SUBTITLE_FILENAME: &str = "subtitles.srt";
pub const OUTPUT_FILENAME: &str = "output.mp4";

/// Scratch directory owned by a single request
///
/// The directory and everything in it is removed when the value is dropped,
/// whichever way the request ends.
#[derive(Debug)]
pub struct ScratchDir {
    id: String,
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh scratch directory under `base_dir`
    ///
    /// # Errors
    ///
    /// Returns an IO error if the base directory or the scratch directory cannot be created
    pub fn create(base_dir: &str) -> io::Result<Self> {
        std::fs::create_dir_all(base_dir)?;
        let id = Uuid::new_v4().to_string();
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", id))
            .tempdir_in(base_dir)?;
        debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { id, dir })
    }

    /// Request id this directory belongs to
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the stored upload, keeping its sanitized name
    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(format!("input_{}", filename))
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.path().join(AUDIO_FILENAME)
    }

    pub fn subtitle_path(&self) -> PathBuf {
        self.dir.path().join(SUBTITLE_FILENAME)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_FILENAME)
    }

    /// Remove the directory now, logging instead of failing
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to clean up folder {}: {}", path.display(), e);
        } else {
            debug!("Cleaned up folder: {}", path.display());
        }
    }
}

/// Reduce an uploaded filename to a safe basename
///
/// Directory components are dropped and every character outside
/// `[A-Za-z0-9._-]` becomes `_`. Leading dots are stripped so the result is
/// never hidden or a parent reference.
pub fn sanitize_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Lower-cased extension of a filename, without the dot
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, extension) = filename.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\videos\\my clip.MOV"), "my_clip.MOV");
        assert_eq!(sanitize_filename(".hidden.mkv"), "hidden.mkv");
        assert_eq!(sanitize_filename("vidéo.mp4"), "vid_o.mp4");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("clip.MP4").as_deref(), Some("mp4"));
        assert_eq!(file_extension("archive.tar.webm").as_deref(), Some("webm"));
        assert_eq!(file_extension("noextension"), None);
        assert_eq!(file_extension("trailingdot."), None);
        assert_eq!(file_extension(".mp4"), None);
    }

    #[test]
    fn test_scratch_dirs_are_isolated_and_removed() {
        let root = tempfile::tempdir().expect("tempdir");
        let base = root.path().to_str().expect("utf8 path");

        let first = ScratchDir::create(base).expect("first scratch");
        let second = ScratchDir::create(base).expect("second scratch");
        assert_ne!(first.path(), second.path());
        assert_ne!(first.audio_path(), second.audio_path());
        assert!(first.path().starts_with(root.path()));

        let first_path = first.path().to_path_buf();
        std::fs::write(first.audio_path(), b"wav").expect("write");
        first.cleanup();
        assert!(!first_path.exists());

        let second_path = second.path().to_path_buf();
        drop(second);
        assert!(!second_path.exists());
    }
}
