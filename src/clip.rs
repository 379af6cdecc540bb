//! Clip Import
//!
//! Pulls a time range of audio from an online video as a WAV file, for use
//! as a voice reference. Extraction shells out to `yt-dlp`; its progress
//! lines are forwarded to a shared [`ProgressTracker`] when the request
//! carries a task id.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, VoiceboxError};
use crate::state::ProgressTracker;

/// A range of a video to extract
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub url: String,
    /// Start time, seconds ("10") or clock form ("00:00:10")
    pub start: String,
    /// End time, same forms as `start`
    pub end: String,
    pub output_dir: PathBuf,
    /// Key under which progress is reported, if any
    pub task_id: Option<String>,
}

impl ClipRequest {
    pub fn new(
        url: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into().trim().to_string(),
            start: start.into().trim().to_string(),
            end: end.into().trim().to_string(),
            output_dir: output_dir.into(),
            task_id: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Check the request before anything is spawned
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(VoiceboxError::InvalidParameter {
                name: "url",
                reason: "URL is required".to_string(),
            });
        }
        check_timestamp("start", &self.start)?;
        check_timestamp("end", &self.end)
    }

    /// The `--download-sections` argument, e.g. `*10-20`
    pub fn section_arg(&self) -> String {
        format!("*{}-{}", self.start, self.end)
    }
}

fn check_timestamp(name: &'static str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(VoiceboxError::InvalidParameter {
            name,
            reason: format!("expected seconds or HH:MM:SS, got '{}'", value),
        })
    }
}

/// Something that can turn a [`ClipRequest`] into a local WAV file
pub trait ClipExtractor {
    /// Extract the clip, returning the path of the written WAV
    fn extract(&self, request: &ClipRequest) -> Result<PathBuf>;
}

/// Extracts clips with the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    yt_dlp_path: PathBuf,
    progress: Option<Arc<Mutex<ProgressTracker>>>,
}

impl YtDlpExtractor {
    pub fn new(yt_dlp_path: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            progress: None,
        }
    }

    /// Report download progress of requests with a task id to `tracker`
    pub fn with_progress(mut self, tracker: Arc<Mutex<ProgressTracker>>) -> Self {
        self.progress = Some(tracker);
        self
    }

    fn report(&self, task_id: Option<&str>, percent: Option<f32>) {
        let (Some(tracker), Some(task_id)) = (&self.progress, task_id) else {
            return;
        };
        // A poisoned tracker only loses progress reporting, never the download
        if let Ok(mut tracker) = tracker.lock() {
            match percent {
                Some(percent) => tracker.update(task_id, percent),
                None => {
                    tracker.remove(task_id);
                }
            }
        }
    }

    fn build_command(&self, request: &ClipRequest, output: &Path) -> Command {
        let mut command = Command::new(&self.yt_dlp_path);
        command
            .arg("-x")
            .arg("--audio-format")
            .arg("wav")
            .arg("--download-sections")
            .arg(request.section_arg())
            .arg("--force-overwrites")
            .arg("--newline")
            .arg("-o")
            .arg(output)
            .arg(&request.url);
        command
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl ClipExtractor for YtDlpExtractor {
    fn extract(&self, request: &ClipRequest) -> Result<PathBuf> {
        request.validate()?;

        std::fs::create_dir_all(&request.output_dir).map_err(|e| {
            VoiceboxError::DirectoryCreateError {
                path: request.output_dir.clone(),
                source: e,
            }
        })?;

        let output = request.output_dir.join(clip_file_name());
        let task_id = request.task_id.as_deref();
        let clip_error = |reason: String| VoiceboxError::ClipExtractionError {
            url: request.url.clone(),
            reason,
        };

        info!(
            "Extracting {} of {} to {}",
            request.section_arg(),
            request.url,
            output.display()
        );
        self.report(task_id, Some(0.0));

        let mut child = self
            .build_command(request, &output)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                self.report(task_id, None);
                clip_error(format!("failed to run {}: {}", self.yt_dlp_path.display(), e))
            })?;

        // Drain stderr on its own thread so a chatty process cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|line| line.ok()) {
                if let Some(percent) = parse_download_percent(&line) {
                    debug!("yt-dlp progress {:.1}%", percent);
                    self.report(task_id, Some(percent));
                }
            }
        }

        let status = child.wait().map_err(|e| {
            self.report(task_id, None);
            clip_error(format!("failed to wait for yt-dlp: {}", e))
        })?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            self.report(task_id, None);
            warn!("yt-dlp failed for {}: {}", request.url, stderr.trim());
            return Err(clip_error(format!(
                "yt-dlp exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        if !output.exists() {
            self.report(task_id, None);
            return Err(clip_error(format!(
                "expected output file not found at {}",
                output.display()
            )));
        }

        self.report(task_id, Some(100.0));
        info!("Clip saved to {}", output.display());
        Ok(output)
    }
}

/// `yt_<8 hex>.wav`
fn clip_file_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("yt_{}.wav", &id[..8])
}

/// Percent from a `[download]  42.3% of ...` progress line
pub fn parse_download_percent(line: &str) -> Option<f32> {
    line.trim_start()
        .strip_prefix("[download]")?
        .split_whitespace()
        .find_map(|token| token.strip_suffix('%'))
        .and_then(|number| number.parse::<f32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;
    use test_case::test_case;

    #[test_case("[download]  42.3% of ~ 3.10MiB at 1.2MiB/s ETA 00:02", Some(42.3) ; "progress line")]
    #[test_case("[download] 100% of 3.10MiB in 00:00:03", Some(100.0) ; "finished line")]
    #[test_case("[download] Destination: /tmp/yt_1234abcd.webm", None ; "destination line")]
    #[test_case("[ExtractAudio] Destination: out.wav", None ; "other stage")]
    #[test_case("", None ; "empty")]
    fn test_parse_download_percent(line: &str, expected: Option<f32>) {
        assert_eq!(parse_download_percent(line), expected);
    }

    #[test]
    fn test_clip_file_name_shape() {
        let name = clip_file_name();
        assert!(name.starts_with("yt_") && name.ends_with(".wav"));
        let id = &name[3..name.len() - 4];
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_trims_and_formats_section() {
        let request = ClipRequest::new(" https://example.com/v ", " 10 ", "00:00:20", "/tmp");
        assert_eq!(request.url, "https://example.com/v");
        assert_eq!(request.section_arg(), "*10-00:00:20");
        assert!(request.validate().is_ok());
    }

    #[test_case("", "10", "20" ; "missing url")]
    #[test_case("https://example.com/v", "", "20" ; "missing start")]
    #[test_case("https://example.com/v", "10", "soon" ; "bad end")]
    fn test_invalid_requests(url: &str, start: &str, end: &str) {
        let request = ClipRequest::new(url, start, end, "/tmp");
        let err = request.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_missing_executable_is_clip_error_and_clears_progress() {
        let temp = tempdir().unwrap();
        let tracker = Arc::new(Mutex::new(ProgressTracker::new(4, Duration::from_secs(60))));
        let extractor =
            YtDlpExtractor::new("/nonexistent/yt-dlp").with_progress(Arc::clone(&tracker));
        let request = ClipRequest::new("https://example.com/v", "1", "2", temp.path())
            .with_task_id("task-1");

        let err = extractor.extract(&request).unwrap_err();

        assert_eq!(err.error_code(), "CLIP_EXTRACTION_ERROR");
        assert_eq!(tracker.lock().unwrap().get("task-1"), None);
    }
}
