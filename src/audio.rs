use std::time::Duration;

use crate::error::ValidationError;

/// Largest upload accepted for transcription.
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

const ALLOWED_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/wav",
    "audio/mp4",
    "audio/webm",
    "audio/ogg",
    "audio/x-m4a",
];

const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "webm", "ogg"];

/// Name used for microphone captures sent to the transcriber.
pub const RECORDING_FILENAME: &str = "recording.wav";

/// Where the active audio payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioSource {
    #[default]
    None,
    Recording,
    Upload,
}

/// Encoded audio ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    pub source: AudioSource,
}

impl AudioPayload {
    /// A WAV-encoded microphone capture.
    pub fn recorded(wav: Vec<u8>) -> Self {
        Self {
            bytes: wav,
            filename: RECORDING_FILENAME.to_string(),
            mime_type: "audio/wav".to_string(),
            source: AudioSource::Recording,
        }
    }

    /// A user-selected file. Falls back to an extension-based MIME type
    /// when the platform did not report one.
    pub fn uploaded(filename: &str, mime_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let mime_type = mime_type
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| mime_for_filename(filename).to_string());
        Self {
            bytes,
            filename: filename.to_string(),
            mime_type,
            source: AudioSource::Upload,
        }
    }
}

/// Check an upload's size and type. Either a known MIME type or a known
/// filename extension is enough.
pub fn validate_upload(
    filename: &str,
    mime_type: Option<&str>,
    size: u64,
) -> Result<(), ValidationError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge { size });
    }

    let mime_ok = mime_type.is_some_and(|m| ALLOWED_MIME_TYPES.contains(&m));
    let ext_ok = extension(filename)
        .is_some_and(|ext| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(&ext)));

    if mime_ok || ext_ok {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedFileType)
    }
}

fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn mime_for_filename(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/x-m4a",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// `MM:SS` elapsed-time display. Minutes are not capped at 59.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
