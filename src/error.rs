use thiserror::Error;

/// Input rejected before any device or network work happens.
/// The display strings are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a question")]
    EmptyQuestion,

    #[error("Please select evaluation rubrics")]
    EmptySelection,

    #[error("Please enter evaluation rubrics")]
    EmptyManualRubrics,

    #[error("Please record audio or upload a file first")]
    MissingTranscript,

    #[error("File size too large. Maximum 25MB allowed.")]
    FileTooLarge { size: u64 },

    #[error("Invalid file type. Please upload an audio file (MP3, WAV, M4A, WebM, OGG).")]
    UnsupportedFileType,

    #[error("Unknown proficiency level index {0}")]
    UnknownLevel(usize),

    #[error("Select a level first")]
    NoLevelSelected,

    #[error("{0} has no description at the selected level")]
    CategoryUnavailable(String),
}

/// Microphone capture failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("No input device found")]
    NoInputDevice,

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Failed to encode recording: {0}")]
    Encode(String),

    #[error("No audio captured")]
    NoAudio,
}

/// Failures talking to the evaluation backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Non-success status. Carries the raw response body, or the status
    /// line when the body was empty.
    #[error("{0}")]
    Backend(String),

    #[error("Invalid JSON from server: {body}")]
    MalformedResponse { body: String },

    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Could not build HTTP client: {0}")]
    ClientBuild(String),
}

/// State-machine misuse in the recording/evaluation session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Another request is still in progress")]
    Busy,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("No audio to transcribe")]
    NoAudio,

    #[error("Microphone unavailable")]
    MicrophoneUnavailable,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
