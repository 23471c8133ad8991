//! Error types for voicebridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceBridgeError {
    // Audio capture errors
    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Calibration errors
    #[error("Calibration failed: {message}")]
    Calibration { message: String },

    #[error("Calibration profile not found for key {key}")]
    ProfileNotFound { key: String },

    // Provider errors, one per pipeline stage
    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Translation failed: {message}")]
    Translation { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // Profile storage errors
    #[error("Calibration storage error: {message}")]
    Storage { message: String },

    #[error("Profile serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoiceBridgeError>;
