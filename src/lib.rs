//! Real-time voice translation core.
//!
//! Continuous audio is analyzed for loudness, segmented into utterances with
//! sliding-extension hysteresis, and run through a speech-to-text,
//! translation, and optional text-to-speech pipeline. A guided calibration
//! flow derives the per-speaker detection threshold, and a signaling state
//! machine manages the call between the two endpoints.
//!
//! The [`engine::TranslationEngine`] ties the pieces together; each module
//! is also usable on its own.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod calibration;
pub mod call;
pub mod clock;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod pipeline;

pub use engine::{EngineHandle, TranslationEngine};
pub use error::{Result, VoiceBridgeError};
