//! Default configuration constants for voicebridge.
//!
//! Shared constants used across components to keep tuned values in one place.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech processing and keeps FFT blocks small.
pub const SAMPLE_RATE: u32 = 16_000;

/// Interval between loudness samples in milliseconds.
///
/// 50ms gives twenty loudness readings per second, enough resolution for the
/// sliding-extension deadline without burning CPU on FFTs.
pub const TICK_INTERVAL_MS: u64 = 50;

/// FFT block size for the loudness metric.
///
/// Must be at least 128 samples; 256 at 16kHz covers 16ms of audio per block.
pub const FFT_BLOCK_SIZE: usize = 256;

/// Pre-roll buffer duration in milliseconds.
///
/// Audio retained while idle and prepended at speech onset so the first
/// syllables are not clipped.
pub const PRE_ROLL_MS: u32 = 300;

/// Silence tolerated inside an utterance before the segment is closed.
///
/// A loud sample pushes the end-of-speech deadline this far into the future,
/// so pauses shorter than this never split a sentence. Also bounds worst-case
/// segmentation latency after the speaker stops.
pub const SENTENCE_END_WAIT_MS: u32 = 500;

/// Duration of the guided silence-sampling calibration phase.
pub const SILENCE_PHASE_MS: u64 = 5_000;

/// Duration of the guided speech-sampling calibration phase.
pub const SPEECH_PHASE_MS: u64 = 5_000;

/// Fallback speech threshold used before any calibration has run.
pub const FALLBACK_THRESHOLD: f32 = 20.0;

/// Minimum audio payload in bytes for a segment to be worth transcribing.
///
/// Anything smaller is treated as silence or noise and rejected before any
/// provider call is made.
pub const MIN_SEGMENT_BYTES: usize = 1_000;

/// Minimum transcript length in characters to accept an STT result.
pub const MIN_TRANSCRIPT_CHARS: usize = 2;

/// End-to-end latency budget in milliseconds, reported for observability.
///
/// Never used to abort an in-flight pipeline call.
pub const LATENCY_BUDGET_MS: u64 = 1_500;

/// How long an outgoing call invitation rings before timing out.
pub const INVITE_TIMEOUT_MS: u64 = 30_000;

/// How long a rejected outgoing call is held before returning to idle.
pub const REJECTED_HOLD_MS: u64 = 3_000;
