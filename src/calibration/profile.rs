//! Persisted calibration results.

use serde::{Deserialize, Serialize};

use crate::defaults::{FALLBACK_THRESHOLD, SENTENCE_END_WAIT_MS};

fn default_sentence_end_wait_ms() -> u32 {
    SENTENCE_END_WAIT_MS
}

/// A speaker's calibrated loudness profile.
///
/// Loudness values are on the analyzer's 0-255 scale. The threshold is
/// stored pre-computed so readers never re-derive it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Arithmetic mean loudness observed during the silence phase.
    pub silence_avg: f32,
    /// Maximum loudness observed during the speech phase.
    pub speech_max: f32,
    /// Speech detection threshold, the rounded midpoint of the two.
    pub threshold: f32,
    /// Silence tolerated inside an utterance; user-tunable independently of
    /// the measured values.
    #[serde(default = "default_sentence_end_wait_ms")]
    pub sentence_end_wait_ms: u32,
    /// Stream timestamp at which the calibration run finished.
    #[serde(default)]
    pub captured_at_ms: u64,
}

impl CalibrationProfile {
    /// Builds a profile from phase measurements, deriving the threshold as
    /// the midpoint rounded to the nearest whole number.
    pub fn from_measurements(silence_avg: f32, speech_max: f32) -> Self {
        let threshold = ((silence_avg + speech_max) / 2.0).round();
        Self {
            silence_avg,
            speech_max,
            threshold,
            sentence_end_wait_ms: SENTENCE_END_WAIT_MS,
            captured_at_ms: 0,
        }
    }

    /// Default profile used before any calibration has run.
    pub fn fallback() -> Self {
        Self {
            silence_avg: 0.0,
            speech_max: FALLBACK_THRESHOLD * 2.0,
            threshold: FALLBACK_THRESHOLD,
            sentence_end_wait_ms: SENTENCE_END_WAIT_MS,
            captured_at_ms: 0,
        }
    }

    pub fn with_sentence_end_wait_ms(mut self, wait_ms: u32) -> Self {
        self.sentence_end_wait_ms = wait_ms;
        self
    }

    pub fn with_captured_at_ms(mut self, captured_at_ms: u64) -> Self {
        self.captured_at_ms = captured_at_ms;
        self
    }

    /// Overrides the derived threshold, for manual tuning.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::fallback()
    }
}
