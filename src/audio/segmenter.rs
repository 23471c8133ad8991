//! Speech segmentation over the loudness stream.
//!
//! Detection uses sliding-extension hysteresis: every loudness reading above
//! the calibrated threshold pushes the end-of-speech deadline further into
//! the future, so short pauses never split an utterance. A segment closes
//! only when the deadline passes without another loud reading.

use std::sync::{Arc, RwLock};

use crate::audio::analyzer::LoudnessSample;
use crate::audio::preroll::PreRollBuffer;
use crate::calibration::CalibrationProfile;
use crate::pipeline::SpeechSegment;

enum VadState {
    Idle,
    Speaking {
        chunks: Vec<Vec<u8>>,
        onset_ms: u64,
        deadline_ms: u64,
    },
}

/// Turns a stream of audio chunks and loudness readings into speech segments.
///
/// Chunks and readings arrive on the same tick; feed the chunk first so a
/// reading that triggers onset captures the chunk that crossed the threshold.
pub struct VadSegmenter {
    profile: Arc<RwLock<CalibrationProfile>>,
    preroll: PreRollBuffer,
    sentence_end_wait_override: Option<u64>,
    state: VadState,
}

impl VadSegmenter {
    /// Creates a segmenter reading its threshold from a shared profile.
    ///
    /// The profile is re-read on every sample, so recalibration takes effect
    /// immediately without restarting the stream.
    pub fn new(profile: Arc<RwLock<CalibrationProfile>>) -> Self {
        Self {
            profile,
            preroll: PreRollBuffer::new(),
            sentence_end_wait_override: None,
            state: VadState::Idle,
        }
    }

    /// Overrides the silence duration that closes a segment; without an
    /// override the profile's own value applies.
    pub fn with_sentence_end_wait_ms(mut self, wait_ms: u64) -> Self {
        self.sentence_end_wait_override = Some(wait_ms);
        self
    }

    /// Overrides the pre-roll capacity.
    pub fn with_preroll_capacity_ms(mut self, capacity_ms: u32) -> Self {
        self.preroll = PreRollBuffer::with_capacity_ms(capacity_ms);
        self
    }

    /// Whether a segment is currently open.
    pub fn is_speaking(&self) -> bool {
        matches!(self.state, VadState::Speaking { .. })
    }

    /// Feeds one audio chunk. While idle the chunk lands in the pre-roll
    /// buffer; while speaking it is appended to the open segment.
    pub fn on_chunk(&mut self, chunk: Vec<u8>, duration_ms: u32) {
        match &mut self.state {
            VadState::Idle => self.preroll.push(chunk, duration_ms),
            VadState::Speaking { chunks, .. } => chunks.push(chunk),
        }
    }

    /// Feeds one loudness reading. Returns a closed segment when the reading
    /// lets the end-of-speech deadline expire.
    pub fn on_sample(&mut self, sample: &LoudnessSample) -> Option<SpeechSegment> {
        let (threshold, profile_wait_ms) = {
            let profile = self
                .profile
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            (profile.threshold, u64::from(profile.sentence_end_wait_ms))
        };
        let wait_ms = self.sentence_end_wait_override.unwrap_or(profile_wait_ms);

        if sample.value > threshold {
            let deadline = sample.timestamp_ms + wait_ms;
            match &mut self.state {
                VadState::Idle => {
                    self.state = VadState::Speaking {
                        chunks: self.preroll.drain(),
                        onset_ms: sample.timestamp_ms,
                        deadline_ms: deadline,
                    };
                }
                VadState::Speaking { deadline_ms, .. } => {
                    *deadline_ms = deadline;
                }
            }
            return None;
        }

        if let VadState::Speaking {
            onset_ms,
            deadline_ms,
            ..
        } = &self.state
        {
            if sample.timestamp_ms >= *deadline_ms {
                let onset_ms = *onset_ms;
                let offset_ms = sample.timestamp_ms;
                let chunks = match std::mem::replace(&mut self.state, VadState::Idle) {
                    VadState::Speaking { chunks, .. } => chunks,
                    VadState::Idle => Vec::new(),
                };
                return Some(SpeechSegment {
                    chunks,
                    onset_ms,
                    offset_ms,
                });
            }
        }

        None
    }

    /// Closes an open segment when the stream ends, using the scheduled
    /// end-of-speech deadline as the offset.
    pub fn flush(&mut self) -> Option<SpeechSegment> {
        match std::mem::replace(&mut self.state, VadState::Idle) {
            VadState::Speaking {
                chunks,
                onset_ms,
                deadline_ms,
            } => Some(SpeechSegment {
                chunks,
                onset_ms,
                offset_ms: deadline_ms,
            }),
            VadState::Idle => None,
        }
    }
}
