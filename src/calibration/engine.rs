//! Two-phase guided calibration.
//!
//! The user is first asked to stay silent, then to speak normally. The
//! silence phase averages the loudness readings, the speech phase tracks the
//! loudest one, and the detection threshold lands midway between the two.

use std::sync::Arc;

use tracing::info;

use crate::audio::LoudnessSample;
use crate::calibration::store::CalibrationStore;
use crate::calibration::CalibrationProfile;
use crate::defaults::{SENTENCE_END_WAIT_MS, SILENCE_PHASE_MS, SPEECH_PHASE_MS};
use crate::error::Result;

/// Which calibration prompt the UI should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Not calibrating.
    Idle,
    /// "Stay silent" phase.
    Silence,
    /// "Speak normally" phase.
    Speech,
}

enum PhaseState {
    Idle,
    Silence {
        started_ms: u64,
        values: Vec<f32>,
    },
    Speech {
        started_ms: u64,
        silence_avg: f32,
        peak: f32,
    },
}

/// Runs the guided calibration flow over the live loudness stream.
pub struct CalibrationEngine {
    state: PhaseState,
    silence_phase_ms: u64,
    speech_phase_ms: u64,
    sentence_end_wait_ms: u32,
    store: Option<(Arc<dyn CalibrationStore>, String)>,
}

impl CalibrationEngine {
    /// Creates an engine with the default phase durations.
    pub fn new() -> Self {
        Self {
            state: PhaseState::Idle,
            silence_phase_ms: SILENCE_PHASE_MS,
            speech_phase_ms: SPEECH_PHASE_MS,
            sentence_end_wait_ms: SENTENCE_END_WAIT_MS,
            store: None,
        }
    }

    /// Sets the sentence-end wait carried into produced profiles.
    pub fn with_sentence_end_wait_ms(mut self, wait_ms: u32) -> Self {
        self.sentence_end_wait_ms = wait_ms;
        self
    }

    /// Overrides the phase durations.
    pub fn with_phase_durations(mut self, silence_ms: u64, speech_ms: u64) -> Self {
        self.silence_phase_ms = silence_ms;
        self.speech_phase_ms = speech_ms;
        self
    }

    /// Persists the finished profile under `key` before it is returned.
    pub fn with_store(mut self, store: Arc<dyn CalibrationStore>, key: impl Into<String>) -> Self {
        self.store = Some((store, key.into()));
        self
    }

    /// Begins the silence phase at the given stream timestamp.
    ///
    /// Restarting mid-run discards the partial measurements.
    pub fn start(&mut self, now_ms: u64) {
        self.state = PhaseState::Silence {
            started_ms: now_ms,
            values: Vec::new(),
        };
    }

    /// Abandons the run; partial measurements are discarded and any stored
    /// profile is left untouched.
    pub fn cancel(&mut self) {
        self.state = PhaseState::Idle;
    }

    /// The prompt currently owed to the user.
    pub fn phase(&self) -> CalibrationPhase {
        match self.state {
            PhaseState::Idle => CalibrationPhase::Idle,
            PhaseState::Silence { .. } => CalibrationPhase::Silence,
            PhaseState::Speech { .. } => CalibrationPhase::Speech,
        }
    }

    /// Whether a calibration run is in progress.
    pub fn is_running(&self) -> bool {
        !matches!(self.state, PhaseState::Idle)
    }

    /// Overall progress in percent, half per phase.
    pub fn progress(&self, now_ms: u64) -> u8 {
        match &self.state {
            PhaseState::Idle => 0,
            PhaseState::Silence { started_ms, .. } => {
                let elapsed = now_ms.saturating_sub(*started_ms);
                (50 * elapsed / self.silence_phase_ms).min(50) as u8
            }
            PhaseState::Speech { started_ms, .. } => {
                let elapsed = now_ms.saturating_sub(*started_ms);
                (50 + 50 * elapsed / self.speech_phase_ms).min(100) as u8
            }
        }
    }

    /// Feeds one loudness reading.
    ///
    /// Returns the finished profile once the speech phase completes; the
    /// profile has already been persisted at that point if a store is
    /// configured.
    pub fn on_sample(&mut self, sample: &LoudnessSample) -> Result<Option<CalibrationProfile>> {
        match &mut self.state {
            PhaseState::Idle => Ok(None),
            PhaseState::Silence { started_ms, values } => {
                if sample.timestamp_ms.saturating_sub(*started_ms) >= self.silence_phase_ms {
                    let silence_avg = if values.is_empty() {
                        0.0
                    } else {
                        values.iter().sum::<f32>() / values.len() as f32
                    };
                    // The crossing reading opens the speech phase.
                    self.state = PhaseState::Speech {
                        started_ms: sample.timestamp_ms,
                        silence_avg,
                        peak: sample.value,
                    };
                    Ok(None)
                } else {
                    values.push(sample.value);
                    Ok(None)
                }
            }
            PhaseState::Speech {
                started_ms,
                silence_avg,
                peak,
            } => {
                if sample.timestamp_ms.saturating_sub(*started_ms) >= self.speech_phase_ms {
                    let profile = CalibrationProfile::from_measurements(*silence_avg, *peak)
                        .with_sentence_end_wait_ms(self.sentence_end_wait_ms)
                        .with_captured_at_ms(sample.timestamp_ms);
                    self.state = PhaseState::Idle;
                    if let Some((store, key)) = &self.store {
                        store.save(key, &profile)?;
                    }
                    info!(
                        silence_avg = profile.silence_avg,
                        speech_max = profile.speech_max,
                        threshold = profile.threshold,
                        "calibration complete"
                    );
                    Ok(Some(profile))
                } else {
                    *peak = peak.max(sample.value);
                    Ok(None)
                }
            }
        }
    }
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new()
    }
}
