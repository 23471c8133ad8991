//! Audio capture source abstraction.

use crate::error::{Result, VoiceBridgeError};

/// Trait for audio source devices.
///
/// This trait allows swapping implementations (real capture device vs mock).
/// The analyzer and the segment recorder both read from the same source; a
/// device that disappears simply stops yielding samples.
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read available audio samples as 16-bit PCM.
    ///
    /// An empty vector means no new audio yet (live source warming up) or the
    /// source is exhausted (finite source).
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// Whether this source ends on its own (file/fixture) rather than
    /// streaming until stopped (microphone).
    fn is_finite(&self) -> bool {
        false
    }
}

/// One phase of a scripted frame sequence for the mock source.
#[derive(Debug, Clone)]
pub struct FramePhase {
    /// Samples returned for each read in this phase.
    pub samples: Vec<i16>,
    /// Number of reads this phase lasts.
    pub count: usize,
}

/// Mock audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    phases: Vec<FramePhase>,
    phase_index: usize,
    reads_in_phase: usize,
    live: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with no scripted frames.
    pub fn new() -> Self {
        Self {
            is_started: false,
            phases: Vec::new(),
            phase_index: 0,
            reads_in_phase: 0,
            live: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Script a sequence of frame phases; reads walk through the phases and
    /// return empty once exhausted.
    pub fn with_frame_sequence(mut self, phases: Vec<FramePhase>) -> Self {
        self.phases = phases;
        self
    }

    /// Mark the source as live (infinite), like a microphone.
    pub fn as_live_source(mut self) -> Self {
        self.live = true;
        self
    }

    /// Configure the mock to fail on read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Check if the audio source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(VoiceBridgeError::AudioCapture {
                message: self.error_message.clone(),
            });
        }

        while let Some(phase) = self.phases.get(self.phase_index) {
            if self.reads_in_phase < phase.count {
                self.reads_in_phase += 1;
                return Ok(phase.samples.clone());
            }
            self.phase_index += 1;
            self.reads_in_phase = 0;
        }

        Ok(Vec::new())
    }

    fn is_finite(&self) -> bool {
        !self.live
    }
}
