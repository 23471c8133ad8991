//! Frequency-domain loudness analysis.
//!
//! Loudness is the mean FFT-bin magnitude of the most recent block of PCM
//! samples, scaled to a 0-255 range. Calibration profiles store thresholds in
//! this scale, so the metric must stay stable across releases.

use std::sync::Arc;
use std::time::Instant;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::clock::Clock;
use crate::defaults::FFT_BLOCK_SIZE;

/// A single loudness reading on the analyzer's timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    /// Milliseconds since the analyzer was created.
    pub timestamp_ms: u64,
    /// Mean FFT-bin magnitude, 0-255 scale.
    pub value: f32,
}

/// Computes loudness samples from incoming PCM audio.
///
/// Samples accumulate until a full FFT block is available; each emitted
/// reading covers the latest block and resets the accumulator.
pub struct VolumeAnalyzer {
    clock: Arc<dyn Clock>,
    epoch: Instant,
    block_size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<i16>,
}

impl VolumeAnalyzer {
    /// Creates an analyzer with the default block size.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_block_size(clock, FFT_BLOCK_SIZE)
    }

    /// Creates an analyzer with a custom FFT block size.
    pub fn with_block_size(clock: Arc<dyn Clock>, block_size: usize) -> Self {
        let block_size = block_size.max(128);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(block_size);
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            block_size,
            fft,
            buffer: Vec::with_capacity(block_size * 2),
        }
    }

    /// Feeds PCM samples in; returns a loudness reading once a full block has
    /// accumulated, or `None` while still filling. The reading is stamped
    /// with the clock's elapsed time since the analyzer was created.
    pub fn push(&mut self, samples: &[i16]) -> Option<LoudnessSample> {
        let timestamp_ms = self
            .clock
            .now()
            .saturating_duration_since(self.epoch)
            .as_millis() as u64;
        self.push_at(samples, timestamp_ms)
    }

    /// Like [`push`](Self::push), but stamps the reading with a caller-chosen
    /// timestamp, typically the stream position of the audio itself.
    pub fn push_at(&mut self, samples: &[i16], timestamp_ms: u64) -> Option<LoudnessSample> {
        self.buffer.extend_from_slice(samples);
        if self.buffer.len() < self.block_size {
            return None;
        }

        let start = self.buffer.len() - self.block_size;
        let block: Vec<i16> = self.buffer[start..].to_vec();
        let value = self.block_loudness(&block);
        self.buffer.clear();

        Some(LoudnessSample {
            timestamp_ms,
            value,
        })
    }

    /// Number of samples currently buffered, waiting for a full block.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn block_loudness(&self, block: &[i16]) -> f32 {
        let mut spectrum: Vec<Complex<f32>> = block
            .iter()
            .map(|&s| Complex::new(f32::from(s) / 32768.0, 0.0))
            .collect();
        self.fft.process(&mut spectrum);

        // Only the first half of the spectrum carries distinct frequencies
        // for a real-valued signal.
        let half = self.block_size / 2;
        let sum: f32 = spectrum[..half].iter().map(|c| c.norm()).sum();
        255.0 * sum / half as f32
    }
}
