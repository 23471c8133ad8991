//! Pre-roll buffer for speech onset.
//!
//! While no speech is detected, recent audio chunks are retained here so that
//! the first syllables of an utterance can be prepended when the detector
//! finally fires.

use std::collections::VecDeque;

use crate::defaults::PRE_ROLL_MS;

struct TimedChunk {
    bytes: Vec<u8>,
    duration_ms: u32,
}

/// Bounded buffer of recent audio chunks, capped by total duration.
pub struct PreRollBuffer {
    chunks: VecDeque<TimedChunk>,
    capacity_ms: u32,
    total_ms: u32,
}

impl PreRollBuffer {
    /// Creates a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity_ms(PRE_ROLL_MS)
    }

    /// Creates a buffer holding at most `capacity_ms` of audio.
    pub fn with_capacity_ms(capacity_ms: u32) -> Self {
        Self {
            chunks: VecDeque::new(),
            capacity_ms,
            total_ms: 0,
        }
    }

    /// Appends a chunk, evicting the oldest chunks until the buffered
    /// duration fits the capacity again.
    pub fn push(&mut self, bytes: Vec<u8>, duration_ms: u32) {
        self.total_ms += duration_ms;
        self.chunks.push_back(TimedChunk { bytes, duration_ms });

        // Keep at least the newest chunk even if it alone exceeds capacity.
        while self.total_ms > self.capacity_ms && self.chunks.len() > 1 {
            if let Some(evicted) = self.chunks.pop_front() {
                self.total_ms -= evicted.duration_ms;
            }
        }
    }

    /// Moves all buffered chunks out, oldest first, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        self.total_ms = 0;
        self.chunks.drain(..).map(|c| c.bytes).collect()
    }

    /// Total duration of buffered audio in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        self.total_ms
    }

    /// Whether the buffer holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl Default for PreRollBuffer {
    fn default() -> Self {
        Self::new()
    }
}
