//! End-to-end translation engine.
//!
//! Wires an [`AudioSource`] through loudness analysis and speech
//! segmentation on a capture thread, and feeds the closed segments to the
//! pipeline on the tokio runtime. Results arrive on a channel in segment
//! order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::audio::{AudioSource, VadSegmenter, VolumeAnalyzer};
use crate::calibration::{CalibrationEngine, CalibrationProfile};
use crate::clock::SystemClock;
use crate::defaults::{SAMPLE_RATE, TICK_INTERVAL_MS};
use crate::error::Result;
use crate::pipeline::{Direction, PipelineOrchestrator, SpeechSegment, TranslationResult};

const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;
const SEGMENT_QUEUE_DEPTH: usize = 32;

/// Builder for a running translation engine.
pub struct TranslationEngine {
    direction: Direction,
    profile: Arc<RwLock<CalibrationProfile>>,
    calibration: Option<Arc<Mutex<CalibrationEngine>>>,
    sample_rate: u32,
    tick_interval: Duration,
    sentence_end_wait_ms: Option<u64>,
}

impl TranslationEngine {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            profile: Arc::new(RwLock::new(CalibrationProfile::fallback())),
            calibration: None,
            sample_rate: SAMPLE_RATE,
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            sentence_end_wait_ms: None,
        }
    }

    /// Shares a calibration profile with the engine; updates through the
    /// lock take effect on the next loudness reading.
    pub fn with_profile(mut self, profile: Arc<RwLock<CalibrationProfile>>) -> Self {
        self.profile = profile;
        self
    }

    /// Attaches a calibration engine. While a run is in progress the
    /// loudness stream feeds calibration instead of segmentation, and a
    /// finished run replaces the shared profile.
    pub fn with_calibration(mut self, calibration: Arc<Mutex<CalibrationEngine>>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_sentence_end_wait_ms(mut self, wait_ms: u64) -> Self {
        self.sentence_end_wait_ms = Some(wait_ms);
        self
    }

    /// Starts capture and processing.
    ///
    /// Must be called from within a tokio runtime. Returns a handle that
    /// stops the capture thread and a channel of per-segment results.
    pub fn start(
        self,
        mut source: Box<dyn AudioSource>,
        orchestrator: PipelineOrchestrator,
    ) -> Result<(EngineHandle, mpsc::Receiver<TranslationResult>)> {
        source.start()?;

        let (segment_tx, mut segment_rx) = mpsc::channel::<SpeechSegment>(SEGMENT_QUEUE_DEPTH);
        let (result_tx, result_rx) = mpsc::channel::<TranslationResult>(SEGMENT_QUEUE_DEPTH);

        let running = Arc::new(AtomicBool::new(true));
        let running_capture = Arc::clone(&running);

        let mut segmenter = VadSegmenter::new(Arc::clone(&self.profile));
        if let Some(wait_ms) = self.sentence_end_wait_ms {
            segmenter = segmenter.with_sentence_end_wait_ms(wait_ms);
        }
        let mut analyzer = VolumeAnalyzer::new(Arc::new(SystemClock));
        let profile = self.profile;
        let calibration = self.calibration;
        let sample_rate = u64::from(self.sample_rate);
        let tick_interval = self.tick_interval;

        let capture_thread = thread::spawn(move || {
            let mut position_samples: u64 = 0;
            let mut consecutive_errors: u32 = 0;
            let finite = source.is_finite();

            while running_capture.load(Ordering::SeqCst) {
                let samples = match source.read_samples() {
                    Ok(samples) => {
                        consecutive_errors = 0;
                        samples
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                            error!(error = %e, "audio source failing persistently, capture stopped");
                            break;
                        }
                        thread::sleep(tick_interval);
                        continue;
                    }
                };

                if samples.is_empty() {
                    if finite {
                        break;
                    }
                    thread::sleep(tick_interval);
                    continue;
                }

                let mut bytes = Vec::with_capacity(samples.len() * 2);
                for sample in &samples {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                }
                let duration_ms = (samples.len() as u64 * 1_000 / sample_rate) as u32;
                segmenter.on_chunk(bytes, duration_ms);

                position_samples += samples.len() as u64;
                let position_ms = position_samples * 1_000 / sample_rate;

                if let Some(reading) = analyzer.push_at(&samples, position_ms) {
                    let calibrating = calibration.as_ref().is_some_and(|calibration| {
                        let mut calibration = calibration
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        if !calibration.is_running() {
                            return false;
                        }
                        match calibration.on_sample(&reading) {
                            Ok(Some(new_profile)) => {
                                let mut shared = profile
                                    .write()
                                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                                *shared = new_profile;
                            }
                            Ok(None) => {}
                            Err(e) => error!(error = %e, "calibration failed"),
                        }
                        true
                    });

                    if !calibrating {
                        if let Some(segment) = segmenter.on_sample(&reading) {
                            debug!(
                                onset_ms = segment.onset_ms,
                                offset_ms = segment.offset_ms,
                                payload_len = segment.payload_len(),
                                "segment closed"
                            );
                            if segment_tx.blocking_send(segment).is_err() {
                                break;
                            }
                        }
                    }
                }

                if !finite {
                    thread::sleep(tick_interval);
                }
            }

            if let Some(segment) = segmenter.flush() {
                segment_tx.blocking_send(segment).ok();
            }
            if let Err(e) = source.stop() {
                error!(error = %e, "audio source failed to stop");
            }
            info!("capture thread stopped");
        });

        let orchestrator = Arc::new(orchestrator);
        let direction = self.direction;
        tokio::spawn(async move {
            while let Some(segment) = segment_rx.recv().await {
                let result = orchestrator.process(segment, &direction).await;
                if result_tx.send(result).await.is_err() {
                    break;
                }
            }
        });

        Ok((
            EngineHandle {
                running,
                capture_thread: Some(capture_thread),
            },
            result_rx,
        ))
    }
}

/// Handle to a running engine.
pub struct EngineHandle {
    running: Arc<AtomicBool>,
    capture_thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Whether the capture thread is still alive.
    pub fn is_running(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stops capture and waits for the capture thread to finish. Results
    /// already queued still arrive on the result channel.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.capture_thread.take() {
            thread.join().ok();
        }
    }
}
