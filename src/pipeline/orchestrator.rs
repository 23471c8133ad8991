//! Pipeline orchestration: STT, translation, and optional synthesis.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::defaults::{LATENCY_BUDGET_MS, MIN_SEGMENT_BYTES, MIN_TRANSCRIPT_CHARS};
use crate::pipeline::providers::{SpeechSynthesizer, SpeechToText, Translator};
use crate::pipeline::types::{
    Direction, FailureReason, SpeechSegment, StageTimings, TranslationResult,
};

/// Tuning knobs for the orchestrator's pre-filters and reporting.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Segments with less audio than this are dropped without provider calls.
    pub min_segment_bytes: usize,
    /// Transcripts shorter than this count as empty.
    pub min_transcript_chars: usize,
    /// Transcripts matching these entries (trimmed, case-insensitive) are
    /// dropped as recognizer noise.
    pub noise_denylist: Vec<String>,
    /// Latency budget, logged against but never enforced.
    pub latency_budget_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_segment_bytes: MIN_SEGMENT_BYTES,
            min_transcript_chars: MIN_TRANSCRIPT_CHARS,
            // Phrases speech recognizers hallucinate over silence or hiss.
            noise_denylist: vec![
                "谢谢观看".to_string(),
                "请订阅".to_string(),
                "字幕由amara.org社区提供".to_string(),
                "thank you for watching".to_string(),
                "cảm ơn các bạn đã xem".to_string(),
            ],
            latency_budget_ms: LATENCY_BUDGET_MS,
        }
    }
}

/// Runs speech segments through STT, translation, and optional synthesis.
///
/// `process` is infallible by design: every segment yields a
/// [`TranslationResult`], with failures reported inside the result rather
/// than as errors, so one bad segment never tears down the stream.
pub struct PipelineOrchestrator {
    stt: Arc<dyn SpeechToText>,
    translator: Arc<dyn Translator>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(stt: Arc<dyn SpeechToText>, translator: Arc<dyn Translator>) -> Self {
        Self {
            stt,
            translator,
            synthesizer: None,
            config: PipelineConfig::default(),
        }
    }

    /// Enables speech synthesis of the translated text.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    fn is_noise(&self, transcript: &str) -> bool {
        let normalized = transcript.trim().to_lowercase();
        self.config
            .noise_denylist
            .iter()
            .any(|entry| entry.trim().to_lowercase() == normalized)
    }

    /// Processes one segment end to end.
    pub async fn process(&self, segment: SpeechSegment, direction: &Direction) -> TranslationResult {
        let started = Instant::now();
        let onset_ms = segment.onset_ms;
        let offset_ms = segment.offset_ms;

        let payload_len = segment.payload_len();
        if payload_len < self.config.min_segment_bytes {
            debug!(payload_len, onset_ms, "segment under byte floor, dropped");
            return TranslationResult::failed(
                FailureReason::TooShort,
                direction.clone(),
                onset_ms,
                offset_ms,
            );
        }

        let mut timings = StageTimings::default();
        let audio = segment.into_bytes();

        let transcript = match self.stt.transcribe(&audio, &direction.source).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!(error = %e, onset_ms, "transcription failed");
                return self.finish(
                    TranslationResult::failed(
                        FailureReason::TranscriptionFailed,
                        direction.clone(),
                        onset_ms,
                        offset_ms,
                    ),
                    timings,
                    started,
                );
            }
        };
        timings.stt_ms = transcript.elapsed_ms;

        let text = transcript.text.trim().to_string();
        if text.chars().count() < self.config.min_transcript_chars {
            debug!(onset_ms, "empty transcript, dropped");
            return self.finish(
                TranslationResult::failed(
                    FailureReason::EmptyTranscript,
                    direction.clone(),
                    onset_ms,
                    offset_ms,
                ),
                timings,
                started,
            );
        }

        if self.is_noise(&text) {
            debug!(onset_ms, transcript = %text, "noise transcript, dropped");
            let mut result = TranslationResult::failed(
                FailureReason::NoiseTranscript,
                direction.clone(),
                onset_ms,
                offset_ms,
            );
            result.original_text = Some(text);
            return self.finish(result, timings, started);
        }

        let translation = match self.translator.translate(&text, direction).await {
            Ok(translation) => translation,
            Err(e) => {
                warn!(error = %e, onset_ms, "translation failed, keeping transcript");
                let mut result = TranslationResult::failed(
                    FailureReason::TranslationFailed,
                    direction.clone(),
                    onset_ms,
                    offset_ms,
                );
                result.original_text = Some(text);
                return self.finish(result, timings, started);
            }
        };
        timings.translate_ms = translation.elapsed_ms;

        let mut result = TranslationResult {
            original_text: Some(text),
            translated_text: Some(translation.text.clone()),
            audio: None,
            direction: direction.clone(),
            timings,
            success: true,
            error_reason: None,
            onset_ms,
            offset_ms,
        };

        if let Some(synthesizer) = &self.synthesizer {
            match synthesizer.synthesize(&translation.text, &direction.target).await {
                Ok(synthesis) => {
                    result.timings.tts_first_chunk_ms = Some(synthesis.first_chunk_ms);
                    result.timings.tts_ms = Some(synthesis.elapsed_ms);
                    result.audio = Some(synthesis.audio);
                }
                Err(e) => {
                    warn!(error = %e, onset_ms, "synthesis failed, keeping text");
                    result.success = false;
                    result.error_reason = Some(FailureReason::SynthesisFailed);
                }
            }
        }

        let timings = result.timings;
        self.finish(result, timings, started)
    }

    fn finish(
        &self,
        mut result: TranslationResult,
        mut timings: StageTimings,
        started: Instant,
    ) -> TranslationResult {
        timings.total_ms = started.elapsed().as_millis() as u64;
        result.timings = timings;

        if timings.total_ms > self.config.latency_budget_ms {
            warn!(
                total_ms = timings.total_ms,
                budget_ms = self.config.latency_budget_ms,
                direction = %result.direction.tag(),
                "segment exceeded latency budget"
            );
        } else {
            debug!(
                total_ms = timings.total_ms,
                success = result.success,
                direction = %result.direction.tag(),
                "segment processed"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::providers::{
        MockSpeechSynthesizer, MockSpeechToText, MockTranslator,
    };

    fn segment(payload: usize) -> SpeechSegment {
        SpeechSegment {
            chunks: vec![vec![0u8; payload]],
            onset_ms: 100,
            offset_ms: 650,
        }
    }

    fn direction() -> Direction {
        Direction::new("zh", "vi")
    }

    #[tokio::test]
    async fn test_segment_above_floor_is_transcribed() {
        let stt = Arc::new(MockSpeechToText::new().with_response("你好吗"));
        let translator = Arc::new(MockTranslator::new().with_response("bạn khỏe không"));
        let orchestrator =
            PipelineOrchestrator::new(Arc::clone(&stt) as _, Arc::clone(&translator) as _);

        let result = orchestrator.process(segment(1_200), &direction()).await;

        assert!(result.success);
        assert_eq!(stt.call_count(), 1);
        assert_eq!(result.original_text.as_deref(), Some("你好吗"));
        assert_eq!(result.translated_text.as_deref(), Some("bạn khỏe không"));
    }

    #[tokio::test]
    async fn test_segment_under_floor_makes_no_provider_calls() {
        let stt = Arc::new(MockSpeechToText::new().with_response("你好吗"));
        let translator = Arc::new(MockTranslator::new());
        let orchestrator =
            PipelineOrchestrator::new(Arc::clone(&stt) as _, Arc::clone(&translator) as _);

        let result = orchestrator.process(segment(800), &direction()).await;

        assert!(!result.success);
        assert_eq!(result.error_reason, Some(FailureReason::TooShort));
        assert_eq!(stt.call_count(), 0);
        assert_eq!(translator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_translation() {
        let stt = Arc::new(MockSpeechToText::new().with_response("  "));
        let translator = Arc::new(MockTranslator::new());
        let orchestrator =
            PipelineOrchestrator::new(Arc::clone(&stt) as _, Arc::clone(&translator) as _);

        let result = orchestrator.process(segment(2_000), &direction()).await;

        assert_eq!(result.error_reason, Some(FailureReason::EmptyTranscript));
        assert_eq!(stt.call_count(), 1);
        assert_eq!(translator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_noise_transcript_is_filtered() {
        let stt = Arc::new(MockSpeechToText::new().with_response(" Thank You For Watching "));
        let translator = Arc::new(MockTranslator::new());
        let orchestrator =
            PipelineOrchestrator::new(Arc::clone(&stt) as _, Arc::clone(&translator) as _);

        let result = orchestrator.process(segment(2_000), &direction()).await;

        assert_eq!(result.error_reason, Some(FailureReason::NoiseTranscript));
        assert_eq!(
            result.original_text.as_deref(),
            Some("Thank You For Watching")
        );
        assert_eq!(translator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_transcript() {
        let stt = Arc::new(MockSpeechToText::new().with_response("你好吗"));
        let translator = Arc::new(MockTranslator::new().with_failure());
        let orchestrator =
            PipelineOrchestrator::new(Arc::clone(&stt) as _, Arc::clone(&translator) as _);

        let result = orchestrator.process(segment(2_000), &direction()).await;

        assert!(!result.success);
        assert_eq!(result.error_reason, Some(FailureReason::TranslationFailed));
        assert_eq!(result.original_text.as_deref(), Some("你好吗"));
        assert!(result.translated_text.is_none());
        assert_eq!(result.timings.stt_ms, 10);
    }

    #[tokio::test]
    async fn test_synthesis_populates_audio_and_timings() {
        let stt = Arc::new(MockSpeechToText::new().with_response("你好吗"));
        let translator = Arc::new(MockTranslator::new());
        let synthesizer = Arc::new(MockSpeechSynthesizer::new().with_audio(vec![7; 32]));
        let orchestrator =
            PipelineOrchestrator::new(Arc::clone(&stt) as _, Arc::clone(&translator) as _)
                .with_synthesizer(Arc::clone(&synthesizer) as _);

        let result = orchestrator.process(segment(2_000), &direction()).await;

        assert!(result.success);
        assert_eq!(result.audio.as_deref(), Some(&[7u8; 32][..]));
        assert_eq!(result.timings.tts_first_chunk_ms, Some(5));
        assert_eq!(result.timings.tts_ms, Some(15));
        assert_eq!(result.timings.stt_ms, 10);
        assert_eq!(result.timings.translate_ms, 20);
        assert_eq!(synthesizer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_without_synthesizer_audio_is_none() {
        let stt = Arc::new(MockSpeechToText::new().with_response("你好吗"));
        let translator = Arc::new(MockTranslator::new());
        let orchestrator = PipelineOrchestrator::new(stt, translator);

        let result = orchestrator.process(segment(2_000), &direction()).await;

        assert!(result.success);
        assert!(result.audio.is_none());
        assert!(result.timings.tts_first_chunk_ms.is_none());
        assert!(result.timings.tts_ms.is_none());
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_text() {
        let stt = Arc::new(MockSpeechToText::new().with_response("你好吗"));
        let translator = Arc::new(MockTranslator::new().with_response("bạn khỏe không"));
        let synthesizer = Arc::new(MockSpeechSynthesizer::new().with_failure());
        let orchestrator = PipelineOrchestrator::new(stt, translator)
            .with_synthesizer(synthesizer as _);

        let result = orchestrator.process(segment(2_000), &direction()).await;

        assert!(!result.success);
        assert_eq!(result.error_reason, Some(FailureReason::SynthesisFailed));
        assert_eq!(result.translated_text.as_deref(), Some("bạn khỏe không"));
        assert!(result.audio.is_none());
    }

    #[tokio::test]
    async fn test_result_echoes_segment_identity() {
        let stt = Arc::new(MockSpeechToText::new().with_response("你好吗"));
        let translator = Arc::new(MockTranslator::new());
        let orchestrator = PipelineOrchestrator::new(stt, translator);

        let result = orchestrator.process(segment(2_000), &direction()).await;

        assert_eq!(result.onset_ms, 100);
        assert_eq!(result.offset_ms, 650);
    }
}
