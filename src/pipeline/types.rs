//! Data types flowing through the translation pipeline.

use serde::Serialize;

/// A closed speech segment produced by the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSegment {
    /// Audio chunks in capture order, pre-roll included.
    pub chunks: Vec<Vec<u8>>,
    /// Stream timestamp of the reading that opened the segment.
    pub onset_ms: u64,
    /// Stream timestamp of the reading that closed it.
    pub offset_ms: u64,
}

impl SpeechSegment {
    /// Total audio payload in bytes across all chunks.
    pub fn payload_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Concatenates the chunks into one contiguous buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.payload_len());
        for chunk in self.chunks {
            bytes.extend_from_slice(&chunk);
        }
        bytes
    }
}

/// A translation direction between two language codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Direction {
    pub source: String,
    pub target: String,
}

impl Direction {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Wire tag for this direction, e.g. `zh-to-vi`.
    pub fn tag(&self) -> String {
        format!("{}-to-{}", self.source, self.target)
    }

    /// The opposite direction, for the remote peer's speech.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}

/// Why a segment produced no translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Segment payload under the byte floor; no provider was called.
    TooShort,
    /// STT returned nothing usable.
    EmptyTranscript,
    /// Transcript matched the noise denylist.
    NoiseTranscript,
    /// The STT provider failed.
    TranscriptionFailed,
    /// The translation provider failed.
    TranslationFailed,
    /// The speech synthesis provider failed.
    SynthesisFailed,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            FailureReason::TooShort => "too-short",
            FailureReason::EmptyTranscript => "empty-transcript",
            FailureReason::NoiseTranscript => "noise-transcript",
            FailureReason::TranscriptionFailed => "transcription-failed",
            FailureReason::TranslationFailed => "translation-failed",
            FailureReason::SynthesisFailed => "synthesis-failed",
        };
        write!(f, "{tag}")
    }
}

/// Per-stage wall times for one segment, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub stt_ms: u64,
    pub translate_ms: u64,
    /// Time to the first synthesized audio chunk, when synthesis ran.
    pub tts_first_chunk_ms: Option<u64>,
    pub tts_ms: Option<u64>,
    /// End-to-end time from segment receipt to result.
    pub total_ms: u64,
}

/// Outcome of running one speech segment through the pipeline.
///
/// Always produced, success or not; failures carry a reason instead of an
/// error so downstream consumers never lose the segment's place in the
/// stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    /// Transcript in the source language, when STT got that far.
    pub original_text: Option<String>,
    /// Translated text, when translation succeeded.
    pub translated_text: Option<String>,
    /// Synthesized audio of the translation, when synthesis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<u8>>,
    pub direction: Direction,
    pub timings: StageTimings,
    pub success: bool,
    pub error_reason: Option<FailureReason>,
    /// Segment identity, echoed from the detector.
    pub onset_ms: u64,
    pub offset_ms: u64,
}

impl TranslationResult {
    /// A result for a segment that failed before or during the pipeline.
    pub fn failed(
        reason: FailureReason,
        direction: Direction,
        onset_ms: u64,
        offset_ms: u64,
    ) -> Self {
        Self {
            original_text: None,
            translated_text: None,
            audio: None,
            direction,
            timings: StageTimings::default(),
            success: false,
            error_reason: Some(reason),
            onset_ms,
            offset_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_len_sums_chunks() {
        let segment = SpeechSegment {
            chunks: vec![vec![0; 300], vec![0; 500], vec![0; 400]],
            onset_ms: 0,
            offset_ms: 500,
        };
        assert_eq!(segment.payload_len(), 1_200);
    }

    #[test]
    fn test_into_bytes_concatenates_in_order() {
        let segment = SpeechSegment {
            chunks: vec![vec![1, 2], vec![3], vec![4, 5]],
            onset_ms: 0,
            offset_ms: 100,
        };
        assert_eq!(segment.into_bytes(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_direction_tag() {
        let direction = Direction::new("zh", "vi");
        assert_eq!(direction.tag(), "zh-to-vi");
        assert_eq!(direction.reversed().tag(), "vi-to-zh");
    }

    #[test]
    fn test_failure_reason_tags() {
        assert_eq!(FailureReason::TooShort.to_string(), "too-short");
        assert_eq!(FailureReason::EmptyTranscript.to_string(), "empty-transcript");
        assert_eq!(FailureReason::NoiseTranscript.to_string(), "noise-transcript");
    }

    #[test]
    fn test_failed_result_shape() {
        let result = TranslationResult::failed(
            FailureReason::TooShort,
            Direction::new("zh", "vi"),
            100,
            650,
        );
        assert!(!result.success);
        assert_eq!(result.error_reason, Some(FailureReason::TooShort));
        assert!(result.original_text.is_none());
        assert_eq!(result.onset_ms, 100);
        assert_eq!(result.offset_ms, 650);
    }

    #[test]
    fn test_result_serializes_reason_as_tag() {
        let result = TranslationResult::failed(
            FailureReason::NoiseTranscript,
            Direction::new("vi", "zh"),
            0,
            500,
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"noise-transcript\""));
    }
}
