//! Provider traits for the three pipeline stages.
//!
//! Each provider reports its own elapsed time so stage timings reflect the
//! provider call itself, not queueing inside the orchestrator.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, VoiceBridgeError};
use crate::pipeline::types::Direction;

/// Output of a speech-to-text call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub elapsed_ms: u64,
}

/// Output of a translation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub elapsed_ms: u64,
}

/// Output of a speech synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub audio: Vec<u8>,
    /// Time to the first audio chunk, the user-perceived latency.
    pub first_chunk_ms: u64,
    pub elapsed_ms: u64,
}

/// Speech-to-text provider.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribes an audio buffer, hinted with the expected language.
    async fn transcribe(&self, audio: &[u8], language_hint: &str) -> Result<Transcript>;
}

/// Text translation provider.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, direction: &Direction) -> Result<Translation>;
}

/// Text-to-speech provider.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Synthesis>;
}

/// Mock STT provider for testing.
pub struct MockSpeechToText {
    responses: Mutex<Vec<String>>,
    fixed_response: String,
    should_fail: bool,
    call_count: AtomicU32,
}

impl MockSpeechToText {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fixed_response: String::new(),
            should_fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    /// Sets the transcript returned by every call.
    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.fixed_response = text.into();
        self
    }

    /// Queues transcripts returned one per call, falling back to the fixed
    /// response once exhausted.
    pub fn with_responses(self, texts: Vec<&str>) -> Self {
        {
            let mut responses = self
                .responses
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Stored reversed so pop() yields them in order.
            *responses = texts.iter().rev().map(|t| t.to_string()).collect();
        }
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of transcribe calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockSpeechToText {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechToText for MockSpeechToText {
    async fn transcribe(&self, _audio: &[u8], _language_hint: &str) -> Result<Transcript> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoiceBridgeError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        let queued = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();
        Ok(Transcript {
            text: queued.unwrap_or_else(|| self.fixed_response.clone()),
            elapsed_ms: 10,
        })
    }
}

/// Mock translator for testing.
pub struct MockTranslator {
    fixed_response: String,
    should_fail: bool,
    call_count: AtomicU32,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            fixed_response: String::new(),
            should_fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.fixed_response = text.into();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _direction: &Direction) -> Result<Translation> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoiceBridgeError::Translation {
                message: "mock translation failure".to_string(),
            });
        }
        let response = if self.fixed_response.is_empty() {
            format!("[translated] {text}")
        } else {
            self.fixed_response.clone()
        };
        Ok(Translation {
            text: response,
            elapsed_ms: 20,
        })
    }
}

/// Mock speech synthesizer for testing.
pub struct MockSpeechSynthesizer {
    audio: Vec<u8>,
    should_fail: bool,
    call_count: AtomicU32,
}

impl MockSpeechSynthesizer {
    pub fn new() -> Self {
        Self {
            audio: vec![0u8; 64],
            should_fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockSpeechSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeechSynthesizer {
    async fn synthesize(&self, _text: &str, _language: &str) -> Result<Synthesis> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoiceBridgeError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        Ok(Synthesis {
            audio: self.audio.clone(),
            first_chunk_ms: 5,
            elapsed_ms: 15,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_stt_counts_calls() {
        let stt = MockSpeechToText::new().with_response("xin chào");
        assert_eq!(stt.call_count(), 0);
        let transcript = stt.transcribe(&[0u8; 16], "vi").await.unwrap();
        assert_eq!(transcript.text, "xin chào");
        assert_eq!(stt.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_stt_queued_responses_in_order() {
        let stt = MockSpeechToText::new()
            .with_response("fallback")
            .with_responses(vec!["first", "second"]);
        assert_eq!(stt.transcribe(&[], "vi").await.unwrap().text, "first");
        assert_eq!(stt.transcribe(&[], "vi").await.unwrap().text, "second");
        assert_eq!(stt.transcribe(&[], "vi").await.unwrap().text, "fallback");
    }

    #[tokio::test]
    async fn test_mock_stt_failure() {
        let stt = MockSpeechToText::new().with_failure();
        let result = stt.transcribe(&[0u8; 16], "zh").await;
        assert!(matches!(
            result,
            Err(VoiceBridgeError::Transcription { .. })
        ));
        assert_eq!(stt.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_translator_default_echoes() {
        let translator = MockTranslator::new();
        let direction = Direction::new("zh", "vi");
        let translation = translator.translate("你好", &direction).await.unwrap();
        assert_eq!(translation.text, "[translated] 你好");
    }

    #[tokio::test]
    async fn test_mock_synthesizer_audio_and_failure() {
        let ok = MockSpeechSynthesizer::new().with_audio(vec![1, 2, 3]);
        let synthesis = ok.synthesize("hello", "vi").await.unwrap();
        assert_eq!(synthesis.audio, vec![1, 2, 3]);

        let failing = MockSpeechSynthesizer::new().with_failure();
        assert!(failing.synthesize("hello", "vi").await.is_err());
    }
}
