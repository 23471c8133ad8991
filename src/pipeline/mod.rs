//! Speech-to-speech translation pipeline.

pub mod orchestrator;
pub mod providers;
pub mod types;

pub use orchestrator::{PipelineConfig, PipelineOrchestrator};
pub use providers::{
    MockSpeechSynthesizer, MockSpeechToText, MockTranslator, SpeechSynthesizer, SpeechToText,
    Synthesis, Transcript, Translation, Translator,
};
pub use types::{Direction, FailureReason, SpeechSegment, StageTimings, TranslationResult};
