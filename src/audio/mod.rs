//! Audio capture, loudness analysis, and speech segmentation.

pub mod analyzer;
pub mod preroll;
pub mod segmenter;
pub mod source;

pub use analyzer::{LoudnessSample, VolumeAnalyzer};
pub use preroll::PreRollBuffer;
pub use segmenter::VadSegmenter;
pub use source::{AudioSource, FramePhase, MockAudioSource};
