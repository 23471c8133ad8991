//! Guided loudness calibration and profile storage.

pub mod engine;
pub mod profile;
pub mod store;

pub use engine::{CalibrationEngine, CalibrationPhase};
pub use profile::CalibrationProfile;
pub use store::{CalibrationStore, JsonFileStore, MemoryStore};
