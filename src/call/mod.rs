//! Call signaling between translation endpoints.

pub mod runner;
pub mod session;

pub use runner::{spawn, CallCommand, SignalingHandle};
pub use session::{CallSession, CallStatus, PeerRef, SignalMessage};
