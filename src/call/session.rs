//! Call signaling state machine.
//!
//! The session tracks one call at a time. Every local action and every
//! inbound message returns the signal messages to send to the peer; stale or
//! repeated inputs return nothing, so retransmits and UI double-clicks are
//! harmless.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::defaults::{INVITE_TIMEOUT_MS, REJECTED_HOLD_MS};

/// Identity of the remote party in a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRef {
    pub session_id: String,
    pub peer_id: String,
}

impl PeerRef {
    pub fn new(session_id: impl Into<String>, peer_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            peer_id: peer_id.into(),
        }
    }
}

/// Wire messages exchanged between call endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "peer", rename_all = "kebab-case")]
pub enum SignalMessage {
    Invite(PeerRef),
    Accepted(PeerRef),
    Rejected(PeerRef),
    Cancelled(PeerRef),
    Timeout(PeerRef),
    Missed(PeerRef),
    Ended(PeerRef),
}

/// Public view of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Idle,
    /// Invite sent, waiting for the peer to answer.
    Outgoing,
    /// Peer rejected; held briefly so the UI can show it before idling.
    OutgoingRejected,
    /// Invite received, waiting for the local user to answer.
    Incoming,
    Connected,
}

enum CallState {
    Idle,
    OutgoingRinging { peer: PeerRef, deadline: Instant },
    OutgoingRejected { peer: PeerRef, until: Instant },
    Incoming { peer: PeerRef, deadline: Instant },
    Connected { peer: PeerRef },
}

/// One endpoint's call signaling session.
pub struct CallSession {
    clock: Arc<dyn Clock>,
    state: CallState,
    invite_timeout: Duration,
    rejected_hold: Duration,
}

impl CallSession {
    /// Creates a session on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: CallState::Idle,
            invite_timeout: Duration::from_millis(INVITE_TIMEOUT_MS),
            rejected_hold: Duration::from_millis(REJECTED_HOLD_MS),
        }
    }

    /// Overrides the ring timeout and rejected-hold durations.
    pub fn with_durations(mut self, invite_timeout: Duration, rejected_hold: Duration) -> Self {
        self.invite_timeout = invite_timeout;
        self.rejected_hold = rejected_hold;
        self
    }

    pub fn status(&self) -> CallStatus {
        match self.state {
            CallState::Idle => CallStatus::Idle,
            CallState::OutgoingRinging { .. } => CallStatus::Outgoing,
            CallState::OutgoingRejected { .. } => CallStatus::OutgoingRejected,
            CallState::Incoming { .. } => CallStatus::Incoming,
            CallState::Connected { .. } => CallStatus::Connected,
        }
    }

    /// The peer of the current call, if any.
    pub fn peer(&self) -> Option<&PeerRef> {
        match &self.state {
            CallState::Idle => None,
            CallState::OutgoingRinging { peer, .. }
            | CallState::OutgoingRejected { peer, .. }
            | CallState::Incoming { peer, .. }
            | CallState::Connected { peer } => Some(peer),
        }
    }

    /// Starts an outgoing call. Only effective while idle; repeated calls to
    /// the same peer are absorbed.
    pub fn invite(&mut self, peer: PeerRef) -> Vec<SignalMessage> {
        match &self.state {
            CallState::Idle => {
                info!(peer = %peer.peer_id, "outgoing call");
                self.state = CallState::OutgoingRinging {
                    peer: peer.clone(),
                    deadline: self.clock.now() + self.invite_timeout,
                };
                vec![SignalMessage::Invite(peer)]
            }
            _ => Vec::new(),
        }
    }

    /// Cancels an outgoing call that is still ringing.
    pub fn cancel(&mut self) -> Vec<SignalMessage> {
        match std::mem::replace(&mut self.state, CallState::Idle) {
            CallState::OutgoingRinging { peer, .. } => vec![SignalMessage::Cancelled(peer)],
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    /// Answers an incoming call.
    pub fn accept(&mut self) -> Vec<SignalMessage> {
        match std::mem::replace(&mut self.state, CallState::Idle) {
            CallState::Incoming { peer, .. } => {
                info!(peer = %peer.peer_id, "call accepted");
                self.state = CallState::Connected { peer: peer.clone() };
                vec![SignalMessage::Accepted(peer)]
            }
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    /// Declines an incoming call.
    pub fn reject(&mut self) -> Vec<SignalMessage> {
        match std::mem::replace(&mut self.state, CallState::Idle) {
            CallState::Incoming { peer, .. } => vec![SignalMessage::Rejected(peer)],
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    /// Ends a connected call.
    pub fn hang_up(&mut self) -> Vec<SignalMessage> {
        match std::mem::replace(&mut self.state, CallState::Idle) {
            CallState::Connected { peer } => {
                info!(peer = %peer.peer_id, "call ended");
                vec![SignalMessage::Ended(peer)]
            }
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    /// Applies a message from the signaling channel.
    pub fn on_message(&mut self, message: &SignalMessage) -> Vec<SignalMessage> {
        match message {
            SignalMessage::Invite(peer) => {
                if matches!(self.state, CallState::Idle) {
                    info!(peer = %peer.peer_id, "incoming call");
                    self.state = CallState::Incoming {
                        peer: peer.clone(),
                        deadline: self.clock.now() + self.invite_timeout,
                    };
                } else {
                    debug!(peer = %peer.peer_id, "invite ignored, session busy");
                }
                Vec::new()
            }
            SignalMessage::Accepted(peer) => {
                if let CallState::OutgoingRinging { peer: ours, .. } = &self.state {
                    if ours == peer {
                        self.state = CallState::Connected { peer: peer.clone() };
                    }
                }
                Vec::new()
            }
            SignalMessage::Rejected(peer) => {
                if let CallState::OutgoingRinging { peer: ours, .. } = &self.state {
                    if ours == peer {
                        self.state = CallState::OutgoingRejected {
                            peer: peer.clone(),
                            until: self.clock.now() + self.rejected_hold,
                        };
                    }
                }
                Vec::new()
            }
            SignalMessage::Cancelled(peer) | SignalMessage::Timeout(peer) => {
                if let CallState::Incoming { peer: ours, .. } = &self.state {
                    if ours == peer {
                        self.state = CallState::Idle;
                    }
                }
                Vec::new()
            }
            SignalMessage::Ended(peer) => {
                if let CallState::Connected { peer: ours } = &self.state {
                    if ours == peer {
                        self.state = CallState::Idle;
                    }
                }
                Vec::new()
            }
            SignalMessage::Missed(_) => Vec::new(),
        }
    }

    /// Advances time-driven transitions. Call this periodically.
    pub fn poll(&mut self) -> Vec<SignalMessage> {
        let now = self.clock.now();
        match &self.state {
            CallState::OutgoingRinging { peer, deadline } if now >= *deadline => {
                info!(peer = %peer.peer_id, "outgoing call timed out");
                let peer = peer.clone();
                self.state = CallState::Idle;
                vec![SignalMessage::Timeout(peer)]
            }
            CallState::OutgoingRejected { until, .. } if now >= *until => {
                self.state = CallState::Idle;
                Vec::new()
            }
            CallState::Incoming { peer, deadline } if now >= *deadline => {
                let peer = peer.clone();
                self.state = CallState::Idle;
                vec![SignalMessage::Missed(peer)]
            }
            _ => Vec::new(),
        }
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn session() -> (CallSession, MockClock) {
        let clock = MockClock::new();
        let session = CallSession::with_clock(Arc::new(clock.clone()));
        (session, clock)
    }

    fn peer(name: &str) -> PeerRef {
        PeerRef::new("session-1", name)
    }

    #[test]
    fn test_outgoing_call_accepted() {
        let (mut session, _clock) = session();
        let out = session.invite(peer("bob"));
        assert_eq!(out, vec![SignalMessage::Invite(peer("bob"))]);
        assert_eq!(session.status(), CallStatus::Outgoing);

        assert!(session
            .on_message(&SignalMessage::Accepted(peer("bob")))
            .is_empty());
        assert_eq!(session.status(), CallStatus::Connected);
    }

    #[test]
    fn test_incoming_call_accept_and_hang_up() {
        let (mut session, _clock) = session();
        session.on_message(&SignalMessage::Invite(peer("alice")));
        assert_eq!(session.status(), CallStatus::Incoming);

        let out = session.accept();
        assert_eq!(out, vec![SignalMessage::Accepted(peer("alice"))]);
        assert_eq!(session.status(), CallStatus::Connected);

        let out = session.hang_up();
        assert_eq!(out, vec![SignalMessage::Ended(peer("alice"))]);
        assert_eq!(session.status(), CallStatus::Idle);
    }

    #[test]
    fn test_invite_while_connected_is_ignored() {
        let (mut session, _clock) = session();
        session.on_message(&SignalMessage::Invite(peer("alice")));
        session.accept();
        assert_eq!(session.status(), CallStatus::Connected);

        let out = session.on_message(&SignalMessage::Invite(PeerRef::new(
            "session-2", "mallory",
        )));
        assert!(out.is_empty());
        assert_eq!(session.status(), CallStatus::Connected);
        assert_eq!(session.peer(), Some(&peer("alice")));
    }

    #[test]
    fn test_outgoing_timeout_emits_exactly_one_timeout() {
        let (mut session, clock) = session();
        session.invite(peer("bob"));

        clock.advance(Duration::from_millis(INVITE_TIMEOUT_MS - 1));
        assert!(session.poll().is_empty());

        clock.advance(Duration::from_millis(1));
        let out = session.poll();
        assert_eq!(out, vec![SignalMessage::Timeout(peer("bob"))]);
        assert_eq!(session.status(), CallStatus::Idle);

        // Further polls stay quiet.
        clock.advance(Duration::from_secs(60));
        assert!(session.poll().is_empty());
    }

    #[test]
    fn test_rejected_holds_then_idles() {
        let (mut session, clock) = session();
        session.invite(peer("bob"));
        session.on_message(&SignalMessage::Rejected(peer("bob")));
        assert_eq!(session.status(), CallStatus::OutgoingRejected);

        clock.advance(Duration::from_millis(REJECTED_HOLD_MS - 1));
        assert!(session.poll().is_empty());
        assert_eq!(session.status(), CallStatus::OutgoingRejected);

        clock.advance(Duration::from_millis(1));
        assert!(session.poll().is_empty());
        assert_eq!(session.status(), CallStatus::Idle);
    }

    #[test]
    fn test_cancel_only_while_ringing() {
        let (mut session, _clock) = session();
        assert!(session.cancel().is_empty());

        session.invite(peer("bob"));
        let out = session.cancel();
        assert_eq!(out, vec![SignalMessage::Cancelled(peer("bob"))]);
        assert_eq!(session.status(), CallStatus::Idle);

        // Connected calls are ended with hang_up, not cancel.
        session.on_message(&SignalMessage::Invite(peer("alice")));
        session.accept();
        assert!(session.cancel().is_empty());
        assert_eq!(session.status(), CallStatus::Connected);
    }

    #[test]
    fn test_incoming_cancelled_by_caller() {
        let (mut session, _clock) = session();
        session.on_message(&SignalMessage::Invite(peer("alice")));
        session.on_message(&SignalMessage::Cancelled(peer("alice")));
        assert_eq!(session.status(), CallStatus::Idle);
    }

    #[test]
    fn test_unanswered_incoming_goes_missed() {
        let (mut session, clock) = session();
        session.on_message(&SignalMessage::Invite(peer("alice")));
        clock.advance(Duration::from_millis(INVITE_TIMEOUT_MS));
        let out = session.poll();
        assert_eq!(out, vec![SignalMessage::Missed(peer("alice"))]);
        assert_eq!(session.status(), CallStatus::Idle);
    }

    #[test]
    fn test_transitions_are_idempotent() {
        let (mut session, _clock) = session();
        session.invite(peer("bob"));
        // Re-inviting while ringing is absorbed.
        assert!(session.invite(peer("bob")).is_empty());

        session.on_message(&SignalMessage::Accepted(peer("bob")));
        // A retransmitted accept changes nothing.
        assert!(session
            .on_message(&SignalMessage::Accepted(peer("bob")))
            .is_empty());
        assert_eq!(session.status(), CallStatus::Connected);

        session.hang_up();
        assert!(session.hang_up().is_empty());
        assert_eq!(session.status(), CallStatus::Idle);
    }

    #[test]
    fn test_stale_answer_from_wrong_peer_ignored() {
        let (mut session, _clock) = session();
        session.invite(peer("bob"));
        session.on_message(&SignalMessage::Accepted(peer("carol")));
        assert_eq!(session.status(), CallStatus::Outgoing);
    }

    #[test]
    fn test_reject_declines_incoming() {
        let (mut session, _clock) = session();
        session.on_message(&SignalMessage::Invite(peer("alice")));
        let out = session.reject();
        assert_eq!(out, vec![SignalMessage::Rejected(peer("alice"))]);
        assert_eq!(session.status(), CallStatus::Idle);
    }

    #[test]
    fn test_signal_message_wire_format() {
        let message = SignalMessage::Invite(PeerRef::new("s-1", "bob"));
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"type\":\"invite\""));
        assert!(json.contains("\"session_id\":\"s-1\""));

        let restored: SignalMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, message);
    }
}
