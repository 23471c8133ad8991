//! Threaded driver for the call session.
//!
//! Owns a [`CallSession`] on a dedicated thread, applying commands and
//! inbound messages as they arrive and polling for deadline-driven
//! transitions in between.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use crate::call::session::{CallSession, CallStatus, PeerRef, SignalMessage};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Commands accepted by the signaling thread.
#[derive(Debug, Clone)]
pub enum CallCommand {
    Invite(PeerRef),
    Accept,
    Reject,
    Cancel,
    HangUp,
    /// A message received from the signaling transport.
    Inbound(SignalMessage),
    Shutdown,
}

/// Handle to a running signaling thread.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) stops the
/// thread on its next tick, once the command channel disconnects.
pub struct SignalingHandle {
    commands: Sender<CallCommand>,
    outbound: Receiver<SignalMessage>,
    status: Arc<Mutex<CallStatus>>,
    thread: Option<JoinHandle<()>>,
}

impl SignalingHandle {
    pub fn invite(&self, peer: PeerRef) {
        self.commands.send(CallCommand::Invite(peer)).ok();
    }

    pub fn accept(&self) {
        self.commands.send(CallCommand::Accept).ok();
    }

    pub fn reject(&self) {
        self.commands.send(CallCommand::Reject).ok();
    }

    pub fn cancel(&self) {
        self.commands.send(CallCommand::Cancel).ok();
    }

    pub fn hang_up(&self) {
        self.commands.send(CallCommand::HangUp).ok();
    }

    /// Feeds a message received from the signaling transport.
    pub fn inbound(&self, message: SignalMessage) {
        self.commands.send(CallCommand::Inbound(message)).ok();
    }

    /// Messages to deliver to the peer over the signaling transport.
    pub fn outbound(&self) -> &Receiver<SignalMessage> {
        &self.outbound
    }

    /// Last observed session status.
    pub fn status(&self) -> CallStatus {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stops the signaling thread and waits for it to finish.
    pub fn shutdown(mut self) {
        self.commands.send(CallCommand::Shutdown).ok();
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

/// Spawns a signaling thread around `session`.
pub fn spawn(mut session: CallSession) -> SignalingHandle {
    let (command_tx, command_rx) = unbounded::<CallCommand>();
    let (outbound_tx, outbound_rx) = unbounded::<SignalMessage>();
    let status = Arc::new(Mutex::new(session.status()));
    let status_shared = Arc::clone(&status);

    let thread = thread::spawn(move || {
        loop {
            let outgoing = match command_rx.recv_timeout(POLL_INTERVAL) {
                Ok(CallCommand::Invite(peer)) => session.invite(peer),
                Ok(CallCommand::Accept) => session.accept(),
                Ok(CallCommand::Reject) => session.reject(),
                Ok(CallCommand::Cancel) => session.cancel(),
                Ok(CallCommand::HangUp) => session.hang_up(),
                Ok(CallCommand::Inbound(message)) => session.on_message(&message),
                Ok(CallCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => session.poll(),
            };

            for message in outgoing {
                if outbound_tx.send(message).is_err() {
                    break;
                }
            }

            let mut shared = status_shared
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *shared = session.status();
        }
        debug!("signaling thread stopped");
    });

    SignalingHandle {
        commands: command_tx,
        outbound: outbound_rx,
        status,
        thread: Some(thread),
    }
}
