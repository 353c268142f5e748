//! Correlation of controller replies with the outstanding request.
//!
//! The correlator is a pure state machine: callers pass in the current time
//! and drive the timer themselves from [`Correlator::deadline`].

use crate::exit::ExitStatus;
use clustermon_protocol::{AdminReply, ReplyRejection, MSG_TYPE_RESPONSE};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

/// How many replies a command waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyExpectation {
    /// Fire and forget.
    None,
    /// Wait for this many valid replies.
    Replies(u32),
}

impl ReplyExpectation {
    /// Number of replies to wait for.
    pub fn count(self) -> u32 {
        match self {
            ReplyExpectation::None => 0,
            ReplyExpectation::Replies(n) => n,
        }
    }
}

/// Lifecycle of a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing sent yet.
    Idle,
    /// Waiting for replies; the timer is armed.
    Waiting,
    /// All expected replies arrived.
    Complete,
    /// The timer fired.
    TimedOut,
    /// The connection was lost.
    Disconnected,
}

impl Phase {
    /// Returns true once the request can make no further progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::TimedOut | Phase::Disconnected)
    }
}

/// Bookkeeping for the single outstanding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Correlation reference of the request.
    pub reference: Option<String>,
    /// Replies still needed to complete, as a total.
    pub expected: u32,
    /// Valid replies received so far.
    pub received: u32,
    /// When the timer fires, while waiting.
    pub deadline: Option<Instant>,
    /// Current phase.
    pub phase: Phase,
}

impl PendingRequest {
    fn idle() -> Self {
        Self {
            reference: None,
            expected: 0,
            received: 0,
            deadline: None,
            phase: Phase::Idle,
        }
    }
}

/// Result of feeding one inbound message to the correlator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The message could not be decoded.
    Unparsable,
    /// The message failed validation.
    Rejected(ReplyRejection),
    /// The message was counted.
    Accepted {
        /// The decoded reply.
        reply: AdminReply,
        /// True if this reply completed the request.
        complete: bool,
    },
    /// Nothing is being waited for.
    Ignored,
}

/// Counts replies to one request and enforces an inactivity timeout.
///
/// The timer is armed when waiting starts and re-armed by every valid reply.
/// Messages that fail decoding or validation leave it untouched.
#[derive(Debug, Clone)]
pub struct Correlator {
    timeout: Duration,
    pending: PendingRequest,
}

impl Correlator {
    /// Creates an idle correlator.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: PendingRequest::idle(),
        }
    }

    /// Returns the inactivity timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the pending request.
    pub fn pending(&self) -> &PendingRequest {
        &self.pending
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.pending.phase
    }

    /// Returns true while replies are awaited.
    pub fn is_waiting(&self) -> bool {
        self.pending.phase == Phase::Waiting
    }

    /// Returns when the timer fires, if it is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.pending.phase {
            Phase::Waiting => self.pending.deadline,
            _ => None,
        }
    }

    /// Starts tracking a sent request.
    ///
    /// Returns true if replies are awaited. A request expecting no replies
    /// completes immediately and never arms the timer.
    pub fn begin(
        &mut self,
        reference: Option<String>,
        expectation: ReplyExpectation,
        now: Instant,
    ) -> bool {
        let expected = expectation.count();
        self.pending = PendingRequest {
            reference,
            expected,
            received: 0,
            deadline: None,
            phase: Phase::Complete,
        };
        if expected == 0 {
            return false;
        }

        self.pending.phase = Phase::Waiting;
        self.pending.deadline = Some(now + self.timeout);
        trace!(expected, timeout_ms = self.timeout.as_millis() as u64, "waiting for replies");
        true
    }

    /// Feeds one inbound message.
    pub fn on_reply(&mut self, raw: &[u8], now: Instant) -> ReplyOutcome {
        if self.pending.phase != Phase::Waiting {
            debug!(phase = ?self.pending.phase, "ignoring message received while not waiting");
            return ReplyOutcome::Ignored;
        }

        let reply = match AdminReply::decode(raw) {
            Ok(reply) => reply,
            Err(e) => {
                info!(error = %e, "message was not valid, discarding");
                return ReplyOutcome::Unparsable;
            }
        };

        if let Err(rejection) = reply.validate(MSG_TYPE_RESPONSE, self.pending.reference.as_deref()) {
            info!(%rejection, "message was not valid, discarding");
            return ReplyOutcome::Rejected(rejection);
        }

        self.pending.received += 1;
        trace!(
            received = self.pending.received,
            expected = self.pending.expected,
            "received expected reply"
        );

        let complete = self.pending.received >= self.pending.expected;
        if complete {
            self.pending.phase = Phase::Complete;
            self.pending.deadline = None;
            trace!("received all expected replies");
        } else {
            self.pending.deadline = Some(now + self.timeout);
        }
        ReplyOutcome::Accepted { reply, complete }
    }

    /// Handles the timer firing.
    pub fn on_timeout(&mut self) -> ExitStatus {
        error!(
            waited_secs = self.timeout.as_secs(),
            received = self.pending.received,
            expected = self.pending.expected,
            "No messages received in {} seconds.. aborting",
            self.timeout.as_secs()
        );
        self.pending.phase = Phase::TimedOut;
        self.pending.deadline = None;
        ExitStatus::Timeout
    }

    /// Handles loss of the connection.
    ///
    /// A wait in progress stops the same way an expired timer does and
    /// yields [`ExitStatus::Timeout`]. Losing the connection before any wait
    /// started yields [`ExitStatus::Disconnect`].
    pub fn on_disconnect(&mut self) -> ExitStatus {
        let status = if self.pending.phase == Phase::Waiting {
            error!(
                received = self.pending.received,
                expected = self.pending.expected,
                "connection to controller was terminated while waiting for replies"
            );
            ExitStatus::Timeout
        } else {
            error!("connection to controller was terminated");
            ExitStatus::Disconnect
        };
        self.pending.phase = Phase::Disconnected;
        self.pending.deadline = None;
        status
    }
}
