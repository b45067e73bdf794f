//! Connection lifecycle state machine.
//!
//! Pure bookkeeping, no I/O and no clocks: the session driver reports what
//! happened on the socket and this machine answers with what to do next. Retry
//! pacing is a fixed delay with a hard attempt cap; a successful connection
//! refunds the whole budget.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Connected,
    /// Retry budget exhausted. Terminal until the next attach.
    Failed,
}

impl StreamState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPlan {
    /// Ordinal of the attempt this plan schedules, 1-based.
    pub attempt: u32,
    pub delay: Duration,
}

/// What the driver should do after a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    Retry(ReconnectPlan),
    GiveUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLifecycle {
    state: StreamState,
    connect_attempts: u32,
    reconnect_delay: Duration,
    max_attempts: u32,
}

impl StreamLifecycle {
    pub fn new(reconnect_delay: Duration, max_attempts: u32) -> Self {
        Self {
            state: StreamState::Disconnected,
            connect_attempts: 0,
            reconnect_delay,
            max_attempts,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    /// Record that a connection open is about to start. Counted against the
    /// retry budget before the dial, so a never-reachable endpoint is dialed
    /// exactly `max_attempts` times.
    pub fn mark_connecting(&mut self) {
        self.state = StreamState::Connecting;
        self.connect_attempts = self.connect_attempts.saturating_add(1);
    }

    /// Record an established connection. Resets the attempt budget.
    pub fn mark_connected(&mut self) {
        self.state = StreamState::Connected;
        self.connect_attempts = 0;
    }

    /// Record that the connection closed or the open failed, and decide
    /// whether to retry.
    #[must_use]
    pub fn mark_disconnected(&mut self) -> ReconnectDecision {
        if self.connect_attempts >= self.max_attempts {
            self.state = StreamState::Failed;
            return ReconnectDecision::GiveUp;
        }
        self.state = StreamState::Disconnected;
        ReconnectDecision::Retry(ReconnectPlan {
            attempt: self.connect_attempts.saturating_add(1),
            delay: self.reconnect_delay,
        })
    }

    /// Deliberate teardown. The budget is irrelevant once detached; the next
    /// attach starts from a fresh machine.
    pub fn mark_detached(&mut self) {
        self.state = StreamState::Disconnected;
    }

    pub fn reset(&mut self) {
        self.state = StreamState::Disconnected;
        self.connect_attempts = 0;
    }
}
