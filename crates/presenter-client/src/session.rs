use std::time::{Duration, Instant};

use crate::config::ReconnectConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
        }
    }
}

/// Websocket close code as reported by the peer or synthesized for abnormal drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    pub const NORMAL: Self = Self(1000);
    pub const GOING_AWAY: Self = Self(1001);
    pub const ABNORMAL: Self = Self(1006);
    pub const POLICY_VIOLATION: Self = Self(1008);

    /// The server ended the session on purpose; reconnecting would be wrong.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self.0, 1000 | 1001 | 1008)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReconnect {
    pub scheduled_at: Instant,
    pub attempt_delay_ms: u64,
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectDecision {
    Start,
    AlreadyActive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectPlan {
    Scheduled(PendingReconnect),
    Terminal,
    Exhausted { attempts: u32 },
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
    pub was_open: bool,
    pub code: CloseCode,
    pub plan: ReconnectPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub identity: String,
    pub connect_attempts: u32,
    pub reconnect_attempts: u32,
    pub next_retry_ms: Option<u64>,
    pub last_error: Option<String>,
}

/// Connection lifecycle for one operator identity.
#[derive(Debug, Clone)]
pub struct Session {
    identity: String,
    policy: ReconnectConfig,
    state: ConnectionState,
    last_error: Option<String>,
    pending: Option<PendingReconnect>,
    connect_attempts: u32,
    reconnect_attempts: u32,
    closing: bool,
}

impl Session {
    pub fn new(identity: impl Into<String>, policy: ReconnectConfig) -> Self {
        Self {
            identity: identity.into(),
            policy,
            state: ConnectionState::Disconnected,
            last_error: None,
            pending: None,
            connect_attempts: 0,
            reconnect_attempts: 0,
            closing: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn pending_reconnect(&self) -> Option<&PendingReconnect> {
        self.pending.as_ref()
    }

    /// Idempotent: a no-op while Open or Connecting. Starting an attempt cancels any pending timer.
    pub fn begin_connect(&mut self) -> ConnectDecision {
        if matches!(self.state, ConnectionState::Open | ConnectionState::Connecting) {
            return ConnectDecision::AlreadyActive;
        }
        self.pending = None;
        self.closing = false;
        self.state = ConnectionState::Connecting;
        self.connect_attempts = self.connect_attempts.saturating_add(1);
        ConnectDecision::Start
    }

    pub fn mark_open(&mut self) {
        self.state = ConnectionState::Open;
        self.last_error = None;
        self.pending = None;
        self.reconnect_attempts = 0;
    }

    /// Local teardown; the following close must not schedule a reconnect.
    pub fn begin_shutdown(&mut self) {
        self.closing = true;
        self.pending = None;
    }

    #[must_use]
    pub fn mark_closed(
        &mut self,
        code: CloseCode,
        reason: Option<String>,
        now: Instant,
    ) -> CloseOutcome {
        let was_open = self.state == ConnectionState::Open;
        self.state = ConnectionState::Disconnected;
        self.last_error = Some(reason.unwrap_or_else(|| format!("closed with code {}", code.0)));
        self.pending = None;

        let plan = if self.closing {
            ReconnectPlan::Suppressed
        } else if code.is_terminal() {
            ReconnectPlan::Terminal
        } else {
            let attempt = self.reconnect_attempts.saturating_add(1);
            match self.policy.delay_for(attempt) {
                Some(delay) => {
                    self.reconnect_attempts = attempt;
                    let pending = PendingReconnect {
                        scheduled_at: now + delay,
                        attempt_delay_ms: delay_ms(delay),
                        attempt,
                    };
                    self.pending = Some(pending.clone());
                    ReconnectPlan::Scheduled(pending)
                }
                None => ReconnectPlan::Exhausted {
                    attempts: self.reconnect_attempts,
                },
            }
        };

        CloseOutcome {
            was_open,
            code,
            plan,
        }
    }

    /// Consume the pending timer if it is due.
    pub fn take_due_reconnect(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some(pending) if pending.scheduled_at <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            identity: self.identity.clone(),
            connect_attempts: self.connect_attempts,
            reconnect_attempts: self.reconnect_attempts,
            next_retry_ms: self.pending.as_ref().map(|pending| pending.attempt_delay_ms),
            last_error: self.last_error.clone(),
        }
    }
}

fn delay_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{CloseCode, ConnectDecision, ConnectionState, ReconnectPlan, Session};
    use crate::config::ReconnectConfig;

    fn open_session() -> Session {
        let mut session = Session::new("presenter", ReconnectConfig::default());
        assert_eq!(session.begin_connect(), ConnectDecision::Start);
        session.mark_open();
        session
    }

    #[test]
    fn connect_is_idempotent_while_active() {
        let mut session = Session::new("presenter", ReconnectConfig::default());
        assert_eq!(session.begin_connect(), ConnectDecision::Start);
        assert_eq!(session.begin_connect(), ConnectDecision::AlreadyActive);
        session.mark_open();
        assert_eq!(session.begin_connect(), ConnectDecision::AlreadyActive);
        assert_eq!(session.snapshot().connect_attempts, 1);
    }

    #[test]
    fn terminal_close_codes_never_schedule_reconnect() {
        for code in [CloseCode::NORMAL, CloseCode::GOING_AWAY, CloseCode::POLICY_VIOLATION] {
            let mut session = open_session();
            let outcome = session.mark_closed(code, None, Instant::now());
            assert!(outcome.was_open);
            assert_eq!(outcome.plan, ReconnectPlan::Terminal, "code {}", code.0);
            assert!(session.pending_reconnect().is_none());
            assert_eq!(session.state(), ConnectionState::Disconnected);
        }
    }

    #[test]
    fn other_close_codes_schedule_exactly_one_reconnect() {
        let now = Instant::now();
        for code in [CloseCode::ABNORMAL, CloseCode(1011), CloseCode(4000)] {
            let mut session = open_session();
            let outcome = session.mark_closed(code, Some("reset".to_string()), now);
            let ReconnectPlan::Scheduled(pending) = outcome.plan else {
                panic!("code {} should schedule a reconnect", code.0);
            };
            assert_eq!(pending.attempt_delay_ms, 3_000);
            assert_eq!(pending.scheduled_at, now + Duration::from_millis(3_000));
            assert_eq!(session.pending_reconnect(), Some(&pending));
            assert_eq!(session.last_error(), Some("reset"));
        }
    }

    #[test]
    fn manual_connect_cancels_pending_timer() {
        let now = Instant::now();
        let mut session = open_session();
        let _ = session.mark_closed(CloseCode::ABNORMAL, None, now);
        assert!(session.pending_reconnect().is_some());

        assert_eq!(session.begin_connect(), ConnectDecision::Start);
        assert!(session.pending_reconnect().is_none());
        assert!(!session.take_due_reconnect(now + Duration::from_secs(10)));
    }

    #[test]
    fn pending_timer_fires_only_when_due() {
        let now = Instant::now();
        let mut session = open_session();
        let _ = session.mark_closed(CloseCode::ABNORMAL, None, now);
        assert!(!session.take_due_reconnect(now + Duration::from_millis(2_999)));
        assert!(session.take_due_reconnect(now + Duration::from_millis(3_000)));
        assert!(!session.take_due_reconnect(now + Duration::from_millis(6_000)));
    }

    #[test]
    fn failed_attempts_back_off_until_exhausted() {
        let now = Instant::now();
        let mut session = Session::new(
            "presenter",
            ReconnectConfig {
                delay_ms: 100,
                max_delay_ms: 250,
                max_attempts: Some(3),
            },
        );
        let mut delays = Vec::new();
        for _ in 0..3 {
            let _ = session.begin_connect();
            match session.mark_closed(CloseCode::ABNORMAL, None, now).plan {
                ReconnectPlan::Scheduled(pending) => delays.push(pending.attempt_delay_ms),
                other => panic!("unexpected plan: {other:?}"),
            }
        }
        assert_eq!(delays, vec![100, 200, 250]);

        let _ = session.begin_connect();
        let outcome = session.mark_closed(CloseCode::ABNORMAL, None, now);
        assert_eq!(outcome.plan, ReconnectPlan::Exhausted { attempts: 3 });
        assert!(!outcome.was_open);

        let _ = session.begin_connect();
        session.mark_open();
        assert_eq!(session.snapshot().reconnect_attempts, 0);
    }

    #[test]
    fn local_shutdown_suppresses_reconnect() {
        let mut session = open_session();
        session.begin_shutdown();
        let outcome = session.mark_closed(CloseCode::ABNORMAL, None, Instant::now());
        assert_eq!(outcome.plan, ReconnectPlan::Suppressed);
        assert!(session.pending_reconnect().is_none());
    }
}
