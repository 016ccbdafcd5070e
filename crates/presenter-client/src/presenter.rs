//! The single explicit state container for one operator session.
//!
//! `Presenter` is synchronous and clock-injected. Every input (connection lifecycle,
//! inbound frame, operator intent, timer tick) mutates state through the transitions of
//! the session, lock and roast machines and queues [`Effects`]; the async driver in
//! [`crate::runtime`] flushes them after each step.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::controls::{ControlBoard, ControlInputs};
use crate::envelope::{OutboundAction, ServerEvent};
use crate::error::{ClientError, Result};
use crate::features::{FeatureState, StandardFeatures};
use crate::lock::{ModalLock, ReleaseReason};
use crate::roast::RoastSequence;
use crate::router::{
    self, CoreHandler, FeatureContext, FeatureDispatcher, FeatureHandle, RouteOutcome, Router,
};
use crate::search::SuggestionTracker;
use crate::session::{
    CloseCode, CloseOutcome, ConnectDecision, ConnectionState, ReconnectPlan, Session,
};
use crate::view::{ControlGroup, Severity, UiEvent};

/// Outbound actions and renderer events queued by one processing step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub outbound: Vec<OutboundAction>,
    pub ui: Vec<UiEvent>,
}

impl Effects {
    pub fn send(&mut self, action: OutboundAction) {
        self.outbound.push(action);
    }

    pub fn show(&mut self, event: UiEvent) {
        self.ui.push(event);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.ui.is_empty()
    }

    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// State the router's core table and the feature layer share.
#[derive(Debug)]
pub struct CoreState {
    pub(crate) lock: ModalLock,
    pub(crate) roast: RoastSequence,
    pub(crate) features: FeatureState,
    pub(crate) controls: ControlBoard,
    pub(crate) effects: Effects,
    pub(crate) connected: bool,
    pub(crate) registered: bool,
}

impl CoreState {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            lock: ModalLock::new(config.lock_timeout),
            roast: RoastSequence::default(),
            features: FeatureState::default(),
            controls: ControlBoard::default(),
            effects: Effects::default(),
            connected: false,
            registered: false,
        }
    }

    pub(crate) fn reconcile_controls(&mut self) {
        let inputs = ControlInputs {
            lock: &self.lock,
            roast: &self.roast,
            navigation: self.features.navigation,
        };
        self.controls.reconcile(&inputs, &mut self.effects.ui);
    }

    pub(crate) fn status(&mut self, severity: Severity, text: impl Into<String>) {
        self.effects.show(UiEvent::status(severity, text));
    }

    pub(crate) fn restore_control(&mut self) {
        router::restore_control(self.connected, &mut self.roast, &mut self.effects);
    }
}

impl CoreHandler for CoreState {
    fn handle_core(&mut self, event: &ServerEvent, _now: Instant) {
        match event {
            ServerEvent::RegistrationSuccess {
                client_type,
                message,
            } => {
                self.registered = true;
                let client_type = client_type.as_deref().unwrap_or("presenter");
                info!(client_type, "registered with control server");
                let text = message
                    .clone()
                    .unwrap_or_else(|| format!("registered as {client_type}"));
                self.status(Severity::Success, text);
            }
            ServerEvent::Pong => debug!("keepalive reply"),
            ServerEvent::ReEnableControls { message, tag } => {
                if let Some(message) = message {
                    self.status(Severity::Info, message.clone());
                }
                let released = if tag.is_empty() {
                    self.lock.release(ReleaseReason::ServerSignal)
                } else {
                    self.lock.release_owned(tag, ReleaseReason::ServerSignal)
                };
                if let Some(released) = released {
                    debug!(kind = released.kind.as_str(), "server returned control");
                }
                let settled = self.roast.settle();
                if released.is_some() || settled {
                    self.restore_control();
                }
            }
            other => warn!(?other, "core table received a type it does not own"),
        }
    }

    fn feature_context(&mut self, now: Instant) -> FeatureContext<'_> {
        FeatureContext {
            now,
            connected: self.connected,
            registered: self.registered,
            lock: &mut self.lock,
            roast: &mut self.roast,
            state: &mut self.features,
            effects: &mut self.effects,
        }
    }

    fn report(&mut self, severity: Severity, text: String) {
        self.status(severity, text);
    }
}

/// One operator session: connection lifecycle, routing, lock and roast state.
#[derive(Debug)]
pub struct Presenter {
    pub(crate) session: Session,
    pub(crate) router: Router,
    pub(crate) core: CoreState,
    pub(crate) suggestions: SuggestionTracker,
    client_type: String,
}

impl Presenter {
    /// Bare presenter with no feature dispatcher. The initial control states are queued.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let mut presenter = Self {
            session: Session::new(config.client_type.clone(), config.reconnect.clone()),
            router: Router::new(),
            core: CoreState::new(config),
            suggestions: SuggestionTracker::new(config.search_limit),
            client_type: config.client_type.clone(),
        };
        presenter.core.reconcile_controls();
        presenter
    }

    #[must_use]
    pub fn with_standard_features(config: &ClientConfig) -> Self {
        let mut presenter = Self::new(config);
        presenter.register_features(Box::new(StandardFeatures));
        presenter
    }

    pub fn register_features(&mut self, dispatcher: Box<dyn FeatureDispatcher>) -> FeatureHandle {
        self.router.register(dispatcher)
    }

    pub fn unregister_features(&mut self, handle: FeatureHandle) -> bool {
        self.router.unregister(handle)
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn lock(&self) -> &ModalLock {
        &self.core.lock
    }

    #[must_use]
    pub fn roast(&self) -> &RoastSequence {
        &self.core.roast
    }

    #[must_use]
    pub fn features(&self) -> &FeatureState {
        &self.core.features
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.core.registered
    }

    #[must_use]
    pub fn is_enabled(&self, group: ControlGroup) -> bool {
        self.core.controls.is_enabled(group)
    }

    pub fn take_effects(&mut self) -> Effects {
        self.core.effects.take()
    }

    /// Idempotent; a manual connect also cancels a pending reconnect.
    pub fn connect(&mut self) -> ConnectDecision {
        let decision = self.session.begin_connect();
        if decision == ConnectDecision::Start {
            self.core.effects.show(UiEvent::Connection {
                state: ConnectionState::Connecting,
                detail: "connecting".to_string(),
            });
        }
        decision
    }

    pub fn on_open(&mut self) {
        self.session.mark_open();
        self.core.connected = true;
        self.core.registered = false;
        info!(identity = self.session.identity(), "connection open");
        self.core.effects.show(UiEvent::Connection {
            state: ConnectionState::Open,
            detail: "connected".to_string(),
        });
        self.core.effects.send(OutboundAction::Register {
            client_type: self.client_type.clone(),
        });
        self.core.reconcile_controls();
    }

    /// Failed attempt: treated like an abnormal close so the reconnect policy applies.
    pub fn on_connect_failed(&mut self, error: &ClientError, now: Instant) -> CloseOutcome {
        self.on_closed(CloseCode::ABNORMAL, Some(error.to_string()), now)
    }

    /// Close of any kind. Whatever held the lock is force-released in this same step.
    pub fn on_closed(
        &mut self,
        code: CloseCode,
        reason: Option<String>,
        now: Instant,
    ) -> CloseOutcome {
        let outcome = self.session.mark_closed(code, reason.clone(), now);
        self.core.connected = false;
        self.core.registered = false;

        if let Some(released) = self.core.lock.release(ReleaseReason::Disconnected) {
            info!(kind = released.kind.as_str(), "released lock on disconnect");
        }
        self.core.roast.abort();

        let detail = reason.unwrap_or_else(|| format!("closed with code {}", code.0));
        self.core.effects.show(UiEvent::Connection {
            state: ConnectionState::Disconnected,
            detail,
        });

        let (severity, text) = match &outcome.plan {
            ReconnectPlan::Scheduled(pending) => (
                Severity::Error,
                format!(
                    "disconnected (code {}), reconnecting in {} ms",
                    code.0, pending.attempt_delay_ms
                ),
            ),
            ReconnectPlan::Terminal => (
                Severity::Error,
                format!("connection closed by server (code {})", code.0),
            ),
            ReconnectPlan::Exhausted { attempts } => (
                Severity::Error,
                format!(
                    "disconnected (code {}), giving up after {attempts} reconnect attempts",
                    code.0
                ),
            ),
            ReconnectPlan::Suppressed => (Severity::Info, "disconnected".to_string()),
        };
        warn!(code = code.0, plan = ?outcome.plan, "connection closed");
        self.core.status(severity, text);
        self.core.reconcile_controls();
        outcome
    }

    /// Local teardown; the close that follows does not reconnect.
    pub fn begin_shutdown(&mut self) {
        self.session.begin_shutdown();
    }

    pub fn on_frame(&mut self, text: &str, now: Instant) -> RouteOutcome {
        let outcome = self.router.route(text, &mut self.core, now);
        self.core.reconcile_controls();
        outcome
    }

    /// Earliest instant at which [`Presenter::poll_timers`] has work to do.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        let reconnect = self
            .session
            .pending_reconnect()
            .map(|pending| pending.scheduled_at);
        match (reconnect, self.core.lock.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Expire a stalled lock and report whether a reconnect attempt is due.
    pub fn poll_timers(&mut self, now: Instant) -> bool {
        if let Some(released) = self.core.lock.expire(now) {
            warn!(kind = released.kind.as_str(), "lock timed out waiting for the server");
            self.core.roast.abort();
            self.core.status(
                Severity::Warning,
                format!(
                    "{} timed out waiting for the server; controls restored",
                    released.kind.label()
                ),
            );
            self.core.restore_control();
        }
        let due = self.session.take_due_reconnect(now);
        self.core.reconcile_controls();
        due
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.session.is_open() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}
