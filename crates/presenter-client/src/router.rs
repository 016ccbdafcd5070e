//! Inbound envelope routing.
//!
//! Every decoded frame is offered to the core table first. Types the core knows are
//! either consumed there or forwarded afterwards; everything else goes to the single
//! registered feature dispatcher. A frame is never handed to features before the core.

use std::time::Instant;

use tracing::{debug, warn};

use crate::envelope::{Envelope, OutboundAction, ServerEvent};
use crate::features::FeatureState;
use crate::lock::ModalLock;
use crate::presenter::Effects;
use crate::roast::RoastSequence;
use crate::view::{Severity, UiEvent};

/// Message types the feature layer may receive without anyone handling them.
const IGNORE_WHEN_UNHANDLED: &[&str] = &["pong"];

/// What the core table does with a message it recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreDisposition {
    Consumed,
    Forward,
}

/// Core table keyed by message type.
#[must_use]
pub fn core_disposition(kind: &str) -> Option<CoreDisposition> {
    match kind {
        "pong" | "re_enable_auto_send_buttons" => Some(CoreDisposition::Consumed),
        "registration_success" => Some(CoreDisposition::Forward),
        _ => None,
    }
}

/// Which logical owner handled a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    CoreOnly,
    FeatureOnly,
    CoreThenFeature,
    /// Nobody was registered for the type; the operator was warned unless ignore-listed.
    Unhandled { kind: String },
    /// Decode failure reported as a status; the connection stays up.
    Malformed,
}

/// Handle returned by [`Router::register`]; pass it back to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureHandle(u64);

/// Receiver for every message the core table does not consume.
pub trait FeatureDispatcher: Send {
    fn dispatch(&mut self, event: &ServerEvent, cx: &mut FeatureContext<'_>);
}

/// Core side of routing: applies the bookkeeping for types in the core table and
/// lends its state to the feature layer.
pub trait CoreHandler {
    fn handle_core(&mut self, event: &ServerEvent, now: Instant);
    fn feature_context(&mut self, now: Instant) -> FeatureContext<'_>;
    fn report(&mut self, severity: Severity, text: String);
}

/// Mutable view of the presenter state lent to a feature dispatcher for one message.
pub struct FeatureContext<'a> {
    pub now: Instant,
    pub connected: bool,
    pub registered: bool,
    pub lock: &'a mut ModalLock,
    pub roast: &'a mut RoastSequence,
    pub state: &'a mut FeatureState,
    pub effects: &'a mut Effects,
}

impl FeatureContext<'_> {
    pub fn send(&mut self, action: OutboundAction) {
        self.effects.send(action);
    }

    pub fn show(&mut self, event: UiEvent) {
        self.effects.show(event);
    }

    pub fn status(&mut self, severity: Severity, text: impl Into<String>) {
        self.effects.show(UiEvent::status(severity, text));
    }

    /// Aftermath of returning control to the operator: a roast that never loaded is
    /// dropped, and unless a roast is still running the authoritative script state is
    /// requested again so navigation controls derive from fresh data.
    pub fn restore_control(&mut self) {
        restore_control(self.connected, self.roast, self.effects);
    }
}

pub(crate) fn restore_control(connected: bool, roast: &mut RoastSequence, effects: &mut Effects) {
    roast.settle();
    if connected && !roast.is_active() {
        effects.send(OutboundAction::GetCurrentState {});
        effects.send(OutboundAction::BrowseScripts {
            path: ".".to_string(),
        });
    }
}

#[derive(Default)]
pub struct Router {
    features: Option<(FeatureHandle, Box<dyn FeatureDispatcher>)>,
    next_handle: u64,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("features", &self.features.as_ref().map(|(handle, _)| *handle))
            .finish()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the feature dispatcher, replacing any previous one.
    pub fn register(&mut self, dispatcher: Box<dyn FeatureDispatcher>) -> FeatureHandle {
        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = FeatureHandle(self.next_handle);
        if self.features.replace((handle, dispatcher)).is_some() {
            debug!("replaced feature dispatcher");
        }
        handle
    }

    /// Remove the dispatcher if `handle` still identifies it.
    pub fn unregister(&mut self, handle: FeatureHandle) -> bool {
        match &self.features {
            Some((current, _)) if *current == handle => {
                self.features = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn has_features(&self) -> bool {
        self.features.is_some()
    }

    pub fn route<C: CoreHandler>(&mut self, text: &str, core: &mut C, now: Instant) -> RouteOutcome {
        let decoded = Envelope::decode(text).and_then(|envelope| {
            ServerEvent::from_envelope(&envelope).map(|event| (envelope.kind, event))
        });
        let (kind, event) = match decoded {
            Ok(decoded) => decoded,
            Err(error) => {
                warn!(error = %error, "dropping malformed envelope");
                core.report(Severity::Error, format!("malformed server message: {error}"));
                return RouteOutcome::Malformed;
            }
        };

        let disposition = core_disposition(&kind);
        if disposition.is_some() {
            core.handle_core(&event, now);
        }
        if disposition == Some(CoreDisposition::Consumed) {
            return RouteOutcome::CoreOnly;
        }

        let Some((_, features)) = self.features.as_mut() else {
            if disposition.is_some() {
                return RouteOutcome::CoreOnly;
            }
            if IGNORE_WHEN_UNHANDLED.contains(&kind.as_str()) {
                debug!(kind = %kind, "ignoring unhandled message");
            } else {
                warn!(kind = %kind, "no feature dispatcher registered");
                core.report(Severity::Warning, format!("unhandled server message: {kind}"));
            }
            return RouteOutcome::Unhandled { kind };
        };

        let mut cx = core.feature_context(now);
        features.dispatch(&event, &mut cx);
        if disposition.is_some() {
            RouteOutcome::CoreThenFeature
        } else {
            RouteOutcome::FeatureOnly
        }
    }
}
