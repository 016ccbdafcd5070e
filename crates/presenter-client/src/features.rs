//! Standard feature layer: everything the core table forwards.

use tracing::{debug, warn};

use crate::controls::NavigationState;
use crate::envelope::{
    Breadcrumb, CurrentEvent, DanmakuListType, OperationTag, OutboundAction, RoastReady, RoastStep,
    ScriptOption, ScriptOptions, ServerEvent,
};
use crate::lock::{ModalKind, ReleaseReason};
use crate::roast::ReadyOutcome;
use crate::router::{FeatureContext, FeatureDispatcher};
use crate::view::{
    CurrentEventView, ListClick, ListDisplay, RoastPromptView, ScriptBrowserView, Severity, UiEvent,
    format_progress,
};

/// Welcome and roast lists from the last fetches, keyed by one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedListCache {
    welcome: Vec<String>,
    roast: Vec<String>,
    subject: Option<String>,
}

impl FetchedListCache {
    #[must_use]
    pub fn subject_name(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn welcome(&self) -> &[String] {
        &self.welcome
    }

    #[must_use]
    pub fn roast(&self) -> &[String] {
        &self.roast
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.welcome.is_empty() && self.roast.is_empty()
    }

    /// Replace one side. A different subject clears both sides first.
    pub fn store(&mut self, list_type: DanmakuListType, subject: &str, items: Vec<String>) {
        let subject = subject.trim();
        if self.subject.as_deref() != Some(subject) {
            self.welcome.clear();
            self.roast.clear();
            self.subject = (!subject.is_empty()).then(|| subject.to_string());
        }
        match list_type {
            DanmakuListType::Welcome => self.welcome = items,
            DanmakuListType::Roast => self.roast = items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBrowserState {
    pub current_path: String,
    pub breadcrumb: Vec<Breadcrumb>,
    pub options: Vec<ScriptOption>,
    pub can_go_up: bool,
}

impl Default for ScriptBrowserState {
    fn default() -> Self {
        Self {
            current_path: ".".to_string(),
            breadcrumb: Vec::new(),
            options: Vec::new(),
            can_go_up: false,
        }
    }
}

impl ScriptBrowserState {
    fn apply(&mut self, update: &ScriptOptions) {
        if !update.current_path.trim().is_empty() {
            self.current_path = update.current_path.clone();
        }
        self.breadcrumb = update.breadcrumb.clone();
        self.options = update.options.clone();
        self.can_go_up = update.can_go_up;
    }

    fn view(&self) -> ScriptBrowserView {
        ScriptBrowserView {
            current_path: self.current_path.clone(),
            breadcrumb: self.breadcrumb.clone(),
            options: self.options.clone(),
            can_go_up: self.can_go_up,
        }
    }
}

/// Feature-owned state. Superseded wholesale by newer server pushes.
#[derive(Debug, Clone, Default)]
pub struct FeatureState {
    pub cache: FetchedListCache,
    pub script: ScriptBrowserState,
    pub navigation: NavigationState,
    pub current_event: Option<CurrentEventView>,
    pub reversal_scripts: Vec<String>,
}

/// Handles every forwarded message type of the presenter protocol.
#[derive(Debug, Default)]
pub struct StandardFeatures;

impl FeatureDispatcher for StandardFeatures {
    fn dispatch(&mut self, event: &ServerEvent, cx: &mut FeatureContext<'_>) {
        match event {
            ServerEvent::RegistrationSuccess { .. } => {
                cx.send(OutboundAction::BrowseScripts {
                    path: ".".to_string(),
                });
                cx.send(OutboundAction::GetCurrentState {});
            }
            ServerEvent::Status {
                severity,
                message,
                tag,
            } => on_status(cx, *severity, message.as_deref(), tag),
            ServerEvent::ScriptOptions(update) => {
                cx.state.script.apply(update);
                let view = cx.state.script.view();
                cx.show(UiEvent::ScriptBrowser(view));
            }
            ServerEvent::CurrentEvent(update) => on_current_event(cx, update),
            ServerEvent::EndOfScript { message } => {
                cx.state.navigation.can_go_next = false;
                cx.status(
                    Severity::Info,
                    message.clone().unwrap_or_else(|| "end of script".to_string()),
                );
            }
            ServerEvent::DanmakuList(list) => {
                let list_type = match list.danmaku_type.as_deref() {
                    Some("welcome") => Some(DanmakuListType::Welcome),
                    Some("roast") => Some(DanmakuListType::Roast),
                    _ => None,
                };
                if let Some(list_type) = list_type {
                    cx.state
                        .cache
                        .store(list_type, &list.streamer_name, list.danmaku_list.clone());
                }
                let label = list.danmaku_type.as_deref().unwrap_or("danmaku");
                show_list(
                    cx,
                    &format!("{label} danmaku for {}", list.streamer_name),
                    list.danmaku_list.clone(),
                    None,
                );
            }
            ServerEvent::ReversalList(list) => {
                let items = list
                    .reversal_list
                    .iter()
                    .map(|pair| format!("{} / {}", pair.danmaku_part, pair.read_part))
                    .collect();
                show_list(
                    cx,
                    &format!("reversal danmaku for {}", list.streamer_name),
                    items,
                    None,
                );
            }
            ServerEvent::CaptionsList(list) => {
                show_list(
                    cx,
                    &format!("captions for {}", list.topic_name),
                    list.captions_list.clone(),
                    None,
                );
            }
            ServerEvent::AntiFanQuotes(quotes) => {
                show_list(cx, "anti-fan quotes", quotes.clone(), None);
            }
            ServerEvent::ReversalScripts(scripts) => {
                cx.state.reversal_scripts = scripts.clone();
                show_list(
                    cx,
                    "reversal scripts",
                    scripts.clone(),
                    Some(ListClick::SendReversalScript),
                );
            }
            ServerEvent::RoastReady(ready) => on_roast_ready(cx, ready),
            ServerEvent::RoastStep(step) => on_roast_step(cx, step),
            ServerEvent::RoastFinished { message, .. } => {
                let was_active = cx.roast.finish();
                let released = if cx.lock.kind() == Some(ModalKind::RoastSequence) {
                    cx.lock.release(ReleaseReason::Finished)
                } else {
                    None
                };
                cx.status(
                    Severity::Info,
                    message
                        .clone()
                        .unwrap_or_else(|| "roast sequence finished".to_string()),
                );
                // Another operation still holding the lock keeps control with the server.
                if released.is_some() || (was_active && cx.lock.is_idle()) {
                    cx.restore_control();
                }
            }
            ServerEvent::AutoSendStarted { message, tag } => {
                let kind = ModalKind::infer(tag).unwrap_or(ModalKind::AutoSend);
                if !cx.lock.confirm(kind, cx.now) {
                    warn!(
                        started = kind.as_str(),
                        holding = ?cx.lock.kind(),
                        "server started an operation while another holds the lock"
                    );
                }
                cx.status(
                    Severity::Info,
                    message.clone().unwrap_or_else(|| format!("{} started", kind.label())),
                );
            }
            ServerEvent::AutoSendFinished { message, tag } => {
                on_send_done(cx, tag, ReleaseReason::Finished, Severity::Success, message.as_deref());
            }
            ServerEvent::AutoSendCancelled { message, tag } => {
                on_send_done(cx, tag, ReleaseReason::Cancelled, Severity::Info, message.as_deref());
            }
            ServerEvent::ReEnableControls { .. } | ServerEvent::Pong => {}
            ServerEvent::Other { kind } => debug!(kind = %kind, "ignoring presenter push"),
        }
    }
}

fn on_status(cx: &mut FeatureContext<'_>, severity: Severity, message: Option<&str>, tag: &OperationTag) {
    cx.status(severity, message.unwrap_or(severity.default_label()));
    if tag.is_empty() {
        return;
    }
    match severity {
        Severity::Error => {
            if ModalKind::RoastSequence.owns(tag) && cx.roast.recover_step() {
                // Back in StepReady: the sequence keeps its lock while the operator decides.
                if cx.lock.kind() == Some(ModalKind::RoastSequence) {
                    cx.lock.park();
                }
                return;
            }
            if cx.lock.release_owned(tag, ReleaseReason::ServerError).is_some() {
                cx.restore_control();
            }
        }
        Severity::Warning => {
            if cx.lock.roll_back(tag).is_some() {
                cx.restore_control();
            }
        }
        Severity::Info | Severity::Success => {
            cx.lock.observe(tag, cx.now);
        }
    }
}

fn on_current_event(cx: &mut FeatureContext<'_>, update: &CurrentEvent) {
    cx.state.navigation = NavigationState {
        can_go_prev: update.can_go_prev,
        can_go_next: update.can_go_next,
    };
    let view = CurrentEventView {
        script_name: update
            .script_name
            .clone()
            .unwrap_or_else(|| "no script loaded".to_string()),
        current_line: update.current_line.clone().unwrap_or_default(),
        presenter_prompt: update.presenter_prompt.clone().unwrap_or_default(),
        progress: format_progress(update.current_event_index, update.total_events),
    };
    cx.state.current_event = Some(view.clone());
    cx.show(UiEvent::CurrentEvent(view));
}

fn on_roast_ready(cx: &mut FeatureContext<'_>, ready: &RoastReady) {
    match cx.roast.on_ready(ready) {
        ReadyOutcome::Ready => {
            cx.lock.confirm(ModalKind::RoastSequence, cx.now);
            cx.lock.park();
            let text = ready.message.clone().unwrap_or_else(|| {
                format!(
                    "roast sequence for {} ready ({} lines)",
                    ready.target_name, ready.total_roasts
                )
            });
            cx.status(Severity::Success, text);
        }
        ReadyOutcome::Empty => {
            if cx.lock.kind() == Some(ModalKind::RoastSequence) {
                cx.lock.release(ReleaseReason::ServerError);
            }
            cx.status(
                Severity::Warning,
                format!("no roast lines available for {}", ready.target_name),
            );
            cx.restore_control();
        }
        ReadyOutcome::Ignored => {
            debug!(phase = cx.roast.phase().as_str(), "ignoring roast ready outside a fetch");
        }
    }
}

fn on_roast_step(cx: &mut FeatureContext<'_>, step: &RoastStep) {
    if let Err(error) = cx.roast.on_step(step) {
        warn!(error = %error, "rejecting roast step");
        cx.status(Severity::Warning, error.to_string());
        return;
    }
    if cx.lock.kind() == Some(ModalKind::RoastSequence) {
        cx.lock.confirm(ModalKind::RoastSequence, cx.now);
        cx.lock.park();
    }
    if let Some(session) = cx.roast.session() {
        let view = RoastPromptView {
            target_name: session.target_name.clone(),
            presenter_line: session.current_presenter_line.clone(),
            raw_template: session.current_raw_template.clone(),
            progress: session.progress(),
        };
        cx.show(UiEvent::RoastPrompt(view));
    }
}

fn on_send_done(
    cx: &mut FeatureContext<'_>,
    tag: &OperationTag,
    reason: ReleaseReason,
    severity: Severity,
    message: Option<&str>,
) {
    let released = if tag.is_empty() {
        match cx.lock.kind() {
            Some(ModalKind::RoastSequence) | None => None,
            Some(_) => cx.lock.release(reason),
        }
    } else {
        cx.lock.release_owned(tag, reason)
    };
    cx.status(severity, message.unwrap_or(reason.as_str()));
    if released.is_some() {
        cx.restore_control();
    }
}

fn show_list(cx: &mut FeatureContext<'_>, title: &str, items: Vec<String>, on_click: Option<ListClick>) {
    if items.is_empty() {
        cx.status(Severity::Info, format!("no results: {title}"));
        return;
    }
    cx.show(UiEvent::List(ListDisplay {
        title: format!("{title} ({})", items.len()),
        items,
        on_click,
    }));
}

/// Split a reversal script at its character midpoint: `(audience part, presenter part)`.
#[must_use]
pub fn split_reversal_script(script: &str) -> (String, String) {
    let midpoint = script.chars().count() / 2;
    let audience = script.chars().take(midpoint).collect();
    let presenter = script.chars().skip(midpoint).collect();
    (audience, presenter)
}
