//! Operator intents turned into outbound actions.
//!
//! `Presenter::dispatch` checks, in order: the control group is available, the input
//! validates, the transport is open. Exclusive actions take the modal lock in the same
//! call, before the action is queued, so nothing can slip in between validation and
//! acquisition. A rejected intent queues nothing but its one status line.

use std::time::Instant;

use tracing::debug;

use crate::controls::{ControlInputs, derive_enabled};
use crate::envelope::{BossDanmakuType, DanmakuListType, OutboundAction};
use crate::error::{ClientError, InputField, Result, ValidationError};
use crate::features::split_reversal_script;
use crate::lock::{ModalKind, ReleaseReason};
use crate::presenter::Presenter;
use crate::view::{ControlGroup, Severity, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    Space,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorIntent {
    BrowseScripts {
        path: String,
    },
    BrowseUp,
    /// Directory entries browse into, file entries load.
    OpenScriptOption {
        index: usize,
    },
    LoadScript {
        filename: String,
    },
    PrevEvent,
    NextEvent,
    RefreshState,
    FetchDanmaku {
        streamer_name: String,
        list_type: DanmakuListType,
    },
    FetchReversal {
        streamer_name: String,
    },
    FetchCaptions {
        topic_name: String,
    },
    FetchAntiFanQuotes,
    FetchComplaints,
    FetchBigBrotherWelcome,
    FetchGiftThanks,
    FetchReversalScripts,
    SelectReversalScript {
        index: usize,
    },
    SendBossDanmaku {
        danmaku_type: BossDanmakuType,
        boss_name: String,
        gift_name: String,
    },
    AutoSend {
        streamer_name: String,
    },
    StartRoast {
        target_name: String,
    },
    AdvanceRoast,
    ExitRoast,
    Shortcut {
        key: ShortcutKey,
        focus_in_input: bool,
    },
}

impl OperatorIntent {
    /// Control group that must be enabled for the intent to run.
    #[must_use]
    pub fn control_group(&self) -> Option<ControlGroup> {
        match self {
            Self::BrowseScripts { .. }
            | Self::BrowseUp
            | Self::OpenScriptOption { .. }
            | Self::LoadScript { .. } => Some(ControlGroup::ScriptBrowse),
            Self::PrevEvent => Some(ControlGroup::NavigatePrev),
            Self::NextEvent => Some(ControlGroup::NavigateNext),
            Self::FetchDanmaku { .. }
            | Self::FetchReversal { .. }
            | Self::FetchCaptions { .. }
            | Self::FetchAntiFanQuotes
            | Self::FetchComplaints
            | Self::FetchBigBrotherWelcome
            | Self::FetchGiftThanks
            | Self::FetchReversalScripts => Some(ControlGroup::Fetch),
            Self::SendBossDanmaku { .. } => Some(ControlGroup::BossDanmaku),
            Self::AutoSend { .. } => Some(ControlGroup::AutoSend),
            Self::StartRoast { .. } => Some(ControlGroup::RoastStart),
            Self::AdvanceRoast => Some(ControlGroup::RoastAdvance),
            Self::ExitRoast => Some(ControlGroup::RoastExit),
            Self::RefreshState | Self::SelectReversalScript { .. } | Self::Shortcut { .. } => None,
        }
    }
}

/// Validated request ready to commit.
#[derive(Debug)]
struct Plan {
    action: OutboundAction,
    exclusive: Option<ModalKind>,
    step: LocalStep,
}

#[derive(Debug)]
enum LocalStep {
    None,
    BeginRoast(String),
    AdvanceRoast,
    ExitRoast,
}

impl Plan {
    fn send(action: OutboundAction) -> Self {
        Self {
            action,
            exclusive: None,
            step: LocalStep::None,
        }
    }
}

fn required(value: &str, field: InputField) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field).into());
    }
    Ok(value.to_string())
}

impl Presenter {
    /// Validate and send one operator intent.
    pub fn dispatch(&mut self, intent: OperatorIntent, now: Instant) -> Result<()> {
        let result = self.dispatch_inner(intent, now);
        if let Err(error) = &result {
            let severity = match error {
                ClientError::Validation(_)
                | ClientError::OperationInProgress(_)
                | ClientError::ControlUnavailable(_) => Severity::Warning,
                _ => Severity::Error,
            };
            debug!(error = %error, "intent rejected");
            self.core.status(severity, error.to_string());
        }
        self.core.reconcile_controls();
        result
    }

    fn dispatch_inner(&mut self, intent: OperatorIntent, now: Instant) -> Result<()> {
        if let OperatorIntent::Shortcut {
            key,
            focus_in_input,
        } = intent
        {
            return match self.resolve_shortcut(key, focus_in_input) {
                Some(intent) => self.dispatch_inner(intent, now),
                None => Ok(()),
            };
        }
        if let Some(group) = intent.control_group() {
            self.check_available(group)?;
        }
        if let OperatorIntent::SelectReversalScript { index } = intent {
            return self.send_reversal_script(index);
        }

        let plan = self.plan(intent)?;
        self.ensure_connected()?;
        if let Some(kind) = plan.exclusive {
            self.core.lock.try_acquire(kind, now)?;
        }
        let exits_roast = matches!(plan.step, LocalStep::ExitRoast);
        match plan.step {
            LocalStep::None => {}
            LocalStep::BeginRoast(target) => {
                if let Err(error) = self.core.roast.begin_fetch(&target) {
                    self.core.lock.release(ReleaseReason::RolledBack);
                    return Err(error);
                }
                self.core
                    .status(Severity::Info, format!("fetching roast lines for {target}"));
            }
            LocalStep::AdvanceRoast => {
                self.core.roast.begin_advance()?;
                match self.core.lock.kind() {
                    Some(ModalKind::RoastSequence) => self.core.lock.resume(now),
                    // A generic unlock freed the sequence's lock; the step needs a deadline.
                    None => self.core.lock.try_acquire(ModalKind::RoastSequence, now)?,
                    Some(_) => {}
                }
            }
            LocalStep::ExitRoast => {}
        }
        if let Some(kind) = plan.exclusive
            && kind != ModalKind::RoastSequence
        {
            self.core
                .status(Severity::Info, format!("{} requested", kind.label()));
        }
        self.core.effects.send(plan.action);

        if exits_roast {
            self.core.roast.finish();
            if self.core.lock.kind() == Some(ModalKind::RoastSequence) {
                self.core.lock.release(ReleaseReason::Finished);
            }
            self.core.restore_control();
        }
        Ok(())
    }

    fn check_available(&self, group: ControlGroup) -> Result<()> {
        if let Some(kind) = self.core.lock.kind()
            && kind.suppresses(group)
        {
            return Err(ClientError::OperationInProgress(kind));
        }
        let inputs = ControlInputs {
            lock: &self.core.lock,
            roast: &self.core.roast,
            navigation: self.core.features.navigation,
        };
        if derive_enabled(group, &inputs) {
            Ok(())
        } else {
            Err(ClientError::ControlUnavailable(group.as_str().to_string()))
        }
    }

    fn plan(&self, intent: OperatorIntent) -> Result<Plan> {
        let plan = match intent {
            OperatorIntent::BrowseScripts { path } => Plan::send(OutboundAction::BrowseScripts {
                path: required(&path, InputField::ScriptPath)?,
            }),
            OperatorIntent::BrowseUp => {
                if !self.core.features.script.can_go_up {
                    return Err(ClientError::ControlUnavailable(
                        "already at the top of the script directory".to_string(),
                    ));
                }
                Plan::send(OutboundAction::BrowseScripts {
                    path: "..".to_string(),
                })
            }
            OperatorIntent::OpenScriptOption { index } => {
                let Some(option) = self.core.features.script.options.get(index) else {
                    return Err(ValidationError::new(
                        InputField::ListSelection,
                        format!("no script entry at position {}", index.saturating_add(1)),
                    )
                    .into());
                };
                if option.is_dir {
                    Plan::send(OutboundAction::BrowseScripts {
                        path: option.path.clone(),
                    })
                } else {
                    Plan::send(OutboundAction::LoadScript {
                        filename: option.path.clone(),
                    })
                }
            }
            OperatorIntent::LoadScript { filename } => Plan::send(OutboundAction::LoadScript {
                filename: required(&filename, InputField::ScriptPath)?,
            }),
            OperatorIntent::PrevEvent => Plan::send(OutboundAction::PrevEvent {}),
            OperatorIntent::NextEvent => Plan::send(OutboundAction::NextEvent {}),
            OperatorIntent::RefreshState => Plan::send(OutboundAction::GetCurrentState {}),
            OperatorIntent::FetchDanmaku {
                streamer_name,
                list_type,
            } => Plan::send(OutboundAction::FetchDanmakuList {
                streamer_name: required(&streamer_name, InputField::StreamerName)?,
                danmaku_type: list_type,
            }),
            OperatorIntent::FetchReversal { streamer_name } => {
                Plan::send(OutboundAction::FetchReversal {
                    streamer_name: required(&streamer_name, InputField::StreamerName)?,
                })
            }
            OperatorIntent::FetchCaptions { topic_name } => Plan::send(OutboundAction::FetchCaptions {
                topic_name: required(&topic_name, InputField::TopicName)?,
            }),
            OperatorIntent::FetchAntiFanQuotes => Plan::send(OutboundAction::FetchAntiFanQuotes {}),
            OperatorIntent::FetchComplaints => Plan::send(OutboundAction::FetchComplaintsDanmaku {}),
            OperatorIntent::FetchBigBrotherWelcome => {
                Plan::send(OutboundAction::FetchBigBrotherWelcome {})
            }
            OperatorIntent::FetchGiftThanks => Plan::send(OutboundAction::FetchGiftThanksDanmaku {}),
            OperatorIntent::FetchReversalScripts => {
                Plan::send(OutboundAction::FetchReversalScriptsRequest {})
            }
            OperatorIntent::SendBossDanmaku {
                danmaku_type,
                boss_name,
                gift_name,
            } => {
                let boss_name = required(&boss_name, InputField::BossName)?;
                let (gift_name, kind) = match danmaku_type {
                    BossDanmakuType::WelcomeBoss => (gift_name.trim().to_string(), ModalKind::BossDanmaku),
                    BossDanmakuType::ThanksBossGift => {
                        (required(&gift_name, InputField::GiftName)?, ModalKind::GiftThanks)
                    }
                };
                Plan {
                    action: OutboundAction::SendBossDanmaku {
                        danmaku_type,
                        boss_name,
                        gift_name,
                    },
                    exclusive: Some(kind),
                    step: LocalStep::None,
                }
            }
            OperatorIntent::AutoSend { streamer_name } => {
                let cache = &self.core.features.cache;
                if cache.is_empty() {
                    return Err(ValidationError::new(
                        InputField::FetchedLists,
                        "fetch welcome or roast danmaku before auto-sending",
                    )
                    .into());
                }
                let streamer_name = match cache.subject_name() {
                    Some(subject) => subject.to_string(),
                    None => required(&streamer_name, InputField::StreamerName)?,
                };
                Plan {
                    action: OutboundAction::AutoSendDanmaku { streamer_name },
                    exclusive: Some(ModalKind::AutoSend),
                    step: LocalStep::None,
                }
            }
            OperatorIntent::StartRoast { target_name } => {
                let target_name = required(&target_name, InputField::RoastTarget)?;
                Plan {
                    action: OutboundAction::GetRoastSequence {
                        target_name: target_name.clone(),
                    },
                    exclusive: Some(ModalKind::RoastSequence),
                    step: LocalStep::BeginRoast(target_name),
                }
            }
            OperatorIntent::AdvanceRoast => Plan {
                action: OutboundAction::AdvanceRoast {},
                exclusive: None,
                step: LocalStep::AdvanceRoast,
            },
            OperatorIntent::ExitRoast => Plan {
                action: OutboundAction::ExitRoastMode {},
                exclusive: None,
                step: LocalStep::ExitRoast,
            },
            OperatorIntent::SelectReversalScript { .. } | OperatorIntent::Shortcut { .. } => {
                return Err(ClientError::ControlUnavailable(
                    "intent is handled before planning".to_string(),
                ));
            }
        };
        Ok(plan)
    }

    /// Shortcuts are ignored while typing and when the target control is disabled.
    fn resolve_shortcut(&self, key: ShortcutKey, focus_in_input: bool) -> Option<OperatorIntent> {
        if focus_in_input {
            return None;
        }
        let intent = match key {
            ShortcutKey::Space if self.core.roast.is_active() => OperatorIntent::AdvanceRoast,
            ShortcutKey::Space | ShortcutKey::PageDown => OperatorIntent::NextEvent,
            ShortcutKey::PageUp => OperatorIntent::PrevEvent,
        };
        let group = intent.control_group()?;
        if self.check_available(group).is_err() {
            debug!(group = group.as_str(), "ignoring shortcut for disabled control");
            return None;
        }
        Some(intent)
    }

    /// Show the presenter half and send the audience half of a listed reversal script.
    fn send_reversal_script(&mut self, index: usize) -> Result<()> {
        let Some(script) = self.core.features.reversal_scripts.get(index).cloned() else {
            return Err(ValidationError::new(
                InputField::ListSelection,
                format!("no reversal script at position {}", index.saturating_add(1)),
            )
            .into());
        };
        self.ensure_connected()?;
        let (audience, presenter) = split_reversal_script(&script);
        self.core
            .effects
            .show(UiEvent::ReversalPrompt(presenter.trim().to_string()));
        if audience.trim().is_empty() {
            return Err(ValidationError::new(
                InputField::ListSelection,
                "reversal script has no audience part to send",
            )
            .into());
        }
        self.core.effects.send(OutboundAction::SendReversalAudiencePart {
            audience_part: audience.trim().to_string(),
            full_script: script,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{OperatorIntent, ShortcutKey};
    use crate::config::ClientConfig;
    use crate::envelope::{BossDanmakuType, DanmakuListType, OutboundAction};
    use crate::error::{ClientError, InputField};
    use crate::lock::{LockPhase, ModalKind};
    use crate::presenter::Presenter;
    use crate::roast::RoastPhase;
    use crate::view::{ControlGroup, Severity, UiEvent};

    fn open_presenter() -> Presenter {
        let mut presenter = Presenter::with_standard_features(&ClientConfig::default());
        presenter.connect();
        presenter.on_open();
        presenter.take_effects();
        presenter
    }

    fn roast_ready(presenter: &mut Presenter, now: Instant) -> anyhow::Result<()> {
        presenter.dispatch(
            OperatorIntent::StartRoast {
                target_name: "Alice".to_string(),
            },
            now,
        )?;
        presenter.on_frame(
            r#"{"type":"roast_sequence_ready","target_name":"Alice","total_roasts":3,"message":"loaded","context":"roast_ready"}"#,
            now,
        );
        presenter.take_effects();
        Ok(())
    }

    fn step_frame(num: i64) -> String {
        format!(
            r#"{{"type":"presenter_roast_update","presenter_line":"line {num}","raw_template":"t {num}","current_roast_num":{num},"total_roasts":3,"target_name":"Alice"}}"#
        )
    }

    #[test]
    fn validation_failures_name_the_field_and_send_nothing() {
        struct Case {
            name: &'static str,
            intent: OperatorIntent,
            expected_field: InputField,
        }

        let cases = vec![
            Case {
                name: "blank boss name",
                intent: OperatorIntent::SendBossDanmaku {
                    danmaku_type: BossDanmakuType::WelcomeBoss,
                    boss_name: "   ".to_string(),
                    gift_name: String::new(),
                },
                expected_field: InputField::BossName,
            },
            Case {
                name: "gift thanks without gift",
                intent: OperatorIntent::SendBossDanmaku {
                    danmaku_type: BossDanmakuType::ThanksBossGift,
                    boss_name: "Boss".to_string(),
                    gift_name: " ".to_string(),
                },
                expected_field: InputField::GiftName,
            },
            Case {
                name: "roast without target",
                intent: OperatorIntent::StartRoast {
                    target_name: String::new(),
                },
                expected_field: InputField::RoastTarget,
            },
            Case {
                name: "captions without topic",
                intent: OperatorIntent::FetchCaptions {
                    topic_name: "\t".to_string(),
                },
                expected_field: InputField::TopicName,
            },
            Case {
                name: "auto-send with nothing fetched",
                intent: OperatorIntent::AutoSend {
                    streamer_name: "Alice".to_string(),
                },
                expected_field: InputField::FetchedLists,
            },
        ];

        for case in cases {
            let mut presenter = open_presenter();
            let error = presenter.dispatch(case.intent, Instant::now()).err();
            assert_eq!(
                error.and_then(|error| error.field()),
                Some(case.expected_field),
                "case '{}'",
                case.name
            );
            assert!(presenter.lock().is_idle(), "case '{}'", case.name);
            let effects = presenter.take_effects();
            assert!(effects.outbound.is_empty(), "case '{}'", case.name);
            let statuses = effects
                .ui
                .iter()
                .filter(|event| matches!(event, UiEvent::Status { severity: Severity::Warning, .. }))
                .count();
            assert_eq!(statuses, 1, "case '{}'", case.name);
        }
    }

    #[test]
    fn nothing_is_sent_while_disconnected() {
        let mut presenter = Presenter::with_standard_features(&ClientConfig::default());
        let result = presenter.dispatch(
            OperatorIntent::StartRoast {
                target_name: "Alice".to_string(),
            },
            Instant::now(),
        );
        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert!(presenter.lock().is_idle());
        assert_eq!(presenter.roast().phase(), RoastPhase::Inactive);
        assert!(presenter.take_effects().outbound.is_empty());
    }

    #[test]
    fn second_exclusive_action_is_rejected_without_sending() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.dispatch(
            OperatorIntent::SendBossDanmaku {
                danmaku_type: BossDanmakuType::WelcomeBoss,
                boss_name: " Boss ".to_string(),
                gift_name: "  ".to_string(),
            },
            now,
        )?;
        let effects = presenter.take_effects();
        assert_eq!(
            effects.outbound,
            vec![OutboundAction::SendBossDanmaku {
                danmaku_type: BossDanmakuType::WelcomeBoss,
                boss_name: "Boss".to_string(),
                gift_name: String::new(),
            }]
        );
        assert_eq!(
            presenter.lock().active().map(|op| op.phase),
            Some(LockPhase::Tentative)
        );

        let second = presenter.dispatch(
            OperatorIntent::StartRoast {
                target_name: "Alice".to_string(),
            },
            now,
        );
        assert!(matches!(
            second,
            Err(ClientError::OperationInProgress(ModalKind::BossDanmaku))
        ));
        assert!(presenter.take_effects().outbound.is_empty());
        assert_eq!(presenter.roast().phase(), RoastPhase::Inactive);
        Ok(())
    }

    #[test]
    fn roast_sequence_runs_to_natural_finish() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.dispatch(
            OperatorIntent::StartRoast {
                target_name: " Alice ".to_string(),
            },
            now,
        )?;
        assert_eq!(presenter.lock().kind(), Some(ModalKind::RoastSequence));
        assert_eq!(presenter.roast().phase(), RoastPhase::Fetching);
        assert_eq!(
            presenter.take_effects().outbound,
            vec![OutboundAction::GetRoastSequence {
                target_name: "Alice".to_string()
            }]
        );

        presenter.on_frame(
            r#"{"type":"roast_sequence_ready","target_name":"Alice","total_roasts":3}"#,
            now,
        );
        assert_eq!(presenter.roast().phase(), RoastPhase::StepReady);
        let session = presenter
            .roast()
            .session()
            .ok_or_else(|| anyhow::anyhow!("missing session"))?;
        assert_eq!((session.current_step_index, session.total_steps), (0, 3));
        assert!(presenter.lock().next_deadline().is_none());
        assert!(presenter.is_enabled(ControlGroup::RoastAdvance));
        assert!(presenter.is_enabled(ControlGroup::RoastExit));
        assert!(!presenter.is_enabled(ControlGroup::AutoSend));

        for num in 1..=3 {
            presenter.dispatch(OperatorIntent::AdvanceRoast, now)?;
            assert_eq!(presenter.roast().phase(), RoastPhase::Advancing);
            assert!(!presenter.is_enabled(ControlGroup::RoastAdvance));
            assert!(matches!(
                presenter.dispatch(OperatorIntent::AdvanceRoast, now),
                Err(ClientError::ControlUnavailable(_))
            ));
            presenter.on_frame(&step_frame(num), now);
            assert_eq!(presenter.roast().phase(), RoastPhase::StepReady);
        }
        presenter.take_effects();

        presenter.dispatch(OperatorIntent::AdvanceRoast, now)?;
        presenter.on_frame(
            r#"{"type":"roast_sequence_finished","message":"done","target_name":"Alice","context":"roast_finished_natural"}"#,
            now,
        );
        assert_eq!(presenter.roast().phase(), RoastPhase::Finished);
        assert!(presenter.lock().is_idle());
        for group in [ControlGroup::AutoSend, ControlGroup::RoastStart, ControlGroup::Fetch] {
            assert!(presenter.is_enabled(group), "{}", group.as_str());
        }
        assert!(!presenter.is_enabled(ControlGroup::RoastAdvance));
        let outbound = presenter.take_effects().outbound;
        assert!(outbound.contains(&OutboundAction::GetCurrentState {}));

        presenter.on_frame(
            r#"{"type":"re_enable_auto_send_buttons","context":"roast_finished_natural_reenable"}"#,
            now,
        );
        assert!(presenter.take_effects().outbound.is_empty());
        Ok(())
    }

    #[test]
    fn operator_exit_releases_immediately_and_tolerates_the_echo() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        roast_ready(&mut presenter, now)?;

        presenter.dispatch(OperatorIntent::ExitRoast, now)?;
        assert_eq!(presenter.roast().phase(), RoastPhase::Finished);
        assert!(presenter.lock().is_idle());
        let outbound = presenter.take_effects().outbound;
        assert_eq!(outbound.first(), Some(&OutboundAction::ExitRoastMode {}));
        assert!(outbound.contains(&OutboundAction::GetCurrentState {}));

        presenter.on_frame(
            r#"{"type":"roast_sequence_finished","message":"exited","context":"roast_exit"}"#,
            now,
        );
        presenter.on_frame(
            r#"{"type":"re_enable_auto_send_buttons","context":"roast_exit_reenable"}"#,
            now,
        );
        assert!(presenter.take_effects().outbound.is_empty());
        assert!(presenter.is_enabled(ControlGroup::RoastStart));
        Ok(())
    }

    #[test]
    fn empty_roast_sequence_is_a_fetch_failure() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.dispatch(
            OperatorIntent::StartRoast {
                target_name: "Alice".to_string(),
            },
            now,
        )?;
        presenter.on_frame(
            r#"{"type":"roast_sequence_ready","target_name":"Alice","total_roasts":0}"#,
            now,
        );
        assert!(presenter.lock().is_idle());
        assert_eq!(presenter.roast().phase(), RoastPhase::Inactive);
        assert!(presenter.is_enabled(ControlGroup::RoastStart));
        Ok(())
    }

    #[test]
    fn failed_step_keeps_the_roast_lock_and_retry_can_time_out() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        roast_ready(&mut presenter, now)?;

        presenter.dispatch(OperatorIntent::AdvanceRoast, now)?;
        presenter.on_frame(r#"{"type":"error","context":"roast_advance_init_error"}"#, now);
        assert_eq!(presenter.roast().phase(), RoastPhase::StepReady);
        assert_eq!(presenter.lock().kind(), Some(ModalKind::RoastSequence));
        assert!(presenter.lock().next_deadline().is_none());
        assert!(!presenter.is_enabled(ControlGroup::AutoSend));

        presenter.on_frame(
            r#"{"type":"re_enable_auto_send_buttons","context":"roast_advance_init_reenable"}"#,
            now,
        );
        assert!(presenter.lock().is_idle());
        assert!(!presenter.take_effects().outbound.contains(&OutboundAction::GetCurrentState {}));

        presenter.dispatch(OperatorIntent::AdvanceRoast, now)?;
        assert_eq!(presenter.roast().phase(), RoastPhase::Advancing);
        assert_eq!(presenter.lock().kind(), Some(ModalKind::RoastSequence));
        assert!(presenter.next_wakeup().is_some());
        presenter.take_effects();

        presenter.poll_timers(now + Duration::from_secs(3_600));
        assert!(presenter.lock().is_idle());
        assert_eq!(presenter.roast().phase(), RoastPhase::Inactive);
        assert!(presenter.is_enabled(ControlGroup::RoastStart));
        assert!(presenter.is_enabled(ControlGroup::ScriptBrowse));
        assert!(!presenter.is_enabled(ControlGroup::RoastExit));
        assert!(presenter.take_effects().outbound.contains(&OutboundAction::GetCurrentState {}));
        Ok(())
    }

    #[test]
    fn roast_finish_leaves_another_operation_locked() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        roast_ready(&mut presenter, now)?;
        presenter.on_frame(r#"{"type":"re_enable_auto_send_buttons"}"#, now);
        presenter.on_frame(r#"{"type":"auto_send_started","context":"auto_send_start"}"#, now);
        assert_eq!(presenter.lock().kind(), Some(ModalKind::AutoSend));
        presenter.take_effects();

        presenter.on_frame(
            r#"{"type":"roast_sequence_finished","message":"done","context":"roast_finished_natural"}"#,
            now,
        );
        assert_eq!(presenter.roast().phase(), RoastPhase::Finished);
        assert_eq!(presenter.lock().kind(), Some(ModalKind::AutoSend));
        assert!(!presenter.is_enabled(ControlGroup::AutoSend));
        assert!(!presenter.is_enabled(ControlGroup::RoastStart));
        assert!(!presenter.take_effects().outbound.contains(&OutboundAction::GetCurrentState {}));

        presenter.on_frame(r#"{"type":"auto_send_finished","context":"auto_send_finished"}"#, now);
        assert!(presenter.lock().is_idle());
        assert!(presenter.is_enabled(ControlGroup::RoastStart));
        assert!(presenter.take_effects().outbound.contains(&OutboundAction::GetCurrentState {}));
        Ok(())
    }

    #[test]
    fn shortcuts_follow_roast_state_and_input_focus() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.on_frame(
            r#"{"type":"current_event_update","current_event_index":0,"total_events":3,"can_go_prev":false,"can_go_next":true}"#,
            now,
        );
        presenter.take_effects();

        let space = |focus_in_input| OperatorIntent::Shortcut {
            key: ShortcutKey::Space,
            focus_in_input,
        };
        presenter.dispatch(space(true), now)?;
        assert!(presenter.take_effects().outbound.is_empty());

        presenter.dispatch(space(false), now)?;
        assert_eq!(presenter.take_effects().outbound, vec![OutboundAction::NextEvent {}]);

        presenter.dispatch(
            OperatorIntent::Shortcut {
                key: ShortcutKey::PageUp,
                focus_in_input: false,
            },
            now,
        )?;
        assert!(presenter.take_effects().outbound.is_empty());

        roast_ready(&mut presenter, now)?;
        presenter.dispatch(space(false), now)?;
        assert_eq!(presenter.take_effects().outbound, vec![OutboundAction::AdvanceRoast {}]);
        presenter.dispatch(space(false), now)?;
        assert!(presenter.take_effects().outbound.is_empty());
        Ok(())
    }

    #[test]
    fn auto_send_prefers_the_fetched_subject() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.on_frame(
            r#"{"type":"danmaku_list","danmaku_type":"roast","streamer_name":"Alice","danmaku_list":["boo"]}"#,
            now,
        );
        presenter.dispatch(
            OperatorIntent::AutoSend {
                streamer_name: "Typed".to_string(),
            },
            now,
        )?;
        assert!(presenter.take_effects().outbound.contains(&OutboundAction::AutoSendDanmaku {
            streamer_name: "Alice".to_string()
        }));
        Ok(())
    }

    #[test]
    fn fetches_trim_and_stay_available_during_roast() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.dispatch(
            OperatorIntent::FetchDanmaku {
                streamer_name: "  Alice ".to_string(),
                list_type: DanmakuListType::Welcome,
            },
            now,
        )?;
        assert_eq!(
            presenter.take_effects().outbound,
            vec![OutboundAction::FetchDanmakuList {
                streamer_name: "Alice".to_string(),
                danmaku_type: DanmakuListType::Welcome,
            }]
        );

        roast_ready(&mut presenter, now)?;
        assert!(matches!(
            presenter.dispatch(OperatorIntent::FetchComplaints, now),
            Err(ClientError::OperationInProgress(ModalKind::RoastSequence))
        ));
        Ok(())
    }

    #[test]
    fn reversal_selection_sends_the_audience_half() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.on_frame(
            r#"{"type":"reversal_scripts_list","scripts_list":["abcdef","x"]}"#,
            now,
        );
        presenter.take_effects();

        presenter.dispatch(OperatorIntent::SelectReversalScript { index: 0 }, now)?;
        let effects = presenter.take_effects();
        assert!(effects.ui.contains(&UiEvent::ReversalPrompt("def".to_string())));
        assert_eq!(
            effects.outbound,
            vec![OutboundAction::SendReversalAudiencePart {
                audience_part: "abc".to_string(),
                full_script: "abcdef".to_string(),
            }]
        );

        let blank = presenter.dispatch(OperatorIntent::SelectReversalScript { index: 1 }, now);
        assert_eq!(blank.err().and_then(|error| error.field()), Some(InputField::ListSelection));
        assert!(presenter.take_effects().outbound.is_empty());

        let missing = presenter.dispatch(OperatorIntent::SelectReversalScript { index: 9 }, now);
        assert!(missing.is_err());
        Ok(())
    }

    #[test]
    fn script_entries_browse_or_load() -> anyhow::Result<()> {
        let now = Instant::now();
        let mut presenter = open_presenter();
        presenter.on_frame(
            r#"{"type":"script_options_update","current_path":"shows","breadcrumb":[{"name":"root","path":"."}],"options":[{"name":"old","path":"shows/old","is_dir":true},{"name":"ep1.txt","path":"shows/ep1.txt","is_dir":false}],"can_go_up":true}"#,
            now,
        );
        presenter.take_effects();

        presenter.dispatch(OperatorIntent::OpenScriptOption { index: 0 }, now)?;
        presenter.dispatch(OperatorIntent::OpenScriptOption { index: 1 }, now)?;
        presenter.dispatch(OperatorIntent::BrowseUp, now)?;
        assert_eq!(
            presenter.take_effects().outbound,
            vec![
                OutboundAction::BrowseScripts {
                    path: "shows/old".to_string()
                },
                OutboundAction::LoadScript {
                    filename: "shows/ep1.txt".to_string()
                },
                OutboundAction::BrowseScripts {
                    path: "..".to_string()
                },
            ]
        );
        Ok(())
    }
}
