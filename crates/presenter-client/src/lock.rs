//! Modal control-authority lock.
//!
//! At most one exclusive server-driven operation holds the lock. It is taken
//! optimistically when the request is dispatched (`Tentative`) and confirmed by the
//! first server push owned by that operation.

use std::time::{Duration, Instant};

use crate::envelope::OperationTag;
use crate::error::{ClientError, Result};
use crate::view::ControlGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalKind {
    AutoSend,
    BossDanmaku,
    GiftThanks,
    RoastSequence,
}

impl ModalKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoSend => "auto_send",
            Self::BossDanmaku => "boss_danmaku",
            Self::GiftThanks => "gift_thanks",
            Self::RoastSequence => "roast_sequence",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AutoSend => "auto-send",
            Self::BossDanmaku => "boss welcome",
            Self::GiftThanks => "gift thanks",
            Self::RoastSequence => "roast sequence",
        }
    }

    /// Control groups disabled while this operation holds the lock.
    #[must_use]
    pub fn suppresses(self, group: ControlGroup) -> bool {
        match group {
            ControlGroup::RoastExit => false,
            ControlGroup::RoastAdvance => self != Self::RoastSequence,
            _ => true,
        }
    }

    /// Whether a server push tagged with `tag` belongs to this operation.
    #[must_use]
    pub fn owns(self, tag: &OperationTag) -> bool {
        match self {
            Self::AutoSend => {
                tag.action_is("auto_send_danmaku") || tag.context_starts_with("auto_send")
            }
            Self::BossDanmaku => {
                tag.action_is("send_boss_danmaku")
                    || (tag.context_starts_with("send_boss_")
                        && !tag.context_starts_with("send_boss_thanks_boss_gift"))
            }
            Self::GiftThanks => {
                tag.action_is("send_boss_danmaku")
                    || (tag.context_starts_with("send_boss_")
                        && !tag.context_starts_with("send_boss_welcome_boss"))
            }
            Self::RoastSequence => {
                tag.action_is("get_roast_sequence")
                    || tag.action_is("advance_roast")
                    || tag.action_is("exit_roast_mode")
                    || tag.context_starts_with("roast_")
            }
        }
    }

    /// Best guess of the operation a server-initiated push refers to.
    #[must_use]
    pub fn infer(tag: &OperationTag) -> Option<Self> {
        if tag.context_starts_with("send_boss_thanks_boss_gift") {
            return Some(Self::GiftThanks);
        }
        [Self::RoastSequence, Self::BossDanmaku, Self::AutoSend]
            .into_iter()
            .find(|kind| kind.owns(tag))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPhase {
    Tentative,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    Finished,
    Cancelled,
    ServerError,
    RolledBack,
    ServerSignal,
    Disconnected,
    TimedOut,
}

impl ReleaseReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::ServerError => "server_error",
            Self::RolledBack => "rolled_back",
            Self::ServerSignal => "server_signal",
            Self::Disconnected => "disconnected",
            Self::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalOperation {
    pub kind: ModalKind,
    pub phase: LockPhase,
    pub acquired_at: Instant,
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub kind: ModalKind,
    pub reason: ReleaseReason,
}

#[derive(Debug, Clone)]
pub struct ModalLock {
    active: Option<ModalOperation>,
    timeout: Option<Duration>,
}

impl ModalLock {
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            active: None,
            timeout,
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<&ModalOperation> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> Option<ModalKind> {
        self.active.map(|operation| operation.kind)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    #[must_use]
    pub fn suppresses(&self, group: ControlGroup) -> bool {
        self.active
            .is_some_and(|operation| operation.kind.suppresses(group))
    }

    /// Enter `Locked(kind)` in the tentative phase, or reject without side effects.
    pub fn try_acquire(&mut self, kind: ModalKind, now: Instant) -> Result<()> {
        if let Some(active) = self.active {
            return Err(ClientError::OperationInProgress(active.kind));
        }
        self.active = Some(ModalOperation {
            kind,
            phase: LockPhase::Tentative,
            acquired_at: now,
            deadline: self.deadline_from(now),
        });
        Ok(())
    }

    /// Server says `kind` started. Idempotent with a local lock of the same kind;
    /// locks from idle when the server started the operation on its own.
    pub fn confirm(&mut self, kind: ModalKind, now: Instant) -> bool {
        match self.active.as_mut() {
            Some(active) if active.kind == kind => {
                active.phase = LockPhase::Confirmed;
                if active.deadline.is_some() {
                    active.deadline = self.timeout.map(|timeout| now + timeout);
                }
                true
            }
            Some(_) => false,
            None => {
                self.active = Some(ModalOperation {
                    kind,
                    phase: LockPhase::Confirmed,
                    acquired_at: now,
                    deadline: self.deadline_from(now),
                });
                true
            }
        }
    }

    /// Operation-tagged progress push: confirms the lock and refreshes its deadline.
    pub fn observe(&mut self, tag: &OperationTag, now: Instant) -> bool {
        match self.active {
            Some(active) if active.kind.owns(tag) => self.confirm(active.kind, now),
            _ => false,
        }
    }

    /// Stop the timeout clock while the operation waits on the operator.
    pub fn park(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.deadline = None;
        }
    }

    /// Restart the timeout clock after the operator handed control back to the server.
    pub fn resume(&mut self, now: Instant) {
        let deadline = self.deadline_from(now);
        if let Some(active) = self.active.as_mut() {
            active.deadline = deadline;
        }
    }

    pub fn release(&mut self, reason: ReleaseReason) -> Option<Released> {
        self.active.take().map(|operation| Released {
            kind: operation.kind,
            reason,
        })
    }

    /// Release only if the current operation owns `tag`.
    pub fn release_owned(&mut self, tag: &OperationTag, reason: ReleaseReason) -> Option<Released> {
        match self.active {
            Some(active) if active.kind.owns(tag) => self.release(reason),
            _ => None,
        }
    }

    /// Undo a tentative lock the server refused before starting.
    pub fn roll_back(&mut self, tag: &OperationTag) -> Option<Released> {
        match self.active {
            Some(active) if active.phase == LockPhase::Tentative && active.kind.owns(tag) => {
                self.release(ReleaseReason::RolledBack)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.and_then(|operation| operation.deadline)
    }

    pub fn expire(&mut self, now: Instant) -> Option<Released> {
        match self.next_deadline() {
            Some(deadline) if deadline <= now => self.release(ReleaseReason::TimedOut),
            _ => None,
        }
    }

    fn deadline_from(&self, now: Instant) -> Option<Instant> {
        self.timeout.map(|timeout| now + timeout)
    }
}
