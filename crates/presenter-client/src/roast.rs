//! Multi-step roast sequence layered on the modal lock.

use crate::envelope::{RoastReady, RoastStep};
use crate::error::{ClientError, InputField, Result, ValidationError};
use crate::lock::ModalKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoastPhase {
    #[default]
    Inactive,
    Fetching,
    StepReady,
    Advancing,
    Finished,
}

impl RoastPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Fetching => "fetching",
            Self::StepReady => "step_ready",
            Self::Advancing => "advancing",
            Self::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoastSession {
    pub target_name: String,
    pub total_steps: u32,
    /// Zero-based; `-1` until the sequence is loaded.
    pub current_step_index: i64,
    pub current_presenter_line: String,
    pub current_raw_template: String,
}

impl RoastSession {
    fn new(target_name: String) -> Self {
        Self {
            target_name,
            total_steps: 0,
            current_step_index: -1,
            current_presenter_line: String::new(),
            current_raw_template: String::new(),
        }
    }

    /// `"{index + 1}/{total}"`.
    #[must_use]
    pub fn progress(&self) -> String {
        format!("{}/{}", self.current_step_index + 1, self.total_steps)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    Ready,
    /// An empty sequence counts as a failed fetch.
    Empty,
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct RoastSequence {
    phase: RoastPhase,
    session: Option<RoastSession>,
}

impl RoastSequence {
    #[must_use]
    pub fn phase(&self) -> RoastPhase {
        self.phase
    }

    #[must_use]
    pub fn session(&self) -> Option<&RoastSession> {
        self.session.as_ref()
    }

    /// Fetching, waiting on the operator, or waiting on the next step.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self.phase(),
            RoastPhase::Fetching | RoastPhase::StepReady | RoastPhase::Advancing
        )
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.phase() == RoastPhase::StepReady
    }

    pub fn begin_fetch(&mut self, target_name: &str) -> Result<()> {
        let target_name = target_name.trim();
        if target_name.is_empty() {
            return Err(ValidationError::required(InputField::RoastTarget).into());
        }
        if self.is_active() {
            return Err(ClientError::OperationInProgress(ModalKind::RoastSequence));
        }
        self.session = Some(RoastSession::new(target_name.to_string()));
        self.phase = RoastPhase::Fetching;
        Ok(())
    }

    pub fn on_ready(&mut self, ready: &RoastReady) -> ReadyOutcome {
        if self.phase() != RoastPhase::Fetching {
            return ReadyOutcome::Ignored;
        }
        let total_steps = u32::try_from(ready.total_roasts).unwrap_or(0);
        if total_steps == 0 {
            self.abort();
            return ReadyOutcome::Empty;
        }
        let session = self
            .session
            .get_or_insert_with(|| RoastSession::new(ready.target_name.clone()));
        if !ready.target_name.trim().is_empty() {
            session.target_name = ready.target_name.trim().to_string();
        }
        session.total_steps = total_steps;
        session.current_step_index = 0;
        self.phase = RoastPhase::StepReady;
        ReadyOutcome::Ready
    }

    /// Re-entrant advances while a step is in flight are refused.
    pub fn begin_advance(&mut self) -> Result<()> {
        match self.phase() {
            RoastPhase::StepReady => {
                self.phase = RoastPhase::Advancing;
                Ok(())
            }
            RoastPhase::Advancing => Err(ClientError::ControlUnavailable(
                "roast step already in flight".to_string(),
            )),
            _ => Err(ClientError::ControlUnavailable(
                "no roast sequence is ready".to_string(),
            )),
        }
    }

    /// Server step content; `current_roast_num` is one-based.
    pub fn on_step(&mut self, step: &RoastStep) -> Result<()> {
        if !matches!(self.phase(), RoastPhase::StepReady | RoastPhase::Advancing) {
            return Err(ClientError::Protocol(format!(
                "roast step received while {}",
                self.phase().as_str()
            )));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(ClientError::Protocol(
                "roast step received without a session".to_string(),
            ));
        };
        let total_steps = u32::try_from(step.total_roasts).unwrap_or(0);
        if total_steps == 0
            || step.current_roast_num < 1
            || step.current_roast_num > i64::from(total_steps)
        {
            return Err(ClientError::Protocol(format!(
                "roast step {} outside 1..={}",
                step.current_roast_num, step.total_roasts
            )));
        }
        let index = step.current_roast_num - 1;
        if index < session.current_step_index {
            return Err(ClientError::Protocol(format!(
                "roast step moved backwards from {} to {}",
                session.current_step_index, index
            )));
        }
        session.total_steps = total_steps;
        session.current_step_index = index;
        session.current_presenter_line = step.presenter_line.clone();
        session.current_raw_template = step.raw_template.clone();
        if !step.target_name.trim().is_empty() {
            session.target_name = step.target_name.trim().to_string();
        }
        self.phase = RoastPhase::StepReady;
        Ok(())
    }

    /// The server failed the step in flight; the operator may retry or exit.
    pub fn recover_step(&mut self) -> bool {
        if self.phase() == RoastPhase::Advancing {
            self.phase = RoastPhase::StepReady;
            return true;
        }
        false
    }

    /// Operator exit or server exhaustion. Returns whether the sequence was running.
    pub fn finish(&mut self) -> bool {
        let was_active = self.is_active();
        if was_active {
            self.phase = RoastPhase::Finished;
        }
        was_active
    }

    /// Control returned to the operator before the sequence loaded: the fetch failed.
    pub fn settle(&mut self) -> bool {
        if self.phase() == RoastPhase::Fetching {
            self.abort();
            return true;
        }
        false
    }

    pub fn abort(&mut self) {
        self.phase = RoastPhase::Inactive;
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadyOutcome, RoastPhase, RoastSequence};
    use crate::envelope::{RoastReady, RoastStep};
    use crate::error::{ClientError, InputField};

    fn ready(total: i64) -> RoastReady {
        RoastReady {
            target_name: "Alice".to_string(),
            total_roasts: total,
            message: None,
        }
    }

    fn step(num: i64, total: i64) -> RoastStep {
        RoastStep {
            presenter_line: format!("line {num}"),
            raw_template: format!("template {num}"),
            current_roast_num: num,
            total_roasts: total,
            target_name: "Alice".to_string(),
        }
    }

    #[test]
    fn ready_enters_first_step() -> anyhow::Result<()> {
        let mut roast = RoastSequence::default();
        roast.begin_fetch("  Alice ")?;
        assert_eq!(roast.phase(), RoastPhase::Fetching);
        assert_eq!(roast.on_ready(&ready(3)), ReadyOutcome::Ready);
        assert_eq!(roast.phase(), RoastPhase::StepReady);
        let session = roast.session().ok_or_else(|| anyhow::anyhow!("missing session"))?;
        assert_eq!(session.target_name, "Alice");
        assert_eq!(session.current_step_index, 0);
        assert_eq!(session.total_steps, 3);
        Ok(())
    }

    #[test]
    fn empty_sequence_is_a_fetch_failure() -> anyhow::Result<()> {
        let mut roast = RoastSequence::default();
        roast.begin_fetch("Alice")?;
        assert_eq!(roast.on_ready(&ready(0)), ReadyOutcome::Empty);
        assert_eq!(roast.phase(), RoastPhase::Inactive);
        assert!(roast.session().is_none());
        Ok(())
    }

    #[test]
    fn blank_target_is_rejected() {
        let mut roast = RoastSequence::default();
        let error = roast.begin_fetch("   ").err();
        assert_eq!(error.and_then(|error| error.field()), Some(InputField::RoastTarget));
        assert_eq!(roast.phase(), RoastPhase::Inactive);
    }

    #[test]
    fn advance_is_not_reentrant() -> anyhow::Result<()> {
        let mut roast = RoastSequence::default();
        roast.begin_fetch("Alice")?;
        roast.on_ready(&ready(3));
        roast.begin_advance()?;
        assert!(matches!(
            roast.begin_advance(),
            Err(ClientError::ControlUnavailable(_))
        ));
        roast.on_step(&step(1, 3))?;
        assert!(roast.can_advance());
        assert!(!roast.recover_step());

        roast.begin_advance()?;
        assert!(roast.recover_step());
        assert!(roast.can_advance());
        Ok(())
    }

    #[test]
    fn steps_keep_index_within_bounds() -> anyhow::Result<()> {
        let mut roast = RoastSequence::default();
        roast.begin_fetch("Alice")?;
        roast.on_ready(&ready(3));
        for num in 1..=3 {
            roast.begin_advance()?;
            roast.on_step(&step(num, 3))?;
            let session = roast.session().ok_or_else(|| anyhow::anyhow!("missing session"))?;
            assert_eq!(session.current_step_index, num - 1);
            assert!(session.current_step_index < i64::from(session.total_steps));
        }
        roast.begin_advance()?;
        assert!(roast.on_step(&step(4, 3)).is_err());
        assert!(roast.on_step(&step(0, 3)).is_err());
        assert!(roast.finish());
        assert_eq!(roast.phase(), RoastPhase::Finished);
        assert!(!roast.settle());
        assert_eq!(roast.phase(), RoastPhase::Finished);

        roast.begin_fetch("Bob")?;
        assert!(roast.settle());
        assert_eq!(roast.phase(), RoastPhase::Inactive);
        Ok(())
    }

    #[test]
    fn steps_outside_a_sequence_are_protocol_errors() {
        let mut roast = RoastSequence::default();
        assert!(matches!(roast.on_step(&step(1, 3)), Err(ClientError::Protocol(_))));
        assert_eq!(roast.on_ready(&ready(3)), ReadyOutcome::Ignored);
        assert!(!roast.finish());
    }
}
