//! Enabled/disabled state of every control group, derived from current state.
//!
//! Nothing here flips flags directly: each reconcile recomputes every group from the
//! lock, the roast sequence and the last navigation state reported by the server,
//! and emits directives only for groups whose state changed.

use std::collections::BTreeMap;

use crate::lock::ModalLock;
use crate::roast::{RoastPhase, RoastSequence};
use crate::view::{ControlGroup, UiEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub can_go_prev: bool,
    pub can_go_next: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ControlInputs<'a> {
    pub lock: &'a ModalLock,
    pub roast: &'a RoastSequence,
    pub navigation: NavigationState,
}

#[must_use]
pub fn derive_enabled(group: ControlGroup, inputs: &ControlInputs<'_>) -> bool {
    let locked = inputs.lock.suppresses(group);
    let roast_active = inputs.roast.is_active();
    match group {
        ControlGroup::AutoSend
        | ControlGroup::BossDanmaku
        | ControlGroup::Fetch
        | ControlGroup::Search => !locked,
        ControlGroup::RoastStart | ControlGroup::ScriptBrowse => !locked && !roast_active,
        ControlGroup::RoastAdvance => !locked && inputs.roast.can_advance(),
        ControlGroup::RoastExit => inputs.roast.phase() == RoastPhase::StepReady,
        ControlGroup::NavigatePrev => {
            !locked && !roast_active && inputs.navigation.can_go_prev
        }
        ControlGroup::NavigateNext => {
            !locked && !roast_active && inputs.navigation.can_go_next
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlBoard {
    last: BTreeMap<ControlGroup, bool>,
}

impl ControlBoard {
    #[must_use]
    pub fn is_enabled(&self, group: ControlGroup) -> bool {
        self.last.get(&group).copied().unwrap_or(false)
    }

    pub fn reconcile(&mut self, inputs: &ControlInputs<'_>, out: &mut Vec<UiEvent>) {
        for group in ControlGroup::ALL {
            let enabled = derive_enabled(group, inputs);
            if self.last.insert(group, enabled) != Some(enabled) {
                out.push(UiEvent::Control { group, enabled });
            }
        }
    }
}
