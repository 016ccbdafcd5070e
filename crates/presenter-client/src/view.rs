//! Events handed to the rendering layer.

use crate::envelope::{Breadcrumb, ScriptOption};
use crate::session::ConnectionState;

/// Status line severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Status text used when the server omits `message`.
    #[must_use]
    pub const fn default_label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "done",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Group of operator controls that share an enabled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlGroup {
    AutoSend,
    BossDanmaku,
    RoastStart,
    RoastAdvance,
    RoastExit,
    NavigatePrev,
    NavigateNext,
    ScriptBrowse,
    Fetch,
    Search,
}

impl ControlGroup {
    pub const ALL: [Self; 10] = [
        Self::AutoSend,
        Self::BossDanmaku,
        Self::RoastStart,
        Self::RoastAdvance,
        Self::RoastExit,
        Self::NavigatePrev,
        Self::NavigateNext,
        Self::ScriptBrowse,
        Self::Fetch,
        Self::Search,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoSend => "auto_send",
            Self::BossDanmaku => "boss_danmaku",
            Self::RoastStart => "roast_start",
            Self::RoastAdvance => "roast_advance",
            Self::RoastExit => "roast_exit",
            Self::NavigatePrev => "navigate_prev",
            Self::NavigateNext => "navigate_next",
            Self::ScriptBrowse => "script_browse",
            Self::Fetch => "fetch",
            Self::Search => "search",
        }
    }
}

/// What selecting an item of a displayed list does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListClick {
    /// Split the script and send the audience half.
    SendReversalScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDisplay {
    pub title: String,
    pub items: Vec<String>,
    pub on_click: Option<ListClick>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBrowserView {
    pub current_path: String,
    pub breadcrumb: Vec<Breadcrumb>,
    pub options: Vec<ScriptOption>,
    pub can_go_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentEventView {
    pub script_name: String,
    pub current_line: String,
    pub presenter_prompt: String,
    pub progress: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoastPromptView {
    pub target_name: String,
    pub presenter_line: String,
    pub raw_template: String,
    pub progress: String,
}

/// Everything the core asks the renderer to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Connection {
        state: ConnectionState,
        detail: String,
    },
    Control {
        group: ControlGroup,
        enabled: bool,
    },
    List(ListDisplay),
    Status {
        text: String,
        severity: Severity,
    },
    ScriptBrowser(ScriptBrowserView),
    CurrentEvent(CurrentEventView),
    RoastPrompt(RoastPromptView),
    ReversalPrompt(String),
    Suggestions(Vec<String>),
    HideSuggestions,
}

impl UiEvent {
    pub fn status(severity: Severity, text: impl Into<String>) -> Self {
        Self::Status {
            text: text.into(),
            severity,
        }
    }
}

/// `"{n}/{total} ({pct}%)"` with a one-based `n`; `-1` displays as `0`, an empty total as `-`.
#[must_use]
pub fn format_progress(current_index: i64, total: u64) -> String {
    if total == 0 || current_index < -1 {
        return "-".to_string();
    }
    let display_index = u128::try_from(i128::from(current_index) + 1).unwrap_or(0);
    let total_wide = u128::from(total);
    let pct = (display_index * 100 + total_wide / 2) / total_wide;
    format!("{display_index}/{total} ({pct}%)")
}

#[cfg(test)]
mod tests {
    use super::format_progress;

    #[test]
    fn progress_is_one_based_with_rounded_percentage() {
        struct Case {
            index: i64,
            total: u64,
            expected: &'static str,
        }

        let cases = vec![
            Case {
                index: 0,
                total: 3,
                expected: "1/3 (33%)",
            },
            Case {
                index: 1,
                total: 3,
                expected: "2/3 (67%)",
            },
            Case {
                index: 2,
                total: 3,
                expected: "3/3 (100%)",
            },
            Case {
                index: -1,
                total: 4,
                expected: "0/4 (0%)",
            },
            Case {
                index: i64::MAX,
                total: 3,
                expected: "9223372036854775808/3 (307445734561825860267%)",
            },
            Case {
                index: 0,
                total: u64::MAX,
                expected: "1/18446744073709551615 (0%)",
            },
            Case {
                index: i64::MAX,
                total: u64::MAX,
                expected: "9223372036854775808/18446744073709551615 (50%)",
            },
        ];

        for case in cases {
            assert_eq!(
                format_progress(case.index, case.total),
                case.expected,
                "{} of {}",
                case.index,
                case.total
            );
        }
    }

    #[test]
    fn progress_without_events_is_a_dash() {
        assert_eq!(format_progress(0, 0), "-");
        assert_eq!(format_progress(-5, 4), "-");
    }
}
