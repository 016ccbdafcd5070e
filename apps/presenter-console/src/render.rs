use std::fmt::Write as _;

use presenter_client::UiEvent;
use presenter_client::view::ListClick;

/// Console text for one renderer event.
pub fn render(event: &UiEvent) -> String {
    match event {
        UiEvent::Connection { state, detail } => {
            format!("[connection] {}: {detail}", state.as_str())
        }
        UiEvent::Control { group, enabled } => {
            let state = if *enabled { "on" } else { "off" };
            format!("[control] {} {state}", group.as_str())
        }
        UiEvent::Status { text, severity } => format!("[{}] {text}", severity.as_str()),
        UiEvent::List(list) => {
            let mut out = format!("== {}", list.title);
            for (index, item) in list.items.iter().enumerate() {
                let _ = write!(out, "\n  {index:>3}. {item}");
            }
            if list.on_click == Some(ListClick::SendReversalScript) {
                out.push_str("\n  (`pick <n>` sends the audience half)");
            }
            out
        }
        UiEvent::ScriptBrowser(view) => {
            let mut out = format!("== scripts: {}", view.current_path);
            if view.can_go_up {
                out.push_str(" (`up` for parent)");
            }
            for (index, option) in view.options.iter().enumerate() {
                let marker = if option.is_dir { "/" } else { "" };
                let _ = write!(out, "\n  {index:>3}. {}{marker}", option.name);
            }
            out
        }
        UiEvent::CurrentEvent(view) => format!(
            "== {} [{}]\n  line:   {}\n  prompt: {}",
            view.script_name, view.progress, view.current_line, view.presenter_prompt
        ),
        UiEvent::RoastPrompt(view) => format!(
            "== roast {} [{}]\n  {}",
            view.target_name, view.progress, view.presenter_line
        ),
        UiEvent::ReversalPrompt(text) => format!("[read aloud] {text}"),
        UiEvent::Suggestions(names) => format!("[suggest] {}", names.join(", ")),
        UiEvent::HideSuggestions => "[suggest] -".to_string(),
    }
}
