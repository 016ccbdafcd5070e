//! Line commands typed at the console.

use presenter_client::{
    BossDanmakuType, DanmakuListType, OperatorIntent, SessionCommand, ShortcutKey,
};

pub const HELP: &str = "\
connect | disconnect | quit
browse <path> | up | open <n> | load <file> | prev | next | refresh
welcome <streamer> | roast-list <streamer> | reversal <streamer> | captions <topic>
quotes | complaints | big-brother | gift-thanks | scripts | pick <n>
boss <name> | thanks <boss> <gift> | auto [streamer]
roast <target> | space | pgup | pgdn | exit-roast
suggest <term>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Session(SessionCommand),
    Help,
    Quit,
}

fn intent(intent: OperatorIntent) -> ConsoleCommand {
    ConsoleCommand::Session(SessionCommand::Intent(intent))
}

fn index(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("expected a list index, got {raw:?}"))
}

fn shortcut(key: ShortcutKey) -> ConsoleCommand {
    intent(OperatorIntent::Shortcut {
        key,
        focus_in_input: false,
    })
}

/// `None` for a blank line. Argument validation is left to the session.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim().to_string();

    let command = match verb {
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "connect" => ConsoleCommand::Session(SessionCommand::Connect),
        "disconnect" => ConsoleCommand::Session(SessionCommand::Disconnect),
        "suggest" => ConsoleCommand::Session(SessionCommand::Suggest(rest)),
        "browse" => intent(OperatorIntent::BrowseScripts { path: rest }),
        "up" => intent(OperatorIntent::BrowseUp),
        "open" => intent(OperatorIntent::OpenScriptOption {
            index: index(&rest)?,
        }),
        "load" => intent(OperatorIntent::LoadScript { filename: rest }),
        "prev" => intent(OperatorIntent::PrevEvent),
        "next" => intent(OperatorIntent::NextEvent),
        "refresh" => intent(OperatorIntent::RefreshState),
        "welcome" => intent(OperatorIntent::FetchDanmaku {
            streamer_name: rest,
            list_type: DanmakuListType::Welcome,
        }),
        "roast-list" => intent(OperatorIntent::FetchDanmaku {
            streamer_name: rest,
            list_type: DanmakuListType::Roast,
        }),
        "reversal" => intent(OperatorIntent::FetchReversal {
            streamer_name: rest,
        }),
        "captions" => intent(OperatorIntent::FetchCaptions { topic_name: rest }),
        "quotes" => intent(OperatorIntent::FetchAntiFanQuotes),
        "complaints" => intent(OperatorIntent::FetchComplaints),
        "big-brother" => intent(OperatorIntent::FetchBigBrotherWelcome),
        "gift-thanks" => intent(OperatorIntent::FetchGiftThanks),
        "scripts" => intent(OperatorIntent::FetchReversalScripts),
        "pick" => intent(OperatorIntent::SelectReversalScript {
            index: index(&rest)?,
        }),
        "boss" => intent(OperatorIntent::SendBossDanmaku {
            danmaku_type: BossDanmakuType::WelcomeBoss,
            boss_name: rest,
            gift_name: String::new(),
        }),
        "thanks" => {
            let (boss_name, gift_name) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest.as_str(), ""));
            intent(OperatorIntent::SendBossDanmaku {
                danmaku_type: BossDanmakuType::ThanksBossGift,
                boss_name: boss_name.to_string(),
                gift_name: gift_name.trim().to_string(),
            })
        }
        "auto" => intent(OperatorIntent::AutoSend {
            streamer_name: rest,
        }),
        "roast" => intent(OperatorIntent::StartRoast { target_name: rest }),
        "space" => shortcut(ShortcutKey::Space),
        "pgup" => shortcut(ShortcutKey::PageUp),
        "pgdn" => shortcut(ShortcutKey::PageDown),
        "exit-roast" => intent(OperatorIntent::ExitRoast),
        other => return Err(format!("unknown command {other:?}, try `help`")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use presenter_client::{BossDanmakuType, OperatorIntent, SessionCommand, ShortcutKey};

    use super::{ConsoleCommand, parse};

    #[test]
    fn commands_map_to_session_inputs() -> anyhow::Result<()> {
        struct Case {
            line: &'static str,
            expected: ConsoleCommand,
        }

        let cases = vec![
            Case {
                line: "  connect ",
                expected: ConsoleCommand::Session(SessionCommand::Connect),
            },
            Case {
                line: "open 2",
                expected: ConsoleCommand::Session(SessionCommand::Intent(
                    OperatorIntent::OpenScriptOption { index: 2 },
                )),
            },
            Case {
                line: "thanks Big Boss rocket",
                expected: ConsoleCommand::Session(SessionCommand::Intent(
                    OperatorIntent::SendBossDanmaku {
                        danmaku_type: BossDanmakuType::ThanksBossGift,
                        boss_name: "Big".to_string(),
                        gift_name: "Boss rocket".to_string(),
                    },
                )),
            },
            Case {
                line: "auto",
                expected: ConsoleCommand::Session(SessionCommand::Intent(
                    OperatorIntent::AutoSend {
                        streamer_name: String::new(),
                    },
                )),
            },
            Case {
                line: "space",
                expected: ConsoleCommand::Session(SessionCommand::Intent(
                    OperatorIntent::Shortcut {
                        key: ShortcutKey::Space,
                        focus_in_input: false,
                    },
                )),
            },
            Case {
                line: "roast  Alice Smith",
                expected: ConsoleCommand::Session(SessionCommand::Intent(
                    OperatorIntent::StartRoast {
                        target_name: "Alice Smith".to_string(),
                    },
                )),
            },
        ];

        for case in cases {
            let parsed = parse(case.line).map_err(anyhow::Error::msg)?;
            assert_eq!(parsed, Some(case.expected), "{}", case.line);
        }
        Ok(())
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse("   "), Ok(None));
        assert!(parse("dance").is_err());
        assert!(parse("pick two").is_err());
    }
}
