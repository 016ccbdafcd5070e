//! Wire envelopes exchanged with the control server.
//!
//! Outbound requests carry their tag under `action`, inbound pushes under `type`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};
use crate::view::Severity;

/// Boss danmaku variant requested by `send_boss_danmaku`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossDanmakuType {
    WelcomeBoss,
    ThanksBossGift,
}

impl BossDanmakuType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WelcomeBoss => "welcome_boss",
            Self::ThanksBossGift => "thanks_boss_gift",
        }
    }
}

/// Side of the fetched danmaku cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanmakuListType {
    Welcome,
    Roast,
}

impl DanmakuListType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Roast => "roast",
        }
    }
}

/// Operator request sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutboundAction {
    Register {
        client_type: String,
    },
    BrowseScripts {
        path: String,
    },
    LoadScript {
        filename: String,
    },
    PrevEvent {},
    NextEvent {},
    GetCurrentState {},
    FetchDanmakuList {
        streamer_name: String,
        danmaku_type: DanmakuListType,
    },
    FetchReversal {
        streamer_name: String,
    },
    FetchCaptions {
        topic_name: String,
    },
    FetchAntiFanQuotes {},
    FetchComplaintsDanmaku {},
    FetchBigBrotherWelcome {},
    FetchGiftThanksDanmaku {},
    FetchReversalScriptsRequest {},
    SendReversalAudiencePart {
        audience_part: String,
        full_script: String,
    },
    SendBossDanmaku {
        danmaku_type: BossDanmakuType,
        boss_name: String,
        gift_name: String,
    },
    AutoSendDanmaku {
        streamer_name: String,
    },
    GetRoastSequence {
        target_name: String,
    },
    AdvanceRoast {},
    ExitRoastMode {},
}

impl OutboundAction {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::BrowseScripts { .. } => "browse_scripts",
            Self::LoadScript { .. } => "load_script",
            Self::PrevEvent {} => "prev_event",
            Self::NextEvent {} => "next_event",
            Self::GetCurrentState {} => "get_current_state",
            Self::FetchDanmakuList { .. } => "fetch_danmaku_list",
            Self::FetchReversal { .. } => "fetch_reversal",
            Self::FetchCaptions { .. } => "fetch_captions",
            Self::FetchAntiFanQuotes {} => "fetch_anti_fan_quotes",
            Self::FetchComplaintsDanmaku {} => "fetch_complaints_danmaku",
            Self::FetchBigBrotherWelcome {} => "fetch_big_brother_welcome",
            Self::FetchGiftThanksDanmaku {} => "fetch_gift_thanks_danmaku",
            Self::FetchReversalScriptsRequest {} => "fetch_reversal_scripts_request",
            Self::SendReversalAudiencePart { .. } => "send_reversal_audience_part",
            Self::SendBossDanmaku { .. } => "send_boss_danmaku",
            Self::AutoSendDanmaku { .. } => "auto_send_danmaku",
            Self::GetRoastSequence { .. } => "get_roast_sequence",
            Self::AdvanceRoast {} => "advance_roast",
            Self::ExitRoastMode {} => "exit_roast_mode",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Operation association carried by server status pushes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationTag {
    pub action: Option<String>,
    pub context: Option<String>,
}

impl OperationTag {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.action.is_none() && self.context.is_none()
    }

    #[must_use]
    pub fn action_is(&self, action: &str) -> bool {
        self.action.as_deref() == Some(action)
    }

    #[must_use]
    pub fn context_starts_with(&self, prefix: &str) -> bool {
        self.context
            .as_deref()
            .is_some_and(|context| context.starts_with(prefix))
    }
}

/// Decoded but untyped inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: String,
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Decode one inbound text frame. The `type` tag is trimmed and must be non-empty.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut payload) = value else {
            return Err(ClientError::Protocol(
                "expected JSON object envelope".to_string(),
            ));
        };
        let kind = match payload.remove("type") {
            Some(Value::String(kind)) => kind.trim().to_string(),
            Some(_) => {
                return Err(ClientError::Protocol(
                    "envelope type must be a string".to_string(),
                ));
            }
            None => return Err(ClientError::Protocol("missing envelope type".to_string())),
        };
        if kind.is_empty() {
            return Err(ClientError::Protocol("empty envelope type".to_string()));
        }
        Ok(Self { kind, payload })
    }

    #[must_use]
    pub fn tag(&self) -> OperationTag {
        OperationTag {
            action: self.string_field("action"),
            context: self.string_field("context"),
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.string_field("message")
    }

    fn string_field(&self, key: &str) -> Option<String> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    }

    fn typed<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.payload.clone())).map_err(|error| {
            ClientError::Protocol(format!("invalid {} payload: {}", self.kind, error))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptOption {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScriptOptions {
    #[serde(default)]
    pub current_path: String,
    #[serde(default)]
    pub breadcrumb: Vec<Breadcrumb>,
    #[serde(default)]
    pub options: Vec<ScriptOption>,
    #[serde(default)]
    pub can_go_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentEvent {
    #[serde(default)]
    pub current_line: Option<String>,
    #[serde(default)]
    pub presenter_prompt: Option<String>,
    #[serde(default)]
    pub script_name: Option<String>,
    #[serde(default = "no_event_index")]
    pub current_event_index: i64,
    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub can_go_prev: bool,
    #[serde(default)]
    pub can_go_next: bool,
}

fn no_event_index() -> i64 {
    -1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReversalPair {
    #[serde(default)]
    pub danmaku_part: String,
    #[serde(default)]
    pub read_part: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DanmakuList {
    pub danmaku_type: Option<String>,
    #[serde(default)]
    pub streamer_name: String,
    #[serde(default)]
    pub danmaku_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReversalList {
    #[serde(default)]
    pub streamer_name: String,
    #[serde(default)]
    pub reversal_list: Vec<ReversalPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptionsList {
    #[serde(default)]
    pub topic_name: String,
    #[serde(default)]
    pub captions_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct QuotesList {
    #[serde(default)]
    quotes_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct ScriptsList {
    #[serde(default)]
    scripts_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoastReady {
    #[serde(default)]
    pub target_name: String,
    pub total_roasts: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoastStep {
    #[serde(default)]
    pub presenter_line: String,
    #[serde(default)]
    pub raw_template: String,
    pub current_roast_num: i64,
    pub total_roasts: i64,
    #[serde(default)]
    pub target_name: String,
}

/// Typed inbound server push.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    RegistrationSuccess {
        client_type: Option<String>,
        message: Option<String>,
    },
    Pong,
    Status {
        severity: Severity,
        message: Option<String>,
        tag: OperationTag,
    },
    ScriptOptions(ScriptOptions),
    CurrentEvent(CurrentEvent),
    EndOfScript {
        message: Option<String>,
    },
    DanmakuList(DanmakuList),
    ReversalList(ReversalList),
    CaptionsList(CaptionsList),
    AntiFanQuotes(Vec<String>),
    ReversalScripts(Vec<String>),
    RoastReady(RoastReady),
    RoastStep(RoastStep),
    RoastFinished {
        message: Option<String>,
        target_name: Option<String>,
        tag: OperationTag,
    },
    AutoSendStarted {
        message: Option<String>,
        tag: OperationTag,
    },
    AutoSendFinished {
        message: Option<String>,
        tag: OperationTag,
    },
    AutoSendCancelled {
        message: Option<String>,
        tag: OperationTag,
    },
    ReEnableControls {
        message: Option<String>,
        tag: OperationTag,
    },
    Other {
        kind: String,
    },
}

impl ServerEvent {
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let event = match envelope.kind.as_str() {
            "registration_success" => Self::RegistrationSuccess {
                client_type: envelope.string_field("client_type"),
                message: envelope.message(),
            },
            "pong" => Self::Pong,
            "info" | "success" | "warning" | "error" => Self::Status {
                severity: Severity::parse(&envelope.kind).unwrap_or(Severity::Info),
                message: envelope.message(),
                tag: envelope.tag(),
            },
            "script_options_update" => Self::ScriptOptions(envelope.typed()?),
            "current_event_update" => Self::CurrentEvent(envelope.typed()?),
            "end_of_script" => Self::EndOfScript {
                message: envelope.message(),
            },
            "danmaku_list" => Self::DanmakuList(envelope.typed()?),
            "reversal_list" => Self::ReversalList(envelope.typed()?),
            "captions_list" => Self::CaptionsList(envelope.typed()?),
            "anti_fan_quotes_list" => Self::AntiFanQuotes(envelope.typed::<QuotesList>()?.quotes_list),
            "reversal_scripts_list" => {
                Self::ReversalScripts(envelope.typed::<ScriptsList>()?.scripts_list)
            }
            "roast_sequence_ready" => Self::RoastReady(envelope.typed()?),
            "presenter_roast_update" => Self::RoastStep(envelope.typed()?),
            "roast_sequence_finished" => Self::RoastFinished {
                message: envelope.message(),
                target_name: envelope.string_field("target_name"),
                tag: envelope.tag(),
            },
            "auto_send_started" => Self::AutoSendStarted {
                message: envelope.message(),
                tag: envelope.tag(),
            },
            "auto_send_finished" => Self::AutoSendFinished {
                message: envelope.message(),
                tag: envelope.tag(),
            },
            "auto_send_cancelled" => Self::AutoSendCancelled {
                message: envelope.message(),
                tag: envelope.tag(),
            },
            "re_enable_auto_send_buttons" => Self::ReEnableControls {
                message: envelope.message(),
                tag: envelope.tag(),
            },
            other => Self::Other {
                kind: other.to_string(),
            },
        };
        Ok(event)
    }
}
