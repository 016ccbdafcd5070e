//! Presenter control surface for the broadcast companion server.
//!
//! [`Presenter`] is a synchronous, clock-injected state container: every input
//! (operator intent, inbound frame, close, timer tick) is processed to completion and
//! leaves queued [`Effects`]. [`runtime::spawn_session`] drives one over a websocket.

pub mod config;
pub mod controls;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod features;
pub mod lock;
pub mod presenter;
pub mod roast;
pub mod router;
pub mod runtime;
pub mod search;
pub mod session;
pub mod transport;
pub mod view;

pub use config::{ClientConfig, ConfigError, ReconnectConfig};
pub use controls::{ControlBoard, ControlInputs, NavigationState, derive_enabled};
pub use dispatcher::{OperatorIntent, ShortcutKey};
pub use envelope::{
    BossDanmakuType, DanmakuListType, Envelope, OperationTag, OutboundAction, ServerEvent,
};
pub use error::{ClientError, InputField, Result, ValidationError};
pub use features::{FeatureState, FetchedListCache, StandardFeatures, split_reversal_script};
pub use lock::{LockPhase, ModalKind, ModalLock, ReleaseReason};
pub use presenter::{Effects, Presenter};
pub use roast::{RoastPhase, RoastSequence};
pub use router::{CoreDisposition, FeatureContext, FeatureDispatcher, FeatureHandle, RouteOutcome};
pub use runtime::{SessionCommand, SessionHandle, spawn_session, spawn_standard_session};
pub use search::SuggestionClient;
pub use session::{CloseCode, CloseOutcome, ConnectionState, ReconnectPlan, Session};
pub use transport::{Connection, TransportEvent};
pub use view::{ControlGroup, Severity, UiEvent};
