//! Websocket connection to the control server.
//!
//! One [`Connection`] per socket. A background reader forwards text frames and the
//! final close as [`TransportEvent`]s tagged with the connection id, so the driver can
//! discard anything from a connection it has already replaced. Read errors are not
//! reported separately: they end the reader with an abnormal close.

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::envelope::OutboundAction;
use crate::error::{ClientError, Result};
use crate::session::CloseCode;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// Close code reported when the peer closes without a status.
const NO_STATUS: CloseCode = CloseCode(1005);

pub type ConnectionId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame {
        connection: ConnectionId,
        text: String,
    },
    Closed {
        connection: ConnectionId,
        code: CloseCode,
        reason: Option<String>,
    },
}

impl TransportEvent {
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        match self {
            Self::Frame { connection, .. } | Self::Closed { connection, .. } => *connection,
        }
    }
}

pub struct Connection {
    id: ConnectionId,
    writer: WsWriter,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Connection {
    /// Open a socket to `url`, failing after `connect_timeout`.
    pub async fn open(
        url: &Url,
        connect_timeout: Duration,
        id: ConnectionId,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ClientError::InvalidUrl(format!(
                "URL must use ws:// or wss:// scheme, got: {}",
                url.scheme()
            )));
        }

        let (stream, _response) = timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                ClientError::Timeout(format!("connection timeout after {connect_timeout:?}"))
            })?
            .map_err(|error| ClientError::Connection(error.to_string()))?;
        let (writer, mut reader) = stream.split();

        let reader = tokio::spawn(async move {
            let (code, reason) = loop {
                match reader.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let event = TransportEvent::Frame {
                            connection: id,
                            text: text.as_str().to_string(),
                        };
                        if events.send(event).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => {
                                let reason = frame.reason.to_string();
                                (
                                    CloseCode(u16::from(frame.code)),
                                    (!reason.is_empty()).then_some(reason),
                                )
                            }
                            None => (NO_STATUS, None),
                        };
                    }
                    Some(Ok(Message::Binary(payload))) => {
                        debug!(connection = id, bytes = payload.len(), "ignoring binary frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(connection = id, error = %error, "websocket read error");
                        break (CloseCode::ABNORMAL, Some(error.to_string()));
                    }
                    None => break (CloseCode::ABNORMAL, Some("connection reset".to_string())),
                }
            };
            let _ = events.send(TransportEvent::Closed {
                connection: id,
                code,
                reason,
            });
        });

        Ok(Self { id, writer, reader })
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|error| ClientError::WebSocket(error.to_string()))
    }

    pub async fn send_action(&mut self, action: &OutboundAction) -> Result<()> {
        debug!(connection = self.id, action = action.name(), "sending action");
        self.send_text(action.to_json()?).await
    }

    /// Local teardown with a normal close frame. The reader stops without reporting.
    pub async fn close(mut self) -> Result<()> {
        self.reader.abort();
        let frame = CloseFrame {
            code: WsCloseCode::Normal,
            reason: "".into(),
        };
        self.writer
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|error| ClientError::WebSocket(error.to_string()))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
