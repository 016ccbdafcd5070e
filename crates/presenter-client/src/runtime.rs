//! Async driver for one presenter session.
//!
//! A single tokio task owns the [`Presenter`], the live [`Connection`] and every timer.
//! It takes one input at a time (operator command, inbound frame, connect result,
//! timer, suggestion answer), lets the presenter process it to completion, then
//! flushes queued outbound actions to the socket and UI events to the handle.

use std::future;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::dispatcher::OperatorIntent;
use crate::error::{ClientError, Result};
use crate::presenter::Presenter;
use crate::router::FeatureDispatcher;
use crate::search::SuggestionClient;
use crate::session::{CloseCode, ConnectDecision};
use crate::transport::{Connection, ConnectionId, TransportEvent};
use crate::view::UiEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Connect,
    Disconnect,
    Intent(OperatorIntent),
    Suggest(String),
    Shutdown,
}

/// Caller side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: mpsc::UnboundedReceiver<UiEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::SessionClosed)
    }

    pub fn connect(&self) -> Result<()> {
        self.send(SessionCommand::Connect)
    }

    pub fn disconnect(&self) -> Result<()> {
        self.send(SessionCommand::Disconnect)
    }

    pub fn intent(&self, intent: OperatorIntent) -> Result<()> {
        self.send(SessionCommand::Intent(intent))
    }

    pub fn suggest(&self, term: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::Suggest(term.into()))
    }

    /// Next renderer event; `None` once the session task has stopped.
    pub async fn next_event(&mut self) -> Option<UiEvent> {
        self.events.recv().await
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.commands.send(SessionCommand::Shutdown);
        self.task
            .await
            .map_err(|error| ClientError::Connection(format!("session task failed: {error}")))
    }
}

/// Start a session with the given feature dispatcher. Call [`SessionHandle::connect`] to open it.
pub fn spawn_session(
    config: ClientConfig,
    features: Box<dyn FeatureDispatcher>,
) -> Result<SessionHandle> {
    let mut presenter = Presenter::new(&config);
    presenter.register_features(features);
    spawn_with(config, presenter)
}

/// Start a session with the standard feature layer.
pub fn spawn_standard_session(config: ClientConfig) -> Result<SessionHandle> {
    let presenter = Presenter::with_standard_features(&config);
    spawn_with(config, presenter)
}

fn spawn_with(config: ClientConfig, presenter: Presenter) -> Result<SessionHandle> {
    let endpoint = config.endpoint_url()?;
    let search = SuggestionClient::new(&config)?;
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let (connect_tx, connect_rx) = mpsc::unbounded_channel();
    let (search_tx, search_rx) = mpsc::unbounded_channel();

    let driver = Driver {
        presenter,
        config,
        endpoint,
        search,
        connection: None,
        pending_connect: None,
        next_connection_id: 0,
        transport_tx,
        connect_tx,
        search_tx,
        events_tx,
    };
    let task = tokio::spawn(driver.run(Inputs {
        commands: commands_rx,
        transport: transport_rx,
        connects: connect_rx,
        lookups: search_rx,
    }));

    Ok(SessionHandle {
        commands: commands_tx,
        events: events_rx,
        task,
    })
}

type ConnectResult = (ConnectionId, Result<Connection>);
type LookupResult = (String, Result<Vec<String>>);

struct Inputs {
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    transport: mpsc::UnboundedReceiver<TransportEvent>,
    connects: mpsc::UnboundedReceiver<ConnectResult>,
    lookups: mpsc::UnboundedReceiver<LookupResult>,
}

struct Driver {
    presenter: Presenter,
    config: ClientConfig,
    endpoint: Url,
    search: SuggestionClient,
    connection: Option<Connection>,
    pending_connect: Option<ConnectionId>,
    next_connection_id: ConnectionId,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    connect_tx: mpsc::UnboundedSender<ConnectResult>,
    search_tx: mpsc::UnboundedSender<LookupResult>,
    events_tx: mpsc::UnboundedSender<UiEvent>,
}

impl Driver {
    async fn run(mut self, mut inputs: Inputs) {
        self.flush().await;
        loop {
            let wakeup = self.presenter.next_wakeup();
            tokio::select! {
                command = inputs.commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => {
                            self.disconnect().await;
                            self.flush().await;
                            break;
                        }
                        Some(command) => self.on_command(command).await,
                    }
                }
                Some(event) = inputs.transport.recv() => self.on_transport(event),
                Some((id, result)) = inputs.connects.recv() => self.on_connect_result(id, result),
                Some((term, result)) = inputs.lookups.recv() => {
                    self.presenter.on_suggestions(&term, result);
                }
                () = sleep_until(wakeup) => {
                    if self.presenter.poll_timers(Instant::now()) {
                        info!("reconnecting");
                        self.start_connect();
                    }
                }
            }
            self.flush().await;
        }
        debug!("session driver stopped");
    }

    async fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect => self.start_connect(),
            SessionCommand::Disconnect => self.disconnect().await,
            SessionCommand::Intent(intent) => {
                if let Err(error) = self.presenter.dispatch(intent, Instant::now()) {
                    debug!(error = %error, "operator intent rejected");
                }
            }
            SessionCommand::Suggest(term) => {
                if let Some(term) = self.presenter.suggest(&term) {
                    let search = self.search.clone();
                    let results = self.search_tx.clone();
                    tokio::spawn(async move {
                        let result = search.lookup(&term).await;
                        let _ = results.send((term, result));
                    });
                }
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn start_connect(&mut self) {
        if self.presenter.connect() == ConnectDecision::AlreadyActive {
            debug!("connect ignored, session already active");
            return;
        }
        self.next_connection_id = self.next_connection_id.wrapping_add(1);
        let id = self.next_connection_id;
        self.pending_connect = Some(id);

        let endpoint = self.endpoint.clone();
        let timeout = self.config.connect_timeout;
        let transport = self.transport_tx.clone();
        let results = self.connect_tx.clone();
        info!(url = %endpoint, connection = id, "connecting");
        tokio::spawn(async move {
            let result = Connection::open(&endpoint, timeout, id, transport).await;
            let _ = results.send((id, result));
        });
    }

    fn on_connect_result(&mut self, id: ConnectionId, result: Result<Connection>) {
        if self.pending_connect != Some(id) {
            debug!(connection = id, "discarding superseded connection attempt");
            return;
        }
        self.pending_connect = None;
        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.presenter.on_open();
            }
            Err(error) => {
                warn!(connection = id, error = %error, "connection attempt failed");
                self.presenter.on_connect_failed(&error, Instant::now());
            }
        }
    }

    fn on_transport(&mut self, event: TransportEvent) {
        let current = self.connection.as_ref().map(Connection::id);
        if current != Some(event.connection()) {
            debug!(connection = event.connection(), "discarding event from stale connection");
            return;
        }
        match event {
            TransportEvent::Frame { text, .. } => {
                self.presenter.on_frame(&text, Instant::now());
            }
            TransportEvent::Closed { code, reason, .. } => {
                self.connection = None;
                self.presenter.on_closed(code, reason, Instant::now());
            }
        }
    }

    async fn disconnect(&mut self) {
        self.presenter.begin_shutdown();
        let was_connecting = self.pending_connect.take().is_some();
        if let Some(connection) = self.connection.take() {
            if let Err(error) = connection.close().await {
                debug!(error = %error, "close frame not delivered");
            }
        } else if !was_connecting {
            return;
        }
        self.presenter.on_closed(
            CloseCode::NORMAL,
            Some("closed by operator".to_string()),
            Instant::now(),
        );
    }

    async fn flush(&mut self) {
        let effects = self.presenter.take_effects();
        for action in effects.outbound {
            match self.connection.as_mut() {
                Some(connection) => {
                    if let Err(error) = connection.send_action(&action).await {
                        warn!(action = action.name(), error = %error, "send failed");
                    }
                }
                None => warn!(action = action.name(), "dropping action without a connection"),
            }
        }
        for event in effects.ui {
            if self.events_tx.send(event).is_err() {
                debug!("ui receiver dropped");
                break;
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => future::pending().await,
    }
}
