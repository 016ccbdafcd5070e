mod command;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use presenter_client::{ClientConfig, SessionHandle, spawn_standard_session};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::{ConsoleCommand, HELP};

/// Line-oriented presenter console for the broadcast companion server.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Server host. Overrides PRESENTER_HOST.
    #[arg(long)]
    host: Option<String>,

    /// Websocket port. Overrides PRESENTER_WS_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// HTTP port for streamer-name suggestions. Overrides PRESENTER_HTTP_PORT.
    #[arg(long)]
    http_port: Option<u16>,

    /// Use wss:// and https://.
    #[arg(long)]
    secure: bool,

    /// Start without connecting; type `connect` later.
    #[arg(long)]
    no_connect: bool,
}

impl Args {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.ws_port = port;
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if self.secure {
            config.secure = true;
        }
    }
}

async fn write_line(stdout: &mut Stdout, text: &str) -> Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

async fn run(mut handle: SessionHandle, mut stdout: Stdout) -> Result<SessionHandle> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    return Ok(handle);
                };
                match command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(ConsoleCommand::Help)) => write_line(&mut stdout, HELP).await?,
                    Ok(Some(ConsoleCommand::Quit)) => return Ok(handle),
                    Ok(Some(ConsoleCommand::Session(command))) => handle.send(command)?,
                    Err(message) => write_line(&mut stdout, &message).await?,
                }
            }
            event = handle.next_event() => {
                let Some(event) = event else {
                    warn!("session stopped");
                    return Ok(handle);
                };
                write_line(&mut stdout, &render::render(&event)).await?;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env().context("read presenter configuration")?;
    args.apply(&mut config);
    info!(endpoint = %config.endpoint_url()?, "starting presenter console");

    let handle = spawn_standard_session(config).context("start presenter session")?;
    if !args.no_connect {
        handle.connect()?;
    }
    let handle = run(handle, tokio::io::stdout()).await?;
    handle.shutdown().await.context("stop presenter session")?;
    Ok(())
}
