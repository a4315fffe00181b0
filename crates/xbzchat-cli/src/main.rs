//! xbzchat terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Join the chat served at the default origin
//! xbzchat --nickname tom
//!
//! # Join a remote server over TLS
//! xbzchat --nickname tom --server https://chat.example.com
//! ```
//!
//! Typed lines are sent as chat messages. `/hide` and `/show` report the
//! window as hidden or visible, `/resume` reports a resume from suspension,
//! `/quit` leaves.

mod printer;

use std::io;

use clap::Parser;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use xbzchat_client::{RuntimeError, SessionHandle, connect_ws};
use xbzchat_core::{Session, SessionConfig, SessionError, config::DEFAULT_ORIGIN, endpoint_for_origin};

use crate::printer::Printer;

/// xbzchat terminal client
#[derive(Parser, Debug)]
#[command(name = "xbzchat")]
#[command(about = "Two-user real-time chat client")]
#[command(version)]
struct Args {
    /// Nickname to join with
    #[arg(short, long)]
    nickname: String,

    /// Origin serving the chat (http/https)
    #[arg(short, long, default_value = DEFAULT_ORIGIN)]
    server: String,

    /// Full WebSocket URL; overrides --server
    #[arg(long)]
    url: Option<String>,

    /// Disable the periodic liveness re-check
    #[arg(long)]
    no_periodic_check: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// CLI errors.
#[derive(Debug, Error)]
enum CliError {
    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Session could not be built from the arguments.
    #[error("invalid session: {0}")]
    Session(#[from] SessionError),

    /// Runtime stopped underneath us.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Runtime task panicked.
    #[error("runtime task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What a typed line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Hide,
    Show,
    Resume,
    Quit,
    Chat(&'a str),
    Blank,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Blank,
        "/hide" => Input::Hide,
        "/show" => Input::Show,
        "/resume" => Input::Resume,
        "/quit" => Input::Quit,
        _ => Input::Chat(line),
    }
}

fn build_session(args: &Args) -> Result<Session<tokio::time::Instant>, SessionError> {
    let endpoint = match &args.url {
        Some(url) => url.clone(),
        None => endpoint_for_origin(&args.server)?,
    };
    let config = SessionConfig {
        periodic_check: !args.no_periodic_check,
        ..SessionConfig::with_endpoint(endpoint)
    };
    Session::new(args.nickname.clone(), config)
}

/// Forward stdin lines until `/quit` or end of input.
async fn read_input(handle: &SessionHandle) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Hide => handle.set_visible(false)?,
            Input::Show => handle.set_visible(true)?,
            Input::Resume => handle.resumed()?,
            Input::Quit => break,
            Input::Chat(content) => handle.send(content)?,
            Input::Blank => {},
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let session = build_session(&args)?;
    tracing::info!(nickname = %session.nickname(), endpoint = %session.config().endpoint, "starting");

    let (handle, task) = connect_ws(session, Printer::new(io::stdout()));
    handle.connect()?;

    let result = read_input(&handle).await;

    handle.shutdown()?;
    task.await?;
    result
}
