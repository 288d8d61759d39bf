//! boxwm
//!
//! A stacking X11 window manager: decorated frames, workspaces, a toolbar
//! and a dock, driven by a single-threaded event loop.

mod config;
mod shared;
mod wm;
mod x11_async;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::wm::display::Display;
use crate::wm::error::{report, Severity, WmError};
use crate::wm::render::SolidRenderer;
use crate::wm::session::SessionState;
use crate::wm::xconn::XConnection;
use crate::wm::WindowManager;
use crate::x11_async::XEventSource;

#[derive(Parser, Debug)]
#[command(name = "boxwm", version, about = "A stacking window manager for X11")]
struct Args {
    /// Replace the running window manager
    #[arg(short, long)]
    replace: bool,

    /// Configuration file (default: ~/.config/boxwm/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// X display to manage (default: $DISPLAY)
    #[arg(short, long)]
    display: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "boxwm=debug" } else { "boxwm=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(WmError::AnotherWmRunning(screen)) = e.downcast_ref::<WmError>() {
                eprintln!(
                    "boxwm: another window manager is running on screen {}, try --replace",
                    screen
                );
            } else {
                error!("{:#}", e);
                eprintln!("boxwm: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting boxwm {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let session_path = SessionState::default_path().ok();
    let session = match &session_path {
        Some(path) => SessionState::load(path).unwrap_or_else(|e| {
            warn!("Ignoring session file: {:#}", e);
            None
        }),
        None => None,
    };
    if let Some(session) = &session {
        session.apply(&mut config);
    }

    let display = XConnection::connect(args.display.as_deref(), args.replace)?;
    let events = XEventSource::new(display.connection())?;
    let mut wm = WindowManager::new(
        display,
        Box::new(SolidRenderer),
        config,
        args.config.clone(),
        session.as_ref(),
    )?;
    wm.adopt_existing()?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    while wm.is_running() {
        // Replies read while handling can leave events buffered without
        // the socket becoming readable again
        let backlog = dispatch_batch(&mut wm, &events)?;
        if !wm.is_running() {
            break;
        }
        wm.display_mut().flush()?;

        let deadline = wm.next_deadline();
        tokio::select! {
            _ = events.readable() => {}
            _ = std::future::ready(()), if backlog => {}
            _ = sleep_until(deadline) => {
                if let Err(e) = wm.fire_timers(Instant::now()) {
                    if report(&e) == Severity::Fatal {
                        return Err(e);
                    }
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                if let Err(e) = wm.reconfigure() {
                    if report(&e) == Severity::Fatal {
                        return Err(e);
                    }
                }
            }
        }
    }

    wm.shutdown(session_path.as_deref())?;
    info!("boxwm exited");
    Ok(())
}

/// Dispatch one batch of queued events and report whether more may be
/// waiting. Handler errors are logged; only a lost connection ends the
/// loop.
fn dispatch_batch(wm: &mut WindowManager<XConnection>, events: &XEventSource) -> Result<bool> {
    let batch = events.drain()?;
    let full = batch.len() == x11_async::DRAIN_LIMIT;
    for raw in batch {
        let Some(event) = wm.display().translate(raw) else {
            continue;
        };
        if let Err(e) = wm.handle_event(event) {
            if report(&e) == Severity::Fatal {
                return Err(e);
            }
        }
        if !wm.is_running() {
            break;
        }
    }
    Ok(full)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}
