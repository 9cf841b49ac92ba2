//! The `jabbot` binary.
//!
//! ```bash
//! jabbot --config jabbot.toml --profile production
//! ```
//!
//! Frames are read from stdin and replies written to stdout, one JSON object
//! per line; the banner and logs go to stderr. The exit code tells the
//! process supervisor what happened: `0` for a planned recycle, `-1` for a
//! fault, including a panic that escapes the runtime.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use futures::FutureExt;
use tracing::{error, info};

use jabbot_adapter_console::ConsoleSession;
use jabbot_runtime::config::LogOutput;
use jabbot_runtime::{ConfigLoader, JabbotRuntime, init_from_config};

const FAILURE: i32 = -1;

#[derive(Debug, Parser)]
#[command(name = "jabbot", version, about = "A plugin-based chat bot")]
struct Args {
    /// Configuration file to load on top of the searched ones.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Configuration profile (development, production, or a custom name).
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    eprintln!("Jabbot v{}", env!("CARGO_PKG_VERSION"));
    install_panic_hook();

    let code = exit_code(run(args)).await;
    std::process::exit(code);
}

/// Routes every panic report through the log before the default hook.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!(panic = %info, "Panicked");
        default_hook(info);
    }));
}

/// Awaits `run` and maps how it ended to a process exit code.
async fn exit_code<F>(run: F) -> i32
where
    F: Future<Output = Result<i32>>,
{
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            error!(error = %e, "Fatal error");
            eprintln!("Fatal error: {e:#}");
            FAILURE
        }
        Err(_) => {
            eprintln!("Fatal error: jabbot panicked");
            FAILURE
        }
    }
}

async fn run(args: Args) -> Result<i32> {
    let mut loader = ConfigLoader::new();
    if let Some(profile) = args.profile.as_deref() {
        loader = loader.profile(profile);
    }
    if let Some(path) = args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load()?;

    // Stdout belongs to the reply frames.
    if config.logging.output == LogOutput::Stdout {
        eprintln!("logging.output = \"stdout\" would corrupt the reply stream, using stderr");
        config.logging.output = LogOutput::Stderr;
    }
    init_from_config(&config.logging);
    info!(profile = ?args.profile, "Configuration loaded");

    let registry = jabbot_sprockets::default_registry()?;
    let (session, events) = ConsoleSession::stdio();

    let reason = JabbotRuntime::builder(config, session, events)
        .registry(registry)
        .build()?
        .run()
        .await?;

    Ok(reason.exit_code())
}
