// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! # tt — time tracker
//!
//! Runs a live timer whose entry is redrawn in place and saved to a plain-text
//! file when the process is interrupted, appends manual entries, and totals
//! recorded time across one file or a directory tree.
//!
//! ## File format
//!
//! ```text
//! #tt
//!
//! refresh_time="0.2"
//! format_duration="%H:%M:%S"
//! format_time="%H:%M:%S"
//! format_date="%a %b %d %Y"
//! format_entry="  %{duration} | %{last_date} | %{last_time} - %{curr_time}"
//! format_total="total: %H:%M:%S"
//!
//! entries:
//!   01:30:00 | Mon Jan 01 2024 | 09:00:00 - 10:30:00
//! ```
//!
//! ## Modes
//!
//! | Invocation        | Description |
//! |-------------------|-------------|
//! | `tt PATH`         | Start a timer; Ctrl-C (or SIGTERM) saves the entry and exits. |
//! | `tt PATH -e TEXT` | Append `TEXT` as an entry without starting a timer. |
//! | `tt PATH -s`      | Print the total time in `PATH` (file or directory). |
//! | `tt PATH -ss`     | Also print each file's total. |
//! | `tt PATH -sss`    | Also print every entry. |
//!
//! `--cascade-defaults` additionally reads `.tt-defaults` files from the
//! target's ancestor directories before the file's own options.

mod clock;
mod display;
mod error;
mod options;
mod session;
mod signal;
mod store;
mod summary;
mod template;

use std::env;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;

use crate::clock::SystemClock;
use crate::display::Terminal;
use crate::error::Result;
use crate::session::TimerSession;

#[derive(Parser, Debug)]
#[command(name = "tt", version, about = "Plain-text time tracker")]
struct Cli {
    /// Tracked file to time into, or file/directory to summarize
    path: PathBuf,

    /// Append TEXT as an entry instead of starting the timer
    #[arg(short, long, value_name = "TEXT", conflicts_with = "summarize")]
    entry: Option<String>,

    /// Summarize recorded time; repeat for more detail (-ss, -sss)
    #[arg(short, long, action = ArgAction::Count)]
    summarize: u8,

    /// Also apply .tt-defaults files found in ancestor directories
    #[arg(long)]
    cascade_defaults: bool,
}

/// Logs go to stderr. `TT_LOG` takes an env-filter directive; without it,
/// `TT_DEBUG` (any value) selects debug and the default is warn.
fn init_logging() {
    let default = if env::var_os("TT_DEBUG").is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var("TT_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .init();
}

/// Runs the live timer until SIGINT/SIGTERM, then saves.
fn cmd_timer(path: &Path, cascade: bool) -> Result<()> {
    let file = store::open(path, &options::chain_for(path, cascade))?;
    let cancel = signal::install();
    let mut session = TimerSession::new(file, SystemClock, Terminal::new(io::stdout()))?;
    session.run(cancel)
}

fn cmd_entry(path: &Path, text: &str, cascade: bool) -> Result<()> {
    session::append_entry(path, &options::chain_for(path, cascade), text)?;
    Ok(())
}

fn cmd_summarize(path: &Path, verbosity: u8, cascade: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    summary::run(path, verbosity, cascade, &mut out)?;
    Ok(())
}

fn main() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
    let cli = Cli::parse();
    init_logging();
    debug!(?cli, "dispatching");

    let result = match (&cli.entry, cli.summarize) {
        (Some(text), _) => cmd_entry(&cli.path, text, cli.cascade_defaults),
        (None, 0) => cmd_timer(&cli.path, cli.cascade_defaults),
        (None, n) => cmd_summarize(&cli.path, n, cli.cascade_defaults),
    };
    if let Err(e) = result {
        eprintln!("tt: {}", e);
        process::exit(1);
    }
}
