use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, process};

use clap::{Parser, Subcommand};
#[cfg(feature = "profiling")]
use profiling::puffin;
#[cfg(feature = "profiling")]
use puffin_http::Server;
use strata::{backend, daemon};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command line arguments.
#[derive(Parser, Debug)]
#[clap(author, about, version, max_term_width = 80)]
struct Options {
    #[clap(subcommand)]
    pub subcommands: Subcommands,
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    /// Replay a script of compositor events.
    Replay(ReplayOptions),
}

#[derive(clap::Args, Debug)]
pub struct ReplayOptions {
    /// Event script, one JSON event per line.
    script: PathBuf,

    /// Shell command run once the compositor is ready.
    #[clap(long)]
    startup_command: Option<String>,

    /// Override the outputs' frame interval in milliseconds.
    #[clap(long, value_name = "MS")]
    frame_interval: Option<u64>,
}

pub fn main() {
    #[cfg(feature = "profiling")]
    let _server = {
        puffin::set_scopes_on(true);
        Server::new(&format!("0.0.0.0:{}", puffin_http::DEFAULT_PORT)).ok()
    };

    // Setup logging.
    let directives = env::var("RUST_LOG").unwrap_or("warn,strata=info".into());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    FmtSubscriber::builder().with_env_filter(env_filter).with_line_number(true).init();

    match Options::parse().subcommands {
        Subcommands::Replay(options) => {
            if let Some(command) = &options.startup_command {
                trace_error(daemon::spawn_startup_command(command));
            }

            let frame_interval = options.frame_interval.map(Duration::from_millis);
            if let Err(err) = backend::run(&options.script, frame_interval) {
                error!("{err}");
                process::exit(1);
            }
        },
    }
}

/// Log an error, ignoring success.
pub fn trace_error<T, E: Display>(result: Result<T, E>) {
    if let Err(err) = &result {
        error!("{err}");
    }
}
