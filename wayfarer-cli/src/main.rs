//! wayfarer: trip planner agent API façade and its manual test driver.
//!
//! Logging: set `RUST_LOG=wayfarer_http=debug` (or `warn`, ...) to tune what reaches stderr.

mod probe;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wayfarer_http::{start_server, ServerConfig};

#[derive(Parser)]
#[command(name = "wayfarer", version)]
#[command(about = "Trip planner agent API: serve the HTTP façade or probe a running one.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP façade. Reads PORT, GOOGLE_CLOUD_PROJECT and WAYFARER_* from the environment
    Serve {
        /// Listen port on 0.0.0.0 (overrides PORT)
        #[arg(long)]
        port: Option<u16>,

        /// ADK-compatible agent server to forward to (overrides WAYFARER_BACKEND_URL)
        #[arg(long)]
        backend_url: Option<String>,
    },
    /// Exercise a running façade: find or create a session, call /run, print the answer
    #[command(after_help = probe::EXAMPLES)]
    Probe(probe::ProbeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Serve { port, backend_url } => {
            let mut config = ServerConfig::from_env()?;
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if backend_url.is_some() {
                config = config.with_backend_url(backend_url);
            }
            start_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe(args) => {
            let ok = probe::run(args).await?;
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}
