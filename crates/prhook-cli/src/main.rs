//! prhook - pull-request comment trigger resource
//!
//! Each subcommand reads one JSON request on stdin and writes one JSON
//! response line on stdout. Diagnostics and logs go to stderr.
//!
//! ## Commands
//!
//! - `check`: resolve the next trigger comment version
//! - `in`: materialize a version into a destination directory
//! - `out`: report build status for a materialized version

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, Level};

use prhook_core::obs::{self, PhaseSpan};
use prhook_core::{
    report, BuildEnv, CheckRequest, CliGit, GithubClient, HookError, HostingClient, InRequest,
    Materializer, OutRequest, PhaseResponse, Version,
};

#[derive(Parser)]
#[command(name = "prhook")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pull-request comment trigger resource", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "PRHOOK_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the next trigger comment version
    Check,

    /// Materialize a version into a destination directory
    In {
        /// Directory to clone into (created by the orchestrator)
        destination: PathBuf,
    },

    /// Report status for a previously materialized version
    Out {
        /// Root directory holding the build's inputs
        sources: PathBuf,

        /// Orchestrator base URL, used for the default target_url
        #[arg(long, env = "ATC_EXTERNAL_URL")]
        atc_external_url: Option<String>,

        /// Build number, used for the default target_url
        #[arg(long, env = "BUILD_ID")]
        build_id: Option<String>,
    },
}

impl Commands {
    fn phase(&self) -> &'static str {
        match self {
            Commands::Check => "check",
            Commands::In { .. } => "in",
            Commands::Out { .. } => "out",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    prhook_core::init_tracing(cli.json, level);

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;

    let phase = cli.command.phase();
    match run(cli.command, &input).await {
        Ok(line) => {
            println!("{line}");
            Ok(())
        }
        Err(err) => {
            obs::emit_phase_failed(phase, err.kind(), &err);
            Err(anyhow::Error::new(err).context(format!("{phase} failed")))
        }
    }
}

/// Run one phase against the live hosting service; returns the response line.
async fn run(command: Commands, input: &str) -> prhook_core::Result<String> {
    match command {
        Commands::Check => {
            let request: CheckRequest = parse_request(input, "check")?;
            let _span = PhaseSpan::enter("check", &request.source.repository);
            let client = GithubClient::from_source(&request.source)?;
            let versions = cmd_check(&client, &request).await?;
            to_line(&versions)
        }
        Commands::In { destination } => {
            let request: InRequest = parse_request(input, "in")?;
            let _span = PhaseSpan::enter("in", &request.source.repository);
            let client = GithubClient::from_source(&request.source)?;
            let git = CliGit::new(&request.source.access_token);
            let response = cmd_in(&client, &git, &request, &destination).await?;
            to_line(&response)
        }
        Commands::Out {
            sources,
            atc_external_url,
            build_id,
        } => {
            let request: OutRequest = parse_request(input, "out")?;
            let _span = PhaseSpan::enter("out", &request.source.repository);
            let client = GithubClient::from_source(&request.source)?;
            let env = BuildEnv {
                external_url: atc_external_url,
                build_id,
            };
            let response = cmd_out(&client, &request, &sources, &env).await?;
            to_line(&response)
        }
    }
}

async fn cmd_check(
    client: &dyn HostingClient,
    request: &CheckRequest,
) -> prhook_core::Result<Vec<Version>> {
    let cursor = request
        .version
        .as_ref()
        .map(|v| v.comment_id.as_str())
        .filter(|id| !id.is_empty());
    obs::emit_check_started(cursor);

    let versions = prhook_core::resolve(client, &request.source, request.version.as_ref()).await?;
    if let Some(version) = versions.first() {
        obs::emit_check_resolved(&version.pr, &version.comment_id);
    }
    Ok(versions)
}

async fn cmd_in(
    client: &dyn HostingClient,
    git: &CliGit,
    request: &InRequest,
    destination: &Path,
) -> prhook_core::Result<PhaseResponse> {
    // Git chatter must never reach stdout.
    let mut diag = std::io::stderr();
    let metadata = Materializer::new(client, git)
        .materialize(
            &request.source,
            &request.version,
            &request.params,
            destination,
            &mut diag,
        )
        .await?;

    Ok(PhaseResponse {
        version: request.version.clone(),
        metadata,
    })
}

async fn cmd_out(
    client: &dyn HostingClient,
    request: &OutRequest,
    sources: &Path,
    env: &BuildEnv,
) -> prhook_core::Result<PhaseResponse> {
    debug!(path = %request.params.path, status = %request.params.status, "reporting");
    report(client, &request.source, &request.params, sources, env).await
}

fn parse_request<T: DeserializeOwned>(input: &str, phase: &str) -> prhook_core::Result<T> {
    serde_json::from_str(input)
        .map_err(|e| HookError::Config(format!("invalid {phase} request: {e}")))
}

fn to_line<T: Serialize>(value: &T) -> prhook_core::Result<String> {
    Ok(serde_json::to_string(value)?)
}
