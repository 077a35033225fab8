// Copyright 2023 rust-dns-sdk authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::time::Duration;

use alidns_solver::client::DnsProviderBuilder;
use alidns_solver::providers::alidns::AliDnsBuilder;
use alidns_solver::reconciler::Action;
use alidns_solver::secrets::KubeSecretSource;
use alidns_solver::solver::{AliDnsSolver, ChallengeRequest, reconcile_challenge};
use alidns_solver::utils::request::DefaultDnsClient;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

/// Converge ACME DNS-01 challenge TXT records on Alibaba Cloud DNS
#[derive(Debug, Parser)]
#[command(name = "alidns-solver", version)]
struct Cli {
    /// Abort the reconciliation after this many seconds
    #[arg(long, global = true, env = "ALIDNS_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve a challenge request, reading credentials from the cluster
    Solve {
        /// Path to the challenge request JSON, or "-" for stdin
        #[arg(long, default_value = "-")]
        request: String,
    },
    /// Ensure the challenge record exists
    Present(DirectArgs),
    /// Remove the challenge record
    Cleanup(DirectArgs),
}

#[derive(Debug, Args)]
struct DirectArgs {
    /// Fully-qualified challenge name, e.g. _acme-challenge.example.com.
    #[arg(long)]
    fqdn: String,

    /// Zone managed by Alibaba Cloud DNS, e.g. example.com.
    #[arg(long)]
    zone: String,

    /// Expected TXT value
    #[arg(long)]
    key: String,

    #[arg(long, env = "ALIDNS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: String,

    #[arg(long, env = "ALIDNS_ACCESS_KEY_SECRET", hide_env_values = true)]
    access_key_secret: String,

    #[arg(long, env = "ALIDNS_REGION", default_value = "")]
    region: String,

    /// Override the API base URL
    #[arg(long, env = "ALIDNS_ENDPOINT")]
    endpoint: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .thread_name("alidns-solver")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

/// Installs the global subscriber.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT=json|text`.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    init_tracing();
    let timeout = cli.timeout_secs.map(Duration::from_secs);

    match cli.command {
        Command::Solve { request } => {
            let request = read_request(&request)?;
            debug!(uid = %request.uid, action = %request.action, "Read challenge request");

            let secrets = KubeSecretSource::try_default()
                .await
                .context("error creating kubernetes client")?;
            let mut solver = AliDnsSolver::new(secrets);
            if let Some(timeout) = timeout {
                solver = solver.with_timeout(timeout);
            }

            solver
                .solve(&request)
                .await
                .with_context(|| format!("{} failed for {}", request.action, request.resolved_fqdn))?;
        }
        Command::Present(args) => run_direct(Action::Present, args, timeout).await?,
        Command::Cleanup(args) => run_direct(Action::CleanUp, args, timeout).await?,
    }

    info!("done");
    Ok(())
}

async fn run_direct(action: Action, args: DirectArgs, timeout: Option<Duration>) -> Result<()> {
    let mut builder = AliDnsBuilder::<DefaultDnsClient>::new()
        .set_param("access_key_id", &args.access_key_id)?
        .set_param("access_key_secret", &args.access_key_secret)?
        .set_param("region", &args.region)?;
    if let Some(endpoint) = &args.endpoint {
        builder = builder.set_param("endpoint", endpoint)?;
    }
    let client = builder.build().context("error initializing DNS client")?;

    info!(%action, fqdn = %args.fqdn, zone = %args.zone, "Reconciling challenge record");
    reconcile_challenge(&client, action, &args.fqdn, &args.zone, &args.key, timeout)
        .await
        .with_context(|| format!("{action} failed for {}", args.fqdn))
}

fn read_request(source: &str) -> Result<ChallengeRequest> {
    let raw = if source == "-" {
        std::io::read_to_string(std::io::stdin()).context("error reading request from stdin")?
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("error reading request file {source}"))?
    };

    serde_json::from_str(&raw).context("error decoding challenge request")
}
