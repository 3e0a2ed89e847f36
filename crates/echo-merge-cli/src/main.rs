// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-merge: run the built-in merge strategies over literal inputs.
//!
//! Each input is a comma-separated list of elements. The merged output is
//! printed to stdout, one element per line; logs go to stderr.
//!
//! # Usage
//! ```text
//! echo-merge fair a,b,c,d e,f
//! echo-merge round-robin a,b,c,d e,f
//! echo-merge zip 1,2,3,4 a,b,c
//! echo-merge --batch 1 preferred urgent,now x,y z
//! echo-merge --profile nightly fair a,b c
//! ```
// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod prefs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use echo_merge::{
    upstream_from_iter, ConfigError, FairMerge, MergeConfig, MergeDriver, MergeLogic,
    PreferredMerge, ProfileStore, StrictRoundRobin, Upstream, Zip, ZipInput,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::prefs::{CliPrefs, ConfigDir};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run Echo merge strategies over literal inputs")]
struct Cli {
    /// Elements requested per demand signal (defaults to the saved preference)
    #[arg(long, global = true)]
    batch: Option<u64>,
    /// Log every merge transition at debug level
    #[arg(long, global = true)]
    trace: bool,
    /// Log filter used when RUST_LOG is unset (defaults to the saved preference)
    #[arg(long, global = true)]
    log: Option<String>,
    /// Saved merge profile to run with (defaults to the saved preference)
    #[arg(long, global = true)]
    profile: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interleave any number of inputs without starving any of them
    Fair {
        /// Comma-separated inputs
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Alternate strictly between two inputs, then drain the longer one
    RoundRobin {
        /// Comma-separated inputs (exactly two)
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Pair the elements of two inputs until either ends
    Zip {
        /// Comma-separated inputs (exactly two)
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Serve the first input whenever it has elements, the rest fairly
    Preferred {
        /// Comma-separated inputs; the first one is preferred
        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config (best-effort)
    let config = ConfigDir::locate().ok();
    let prefs: CliPrefs = config
        .as_ref()
        .and_then(|dir| dir.load_prefs().ok().flatten())
        .unwrap_or_default();
    if let Some(dir) = &config {
        let _ = dir.save_prefs(&prefs);
    }

    let filter = cli.log.as_deref().unwrap_or(&prefs.log_filter);
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter).context("invalid log filter")?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    if config.is_none() {
        warn!("config store unavailable; prefs won't persist this session");
    }

    let profile = cli.profile.as_deref().unwrap_or(&prefs.profile);
    let merge = match &config {
        Some(dir) => load_profile(dir, profile)?,
        None => MergeConfig::default(),
    };
    let trace = cli.trace || merge.trace_transitions;
    let merge = merge.with_trace_transitions(trace);
    let batch = cli.batch.unwrap_or(prefs.batch);
    for line in run_command(cli.command, merge, batch).await? {
        println!("{line}");
    }
    Ok(())
}

/// Loads `profile`, saving defaults under it on first use. An unreadable
/// profile falls back to defaults; an invalid name is an error.
fn load_profile(dir: &ConfigDir, profile: &str) -> Result<MergeConfig> {
    match ProfileStore::new(dir).load_or_create(profile) {
        Ok(merge) => Ok(merge),
        Err(err @ ConfigError::InvalidProfile(_)) => Err(err.into()),
        Err(err) => {
            warn!(%err, profile, "merge profile unreadable; using defaults");
            Ok(MergeConfig::default())
        }
    }
}

async fn run_command(command: Command, config: MergeConfig, batch: u64) -> Result<Vec<String>> {
    match command {
        Command::Fair { inputs } => {
            drain(config, FairMerge::new(), upstreams(&inputs), batch, |x| x).await
        }
        Command::RoundRobin { inputs } => {
            drain(config, StrictRoundRobin::new(), upstreams(&inputs), batch, |x| x).await
        }
        Command::Zip { inputs } => {
            drain(config, Zip::new(), zip_upstreams(&inputs), batch, |(a, b)| {
                format!("({a}, {b})")
            })
            .await
        }
        Command::Preferred { inputs } => {
            drain(config, PreferredMerge::new(), upstreams(&inputs), batch, |x| x).await
        }
    }
}

/// Runs `logic` to completion and renders every merged element.
async fn drain<L>(
    config: MergeConfig,
    logic: L,
    upstreams: Vec<Upstream<L::In>>,
    batch: u64,
    render: impl Fn(L::Out) -> String,
) -> Result<Vec<String>>
where
    L: MergeLogic + 'static,
{
    let (driver, downstream) = MergeDriver::with_config(config, logic, upstreams)?;
    let run = tokio::spawn(driver.run());
    let merged = downstream.collect(batch).await?;
    let outcome = run.await.context("merge task did not finish")??;
    info!(?outcome, elements = merged.len(), "merge finished");
    Ok(merged.into_iter().map(render).collect())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn upstreams(inputs: &[String]) -> Vec<Upstream<String>> {
    inputs
        .iter()
        .map(|raw| upstream_from_iter(parse_list(raw)))
        .collect()
}

/// Tags the first input as `A` and every other input as `B`; the strategy
/// rejects any count other than two.
fn zip_upstreams(inputs: &[String]) -> Vec<Upstream<ZipInput<String, String>>> {
    match inputs {
        [a, b] => Zip::upstreams(upstream_from_iter(parse_list(a)), upstream_from_iter(parse_list(b))),
        _ => inputs
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let items = parse_list(raw);
                let tagged: Vec<_> = if index == 0 {
                    items.into_iter().map(ZipInput::A).collect()
                } else {
                    items.into_iter().map(ZipInput::B).collect()
                };
                upstream_from_iter(tagged)
            })
            .collect(),
    }
}
