//! cvdn-nav: shortest-path action trajectories for the CVDN / NDH dataset.
//!
//! - `replan`         -- replay every dialog and attach per-turn action trajectories
//! - `extract-views`  -- walk the simulator to every view a split refers to

mod config;
mod dataset;
mod driver;
mod frames;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cvdn_navigation::{ConnectivityDir, NavGraph};
use cvdn_sim::GraphSimulator;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Settings, load_settings};
use crate::dataset::{read_split, split_path, write_jsonl};
use crate::driver::{replan_to_file, split_scans};
use crate::frames::extract_split;

/// Shortest-path action trajectories for the CVDN / NDH dataset.
#[derive(Parser)]
#[command(name = "cvdn-nav", version, about)]
struct Cli {
    /// TOML configuration file layered over `config/default.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the `actions` of every record with shortest-path trajectories.
    Replan(SplitArgs),
    /// Visit every view referenced by the dataset and write a view manifest per split.
    ExtractViews(SplitArgs),
}

#[derive(Args)]
struct SplitArgs {
    /// Folder holding `<split>.jsonl` files.
    #[arg(long, alias = "dataset_path")]
    dataset_path: PathBuf,

    /// Destination folder.
    #[arg(long)]
    output: PathBuf,

    /// Splits to process (defaults to `dataset.splits` from the configuration).
    #[arg(long = "split")]
    splits: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Replan(args) => replan(&settings, &args),
        Commands::ExtractViews(args) => extract_views(&settings, &args),
    }
}

fn selected_splits<'a>(settings: &'a Settings, args: &'a SplitArgs) -> &'a [String] {
    if args.splits.is_empty() {
        &settings.dataset.splits
    } else {
        &args.splits
    }
}

/// Reads one split and builds the navigation graph of the scans it uses.
fn load_split(settings: &Settings, dir: &Path, split: &str) -> Result<(Vec<dataset::DialogRecord>, Arc<NavGraph>)> {
    let input = split_path(dir, split);
    info!(split, path = %input.display(), "Processing split");
    let records = read_split(&input)?;

    let loader = ConnectivityDir::new(&settings.navigation.connectivity_dir);
    let graph = NavGraph::build(split_scans(&records), &loader)
        .with_context(|| format!("Failed to build navigation graphs for split {split}"))?;
    Ok((records, Arc::new(graph)))
}

fn replan(settings: &Settings, args: &SplitArgs) -> Result<()> {
    fs::create_dir_all(&args.output).with_context(|| format!("Failed to create {}", args.output.display()))?;

    for split in selected_splits(settings, args) {
        let (records, graph) = load_split(settings, &args.dataset_path, split)?;
        let mut sim = GraphSimulator::new(graph.clone(), settings.simulator.camera());
        let output = split_path(&args.output, split);
        replan_to_file(records, &mut sim, &graph, settings.replan.max_steps_per_message, &output)
            .with_context(|| format!("Failed to replan split {split}"))?;
        info!("Wrote updated dataset file {}", output.display());
    }
    Ok(())
}

fn extract_views(settings: &Settings, args: &SplitArgs) -> Result<()> {
    fs::create_dir_all(&args.output).with_context(|| format!("Failed to create {}", args.output.display()))?;

    for split in selected_splits(settings, args) {
        let (records, graph) = load_split(settings, &args.dataset_path, split)?;
        let mut sim = GraphSimulator::new(graph, settings.simulator.camera());
        let manifest =
            extract_split(&records, &mut sim).with_context(|| format!("Failed to extract views of split {split}"))?;

        let output = args.output.join(format!("{split}_views.jsonl"));
        write_jsonl(&output, &manifest)?;
        info!("Wrote view manifest {}", output.display());
    }
    Ok(())
}
