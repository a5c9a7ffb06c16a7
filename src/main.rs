use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error, info, trace, warn};

use ap_verify::config::{PolicyConfig, ProcessEnv};
use ap_verify::dataset::Dataset;
use ap_verify::ingestion::ingest_dataset;
use ap_verify::measurements::{measure_timing, write_measurements, TaskMetadata};
use ap_verify::pipeline::{run_ap_pipe, ApPipeArgs, ApPipeCommand, MakePpdbCommand};
use ap_verify::subprocess::SubprocessManager;
use ap_verify::workspace::Workspace;

/// Verify the alert-production pipeline against a known dataset
#[derive(Parser)]
#[command(name = "ap-verify")]
#[command(version)]
#[command(about = "Run the AP pipeline on a verification dataset", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatasetTarget {
    /// Name of the dataset, as listed in the policy file
    #[arg(long)]
    dataset: String,

    /// Workspace directory for repositories, database and metrics
    #[arg(long)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a dataset, run the AP pipeline on it and record timing metrics
    Run {
        #[command(flatten)]
        target: DatasetTarget,

        /// Where to write the measurements (default: <output>/ap_verify.verify.json)
        #[arg(long)]
        metrics_file: Option<PathBuf>,

        #[command(flatten)]
        pipeline: ApPipeArgs,
    },
    /// Ingest a dataset into a workspace without running the pipeline
    Ingest {
        #[command(flatten)]
        target: DatasetTarget,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    debug!("ap-verify started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run {
            target,
            metrics_file,
            pipeline,
        } => run_verification(target, metrics_file, pipeline).await,
        Commands::Ingest { target } => run_ingest(target).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_target(target: &DatasetTarget) -> anyhow::Result<(PolicyConfig, Dataset, Workspace)> {
    let policy = PolicyConfig::load_default().context("Could not load the ap_verify policy")?;
    let dataset = Dataset::new(&target.dataset, &policy)?;
    let workspace = Workspace::new(&target.output)
        .with_context(|| format!("Could not set up workspace {}", target.output.display()))?;
    Ok((policy, dataset, workspace))
}

async fn run_ingest(target: DatasetTarget) -> anyhow::Result<()> {
    let (_, dataset, workspace) = load_target(&target)?;

    ingest_dataset(
        &dataset,
        &workspace,
        SubprocessManager::production(),
        &ProcessEnv,
    )
    .await
    .with_context(|| format!("Ingestion of {} failed", dataset.name()))?;

    println!(
        "Dataset {} ingested into {}",
        dataset.name(),
        workspace.work_dir().display()
    );
    Ok(())
}

async fn run_verification(
    target: DatasetTarget,
    metrics_file: Option<PathBuf>,
    pipeline: ApPipeArgs,
) -> anyhow::Result<()> {
    let (policy, dataset, workspace) = load_target(&target)?;
    let subprocess = SubprocessManager::production();

    ingest_dataset(&dataset, &workspace, subprocess.clone(), &ProcessEnv)
        .await
        .with_context(|| format!("Ingestion of {} failed", dataset.name()))?;

    let task = ApPipeCommand::new(subprocess.clone());
    let ppdb = MakePpdbCommand::new(subprocess);
    let results = run_ap_pipe(&workspace, &pipeline, &task, &ppdb)
        .await
        .context("AP pipeline failed")?;
    info!(
        "Processed {} data ID(s)",
        results.parsed_cmd.id.id_list.len()
    );

    let metadata = match TaskMetadata::from_workspace(&workspace)? {
        Some(metadata) => metadata,
        None => {
            warn!("No pipeline metadata found; timing metrics will be empty");
            TaskMetadata::default()
        }
    };
    let measurements = measure_timing(&policy, &metadata);

    let metrics_file =
        metrics_file.unwrap_or_else(|| workspace.work_dir().join("ap_verify.verify.json"));
    write_measurements(&metrics_file, &measurements)?;

    println!(
        "Wrote {} measurement(s) to {}",
        measurements.len(),
        metrics_file.display()
    );
    Ok(())
}
