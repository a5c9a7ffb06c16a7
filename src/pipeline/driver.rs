use tracing::{debug, info, warn};

use super::args::ApPipeArgs;
use super::data_id::DataId;
use super::task::{ParsedCmd, PipelineResult, PipelineTask, PpdbFactory};
use crate::workspace::Workspace;
use crate::Result;

/// Config file the pipeline reads from the workspace config directory.
pub const PIPELINE_CONFIG_FILE: &str = "apPipe.py";

/// URL of the SQLite database kept inside `workspace`.
pub fn workspace_db_url(workspace: &Workspace) -> String {
    format!("sqlite:///{}", workspace.db_location().display())
}

/// `--configfile`/`--config` arguments shared by the database factory and the task.
pub fn config_arguments(workspace: &Workspace, db_url: Option<&str>) -> Vec<String> {
    let config_file = workspace.config_dir().join(PIPELINE_CONFIG_FILE);
    let db_url = db_url
        .map(str::to_string)
        .unwrap_or_else(|| workspace_db_url(workspace));

    vec![
        "--configfile".to_string(),
        config_file.display().to_string(),
        "--config".to_string(),
        format!("ppdb.db_url={db_url}"),
        "--config".to_string(),
        "ppdb.isolation_level=READ_UNCOMMITTED".to_string(),
        "--config".to_string(),
        format!(
            "alertPackager.alertWriteLocation={}",
            workspace.alert_location().display()
        ),
    ]
}

fn pipeline_arguments(
    workspace: &Workspace,
    args: &ApPipeArgs,
    config_args: &[String],
) -> Vec<String> {
    let mut pipeline_args = vec![
        workspace.data_repo().display().to_string(),
        "--output".to_string(),
        workspace.output_repo().display().to_string(),
        "--calib".to_string(),
        workspace.calib_repo().display().to_string(),
        "--template".to_string(),
        workspace.template_repo().display().to_string(),
    ];
    pipeline_args.extend(config_args.iter().cloned());

    if args.data_ids.is_empty() {
        pipeline_args.push("--id".to_string());
    } else {
        for data_id in &args.data_ids {
            pipeline_args.push("--id".to_string());
            pipeline_args.extend(data_id.split_whitespace().map(str::to_string));
        }
    }
    pipeline_args.push("--processes".to_string());
    pipeline_args.push(args.processes.to_string());
    pipeline_args.push("--noExit".to_string());
    pipeline_args
}

/// Run the AP pipeline over the data ingested into `workspace`.
///
/// Creates the database through `ppdb`, then hands the full command line to
/// `task`. With `--skip-pipeline` neither is touched and the result only
/// carries the data IDs that would have been processed.
pub async fn run_ap_pipe(
    workspace: &Workspace,
    args: &ApPipeArgs,
    task: &dyn PipelineTask,
    ppdb: &dyn PpdbFactory,
) -> Result<PipelineResult> {
    // Reject malformed IDs before anything touches the database.
    for data_id in &args.data_ids {
        DataId::parse(data_id)?;
    }

    let config_args = config_arguments(workspace, args.db_url.as_deref());
    let pipeline_args = pipeline_arguments(workspace, args, &config_args);
    debug!("Pipeline arguments: {}", pipeline_args.join(" "));

    if args.skip_pipeline {
        info!("Skipping AP pipeline entirely.");
        return Ok(PipelineResult {
            parsed_cmd: ParsedCmd::from_args(pipeline_args)?,
            result_list: Vec::new(),
        });
    }

    ppdb.make_ppdb(config_args).await?;
    debug!("Prompt products database ready");

    info!("Running {}...", task.default_name());
    let results = task.parse_and_run(pipeline_args).await?;
    for (index, result) in results.result_list.iter().enumerate() {
        if result.exit_status != 0 {
            warn!(
                "{} run {} exited with status {}",
                task.default_name(),
                index,
                result.exit_status
            );
        }
    }
    info!("Pipeline complete");
    Ok(results)
}
