//! Ingestion of a fake dataset package into a workspace, with the external
//! ingest programs replaced by the mock process runner.

mod common;

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::path::Path;

use ap_verify::dataset::MAPPER_FILE;
use ap_verify::ingestion::{ingest_dataset, DatasetIngestConfig};
use ap_verify::subprocess::SubprocessManager;
use ap_verify::workspace::Workspace;
use ap_verify::Error;
use common::{TestContext, TestContextBuilder};

fn dataset_with_files() -> Result<TestContext> {
    TestContextBuilder::new()?
        .with_dataset_file("raw/visit42.fits", "raw")
        .with_dataset_file("raw/visit43.fits.gz", "raw")
        .with_dataset_file("raw/README", "not an image")
        .with_dataset_file("calib/bias.fits", "bias")
        .with_dataset_file("calib/flat.fits", "flat")
        .with_dataset_file("config/apPipe.py", "config.ccdProcessor.doCalibrate = False\n")
        .with_dataset_file("config/datasetIngest.py", "unused\n")
        .build()
}

fn write_refcat(path: &Path, shards: &[&str]) -> Result<()> {
    fs::create_dir_all(path.parent().unwrap())?;
    let encoder = GzEncoder::new(fs::File::create(path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for shard in shards {
        let data = b"shard";
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        // Raw name, so archives with `..` entries can be built too.
        header.as_old_mut().name[..shard.len()].copy_from_slice(shard.as_bytes());
        header.set_cksum();
        builder.append(&header, &data[..])?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

#[tokio::test]
async fn test_ingest_runs_raw_and_calib_ingesters() -> Result<()> {
    let ctx = dataset_with_files()?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    let (manager, mock) = SubprocessManager::succeeding_mock();

    ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await?;

    let raw_calls = mock.calls_to("ingest_images.py");
    assert_eq!(raw_calls.len(), 1);
    let raw_args = &raw_calls[0].args;
    assert_eq!(raw_args[0], workspace.data_repo().display().to_string());
    assert!(raw_args.contains(&"link".to_string()));
    let raw_dir = ctx.dataset_root().join("raw");
    assert!(raw_args.contains(&raw_dir.join("visit42.fits").display().to_string()));
    assert!(raw_args.contains(&raw_dir.join("visit43.fits.gz").display().to_string()));
    assert!(!raw_args.contains(&raw_dir.join("README").display().to_string()));
    assert!(!raw_args.contains(&"--badFile".to_string()));

    let calib_calls = mock.calls_to("ingest_calibs.py");
    assert_eq!(calib_calls.len(), 1);
    let calib_args = &calib_calls[0].args;
    let validity = calib_args
        .iter()
        .position(|arg| arg == "--validity")
        .expect("calib ingester was not given a validity");
    assert_eq!(calib_args[validity + 1], "9999");
    assert!(calib_args.contains(&workspace.calib_repo().join("dummy").display().to_string()));

    // No defects configured.
    assert!(mock.verify_called("ingest_defects.py", 0));
    Ok(())
}

#[tokio::test]
async fn test_ingest_prepares_workspace() -> Result<()> {
    let ctx = dataset_with_files()?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    let (manager, _mock) = SubprocessManager::succeeding_mock();

    ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await?;

    assert!(workspace.data_repo().join(MAPPER_FILE).is_file());
    assert!(workspace.calib_repo().join(MAPPER_FILE).is_file());
    common::assertions::assert_file_contains(
        &workspace.config_dir().join("apPipe.py"),
        "doCalibrate = False",
    );
    assert!(workspace.config_dir().join("datasetIngest.py").is_file());
    Ok(())
}

#[tokio::test]
async fn test_no_raw_files_is_an_error() -> Result<()> {
    let ctx = TestContextBuilder::new()?
        .with_dataset_file("calib/bias.fits", "bias")
        .build()?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    let (manager, mock) = SubprocessManager::succeeding_mock();

    let result = ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await;

    match result {
        Err(Error::Ingestion(message)) => assert!(message.contains("No raw files")),
        other => panic!("expected ingestion error, got {other:?}"),
    }
    assert!(mock.get_call_history().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_previously_ingested_steps_are_skipped() -> Result<()> {
    let ctx = dataset_with_files()?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    fs::write(workspace.data_repo().join("registry.sqlite3"), "")?;
    fs::write(workspace.calib_repo().join("calibRegistry.sqlite3"), "")?;
    fs::create_dir_all(workspace.data_repo().join("ref_cats"))?;
    fs::write(workspace.config_dir().join("custom.py"), "kept")?;

    // No expectations: any ingest program call fails the run.
    let (manager, mock) = SubprocessManager::mock();
    ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await?;

    assert!(mock.get_call_history().is_empty());
    assert!(!workspace.config_dir().join("apPipe.py").exists());
    common::assertions::assert_file_contains(&workspace.config_dir().join("custom.py"), "kept");
    Ok(())
}

#[tokio::test]
async fn test_duplicate_raws_are_reported() -> Result<()> {
    let ctx = dataset_with_files()?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    let (manager, mut mock) = SubprocessManager::mock();
    mock.expect_command("ingest_images.py")
        .returns_exit_code(1)
        .returns_stderr("sqlite3.IntegrityError: UNIQUE constraint failed: raw.visit")
        .finish();

    let result = ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await;

    match result {
        Err(Error::Ingestion(message)) => assert_eq!(message, "Not all raw files are unique"),
        other => panic!("expected ingestion error, got {other:?}"),
    }
    assert!(mock.verify_called("ingest_calibs.py", 0));
    Ok(())
}

#[tokio::test]
async fn test_ingester_failure_carries_stderr() -> Result<()> {
    let ctx = dataset_with_files()?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    let (manager, mut mock) = SubprocessManager::mock();
    mock.expect_command("ingest_images.py").finish();
    mock.expect_command("ingest_calibs.py")
        .returns_exit_code(2)
        .returns_stderr("no such camera")
        .finish();

    let result = ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await;

    match result {
        Err(Error::Ingestion(message)) => {
            assert!(message.contains("calibration files"));
            assert!(message.contains("no such camera"));
        }
        other => panic!("expected ingestion error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_dataset_overrides_drive_ingestion() -> Result<()> {
    let ctx = TestContextBuilder::new()?
        .with_dataset_file("raw/visit42.fits", "raw")
        .with_dataset_file("raw/visit43.fits", "raw")
        .with_dataset_file("calib/bias.fits", "bias")
        .with_dataset_file("defects/rev_001/defects.dat", "0 0 1 1")
        .with_obs_file("config/datasetIngest.yaml", "calib_validity: 30\n")
        .with_dataset_file(
            "config/datasetIngest.yaml",
            "data_bad_files: [visit43.fits]\ntext_defect_path: defects\nrefcats:\n  gaia: gaia.tar.gz\n",
        )
        .build()?;
    write_refcat(
        &ctx.dataset_root().join("refcats/gaia.tar.gz"),
        &["config.py", "189584.fits"],
    )?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    let (manager, mock) = SubprocessManager::succeeding_mock();
    let dataset = ctx.dataset()?;

    let config = DatasetIngestConfig::for_dataset(&dataset, &ctx.env())?;
    assert_eq!(config.calib_validity, 30);
    assert_eq!(config.data_bad_files, vec!["visit43.fits"]);

    ingest_dataset(&dataset, &workspace, manager, &ctx.env()).await?;

    let raw_args = &mock.calls_to("ingest_images.py")[0].args;
    let bad_file = raw_args
        .iter()
        .position(|arg| arg == "--badFile")
        .expect("bad files were not passed on");
    assert_eq!(raw_args[bad_file + 1], "visit43.fits");

    let calib_args = &mock.calls_to("ingest_calibs.py")[0].args;
    assert!(calib_args.contains(&"30".to_string()));

    let defect_calls = mock.calls_to("ingest_defects.py");
    assert_eq!(defect_calls.len(), 1);
    assert!(defect_calls[0]
        .args
        .contains(&ctx.dataset_root().join("defects").display().to_string()));

    let gaia = workspace.data_repo().join("ref_cats").join("gaia");
    assert!(gaia.join("config.py").is_file());
    assert!(gaia.join("189584.fits").is_file());
    Ok(())
}

#[tokio::test]
async fn test_previously_ingested_defects_are_skipped() -> Result<()> {
    let ctx = TestContextBuilder::new()?
        .with_dataset_file("raw/visit42.fits", "raw")
        .with_dataset_file("calib/bias.fits", "bias")
        .with_dataset_file("config/datasetIngest.yaml", "text_defect_path: defects\n")
        .build()?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    fs::create_dir_all(workspace.calib_repo().join("defects"))?;
    let (manager, mock) = SubprocessManager::succeeding_mock();

    ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await?;

    assert!(mock.verify_called("ingest_defects.py", 0));
    assert!(mock.verify_called("ingest_images.py", 1));
    Ok(())
}

#[tokio::test]
async fn test_failed_refcat_leaves_no_marker() -> Result<()> {
    let ctx = TestContextBuilder::new()?
        .with_dataset_file("raw/visit42.fits", "raw")
        .with_dataset_file("calib/bias.fits", "bias")
        .with_dataset_file(
            "config/datasetIngest.yaml",
            "refcats:\n  gaia: gaia.tar.gz\n  ps1: ps1.tar.gz\n",
        )
        .build()?;
    let refcats = ctx.dataset_root().join("refcats");
    write_refcat(&refcats.join("gaia.tar.gz"), &["189584.fits"])?;
    write_refcat(&refcats.join("ps1.tar.gz"), &["good.fits", "../escape.fits"])?;
    let workspace = Workspace::new(ctx.workspace_dir())?;
    let ref_cats = workspace.data_repo().join("ref_cats");

    let (manager, _mock) = SubprocessManager::succeeding_mock();
    let result = ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await;

    assert!(matches!(result, Err(Error::Ingestion(_))));
    assert!(!ref_cats.exists());
    assert!(!workspace.data_repo().join("escape.fits").exists());

    // A repaired archive is picked up on the next run.
    write_refcat(&refcats.join("ps1.tar.gz"), &["good.fits"])?;
    let (manager, _mock) = SubprocessManager::succeeding_mock();
    ingest_dataset(&ctx.dataset()?, &workspace, manager, &ctx.env()).await?;

    assert!(ref_cats.join("gaia/189584.fits").is_file());
    assert!(ref_cats.join("ps1/good.fits").is_file());
    Ok(())
}
