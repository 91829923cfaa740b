//! Upload and download command implementations

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use crate::cli::args::ConnectionArgs;
use crate::config::ServerConfig;
use crate::models::responses::TransferResult;
use crate::models::transfer::UploadFile;
use crate::services::{BoardRegistry, TransferCoordinator};

pub async fn execute_upload_command(
    config: ServerConfig,
    connection: &ConnectionArgs,
    paths: Vec<PathBuf>,
    json: bool,
) -> Result<()> {
    let registry = BoardRegistry::load(&config);
    let profile = connection.to_profile(&registry, config.serial.default_baud_rate)?;

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(UploadFile::new(name, content));
    }

    if !json {
        println!("📤 Uploading {} files to {}...", files.len(), profile.describe());
    }
    let coordinator = TransferCoordinator::with_system_transports(config);
    let result = coordinator.upload(profile, files).await;

    report(&result, json)
}

pub async fn execute_download_command(
    config: ServerConfig,
    connection: &ConnectionArgs,
    names: Vec<String>,
    output: PathBuf,
    json: bool,
) -> Result<()> {
    let registry = BoardRegistry::load(&config);
    let profile = connection.to_profile(&registry, config.serial.default_baud_rate)?;

    if !json {
        println!("📥 Downloading {} files from {}...", names.len(), profile.describe());
    }
    let coordinator = TransferCoordinator::with_system_transports(config);
    let result = coordinator.download(profile, names).await;

    if let Some(zip_path) = &result.zip_path {
        tokio::fs::copy(zip_path, &output).await.with_context(|| {
            format!(
                "Failed to copy {} to {}",
                zip_path.display(),
                output.display()
            )
        })?;
        if !json {
            println!("📦 Archive written to {}", output.display());
        }
    }

    report(&result, json)
}

fn report(result: &TransferResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        for file in &result.files {
            println!("  ✅ {}", file);
        }
        for failed in &result.failed {
            println!("  ❌ {}: {}", failed.name, failed.reason);
        }
    }

    if result.success {
        if !json {
            println!("✅ {}", result.message);
        }
        Ok(())
    } else {
        bail!("{}", result.message)
    }
}
