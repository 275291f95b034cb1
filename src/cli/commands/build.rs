//! `bearings build`: resolve bearings and export them.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::adapters::{ProcessEngine, SimulatedEngine};
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{BatchRequest, Config, ExportFormat, Selection};
use crate::domain::ports::GeometryEngine;
use crate::infrastructure::{CatalogLoader, ConfigLoader};
use crate::services::{BatchReport, BatchRunner, InstanceStatus};

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Bearing name from the catalog, or ALL
    pub name: String,

    /// Export type: stl, obj, ply, stp, or fcstd (fcstd requires ALL)
    #[arg(short = 't', long = "type", default_value = "stl")]
    pub format: ExportFormat,

    /// Output directory (defaults to output.dir from the configuration)
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Catalog CSV (defaults to catalog.path from the configuration)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Batch timeout in seconds (defaults to engine.timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Run against the in-memory engine instead of launching the engine host
    #[arg(long)]
    pub simulate: bool,
}

#[derive(Debug, Serialize)]
pub struct BuildOutput {
    #[serde(flatten)]
    pub report: BatchReport,
    pub succeeded: usize,
    pub failed: usize,
}

impl From<BatchReport> for BuildOutput {
    fn from(report: BatchReport) -> Self {
        Self {
            succeeded: report.succeeded_count(),
            failed: report.failed_count(),
            report,
        }
    }
}

impl CommandOutput for BuildOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["bearing", "status", "detail"]);
        for instance in &self.report.instances {
            let (status, detail) = match &instance.status {
                InstanceStatus::Written { path } => ("written", path.display().to_string()),
                InstanceStatus::Combined => ("combined", String::new()),
                InstanceStatus::Failed { reason } => ("failed", reason.clone()),
            };
            table.add_row(vec![instance.name.clone(), status.to_string(), detail]);
        }

        let mut lines = vec![table.to_string()];
        if let Some(path) = &self.report.combined_document {
            lines.push(format!("Wrote {}", path.display()));
        }
        lines.push(format!("{} succeeded, {} failed", self.succeeded, self.failed));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: BuildArgs, mut config: Config, json_mode: bool) -> Result<()> {
    if let Some(timeout) = args.timeout {
        config.engine.timeout_secs = timeout;
        ConfigLoader::validate(&config).map_err(DomainError::from)?;
    }

    let catalog_path = args.catalog.unwrap_or_else(|| config.catalog.path.clone());
    let catalog = CatalogLoader::load(&catalog_path)?;

    let output_dir = args.outdir.unwrap_or_else(|| config.output.dir.clone());
    let mut request = BatchRequest::build(Selection::parse(&args.name), args.format, output_dir, &catalog)?;

    // The engine host resolves relative paths against its own working directory
    tokio::fs::create_dir_all(&request.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", request.output_dir.display()))?;
    request.output_dir = tokio::fs::canonicalize(&request.output_dir)
        .await
        .with_context(|| format!("Failed to resolve {}", request.output_dir.display()))?;

    let mut engine: Box<dyn GeometryEngine> = if args.simulate {
        Box::new(SimulatedEngine::default())
    } else {
        Box::new(ProcessEngine::spawn(&config.engine).map_err(DomainError::from)?)
    };
    info!(engine = engine.name(), selection = %request.selection, format = %request.format, "starting batch");

    let runner = BatchRunner::from_config(&config);
    let report = runner.run(engine.as_mut(), &request, &catalog).await?;
    let success = report.is_success();

    output(&BuildOutput::from(report), json_mode);

    if !success {
        bail!("Failed to build {}", request.selection);
    }
    Ok(())
}
