//! Runs a validated request against an engine.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::convergence_driver::{ConvergenceDriver, ResolvedInstance};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BatchRequest, Catalog, Config, Selection, TemplateConfig};
use crate::domain::ports::GeometryEngine;

/// How long a timed-out batch waits for the template to close.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Outcome for one bearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum InstanceStatus {
    /// Exported to its own file.
    Written { path: PathBuf },
    /// Kept for the combined document.
    Combined,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceReport {
    pub name: String,
    #[serde(flatten)]
    pub status: InstanceStatus,
}

/// Everything a batch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub selection: Selection,
    pub instances: Vec<InstanceReport>,
    pub combined_document: Option<PathBuf>,
}

impl BatchReport {
    fn new(selection: Selection) -> Self {
        Self {
            selection,
            instances: Vec::new(),
            combined_document: None,
        }
    }

    fn record(&mut self, name: &str, status: InstanceStatus) {
        self.instances.push(InstanceReport {
            name: name.to_string(),
            status,
        });
    }

    pub fn failed(&self) -> impl Iterator<Item = &InstanceReport> {
        self.instances
            .iter()
            .filter(|report| matches!(report.status, InstanceStatus::Failed { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.instances.len() - self.failed_count()
    }

    /// A named request fails if its bearing failed. `ALL` tolerates
    /// individual failures.
    pub fn is_success(&self) -> bool {
        self.selection.is_all() || self.failed_count() == 0
    }
}

/// Sequences the convergence driver over the requested bearings.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    driver: ConvergenceDriver,
    template: TemplateConfig,
    combined_file_name: String,
    timeout: Option<Duration>,
}

impl BatchRunner {
    pub fn new(driver: ConvergenceDriver, template: TemplateConfig, combined_file_name: impl Into<String>) -> Self {
        Self {
            driver,
            template,
            combined_file_name: combined_file_name.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ConvergenceDriver::new(config.convergence.clone()),
            config.template.clone(),
            config.output.combined_file_name.clone(),
        )
        .with_timeout(Duration::from_secs(config.engine.timeout_secs))
    }

    /// Abort the whole batch once `timeout` has elapsed.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `request` to completion.
    ///
    /// The template is closed on every path. After a timeout the close is
    /// best effort and bounded by [`CLOSE_GRACE`]; an engine that still does
    /// not answer is left for the caller to drop.
    #[instrument(skip(self, engine, request, catalog), fields(selection = %request.selection, format = %request.format))]
    pub async fn run<E>(&self, engine: &mut E, request: &BatchRequest, catalog: &Catalog) -> DomainResult<BatchReport>
    where
        E: GeometryEngine + ?Sized,
    {
        let Some(timeout) = self.timeout else {
            return self.run_scoped(engine, request, catalog).await;
        };

        if let Ok(outcome) = tokio::time::timeout(timeout, self.run_scoped(engine, request, catalog)).await {
            return outcome;
        }

        warn!(timeout_secs = timeout.as_secs(), "batch timed out, closing template");
        match tokio::time::timeout(CLOSE_GRACE, engine.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "failed to close template after timeout"),
            Err(_) => warn!("engine did not close within the grace period"),
        }
        Err(DomainError::EngineProcess(format!(
            "batch timed out after {}s",
            timeout.as_secs()
        )))
    }

    async fn run_scoped<E>(&self, engine: &mut E, request: &BatchRequest, catalog: &Catalog) -> DomainResult<BatchReport>
    where
        E: GeometryEngine + ?Sized,
    {
        engine
            .open_template(&self.template.path, &self.template.label)
            .await?;
        info!(template = %self.template.path.display(), label = %self.template.label, "template opened");

        let outcome = self.run_open(engine, request, catalog).await;
        let closed = engine.close().await;

        match (outcome, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "failed to close template after batch failure");
                }
                Err(err)
            }
        }
    }

    async fn run_open<E>(&self, engine: &mut E, request: &BatchRequest, catalog: &Catalog) -> DomainResult<BatchReport>
    where
        E: GeometryEngine + ?Sized,
    {
        let entries = request.resolve(catalog)?;
        let mut report = BatchReport::new(request.selection.clone());
        let mut kept: Vec<String> = Vec::new();

        for params in entries {
            info!(bearing = %params.name, "working on bearing");

            match self.driver.resolve(engine, params).await {
                Ok(instance) if request.aggregates() => {
                    kept.push(instance.label().to_string());
                    report.record(&params.name, InstanceStatus::Combined);
                }
                Ok(instance) => {
                    let path = self.export(engine, request, instance).await?;
                    info!(bearing = %params.name, path = %path.display(), "wrote bearing");
                    report.record(&params.name, InstanceStatus::Written { path });
                }
                Err(err) if err.is_instance_scoped() => {
                    warn!(bearing = %params.name, error = %err, "bearing failed");
                    report.record(
                        &params.name,
                        InstanceStatus::Failed {
                            reason: err.to_string(),
                        },
                    );
                }
                Err(err) => return Err(err),
            }
        }

        if request.aggregates() {
            let path = request.output_dir.join(&self.combined_file_name);
            engine.save_document(&kept, &path).await?;
            info!(path = %path.display(), objects = kept.len(), "wrote combined document");
            report.combined_document = Some(path);
        }

        Ok(report)
    }

    async fn export<E>(&self, engine: &mut E, request: &BatchRequest, instance: ResolvedInstance) -> DomainResult<PathBuf>
    where
        E: GeometryEngine + ?Sized,
    {
        let path = request.instance_path(instance.label());
        engine.export(&instance.handle, request.format, &path).await?;
        engine.discard(instance.handle).await?;
        Ok(path)
    }
}
