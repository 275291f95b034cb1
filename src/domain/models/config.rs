use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Dof, DofPolicy};

/// Main configuration structure for the bearing generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Geometry engine process
    #[serde(default)]
    pub engine: EngineConfig,

    /// Template document
    #[serde(default)]
    pub template: TemplateConfig,

    /// Parameter catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// DOF convergence tuning
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Output location
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Geometry engine process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Engine host executable
    #[serde(default = "default_engine_command")]
    pub command: String,

    /// Arguments passed to the engine host, typically the bridge script
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,

    /// Hard limit for a whole batch, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_engine_command() -> String {
    "FreeCADCmd".to_string()
}

fn default_engine_args() -> Vec<String> {
    vec!["bearing-engine.py".to_string()]
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: default_engine_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Template document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TemplateConfig {
    /// Document holding the template object
    #[serde(default = "default_template_path")]
    pub path: PathBuf,

    /// Label of the object to clone
    #[serde(default = "default_template_label")]
    pub label: String,
}

fn default_template_path() -> PathBuf {
    PathBuf::from("bearing-template.FCStd")
}

fn default_template_label() -> String {
    "template".to_string()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: default_template_path(),
            label: default_template_label(),
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CatalogConfig {
    /// CSV file with one bearing per row
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("bearings-data.csv")
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

/// Convergence configuration
///
/// Every DOF takes a policy. The defaults keep width as a single direct
/// application and walk the outer radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceConfig {
    #[serde(default = "default_width_policy")]
    pub width: DofPolicy,

    #[serde(default)]
    pub fillet_radius: DofPolicy,

    #[serde(default)]
    pub inner_radius: DofPolicy,

    #[serde(default = "default_outer_radius_policy")]
    pub outer_radius: DofPolicy,

    /// Fractions of the target applied by the ramp policy
    #[serde(default = "default_ramp_fractions")]
    pub ramp_fractions: Vec<f64>,

    /// Increment of the bounded-step walk
    #[serde(default = "default_walk_step")]
    pub walk_step: f64,

    /// Upper bound on walk increments before giving up
    #[serde(default = "default_max_walk_steps")]
    pub max_walk_steps: u32,

    /// Fillet radius used while the radii are being resolved
    #[serde(default = "default_fillet_placeholder")]
    pub fillet_placeholder: f64,

    /// Accepted difference between a resolved DOF and its target
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

const fn default_width_policy() -> DofPolicy {
    DofPolicy::Direct
}

const fn default_outer_radius_policy() -> DofPolicy {
    DofPolicy::Walk
}

fn default_ramp_fractions() -> Vec<f64> {
    vec![0.125, 0.25, 0.5, 1.0]
}

const fn default_walk_step() -> f64 {
    0.5
}

const fn default_max_walk_steps() -> u32 {
    10_000
}

const fn default_fillet_placeholder() -> f64 {
    0.001
}

const fn default_tolerance() -> f64 {
    1e-6
}

impl ConvergenceConfig {
    pub const fn policy_for(&self, dof: Dof) -> DofPolicy {
        match dof {
            Dof::Width => self.width,
            Dof::FilletRadius => self.fillet_radius,
            Dof::OuterRadius => self.outer_radius,
            Dof::InnerRadius => self.inner_radius,
        }
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            width: default_width_policy(),
            fillet_radius: DofPolicy::default(),
            inner_radius: DofPolicy::default(),
            outer_radius: default_outer_radius_policy(),
            ramp_fractions: default_ramp_fractions(),
            walk_step: default_walk_step(),
            max_walk_steps: default_max_walk_steps(),
            fillet_placeholder: default_fillet_placeholder(),
            tolerance: default_tolerance(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutputConfig {
    /// Directory receiving exported files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File name of the combined document written for `ALL`
    #[serde(default = "default_combined_file_name")]
    pub combined_file_name: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bearings")
}

fn default_combined_file_name() -> String {
    "bearings-catalog.FCStd".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            combined_file_name: default_combined_file_name(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
