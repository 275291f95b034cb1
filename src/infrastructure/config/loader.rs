use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::models::config::Config;
use crate::services::parameter_scheduler::validate_ramp_fractions;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid timeout_secs: {0}. Must be at least 1")]
    InvalidTimeout(u64),

    #[error("Invalid walk_step: {0}. Must be positive")]
    InvalidWalkStep(f64),

    #[error("Invalid max_walk_steps: {0}. Must be at least 1")]
    InvalidMaxWalkSteps(u32),

    #[error("Invalid tolerance: {0}. Must be positive")]
    InvalidTolerance(f64),

    #[error("Invalid fillet_placeholder: {0}. Must be positive")]
    InvalidFilletPlaceholder(f64),

    #[error("Invalid ramp_fractions: {0}")]
    InvalidRampFractions(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Engine command cannot be empty")]
    EmptyEngineCommand,

    #[error("Template label cannot be empty")]
    EmptyTemplateLabel,

    #[error("Combined document file name cannot be empty")]
    EmptyCombinedFileName,
}

impl From<ConfigError> for DomainError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. bearings.yaml in the working directory
    /// 3. bearings.local.yaml (local overrides, optional)
    /// 4. Environment variables (BEARINGS_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("bearings.yaml"))
            .merge(Yaml::file("bearings.local.yaml"))
            .merge(Env::prefixed("BEARINGS_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.engine.command.trim().is_empty() {
            return Err(ConfigError::EmptyEngineCommand);
        }

        if config.engine.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.engine.timeout_secs));
        }

        if config.template.label.trim().is_empty() {
            return Err(ConfigError::EmptyTemplateLabel);
        }

        let convergence = &config.convergence;
        if !(convergence.walk_step.is_finite() && convergence.walk_step > 0.0) {
            return Err(ConfigError::InvalidWalkStep(convergence.walk_step));
        }

        if convergence.max_walk_steps == 0 {
            return Err(ConfigError::InvalidMaxWalkSteps(convergence.max_walk_steps));
        }

        if !(convergence.tolerance.is_finite() && convergence.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(convergence.tolerance));
        }

        if !(convergence.fillet_placeholder.is_finite() && convergence.fillet_placeholder > 0.0) {
            return Err(ConfigError::InvalidFilletPlaceholder(
                convergence.fillet_placeholder,
            ));
        }

        validate_ramp_fractions(&convergence.ramp_fractions)
            .map_err(ConfigError::InvalidRampFractions)?;

        if config.output.combined_file_name.trim().is_empty() {
            return Err(ConfigError::EmptyCombinedFileName);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DofPolicy;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.command, "FreeCADCmd");
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(config.template.label, "template");
        assert_eq!(config.convergence.width, DofPolicy::Direct);
        assert_eq!(config.convergence.outer_radius, DofPolicy::Walk);
        assert_eq!(config.convergence.inner_radius, DofPolicy::Ramp);
        assert_eq!(config.convergence.ramp_fractions, vec![0.125, 0.25, 0.5, 1.0]);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
engine:
  command: /opt/freecad/bin/FreeCADCmd
  timeout_secs: 120
convergence:
  outer_radius: ramp
  walk_step: 0.25
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.engine.command, "/opt/freecad/bin/FreeCADCmd");
        assert_eq!(config.engine.args, vec!["bearing-engine.py".to_string()]);
        assert_eq!(config.engine.timeout_secs, 120);
        assert_eq!(config.convergence.outer_radius, DofPolicy::Ramp);
        assert!((config.convergence.walk_step - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.convergence.width, DofPolicy::Direct);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.output.dir, PathBuf::from("bearings"));

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.engine.timeout_secs = 0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidTimeout(0))));
    }

    #[test]
    fn test_validate_empty_engine_command() {
        let mut config = Config::default();
        config.engine.command = "  ".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::EmptyEngineCommand)));
    }

    #[test]
    fn test_validate_non_positive_walk_step() {
        let mut config = Config::default();
        config.convergence.walk_step = 0.0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidWalkStep(_))));
    }

    #[test]
    fn test_validate_zero_max_walk_steps() {
        let mut config = Config::default();
        config.convergence.max_walk_steps = 0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidMaxWalkSteps(0))));
    }

    #[test]
    fn test_validate_negative_tolerance() {
        let mut config = Config::default();
        config.convergence.tolerance = -1e-6;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidTolerance(_))));
    }

    #[test]
    fn test_validate_zero_placeholder() {
        let mut config = Config::default();
        config.convergence.fillet_placeholder = 0.0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidFilletPlaceholder(_))
        ));
    }

    #[test]
    fn test_validate_ramp_must_end_at_target() {
        let mut config = Config::default();
        config.convergence.ramp_fractions = vec![0.25, 0.5];

        let result = ConfigLoader::validate(&config);
        match result {
            Err(ConfigError::InvalidRampFractions(reason)) => assert!(reason.contains("end at 1")),
            other => panic!("Expected InvalidRampFractions error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogFormat(format)) => assert_eq!(format, "xml"),
            other => panic!("Expected InvalidLogFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_error_is_domain_config_error() {
        let err: DomainError = ConfigError::EmptyEngineCommand.into();
        assert!(matches!(err, DomainError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "template:\n  path: /data/template.FCStd\n  label: ring").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.template.path, PathBuf::from("/data/template.FCStd"));
        assert_eq!(config.template.label, "ring");
        assert_eq!(config.catalog.path, PathBuf::from("bearings-data.csv"));
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "convergence:\n  walk_step: -0.5").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "engine:\n  timeout_secs: 60\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "engine:\n  timeout_secs: 90\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.engine.timeout_secs, 90, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.engine.command, "FreeCADCmd");
    }
}
