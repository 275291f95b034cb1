//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::build::BuildArgs;
use super::commands::list::ListArgs;

#[derive(Parser, Debug)]
#[command(name = "bearings")]
#[command(about = "Generate bearing models from a parametric template", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of bearings.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve one bearing, or ALL, and export it
    Build(BuildArgs),

    /// List the bearings in the catalog
    List(ListArgs),
}
