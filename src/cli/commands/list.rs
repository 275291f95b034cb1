//! `bearings list`: show the catalog.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{format_mm, list_table, output, render_list, CommandOutput};
use crate::domain::models::{Catalog, Config, ParameterSet};
use crate::infrastructure::CatalogLoader;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Catalog CSV (defaults to catalog.path from the configuration)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct CatalogListOutput {
    pub bearings: Vec<ParameterSet>,
    pub total: usize,
}

impl From<&Catalog> for CatalogListOutput {
    fn from(catalog: &Catalog) -> Self {
        Self {
            bearings: catalog.iter().cloned().collect(),
            total: catalog.len(),
        }
    }
}

impl CommandOutput for CatalogListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "id", "od", "width", "radius"]);
        for bearing in &self.bearings {
            table.add_row(vec![
                bearing.name.clone(),
                format_mm(bearing.inner_diameter),
                format_mm(bearing.outer_diameter),
                format_mm(bearing.width),
                format_mm(bearing.fillet_radius),
            ]);
        }
        render_list("bearing", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ListArgs, config: Config, json_mode: bool) -> Result<()> {
    let path = args.catalog.unwrap_or(config.catalog.path);
    let catalog = CatalogLoader::load(&path)?;
    output(&CatalogListOutput::from(&catalog), json_mode);
    Ok(())
}
