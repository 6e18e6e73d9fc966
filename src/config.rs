//! Run configuration: defaults, optional JSON file, command-line overrides.

use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::COUNTRY_COLUMN;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gdp_path: PathBuf,
    pub population_path: PathBuf,
    /// Must exist; receives the merged table and the charts.
    pub output_dir: PathBuf,
    /// File name of the merged table inside `output_dir`.
    pub merged_file: String,
    pub country_column: String,
    /// Ranked countries shown in the printed report.
    pub top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gdp_path: PathBuf::from("data/GDP_WorldBank.xlsx"),
            population_path: PathBuf::from("data/Population_WorldBank.xlsx"),
            output_dir: PathBuf::from("outputs"),
            merged_file: "merged_gdp_population.xlsx".to_string(),
            country_column: COUNTRY_COLUMN.to_string(),
            top_n: 5,
        }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the config file (if given), then command-line values.
    pub fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };

        if let Some(p) = &args.gdp {
            config.gdp_path = p.clone();
        }
        if let Some(p) = &args.population {
            config.population_path = p.clone();
        }
        if let Some(p) = &args.output_dir {
            config.output_dir = p.clone();
        }
        Ok(config)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.output_dir.join(&self.merged_file)
    }
}

#[derive(Parser, Debug, Default)]
#[command(about = "Reshape, join and chart World Bank GDP and population tables")]
pub struct Args {
    /// JSON file with any of the configuration fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// GDP workbook or CSV export.
    #[arg(long)]
    pub gdp: Option<PathBuf>,

    /// Population workbook or CSV export.
    #[arg(long)]
    pub population: Option<PathBuf>,

    /// Existing directory for the merged table and charts.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}
