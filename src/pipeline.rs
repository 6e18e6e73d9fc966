//! One batch run: load, reshape, join, persist, chart, report.

use crate::charts::TrendChartRenderer;
use crate::config::Config;
use crate::data::{
    join, DataLoader, DataProcessor, JoinedRecord, LoadError, LongRecord, ShapeError,
};
use crate::export::{write_joined, WriteError};
use crate::stats::{Report, ReportOptions, TrendReporter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// A failed stage, naming the input or output involved.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("loading {dataset} table: {source}")]
    Load {
        dataset: &'static str,
        source: LoadError,
    },
    #[error("reshaping {dataset} table: {source}")]
    Shape {
        dataset: &'static str,
        source: ShapeError,
    },
    #[error("saving merged table: {0}")]
    Persist(#[source] WriteError),
    #[error("rendering charts: {0}")]
    Charts(#[source] WriteError),
}

/// What a run produced.
#[derive(Debug)]
pub struct RunOutput {
    pub records: Vec<JoinedRecord>,
    pub merged_path: PathBuf,
    pub charts: Vec<PathBuf>,
    pub report: Report,
}

/// Load and reshape one dataset into long records.
fn load_long(
    dataset: &'static str,
    path: &Path,
    country_col: &str,
) -> Result<Vec<LongRecord>, PipelineError> {
    let table = DataLoader::load(path).map_err(|source| PipelineError::Load { dataset, source })?;
    DataProcessor::unpivot_years(&table, country_col)
        .map_err(|source| PipelineError::Shape { dataset, source })
}

pub fn run(config: &Config) -> Result<RunOutput, PipelineError> {
    let gdp = load_long("GDP", &config.gdp_path, &config.country_column)?;
    let population = load_long("population", &config.population_path, &config.country_column)?;

    let records = join(&gdp, &population);

    let merged_path = config.merged_path();
    write_joined(&records, &merged_path).map_err(PipelineError::Persist)?;

    let charts =
        TrendChartRenderer::render_all(&records, &config.output_dir).map_err(PipelineError::Charts)?;

    let report = TrendReporter::build(&records, ReportOptions::default());
    info!(
        "run complete: {} records, {} charts",
        records.len(),
        charts.len()
    );

    Ok(RunOutput {
        records,
        merged_path,
        charts,
        report,
    })
}
