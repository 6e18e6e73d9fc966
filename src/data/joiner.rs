//! Joins the GDP and population long tables and derives GDP per capita.

use crate::data::LongRecord;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// One country-year with both measures and the derived ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub country: String,
    pub year: i32,
    pub gdp: f64,
    pub population: f64,
    /// `NaN` when population is zero or missing.
    pub gdp_per_capita: f64,
}

impl JoinedRecord {
    pub fn new(country: impl Into<String>, year: i32, gdp: f64, population: f64) -> Self {
        Self {
            country: country.into(),
            year,
            gdp,
            population,
            gdp_per_capita: per_capita(gdp, population),
        }
    }
}

/// `gdp / population`, undefined (`NaN`) for a zero or missing population.
pub fn per_capita(gdp: f64, population: f64) -> f64 {
    if population == 0.0 || population.is_nan() {
        f64::NAN
    } else {
        gdp / population
    }
}

/// Inner join on (country, year). Output follows the GDP input order.
pub fn join(gdp: &[LongRecord], population: &[LongRecord]) -> Vec<JoinedRecord> {
    let mut by_key: HashMap<(&str, i32), Vec<f64>> = HashMap::with_capacity(population.len());
    for rec in population {
        by_key
            .entry((rec.country.as_str(), rec.year))
            .or_default()
            .push(rec.value);
    }

    let mut joined = Vec::with_capacity(gdp.len());
    let mut unmatched = 0usize;
    for rec in gdp {
        match by_key.get(&(rec.country.as_str(), rec.year)) {
            Some(pops) => {
                for &pop in pops {
                    joined.push(JoinedRecord::new(rec.country.clone(), rec.year, rec.value, pop));
                }
            }
            None => unmatched += 1,
        }
    }

    if unmatched > 0 {
        debug!("{} GDP records had no population counterpart", unmatched);
    }
    info!(
        "joined {} GDP and {} population records into {}",
        gdp.len(),
        population.len(),
        joined.len()
    );
    joined
}

/// Column headers of the persisted table.
pub const JOINED_HEADERS: [&str; 5] = ["Country Name", "Year", "GDP", "Population", "GDP_per_Capita"];

/// Joined records as a DataFrame; undefined values become nulls.
pub fn to_dataframe(records: &[JoinedRecord]) -> PolarsResult<DataFrame> {
    let defined = |v: f64| if v.is_nan() { None } else { Some(v) };

    let countries: Vec<&str> = records.iter().map(|r| r.country.as_str()).collect();
    let years: Vec<i32> = records.iter().map(|r| r.year).collect();
    let gdp: Vec<Option<f64>> = records.iter().map(|r| defined(r.gdp)).collect();
    let population: Vec<Option<f64>> = records.iter().map(|r| defined(r.population)).collect();
    let per_capita: Vec<Option<f64>> = records.iter().map(|r| defined(r.gdp_per_capita)).collect();

    DataFrame::new(vec![
        Column::new(JOINED_HEADERS[0].into(), countries),
        Column::new(JOINED_HEADERS[1].into(), years),
        Column::new(JOINED_HEADERS[2].into(), gdp),
        Column::new(JOINED_HEADERS[3].into(), population),
        Column::new(JOINED_HEADERS[4].into(), per_capita),
    ])
}
