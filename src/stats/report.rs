//! Trend Report Module
//! Trailing-window GDP-per-capita growth ranking and average trend.

use crate::data::JoinedRecord;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Window lengths, in years, counted back from the latest year (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub growth_window: i32,
    pub trend_window: i32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            growth_window: 10,
            trend_window: 20,
        }
    }
}

/// Growth of one country between the endpoints of the growth window.
#[derive(Debug, Clone)]
pub struct CountryGrowth {
    pub country: String,
    pub first_year: i32,
    pub last_year: i32,
    pub first: f64,
    pub last: f64,
    /// `NaN` when an endpoint is undefined or the first value is zero.
    pub growth_pct: f64,
}

impl CountryGrowth {
    pub fn is_defined(&self) -> bool {
        !self.growth_pct.is_nan()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub max_year: Option<i32>,
    pub growth_from: Option<i32>,
    pub trend_from: Option<i32>,
    /// Descending by growth; undefined growth last.
    pub growth: Vec<CountryGrowth>,
    /// Year -> mean GDP per capita, `NaN` if no country had a value.
    pub trend: BTreeMap<i32, f64>,
}

impl Report {
    /// Best performing country, if any growth is defined.
    pub fn best(&self) -> Option<&CountryGrowth> {
        self.growth.first().filter(|g| g.is_defined())
    }
}

/// Computes growth and trend reports over joined records.
pub struct TrendReporter;

impl TrendReporter {
    pub fn build(records: &[JoinedRecord], options: ReportOptions) -> Report {
        let Some(max_year) = records.iter().map(|r| r.year).max() else {
            return Report::default();
        };
        let growth_from = max_year - (options.growth_window - 1);
        let trend_from = max_year - (options.trend_window - 1);

        Report {
            max_year: Some(max_year),
            growth_from: Some(growth_from),
            trend_from: Some(trend_from),
            growth: Self::growth_ranking(records, growth_from),
            trend: Self::average_trend(records, trend_from),
        }
    }

    /// (last - first) / first * 100.
    pub fn growth_pct(first: f64, last: f64) -> f64 {
        if first == 0.0 || first.is_nan() || last.is_nan() {
            f64::NAN
        } else {
            (last - first) / first * 100.0
        }
    }

    /// Rank countries by growth between their earliest and latest year at
    /// or after `from_year`.
    pub fn growth_ranking(records: &[JoinedRecord], from_year: i32) -> Vec<CountryGrowth> {
        let mut by_country: HashMap<&str, Vec<(i32, f64)>> = HashMap::new();
        for r in records.iter().filter(|r| r.year >= from_year) {
            by_country
                .entry(r.country.as_str())
                .or_default()
                .push((r.year, r.gdp_per_capita));
        }

        let mut ranking: Vec<CountryGrowth> = by_country
            .into_iter()
            .filter_map(|(country, mut points)| {
                // Endpoints come from year order, never from input order
                points.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
                let (first_year, first) = *points.first()?;
                let (last_year, last) = *points.last()?;
                Some(CountryGrowth {
                    country: country.to_string(),
                    first_year,
                    last_year,
                    first,
                    last,
                    growth_pct: Self::growth_pct(first, last),
                })
            })
            .collect();

        ranking.sort_by(Self::rank_order);
        ranking
    }

    fn rank_order(a: &CountryGrowth, b: &CountryGrowth) -> Ordering {
        match (a.is_defined(), b.is_defined()) {
            (true, true) => b.growth_pct.total_cmp(&a.growth_pct),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
        .then_with(|| a.country.cmp(&b.country))
    }

    /// Mean GDP per capita per year at or after `from_year`, ignoring
    /// undefined values.
    pub fn average_trend(records: &[JoinedRecord], from_year: i32) -> BTreeMap<i32, f64> {
        use statrs::statistics::Statistics;

        let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for r in records.iter().filter(|r| r.year >= from_year) {
            let values = by_year.entry(r.year).or_default();
            if !r.gdp_per_capita.is_nan() {
                values.push(r.gdp_per_capita);
            }
        }

        by_year
            .into_iter()
            .map(|(year, values)| (year, values.iter().mean()))
            .collect()
    }
}
