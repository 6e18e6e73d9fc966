//! Static Trend Chart Renderer
//! Draws per-country GDP and GDP-per-capita line charts to PNG files.
//!
//! Layout per image:
//! 1. Title: "GDP Trend: {country}" / "GDP per Capita Trend: {country}"
//! 2. Line chart, X = Year, Y = metric, gaps where the value is undefined

use crate::data::JoinedRecord;
use crate::export::WriteError;
use plotters::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Which measure a chart plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Gdp,
    GdpPerCapita,
}

impl Metric {
    pub fn value(&self, record: &JoinedRecord) -> f64 {
        match self {
            Metric::Gdp => record.gdp,
            Metric::GdpPerCapita => record.gdp_per_capita,
        }
    }

    fn title(&self, country: &str) -> String {
        match self {
            Metric::Gdp => format!("GDP Trend: {}", country),
            Metric::GdpPerCapita => format!("GDP per Capita Trend: {}", country),
        }
    }

    fn axis_label(&self) -> &'static str {
        match self {
            Metric::Gdp => "GDP",
            Metric::GdpPerCapita => "GDP per Capita",
        }
    }

    fn file_suffix(&self) -> &'static str {
        match self {
            Metric::Gdp => "GDP_trend",
            Metric::GdpPerCapita => "GDP_per_capita_trend",
        }
    }
}

/// Points of one country's series, ordered by year.
pub type Series = Vec<(i32, f64)>;

pub struct TrendChartRenderer;

impl TrendChartRenderer {
    /// Render both charts for every country into `out_dir`.
    ///
    /// Returns the written paths, two per country.
    pub fn render_all(records: &[JoinedRecord], out_dir: &Path) -> Result<Vec<PathBuf>, WriteError> {
        let by_country = Self::group_by_country(records);
        Self::warn_on_collisions(by_country.keys().map(String::as_str));

        let mut written = Vec::with_capacity(by_country.len() * 2);
        for (country, rows) in &by_country {
            for metric in [Metric::Gdp, Metric::GdpPerCapita] {
                let path = Self::chart_path(out_dir, country, metric);
                let series = Self::series(rows, metric);
                Self::render_chart(&path, &metric.title(country), metric.axis_label(), &series)?;
                written.push(path);
            }
        }

        info!(
            "rendered {} charts for {} countries into {}",
            written.len(),
            by_country.len(),
            out_dir.display()
        );
        Ok(written)
    }

    /// Records grouped by country name, countries in name order.
    pub fn group_by_country(records: &[JoinedRecord]) -> BTreeMap<String, Vec<&JoinedRecord>> {
        let mut groups: BTreeMap<String, Vec<&JoinedRecord>> = BTreeMap::new();
        for r in records {
            groups.entry(r.country.clone()).or_default().push(r);
        }
        groups
    }

    /// Year-ascending (year, value) points. Join output order is not
    /// year order, so the sort here is what keeps the line monotone in X.
    pub fn series(rows: &[&JoinedRecord], metric: Metric) -> Series {
        let mut points: Series = rows.iter().map(|r| (r.year, metric.value(r))).collect();
        points.sort_by_key(|p| p.0);
        points
    }

    /// Split a series into runs of defined values.
    pub fn segments(series: &[(i32, f64)]) -> Vec<Series> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for &(year, value) in series {
            if value.is_finite() {
                current.push((year, value));
            } else if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    /// File-safe form of a country name.
    pub fn safe_name(country: &str) -> String {
        country
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '_' || c == '-' || c == ' ' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    pub fn chart_path(out_dir: &Path, country: &str, metric: Metric) -> PathBuf {
        out_dir.join(format!(
            "{}_{}.png",
            Self::safe_name(country),
            metric.file_suffix()
        ))
    }

    /// Countries sharing a safe name overwrite each other's files; report
    /// each colliding group.
    pub fn collisions<'a>(countries: impl Iterator<Item = &'a str>) -> Vec<Vec<String>> {
        let mut by_safe: HashMap<String, Vec<String>> = HashMap::new();
        for country in countries {
            by_safe
                .entry(Self::safe_name(country))
                .or_default()
                .push(country.to_string());
        }
        let mut groups: Vec<Vec<String>> = by_safe.into_values().filter(|g| g.len() > 1).collect();
        groups.sort();
        groups
    }

    fn warn_on_collisions<'a>(countries: impl Iterator<Item = &'a str>) {
        for group in Self::collisions(countries) {
            warn!(
                "countries {:?} share a chart file name; later charts overwrite earlier ones",
                group
            );
        }
    }

    fn axis_ranges(series: &[(i32, f64)]) -> ((i32, i32), (f64, f64)) {
        let (mut x_min, mut x_max) = (i32::MAX, i32::MIN);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(year, value) in series {
            x_min = x_min.min(year);
            x_max = x_max.max(year);
            if value.is_finite() {
                y_min = y_min.min(value);
                y_max = y_max.max(value);
            }
        }

        if x_min > x_max {
            x_min = 0;
            x_max = 1;
        } else if x_min == x_max {
            x_min -= 1;
            x_max += 1;
        }

        if !y_min.is_finite() {
            (y_min, y_max) = (0.0, 1.0);
        } else {
            let pad = if y_max > y_min {
                (y_max - y_min) * 0.05
            } else {
                y_min.abs().max(1.0) * 0.05
            };
            y_min -= pad;
            y_max += pad;
        }

        ((x_min, x_max), (y_min, y_max))
    }

    /// Short y-axis tick labels: 1.2T, 350.0B, 4.5M, 12.0K.
    pub fn compact_label(v: f64) -> String {
        let abs = v.abs();
        if abs >= 1e12 {
            format!("{:.1}T", v / 1e12)
        } else if abs >= 1e9 {
            format!("{:.1}B", v / 1e9)
        } else if abs >= 1e6 {
            format!("{:.1}M", v / 1e6)
        } else if abs >= 1e3 {
            format!("{:.1}K", v / 1e3)
        } else {
            format!("{:.1}", v)
        }
    }

    fn render_chart(
        path: &Path,
        title: &str,
        y_label: &str,
        series: &[(i32, f64)],
    ) -> Result<(), WriteError> {
        let chart_err = |e: &dyn std::fmt::Display| WriteError::Chart {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let ((x_min, x_max), (y_min, y_max)) = Self::axis_ranges(series);

        let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| chart_err(&e))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| chart_err(&e))?;

        chart
            .configure_mesh()
            .x_desc("Year")
            .y_desc(y_label)
            .x_label_formatter(&|y| y.to_string())
            .y_label_formatter(&|v| Self::compact_label(*v))
            .draw()
            .map_err(|e| chart_err(&e))?;

        for segment in Self::segments(series) {
            chart
                .draw_series(LineSeries::new(segment, LINE_COLOR.stroke_width(2)))
                .map_err(|e| chart_err(&e))?;
        }

        root.present().map_err(|e| chart_err(&e))?;
        Ok(())
    }
}
