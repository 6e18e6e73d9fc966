//! Data Processor Module
//! Projects a wide table onto its country and year columns and unpivots it
//! into one record per (country, year).

use crate::data::RawTable;
use polars::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

/// Default label of the country-name column in World Bank exports.
pub const COUNTRY_COLUMN: &str = "Country Name";

#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("{source_path}: no '{column}' column (found: {found:?})")]
    MissingCountryColumn {
        source_path: String,
        column: String,
        found: Vec<String>,
    },
    #[error("year column '{0}' does not fit a calendar year")]
    YearOutOfRange(String),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// One measurement in long format.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub country: String,
    pub year: i32,
    /// `NaN` when the source cell was empty or not numeric.
    pub value: f64,
}

impl LongRecord {
    pub fn new(country: impl Into<String>, year: i32, value: f64) -> Self {
        Self {
            country: country.into(),
            year,
            value,
        }
    }
}

/// Reshapes wide tables into long records.
pub struct DataProcessor;

impl DataProcessor {
    /// A label is a year when it is non-empty and made only of ASCII digits.
    pub fn is_year_label(label: &str) -> bool {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_digit())
    }

    /// Year columns in table order.
    pub fn year_columns(table: &RawTable) -> Vec<String> {
        table
            .columns()
            .into_iter()
            .filter(|c| Self::is_year_label(c))
            .collect()
    }

    /// Keep only the country column and the year columns.
    pub fn project(table: &RawTable, country_col: &str) -> Result<DataFrame, ShapeError> {
        let columns = table.columns();
        if !columns.iter().any(|c| c == country_col) {
            return Err(ShapeError::MissingCountryColumn {
                source_path: table.source.display().to_string(),
                column: country_col.to_string(),
                found: columns,
            });
        }

        let years = Self::year_columns(table);
        let dropped: Vec<&String> = columns
            .iter()
            .filter(|c| c.as_str() != country_col && !Self::is_year_label(c))
            .collect();
        if !dropped.is_empty() {
            info!(
                "{}: dropping non-year columns {:?}",
                table.source.display(),
                dropped
            );
        }
        if years.is_empty() {
            warn!(
                "{}: no year columns detected, table reshapes to nothing",
                table.source.display()
            );
        }

        let mut keep = Vec::with_capacity(years.len() + 1);
        keep.push(country_col.to_string());
        keep.extend(years);
        Ok(table.df.select(keep)?)
    }

    /// Transform the wide table to long format: one record per row and
    /// year column, in row-major order.
    pub fn unpivot_years(
        table: &RawTable,
        country_col: &str,
    ) -> Result<Vec<LongRecord>, ShapeError> {
        let projected = Self::project(table, country_col)?;
        let year_cols: Vec<String> = projected
            .get_column_names()
            .iter()
            .skip(1)
            .map(|s| s.to_string())
            .collect();

        let countries = projected.column(country_col)?.cast(&DataType::String)?;
        let countries = countries.str()?;

        let mut years = Vec::with_capacity(year_cols.len());
        let mut values = Vec::with_capacity(year_cols.len());
        for label in &year_cols {
            let year: i32 = label
                .parse()
                .map_err(|_| ShapeError::YearOutOfRange(label.clone()))?;
            years.push(year);
            values.push(projected.column(label)?.cast(&DataType::Float64)?);
        }

        let mut records = Vec::with_capacity(projected.height() * year_cols.len());
        for i in 0..projected.height() {
            let country = countries.get(i).unwrap_or_default();
            for (year, column) in years.iter().zip(&values) {
                let value = column.f64()?.get(i).unwrap_or(f64::NAN);
                records.push(LongRecord::new(country, *year, value));
            }
        }

        info!(
            "{}: reshaped {} rows x {} years into {} records",
            table.source.display(),
            projected.height(),
            year_cols.len(),
            records.len()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_table() -> RawTable {
        let df = DataFrame::new(vec![
            Column::new("Country Name".into(), vec!["A", "B", "C"]),
            Column::new("Country Code".into(), vec!["AAA", "BBB", "CCC"]),
            Column::new("2000".into(), vec![Some(1.0), None, Some(3.0)]),
            Column::new("Indicator Name".into(), vec!["GDP", "GDP", "GDP"]),
            Column::new("2001".into(), vec![4.0, 5.0, 6.0]),
        ])
        .unwrap();
        RawTable::new("gdp.csv", df)
    }

    #[test]
    fn detects_digit_only_labels() {
        assert!(DataProcessor::is_year_label("1960"));
        assert!(!DataProcessor::is_year_label(""));
        assert!(!DataProcessor::is_year_label("1960 [YR1960]"));
        assert!(!DataProcessor::is_year_label("-1"));
        assert_eq!(
            DataProcessor::year_columns(&wide_table()),
            vec!["2000", "2001"]
        );
    }

    #[test]
    fn projection_drops_non_year_columns() {
        let projected = DataProcessor::project(&wide_table(), COUNTRY_COLUMN).unwrap();
        let names: Vec<String> = projected
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["Country Name", "2000", "2001"]);
    }

    #[test]
    fn unpivot_emits_rows_times_years() {
        let table = wide_table();
        let records = DataProcessor::unpivot_years(&table, COUNTRY_COLUMN).unwrap();
        assert_eq!(records.len(), table.row_count() * 2);

        assert_eq!(records[0], LongRecord::new("A", 2000, 1.0));
        assert_eq!(records[1], LongRecord::new("A", 2001, 4.0));
        assert_eq!(records[2].country, "B");
        assert!(records[2].value.is_nan());
        assert_eq!(records[5], LongRecord::new("C", 2001, 6.0));
    }

    #[test]
    fn no_year_columns_yields_no_records() {
        let df = DataFrame::new(vec![
            Column::new("Country Name".into(), vec!["A", "B"]),
            Column::new("Country Code".into(), vec!["AAA", "BBB"]),
        ])
        .unwrap();
        let table = RawTable::new("pop.csv", df);
        let records = DataProcessor::unpivot_years(&table, COUNTRY_COLUMN).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn missing_country_column_is_shape_error() {
        let df = DataFrame::new(vec![
            Column::new("Country".into(), vec!["A"]),
            Column::new("2000".into(), vec![1.0]),
        ])
        .unwrap();
        let table = RawTable::new("gdp.csv", df);
        let err = DataProcessor::unpivot_years(&table, COUNTRY_COLUMN).unwrap_err();
        assert!(matches!(err, ShapeError::MissingCountryColumn { .. }));
    }

    #[test]
    fn oversized_year_label_is_shape_error() {
        let df = DataFrame::new(vec![
            Column::new("Country Name".into(), vec!["A"]),
            Column::new("99999999999".into(), vec![1.0]),
        ])
        .unwrap();
        let table = RawTable::new("gdp.csv", df);
        let err = DataProcessor::unpivot_years(&table, COUNTRY_COLUMN).unwrap_err();
        assert!(matches!(err, ShapeError::YearOutOfRange(_)));
    }
}
