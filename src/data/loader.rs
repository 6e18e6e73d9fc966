//! Spreadsheet Loader Module
//! Reads World Bank style workbooks/CSV exports into Polars DataFrames,
//! skipping the metadata block that precedes the header row.

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Leading title/metadata rows before the header row.
pub const METADATA_ROWS: usize = 4;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
    #[error("{path} has {rows} rows, expected at least {min} (metadata rows + header)")]
    TooShort {
        path: PathBuf,
        rows: usize,
        min: usize,
    },
    #[error("failed to parse {path}: {source}")]
    Polars { path: PathBuf, source: PolarsError },
}

/// A wide table as loaded from disk: one row per country, one column per year.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: PathBuf,
    pub df: DataFrame,
}

impl RawTable {
    pub fn new(source: impl Into<PathBuf>, df: DataFrame) -> Self {
        Self {
            source: source.into(),
            df,
        }
    }

    /// Column labels in their original order.
    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }
}

/// Loads wide tables from workbooks or CSV files.
pub struct DataLoader;

impl DataLoader {
    /// Load a table, choosing the reader by file extension.
    pub fn load(path: &Path) -> Result<RawTable, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let table = if Self::is_workbook(path) {
            Self::load_workbook(path)?
        } else {
            Self::load_csv(path)?
        };

        info!(
            "loaded {} ({} rows, {} columns)",
            path.display(),
            table.row_count(),
            table.df.width()
        );
        debug!("columns in {}: {:?}", path.display(), table.columns());
        Ok(table)
    }

    fn is_workbook(path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                matches!(
                    ext.to_string_lossy().to_lowercase().as_str(),
                    "xlsx" | "xlsm" | "xlsb" | "xls" | "ods"
                )
            })
            .unwrap_or(false)
    }

    /// Load a CSV export using Polars, skipping the metadata lines.
    pub fn load_csv(path: &Path) -> Result<RawTable, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let min = METADATA_ROWS + 1;
        let rows = BufReader::new(file).lines().take(min).count();
        if rows < min {
            return Err(LoadError::TooShort {
                path: path.to_path_buf(),
                rows,
                min,
            });
        }

        let polars_err = |source| LoadError::Polars {
            path: path.to_path_buf(),
            source,
        };
        let df = LazyCsvReader::new(path)
            .with_skip_rows(METADATA_ROWS)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()
            .map_err(polars_err)?
            .collect()
            .map_err(polars_err)?;

        Ok(RawTable::new(path, df))
    }

    /// Load the first worksheet of a workbook with calamine.
    pub fn load_workbook(path: &Path) -> Result<RawTable, LoadError> {
        let workbook_err = |message: String| LoadError::Workbook {
            path: path.to_path_buf(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| workbook_err(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| workbook_err("workbook has no worksheets".to_string()))?
            .map_err(|e| workbook_err(e.to_string()))?;

        // The used range starts at the first non-empty cell, not at A1.
        // Leading empty columns are left out: only labels are used, never
        // column positions.
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let total_rows = if range.is_empty() {
            0
        } else {
            first_row + range.height()
        };
        let min = METADATA_ROWS + 1;
        if total_rows < min {
            return Err(LoadError::TooShort {
                path: path.to_path_buf(),
                rows: total_rows,
                min,
            });
        }

        let skip = METADATA_ROWS.saturating_sub(first_row);
        let mut rows = range.rows().skip(skip);
        let header = rows.next().unwrap_or(&[]);
        let labels = Self::unique_labels(header.iter().map(Self::header_label).collect());
        let body: Vec<&[Data]> = rows.collect();

        let columns = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| Self::sheet_column(label, idx, &body))
            .collect::<Vec<Column>>();

        let df = DataFrame::new(columns).map_err(|source| LoadError::Polars {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(RawTable::new(path, df))
    }

    /// Header cell as text; integral numbers print without a fraction so
    /// that `1960.0` is labeled `1960`.
    fn header_label(cell: &Data) -> String {
        match cell {
            Data::Int(i) => i.to_string(),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (*f as i64).to_string()
            }
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        }
    }

    fn unique_labels(labels: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        labels
            .into_iter()
            .enumerate()
            .map(|(idx, label)| {
                let label = if label.is_empty() {
                    format!("column_{}", idx)
                } else if seen.contains(&label) {
                    format!("{}_{}", label, idx)
                } else {
                    label
                };
                seen.insert(label.clone());
                label
            })
            .collect()
    }

    fn cell_f64(cell: &Data) -> Option<f64> {
        match cell {
            Data::Int(i) => Some(*i as f64),
            Data::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Build one DataFrame column: Float64 when every non-empty cell is
    /// numeric, String otherwise.
    fn sheet_column(label: &str, idx: usize, body: &[&[Data]]) -> Column {
        let cells: Vec<Option<&Data>> = body
            .iter()
            .map(|row| row.get(idx).filter(|c| !matches!(c, Data::Empty)))
            .collect();

        let numeric = cells
            .iter()
            .flatten()
            .all(|c| matches!(c, Data::Int(_) | Data::Float(_)));

        if numeric {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.and_then(Self::cell_f64))
                .collect();
            Column::new(label.into(), values)
        } else {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.map(|cell| cell.to_string()))
                .collect();
            Column::new(label.into(), values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{write_workbook, Cell};
    use std::fs;
    use tempfile::tempdir;

    const CSV: &str = "\"Data Source\",\"World Development Indicators\"\n\
\"Indicator\",\"GDP (current US$)\"\n\
\"Last Updated Date\",\"2024-06-28\"\n\
\"Unit\",\"USD\"\n\
Country Name,Country Code,2000,2001\n\
Aruba,ABW,100.5,110.25\n\
Chad,TCD,,42\n";

    #[test]
    fn loads_csv_after_metadata_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gdp.csv");
        fs::write(&path, CSV).unwrap();

        let table = DataLoader::load(&path).unwrap();
        assert_eq!(table.row_count(), 2);
        let columns = table.columns();
        assert_eq!(columns[0], "Country Name");
        assert!(columns.contains(&"2000".to_string()));
        assert!(columns.contains(&"2001".to_string()));
    }

    #[test]
    fn missing_file_is_load_error() {
        let dir = tempdir().unwrap();
        let err = DataLoader::load(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn short_csv_is_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, "a\nb\nc\nd\n").unwrap();

        let err = DataLoader::load(&path).unwrap_err();
        assert!(matches!(err, LoadError::TooShort { rows: 4, .. }));
    }

    #[test]
    fn loads_workbook_with_numeric_year_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pop.xlsx");
        let rows = vec![
            vec![Cell::Text("Data Source".into()), Cell::Text("WDI".into())],
            vec![],
            vec![Cell::Text("Last Updated Date".into())],
            vec![],
            vec![
                Cell::Text("Country Name".into()),
                Cell::Text("Indicator Name".into()),
                Cell::Number(2000.0),
                Cell::Number(2001.0),
            ],
            vec![
                Cell::Text("Aruba".into()),
                Cell::Text("Population, total".into()),
                Cell::Number(90853.0),
                Cell::Empty,
            ],
            vec![
                Cell::Text("Chad".into()),
                Cell::Text("Population, total".into()),
                Cell::Number(8_259_137.0),
                Cell::Number(8_552_875.0),
            ],
        ];
        write_workbook(&path, "Data", &rows).unwrap();

        let table = DataLoader::load(&path).unwrap();
        assert_eq!(
            table.columns(),
            vec!["Country Name", "Indicator Name", "2000", "2001"]
        );
        assert_eq!(table.row_count(), 2);

        let col_2001 = table.df.column("2001").unwrap().f64().unwrap().clone();
        assert_eq!(col_2001.get(0), None);
        assert_eq!(col_2001.get(1), Some(8_552_875.0));
    }

    #[test]
    fn workbook_starting_after_column_a() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");
        let row = |cells: Vec<Cell>| {
            let mut r = vec![Cell::Empty];
            r.extend(cells);
            r
        };
        let rows = vec![
            row(vec![Cell::Text("Data Source".into())]),
            row(vec![Cell::Text("WDI".into())]),
            row(vec![Cell::Text("Last Updated Date".into())]),
            row(vec![Cell::Text("2024-06-28".into())]),
            row(vec![Cell::Text("Country Name".into()), Cell::Number(2000.0)]),
            row(vec![Cell::Text("Aruba".into()), Cell::Number(1.5)]),
        ];
        write_workbook(&path, "Data", &rows).unwrap();

        let table = DataLoader::load(&path).unwrap();
        assert_eq!(table.columns(), vec!["Country Name", "2000"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn workbook_extensions() {
        for name in ["a.xlsx", "a.XLSM", "a.xlsb", "a.xls", "a.ods"] {
            assert!(DataLoader::is_workbook(Path::new(name)), "{}", name);
        }
        for name in ["a.csv", "a.txt", "a"] {
            assert!(!DataLoader::is_workbook(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn short_workbook_is_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.xlsx");
        let rows = vec![
            vec![Cell::Text("Data Source".into())],
            vec![Cell::Text("Country Name".into())],
        ];
        write_workbook(&path, "Data", &rows).unwrap();

        let err = DataLoader::load(&path).unwrap_err();
        assert!(matches!(err, LoadError::TooShort { rows: 2, .. }));
    }

    #[test]
    fn blank_and_duplicate_labels_are_made_unique() {
        let labels = DataLoader::unique_labels(vec![
            "Country Name".into(),
            String::new(),
            "2000".into(),
            "2000".into(),
        ]);
        assert_eq!(labels, vec!["Country Name", "column_1", "2000", "2000_3"]);
    }
}
