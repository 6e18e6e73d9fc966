//! Merged Table Export Module
//! Writes the joined records to an `.xlsx` workbook or a CSV file.
//!
//! Workbooks are produced by direct ZIP/XML generation: a single worksheet
//! with inline strings, which every spreadsheet reader accepts.

use crate::data::{to_dataframe, JoinedRecord, JOINED_HEADERS};
use polars::prelude::{CsvWriter, PolarsError, SerWriter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("cannot write {path}: {source}")]
    Polars { path: PathBuf, source: PolarsError },
    #[error("cannot render chart {path}: {message}")]
    Chart { path: PathBuf, message: String },
}

/// A worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<f64> for Cell {
    /// Undefined values are left blank.
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Cell::Number(v)
        } else {
            Cell::Empty
        }
    }
}

/// Write the joined table; the format follows the file extension.
///
/// Existing files are overwritten. The parent directory must already exist.
pub fn write_joined(records: &[JoinedRecord], path: &Path) -> Result<(), WriteError> {
    let is_xlsx = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);

    if is_xlsx {
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(
            JOINED_HEADERS
                .iter()
                .map(|h| Cell::Text(h.to_string()))
                .collect::<Vec<_>>(),
        );
        rows.extend(records.iter().map(|r| {
            vec![
                Cell::Text(r.country.clone()),
                Cell::Number(r.year as f64),
                r.gdp.into(),
                r.population.into(),
                r.gdp_per_capita.into(),
            ]
        }));
        write_workbook(path, "Merged", &rows)?;
    } else {
        write_csv(records, path)?;
    }

    info!("saved merged table to {} ({} rows)", path.display(), records.len());
    Ok(())
}

fn write_csv(records: &[JoinedRecord], path: &Path) -> Result<(), WriteError> {
    let polars_err = |source| WriteError::Polars {
        path: path.to_path_buf(),
        source,
    };
    let mut df = to_dataframe(records).map_err(polars_err)?;
    let mut file = File::create(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .map_err(polars_err)
}

/// Write `rows` as the only worksheet of a new workbook.
pub fn write_workbook(path: &Path, sheet_name: &str, rows: &[Vec<Cell>]) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let zip_err = |source| WriteError::Zip {
        path: path.to_path_buf(),
        source,
    };
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();

    let parts: [(&str, String); 5] = [
        ("[Content_Types].xml", content_types_xml().to_string()),
        ("_rels/.rels", rels_xml().to_string()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", workbook_rels_xml().to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];
    for (name, body) in &parts {
        zip.start_file(*name, options).map_err(zip_err)?;
        zip.write_all(body.as_bytes()).map_err(io_err)?;
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

/// Spreadsheet column name for a zero-based index (0 -> A, 26 -> AA).
fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>"#,
    );

    for (row_idx, row) in rows.iter().enumerate() {
        let row_num = row_idx + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_num));
        for (col_idx, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_letter(col_idx), row_num);
            match cell {
                Cell::Text(text) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell_ref,
                    escape_xml(text)
                )),
                Cell::Number(v) => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, v))
                }
                Cell::Empty => {}
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData>\n</worksheet>");
    xml
}

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#
}

fn rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        escape_xml(sheet_name)
    )
}

fn workbook_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use std::fs;
    use tempfile::tempdir;

    fn records() -> Vec<JoinedRecord> {
        vec![
            JoinedRecord::new("A & Co", 2000, 100.0, 10.0),
            JoinedRecord::new("A & Co", 2001, 110.0, 0.0),
        ]
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(4), "E");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn xlsx_has_headers_and_blank_undefined_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged.xlsx");
        write_joined(&records(), &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let rows: Vec<&[Data]> = range.rows().collect();

        assert_eq!(rows.len(), 3);
        let headers: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(headers, JOINED_HEADERS);
        assert_eq!(rows[1][0], Data::String("A & Co".into()));
        assert_eq!(rows[1][4], Data::Float(10.0));
        assert_eq!(rows[2][4], Data::Empty);
    }

    #[test]
    fn csv_output_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        fs::write(&path, "stale contents\n").unwrap();

        write_joined(&records(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Country Name,Year,GDP,Population,GDP_per_Capita")
        );
        assert_eq!(lines.count(), 2);
        assert!(!text.contains("stale"));
    }

    #[test]
    fn missing_directory_is_write_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("merged.xlsx");
        let err = write_joined(&records(), &path).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
        assert!(!path.exists());
    }
}
