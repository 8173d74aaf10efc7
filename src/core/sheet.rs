//! Spreadsheet reading. Workbooks go through calamine, `.csv` files through
//! the csv crate; both come out as [`Record`]s keyed by normalised header.

use crate::domain::model::{normalize_header, Record};
use crate::utils::error::{PostError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::Path;

/// Header occupies spreadsheet row 1.
const FIRST_DATA_ROW: usize = 2;

pub fn read_records(path: &Path, sheet_name: Option<&str>) -> Result<Vec<Record>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        if sheet_name.is_some() {
            tracing::warn!("--sheet is ignored for CSV input");
        }
        read_csv(path)
    } else {
        read_workbook(path, sheet_name)
    }
}

fn read_workbook(path: &Path, sheet_name: Option<&str>) -> Result<Vec<Record>> {
    let mut workbook = open_workbook_auto(path)?;

    let range = match sheet_name {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PostError::ValidationError {
                message: format!("{} contains no worksheets", path.display()),
            })??,
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| normalize_header(&cell.to_string()))
            .collect(),
        None => return Ok(Vec::new()),
    };
    tracing::debug!("Worksheet columns: {:?}", headers);

    let records = rows
        .enumerate()
        .filter_map(|(index, cells)| {
            build_record(
                index + FIRST_DATA_ROW,
                &headers,
                cells.iter().map(cell_to_value),
            )
        })
        .collect();

    Ok(records)
}

fn read_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| normalize_header(String::from_utf8_lossy(h).trim_start_matches('\u{feff}')))
        .collect();
    tracing::debug!("CSV columns: {:?}", headers);

    let mut records = Vec::new();
    for (index, row) in reader.byte_records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("⚠️ Skipping CSV row {}: {}", index + FIRST_DATA_ROW, e);
                continue;
            }
        };
        // Stray non-UTF-8 bytes are replaced rather than losing the row.
        let values = row.iter().map(|field| {
            let text = String::from_utf8_lossy(field);
            let text = text.trim();
            if text.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(text.to_string())
            }
        });
        if let Some(record) = build_record(index + FIRST_DATA_ROW, &headers, values) {
            records.push(record);
        }
    }

    Ok(records)
}

/// Pairs values with headers. Returns `None` for rows with no data at all.
fn build_record(
    row_number: usize,
    headers: &[String],
    values: impl Iterator<Item = serde_json::Value>,
) -> Option<Record> {
    let data: HashMap<String, serde_json::Value> = headers
        .iter()
        .zip(values)
        .filter(|(header, _)| !header.is_empty())
        .map(|(header, value)| (header.clone(), value))
        .collect();

    if data.values().all(serde_json::Value::is_null) {
        return None;
    }

    Some(Record { row_number, data })
}

pub fn cell_to_value(cell: &Data) -> serde_json::Value {
    match cell {
        Data::Empty | Data::Error(_) => serde_json::Value::Null,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(trimmed.to_string())
            }
        }
        Data::Int(i) => serde_json::Value::from(*i),
        Data::Float(f) => {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                serde_json::Value::from(*f as i64)
            } else {
                serde_json::Number::from_f64(*f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Data::Bool(b) => serde_json::Value::Bool(*b),
        other => serde_json::Value::String(other.to_string()),
    }
}
