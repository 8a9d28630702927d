//! Reads the user's selected sheets out of an Excel workbook into one play table.

use crate::{
    error::Error, normalize::canonical_name, plays::PlayDf, Result, PLAY_TYPE, RAW_SHEET_NAME,
    RAW_SHEET_ORDER, SHEET_NAME, SHEET_ORDER,
};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use itertools::Itertools;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls"];

type Workbook = Sheets<BufReader<File>>;

/// One sheet as read from the workbook: a header row and untyped cells.
struct RawSheet {
    name: String,
    order: usize,
    headers: Vec<String>,
    rows: Vec<Vec<Data>>,
}

pub fn check_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());
    match extension {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(Error::FileFormat(format!(
            "{} (expected one of: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        ))),
    }
}

fn open_workbook(path: &Path) -> Result<Workbook> {
    check_extension(path)?;
    let workbook = open_workbook_auto(path)?;
    Ok(workbook)
}

/// Sheet names in workbook order
pub fn list_sheets<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let workbook = open_workbook(path.as_ref())?;
    Ok(workbook.sheet_names().to_vec())
}

/// Loads the named sheets into one table, in the order given.
///
/// Each row is tagged with `SheetName` and `SheetOrder`, the latter being the
/// sheet's index in `sheet_names` (not its position in the workbook). Sheets
/// that are missing or unreadable are logged and skipped; it is only an error
/// when nothing at all could be loaded.
pub fn load_sheets<P: AsRef<Path>>(path: P, sheet_names: &[String]) -> Result<PlayDf> {
    log::trace!("sheet::load_sheets");
    let path = path.as_ref();
    let mut workbook = open_workbook(path)?;
    let available = workbook.sheet_names().to_vec();

    let mut loaded = Vec::with_capacity(sheet_names.len());
    for (order, name) in sheet_names.iter().enumerate() {
        match read_sheet(&mut workbook, &available, name, order) {
            Ok(sheet) => {
                log::debug!("{}: {} rows, {} columns", name, sheet.rows.len(), sheet.headers.len());
                loaded.push(sheet);
            }
            Err(err) => log::warn!("Skipping sheet '{}' in {}: {}", name, path.display(), err),
        }
    }

    if loaded.is_empty() {
        return Err(Error::NoSheetsLoaded);
    }

    let df = unify(&loaded)?;
    log::info!("Loaded {} plays from {} sheets", df.height(), loaded.len());
    Ok(PlayDf::new(df))
}

fn read_sheet(
    workbook: &mut Workbook,
    available: &[String],
    name: &str,
    order: usize,
) -> Result<RawSheet> {
    if !available.iter().any(|sheet| sheet == name) {
        return Err(Error::SheetNotFound(name.to_string()));
    }
    let range = workbook.worksheet_range(name)?;
    let (headers, rows) = split_header(&range);
    Ok(RawSheet {
        name: name.to_string(),
        order,
        headers,
        rows,
    })
}

/// First row is the header; fully blank data rows are dropped.
fn split_header(range: &Range<Data>) -> (Vec<String>, Vec<Vec<Data>>) {
    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|row| header_names(row))
        .unwrap_or_default();
    let rows = rows
        .filter(|row| row.iter().any(|cell| !is_blank(cell)))
        .map(|row| row.to_vec())
        .collect();
    (headers, rows)
}

fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = cell_text(cell)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| format!("Unnamed: {}", idx));
            // Repeated headers within a sheet get a numeric suffix
            let count = seen.entry(name.clone()).or_insert(0);
            let name = match *count {
                0 => name,
                n => format!("{}.{}", name, n),
            };
            *count += 1;
            name
        })
        .collect()
}

/// Columns the loader and normalizer derive themselves
fn is_reserved(header: &str) -> bool {
    let name = canonical_name(header);
    name == SHEET_NAME || name == SHEET_ORDER || name == PLAY_TYPE
}

/// Builds the outer union of all sheets' columns, in first-seen order.
/// Sheet headers that shadow the injected sheet columns are dropped.
fn unify(sheets: &[RawSheet]) -> Result<DataFrame> {
    let columns: Vec<&String> = sheets
        .iter()
        .flat_map(|sheet| sheet.headers.iter())
        .unique()
        .filter(|header| {
            let reserved = is_reserved(header);
            if reserved {
                log::warn!("Ignoring sheet column '{}'; it is derived from the sheet itself", header);
            }
            !reserved
        })
        .collect();

    let positions: Vec<HashMap<&str, usize>> = sheets
        .iter()
        .map(|sheet| {
            sheet
                .headers
                .iter()
                .enumerate()
                .map(|(idx, header)| (header.as_str(), idx))
                .collect()
        })
        .collect();

    let mut series = Vec::with_capacity(columns.len() + 2);
    for column in columns {
        let cells: Vec<Option<&Data>> = sheets
            .iter()
            .zip(&positions)
            .flat_map(|(sheet, lookup)| {
                let idx = lookup.get(column.as_str()).copied();
                sheet
                    .rows
                    .iter()
                    .map(move |row| idx.and_then(|idx| row.get(idx)))
            })
            .collect();
        series.push(build_column(column, &cells));
    }

    let sheet_names: Vec<&str> = sheets
        .iter()
        .flat_map(|sheet| std::iter::repeat(sheet.name.as_str()).take(sheet.rows.len()))
        .collect();
    let sheet_orders: Vec<i64> = sheets
        .iter()
        .flat_map(|sheet| std::iter::repeat(sheet.order as i64).take(sheet.rows.len()))
        .collect();
    series.push(Series::new(RAW_SHEET_NAME, sheet_names));
    series.push(Series::new(RAW_SHEET_ORDER, sheet_orders));

    Ok(DataFrame::new(series)?)
}

/// Numeric when every non-blank cell is numeric, otherwise text.
fn build_column(name: &str, cells: &[Option<&Data>]) -> Series {
    let numeric = cells
        .iter()
        .flatten()
        .filter(|cell| !is_blank(cell))
        .all(|cell| matches!(cell, Data::Int(_) | Data::Float(_)));

    if numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(value)) => Some(*value as f64),
                Some(Data::Float(value)) => Some(*value),
                _ => None,
            })
            .collect();
        Series::new(name, values)
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| cell.and_then(cell_text))
            .collect();
        Series::new(name, values)
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(text) if text.trim().is_empty() => None,
        Data::String(text) => Some(text.clone()),
        Data::Int(value) => Some(value.to_string()),
        Data::Float(value) if value.fract() == 0.0 && value.is_finite() => Some(format!("{:.0}", value)),
        Data::Float(value) => Some(value.to_string()),
        Data::Bool(value) => Some(value.to_string()),
        Data::DateTime(value) => Some(value.to_string()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => Some(value.clone()),
    }
}
