//! Fixture workbooks for tests.

use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

/// Per-test scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gridiq-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a workbook where every cell that parses as a number is stored as one.
/// Empty strings leave the cell blank.
pub fn write_workbook(path: &Path, sheets: &[(&str, Vec<&str>, Vec<Vec<&str>>)]) {
    let mut workbook = Workbook::new();
    for (name, headers, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, *header).unwrap();
        }
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                let (row, col) = (row as u32 + 1, col as u16);
                if value.is_empty() {
                    continue;
                }
                match value.parse::<f64>() {
                    Ok(number) => worksheet.write_number(row, col, number).unwrap(),
                    Err(_) => worksheet.write_string(row, col, *value).unwrap(),
                };
            }
        }
    }
    workbook.save(path).unwrap();
}
