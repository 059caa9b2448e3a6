// Spreadsheet I/O for the reconciler: read any workbook into raw grids, write .xlsx

use std::path::Path;

use txnmis_recon::model::Workbook;

pub mod csv;
pub mod error;
pub mod xlsx;

pub use error::IoError;

/// Read a workbook, choosing the reader by file extension.
///
/// `.csv`, `.tsv` and `.txt` go through the delimited reader; everything else is
/// handed to calamine, which detects xlsx, xlsm, xls, xlsb and ods.
pub fn read_workbook(path: &Path) -> Result<Workbook, IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => csv::import(path),
        "tsv" => csv::import_with_delimiter(path, b'\t'),
        _ => xlsx::import(path),
    }
}

/// Write a workbook as .xlsx, replacing any existing file.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<(), IoError> {
    xlsx::export(workbook, path)
}
