// Excel file import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import: cell values only. Formulas come in as their cached results.
// Export: values only. Dates, booleans and error values keep their cell type,
// other formatting of the source file is not carried over.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook, Worksheet};
use tracing::debug;
use txnmis_recon::model::{Sheet, Value, Workbook};

use crate::error::IoError;

/// Excel worksheet limits.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Number formats for typed cells.
struct CellFormats {
    date: Format,
    datetime: Format,
}

/// Import every sheet of an Excel or ODS file, in workbook order.
///
/// Grids keep their sheet coordinates: leading empty rows and columns are
/// materialised so that a header on row N is at index N.
pub fn import(path: &Path) -> Result<Workbook, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::open(path, e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(IoError::EmptyWorkbook {
            path: path.to_path_buf(),
        });
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| IoError::ReadSheet {
                path: path.to_path_buf(),
                sheet: sheet_name.clone(),
                reason: e.to_string(),
            })?;

        let (height, width) = range.get_size();
        if height == 0 || width == 0 {
            sheets.push(Sheet::new(sheet_name.as_str(), Vec::new()));
            continue;
        }

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let (start_row, start_col) = (start_row as usize, start_col as usize);

        let mut grid: Vec<Vec<Value>> = vec![Vec::new(); start_row];
        for row in range.rows() {
            let mut cells = vec![Value::Empty; start_col];
            cells.extend(row.iter().map(value_from_cell));
            grid.push(cells);
        }

        debug!(sheet = %sheet_name, rows = grid.len(), cols = start_col + width, "sheet imported");
        sheets.push(Sheet::new(sheet_name.as_str(), grid));
    }

    Ok(Workbook::new(sheets))
}

fn value_from_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => Value::Error(e.to_string()),
        // Assumes the 1900 date system.
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_datetime(serial).map_or(Value::Number(serial), datetime_value)
        }
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(datetime_value)
            .or_else(|| {
                s.get(..10)
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                    .map(Value::Date)
            })
            .unwrap_or_else(|| Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Midnight is a plain date.
fn datetime_value(dt: NaiveDateTime) -> Value {
    if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
        Value::Date(dt.date())
    } else {
        Value::DateTime(dt)
    }
}

fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

/// Excel serial in the 1900 system, rounded to the second.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let seconds = (serial * 86_400.0).round() as i64;
    excel_epoch()?.checked_add_signed(Duration::seconds(seconds))
}

/// Inverse of [`excel_serial_to_datetime`].
pub fn datetime_to_excel_serial(dt: NaiveDateTime) -> Option<f64> {
    let seconds = (dt - excel_epoch()?).num_seconds();
    Some(seconds as f64 / 86_400.0)
}

/// Write every sheet of `workbook` to a new .xlsx file, in order.
pub fn export(workbook: &Workbook, path: &Path) -> Result<(), IoError> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let formats = CellFormats {
        date: Format::new().set_num_format(DATE_FORMAT),
        datetime: Format::new().set_num_format(DATETIME_FORMAT),
    };

    for sheet in &workbook.sheets {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| IoError::write(path, format!("sheet '{}': {}", sheet.name, e)))?;
        export_sheet_cells(sheet, worksheet, &formats)
            .map_err(|e| IoError::write(path, format!("sheet '{}': {}", sheet.name, e)))?;
    }

    xlsx_workbook.save(path).map_err(|e| IoError::write(path, e))?;
    debug!(path = %path.display(), sheets = workbook.sheets.len(), "workbook written");
    Ok(())
}

fn export_sheet_cells(sheet: &Sheet, worksheet: &mut Worksheet, formats: &CellFormats) -> Result<(), String> {
    if sheet.grid.len() > MAX_ROWS {
        return Err(format!("{} rows exceed the Excel limit of {}", sheet.grid.len(), MAX_ROWS));
    }

    for (row, cells) in sheet.grid.iter().enumerate() {
        if cells.len() > MAX_COLS {
            return Err(format!("row {} has {} columns, Excel allows {}", row + 1, cells.len(), MAX_COLS));
        }
        let row32 = row as u32;

        for (col, value) in cells.iter().enumerate() {
            let col16 = col as u16;
            let written = match value {
                Value::Empty => continue,
                Value::Text(s) if s.is_empty() => continue,
                Value::Text(s) => worksheet.write_string(row32, col16, s).map(|_| ()),
                Value::Number(n) if !n.is_finite() => continue,
                // Beyond 15 digits Excel rounds. Keep the exact digits as text.
                Value::Number(n) if exceeds_excel_precision(*n) => {
                    worksheet.write_string(row32, col16, value.as_text()).map(|_| ())
                }
                Value::Number(n) => worksheet.write_number(row32, col16, *n).map(|_| ()),
                Value::Date(d) => {
                    let serial = d.and_hms_opt(0, 0, 0).and_then(datetime_to_excel_serial);
                    write_serial(worksheet, row32, col16, serial, &formats.date, value)
                }
                Value::DateTime(dt) => {
                    let serial = datetime_to_excel_serial(*dt);
                    write_serial(worksheet, row32, col16, serial, &formats.datetime, value)
                }
                Value::Bool(b) => worksheet.write_boolean(row32, col16, *b).map(|_| ()),
                // An error literal is a valid formula; the cached result keeps it without recalculation.
                Value::Error(e) => worksheet
                    .write_formula(row32, col16, Formula::new(e.as_str()).set_result(e.as_str()))
                    .map(|_| ()),
            };
            written.map_err(|e| format!("cell ({}, {}): {}", row, col, e))?;
        }
    }
    Ok(())
}

/// Dates before the 1900 epoch have no serial. Those are written as text.
fn write_serial(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    serial: Option<f64>,
    format: &Format,
    value: &Value,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    match serial {
        Some(serial) if serial >= 1.0 => worksheet.write_number_with_format(row, col, serial, format).map(|_| ()),
        _ => worksheet.write_string(row, col, value.as_text()).map(|_| ()),
    }
}

/// Check if a number exceeds Excel's safe precision (15 significant digits)
fn exceeds_excel_precision(n: f64) -> bool {
    n.is_finite() && n.trunc().abs() >= 1e15
}
