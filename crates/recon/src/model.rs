use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::MisError;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single spreadsheet cell after import.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    /// Date with a time of day. Midnight values import as `Date`.
    DateTime(NaiveDateTime),
    Bool(bool),
    /// Spreadsheet error value, as displayed (`#DIV/0!`, `#N/A`).
    Error(String),
    #[default]
    Empty,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Blank text. Appended master rows and derived label columns use this, never `Empty`.
    pub fn blank() -> Self {
        Self::Text(String::new())
    }

    /// True for `Empty` and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text view of the cell: integral numbers print without a decimal point.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            Self::Error(e) => e.clone(),
            Self::Empty => String::new(),
        }
    }

    /// Lenient numeric coercion. Anything that is not a finite number is missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// The cell with any time of day dropped.
    pub fn date_only(&self) -> Self {
        match self {
            Self::DateTime(dt) => Self::Date(dt.date()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Workbook (raw grids, as read from / written to disk)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub grid: Vec<Vec<Value>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, grid: Vec<Vec<Value>>) -> Self {
        Self { name: name.into(), grid }
    }
}

/// Ordered collection of named sheets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Parse a named sheet into a table whose header sits on `header_row`.
    pub fn table(&self, name: &str, header_row: usize) -> Result<Table, MisError> {
        let sheet = self.sheet(name).ok_or_else(|| MisError::MissingSheet {
            sheet: name.to_string(),
        })?;
        Table::from_grid(&sheet.name, &sheet.grid, header_row)
    }

    /// First sheet as a table. Used for single-sheet inputs.
    pub fn first_table(&self, header_row: usize) -> Result<Table, MisError> {
        let sheet = self.sheets.first().ok_or_else(|| MisError::MissingSheet {
            sheet: "<first sheet>".to_string(),
        })?;
        Table::from_grid(&sheet.name, &sheet.grid, header_row)
    }
}

// ---------------------------------------------------------------------------
// Table (header + rows)
// ---------------------------------------------------------------------------

/// A record set: named columns over ordered rows.
///
/// Every row has exactly `columns.len()` cells. `preamble` holds raw rows that sat
/// above the header in the source sheet and is written back verbatim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub preamble: Vec<Vec<Value>>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            preamble: Vec::new(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from a raw grid. Rows that are entirely blank are skipped.
    pub fn from_grid(name: &str, grid: &[Vec<Value>], header_row: usize) -> Result<Self, MisError> {
        if grid.is_empty() && header_row == 0 {
            return Ok(Self::new(name, Vec::new()));
        }
        let header = grid.get(header_row).ok_or_else(|| MisError::MalformedSheet {
            sheet: name.to_string(),
            reason: format!("header row {} not present ({} rows)", header_row + 1, grid.len()),
        })?;

        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let mut columns: Vec<String> = header.iter().map(Value::as_text).collect();
        columns.resize(width, String::new());

        let rows = grid[header_row + 1..]
            .iter()
            .filter(|row| row.iter().any(|v| !v.is_blank()))
            .map(|row| {
                let mut row = row.clone();
                row.resize(width, Value::Empty);
                row
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            preamble: grid[..header_row].to_vec(),
            columns,
            rows,
        })
    }

    /// Flatten back into a grid: preamble, header, rows.
    pub fn to_grid(&self) -> Vec<Vec<Value>> {
        let mut grid = Vec::with_capacity(self.preamble.len() + 1 + self.rows.len());
        grid.extend(self.preamble.iter().cloned());
        grid.push(self.columns.iter().map(|c| Value::text(c.as_str())).collect());
        grid.extend(self.rows.iter().cloned());
        grid
    }

    pub fn to_sheet(&self, name: &str) -> Sheet {
        Sheet::new(name, self.to_grid())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact-name lookup. Use [`crate::matcher::resolve_column`] for loose names.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        static EMPTY: Value = Value::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    /// Copy of the table with every datetime cell reduced to its date.
    pub fn without_times(&self) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(Value::date_only).collect())
                .collect(),
            ..self.clone()
        }
    }

    /// Push a row, padding or truncating it to the table width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Counts reported after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub new_clients: usize,
    pub new_schemes: usize,
    pub raw_rows: usize,
    pub working_rows: usize,
    pub final_rows: usize,
}
