//! Output assembly: column order, Raw/Working/Final views, master write-back.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::classify::{ensure_row_count, ClassifiedRow, CLASSIFIED_COLUMNS};
use crate::config::SheetNames;
use crate::enrich::{Enrichment, ENRICHED_COLUMNS};
use crate::error::MisError;
use crate::model::{Sheet, Table, Workbook};

/// Derived columns appended after the input columns, in output order.
pub fn derived_columns() -> Vec<&'static str> {
    CLASSIFIED_COLUMNS.iter().chain(ENRICHED_COLUMNS.iter()).copied().collect()
}

/// The three transaction views.
#[derive(Debug, Clone)]
pub struct Report {
    /// Every row, unfiltered.
    pub raw: Table,
    /// Rows without a Del Tag.
    pub working: Table,
    /// Working rows with a canonical type and no delete flag.
    pub final_view: Table,
}

impl Report {
    pub fn to_workbook(&self) -> Workbook {
        Workbook::new(vec![
            self.raw.to_sheet(&self.raw.name),
            self.working.to_sheet(&self.working.name),
            self.final_view.to_sheet(&self.final_view.name),
        ])
    }
}

/// Join input rows with their derived fields and partition them.
///
/// Every input column is kept. A derived column whose name is already taken by an
/// input column is renamed with a ` (MIS)` suffix.
pub fn assemble_report(
    transactions: &Table,
    classified: &[ClassifiedRow],
    enriched: &[Enrichment],
    sheets: &SheetNames,
) -> Result<Report, MisError> {
    ensure_row_count(transactions.len(), classified.len())?;
    ensure_row_count(transactions.len(), enriched.len())?;

    let mut columns = transactions.columns.clone();
    let mut taken: HashSet<String> = columns.iter().cloned().collect();
    for name in derived_columns() {
        let header = distinct_header(name, &taken);
        if header != name {
            warn!(column = name, renamed = %header, "input already has a derived column name");
        }
        taken.insert(header.clone());
        columns.push(header);
    }

    let mut raw = Table::new(&sheets.raw_dump, columns.clone());
    let mut working = Table::new(&sheets.working, columns.clone());
    let mut final_view = Table::new(&sheets.final_view, columns);

    for (row, (c, e)) in classified.iter().zip(enriched).enumerate() {
        let mut cells = transactions.rows[row].clone();
        cells.extend(c.cells());
        cells.extend(e.cells());

        if c.is_final() {
            final_view.push_row(cells.clone());
        }
        if c.is_working() {
            working.push_row(cells.clone());
        }
        raw.push_row(cells);
    }
    ensure_row_count(transactions.len(), raw.len())?;

    info!(
        raw = raw.len(),
        working = working.len(),
        final_rows = final_view.len(),
        "report assembled"
    );
    Ok(Report { raw, working, final_view })
}

fn distinct_header(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let mut header = format!("{name} (MIS)");
    let mut n = 2;
    while taken.contains(&header) {
        header = format!("{name} (MIS {n})");
        n += 1;
    }
    header
}

/// Rebuild the master workbook with the reconciled client and scheme sheets at
/// positions 0 and 1. Every other sheet follows in its original order, untouched.
pub fn assemble_master(original: &Workbook, client: &Table, scheme: &Table, sheets: &SheetNames) -> Workbook {
    let mut out: Vec<Sheet> = vec![
        client.to_sheet(&sheets.client_master),
        scheme.to_sheet(&sheets.scheme_master),
    ];
    out.extend(
        original
            .sheets
            .iter()
            .filter(|s| s.name != sheets.client_master && s.name != sheets.scheme_master)
            .cloned(),
    );
    Workbook::new(out)
}
