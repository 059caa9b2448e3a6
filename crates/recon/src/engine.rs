use tracing::info;

use crate::assemble::{assemble_master, assemble_report, Report};
use crate::classify::{classify_transactions, ClassificationRules, TransactionFields};
use crate::config::{MisConfig, SheetNames};
use crate::enrich::{enrich_transactions, Enricher};
use crate::error::MisError;
use crate::master::reconcile_master;
use crate::matcher::{normalize_client_code, normalize_label};
use crate::model::{RunSummary, Table, Workbook};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The four inputs of a run.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub transactions: Table,
    pub reference_clients: Table,
    pub reference_schemes: Table,
    pub master: Workbook,
}

const TRANSACTIONS: &str = "transactions";
const REFERENCE_CLIENTS: &str = "reference clients";
const REFERENCE_SCHEMES: &str = "reference schemes";
const MASTER: &str = "master";

/// Collects run inputs in their fixed order: transactions, reference clients,
/// reference schemes, master. Each stage requires the previous one.
#[derive(Debug, Clone, Default)]
pub struct StagedInputs {
    transactions: Option<Table>,
    reference_clients: Option<Table>,
    reference_schemes: Option<Table>,
    master: Option<Workbook>,
}

impl StagedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(mut self, table: Table) -> Self {
        self.transactions = Some(table);
        self
    }

    pub fn reference_clients(mut self, table: Table) -> Result<Self, MisError> {
        require(&self.transactions, REFERENCE_CLIENTS, TRANSACTIONS)?;
        self.reference_clients = Some(table);
        Ok(self)
    }

    pub fn reference_schemes(mut self, table: Table) -> Result<Self, MisError> {
        require(&self.reference_clients, REFERENCE_SCHEMES, REFERENCE_CLIENTS)?;
        self.reference_schemes = Some(table);
        Ok(self)
    }

    pub fn master(mut self, workbook: Workbook) -> Result<Self, MisError> {
        require(&self.reference_schemes, MASTER, REFERENCE_SCHEMES)?;
        self.master = Some(workbook);
        Ok(self)
    }

    /// The stage the caller should supply next, if any.
    pub fn next_stage(&self) -> Option<&'static str> {
        if self.transactions.is_none() {
            Some(TRANSACTIONS)
        } else if self.reference_clients.is_none() {
            Some(REFERENCE_CLIENTS)
        } else if self.reference_schemes.is_none() {
            Some(REFERENCE_SCHEMES)
        } else if self.master.is_none() {
            Some(MASTER)
        } else {
            None
        }
    }

    pub fn finish(self) -> Result<RunInputs, MisError> {
        Ok(RunInputs {
            transactions: self.transactions.ok_or(MisError::MissingInput(TRANSACTIONS))?,
            reference_clients: self.reference_clients.ok_or(MisError::MissingInput(REFERENCE_CLIENTS))?,
            reference_schemes: self.reference_schemes.ok_or(MisError::MissingInput(REFERENCE_SCHEMES))?,
            master: self.master.ok_or(MisError::MissingInput(MASTER))?,
        })
    }
}

fn require<T>(stage: &Option<T>, supplied: &'static str, required: &'static str) -> Result<(), MisError> {
    match stage {
        Some(_) => Ok(()),
        None => Err(MisError::StageOutOfOrder { supplied, required }),
    }
}

// ---------------------------------------------------------------------------
// Master workbook
// ---------------------------------------------------------------------------

/// The named sheets of the master workbook, parsed.
#[derive(Debug, Clone)]
pub struct MasterWorkbook {
    pub client: Table,
    pub scheme: Table,
    pub ambit_first: Table,
    pub trnx_type: Table,
    pub employee: Table,
    pub ntb: Table,
}

impl MasterWorkbook {
    pub fn from_workbook(workbook: &Workbook, sheets: &SheetNames) -> Result<Self, MisError> {
        Ok(Self {
            client: workbook.table(&sheets.client_master, 0)?,
            scheme: workbook.table(&sheets.scheme_master, sheets.scheme_master_header_row)?,
            ambit_first: workbook.table(&sheets.ambit_first, 0)?,
            trnx_type: workbook.table(&sheets.trnx_type, 0)?,
            employee: workbook.table(&sheets.employee_mapping, 0)?,
            ntb: workbook.table(&sheets.ntb, 0)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Everything a run produces. Nothing is written until the caller decides to.
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub report: Report,
    pub master: Workbook,
    pub summary: RunSummary,
}

/// Reconcile the masters, classify and enrich the transactions, assemble both outputs.
pub fn run(config: &MisConfig, inputs: &RunInputs) -> Result<RunOutputs, MisError> {
    let sheets = &config.sheets;
    let master = MasterWorkbook::from_workbook(&inputs.master, sheets)?;

    let clients = reconcile_master(
        &inputs.reference_clients,
        &master.client,
        &config.client_master,
        normalize_client_code,
    )?;
    let schemes = reconcile_master(
        &inputs.reference_schemes,
        &master.scheme,
        &config.scheme_master,
        normalize_label,
    )?;

    // Transaction timestamps are reported by date.
    let transactions = &inputs.transactions.without_times();
    let fields = TransactionFields::resolve(transactions, &config.transactions)?;
    let rules = ClassificationRules::from_tables(&master.ambit_first, &master.trnx_type, &config.lookups)?;
    let classified = classify_transactions(transactions, &fields, &rules)?;

    // Joins read the reconciled masters, so newly added keys resolve.
    let enricher = Enricher::new(
        &schemes.table,
        &clients.table,
        &master.employee,
        &master.ntb,
        &config.lookups,
    )?;
    let enriched = enrich_transactions(&enricher, transactions, &fields, &classified)?;

    let report = assemble_report(transactions, &classified, &enriched, sheets)?;
    let updated_master = assemble_master(&inputs.master, &clients.table, &schemes.table, sheets);

    let summary = RunSummary {
        new_clients: clients.added(),
        new_schemes: schemes.added(),
        raw_rows: report.raw.len(),
        working_rows: report.working.len(),
        final_rows: report.final_view.len(),
    };
    info!(
        new_clients = summary.new_clients,
        new_schemes = summary.new_schemes,
        raw = summary.raw_rows,
        working = summary.working_rows,
        final_rows = summary.final_rows,
        "run complete"
    );

    Ok(RunOutputs {
        report,
        master: updated_master,
        summary,
    })
}
