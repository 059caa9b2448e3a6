//! Transaction classification: exclusion tags, type normalization, amount derivation.
//!
//! Every input row yields exactly one [`ClassifiedRow`]; nothing is dropped here.
//! Filtering happens later, when the assembler builds the Working and Final views.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{info, warn};

use crate::config::{LookupColumns, TransactionColumns};
use crate::error::MisError;
use crate::matcher::{normalize_account_code, resolve_column, try_resolve_column};
use crate::model::{Table, Value};

/// Types booked as inflow ("Gross Sales").
pub const INFLOW_TYPES: [&str; 4] = ["Purchase", "AUM Trf In", "Switch In", "SIP"];

/// Types that count toward net sales.
pub const NET_SALES_TYPES: [&str; 8] = [
    "Purchase",
    "AUM Trf In",
    "Switch In",
    "SIP",
    "Redemption",
    "AUM Trf Out",
    "Switch Out",
    "SWP",
];

pub const AMBIT_FIRST: &str = "Ambit First";
pub const DELETE_FLAG: &str = "Delete";
const CRORE: f64 = 1e7;

// ---------------------------------------------------------------------------
// Del Tag
// ---------------------------------------------------------------------------

/// Exclusion label. A tagged row is left out of the Working view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelTag {
    Pan,
    Pms,
    Awpl,
    Afpl,
    Dummy,
    Cash,
    TdsAccount,
    MfApplication,
    IntAccPur,
}

impl DelTag {
    /// Evaluation order. The first rule that matches is the row's tag.
    pub const WATERFALL: [DelTag; 9] = [
        Self::Pan,
        Self::Pms,
        Self::Awpl,
        Self::Afpl,
        Self::Dummy,
        Self::Cash,
        Self::TdsAccount,
        Self::MfApplication,
        Self::IntAccPur,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Pan => "Del PAN",
            Self::Pms => "Del PMS",
            Self::Awpl => "Del AWPL",
            Self::Afpl => "Del AFPL",
            Self::Dummy => "Del Dummy",
            Self::Cash => "Del Cash",
            Self::TdsAccount => "Del TDSAccount",
            Self::MfApplication => "Del MFApplication",
            Self::IntAccPur => "Del INTACCPUR",
        }
    }

    fn matches(self, row: &RowFacts) -> bool {
        match self {
            Self::Pan => row.account_len == 10,
            // Ambit First accounts keep their PMS prefix rows.
            Self::Pms => {
                !row.ambit_first && {
                    let code = row.account_code.to_uppercase();
                    ["ND", "DS", "DM"].iter().any(|p| code.starts_with(p))
                }
            }
            Self::Awpl => row.client_name.contains("ambit wealth"),
            Self::Afpl => row.client_name.contains("ambit finvest private limited"),
            Self::Dummy => row.client_name.contains("dummy"),
            Self::Cash => row.security_code.contains("cash"),
            Self::TdsAccount => row.security_code.contains("tds"),
            Self::MfApplication => row.security_code.contains("mfapplication"),
            Self::IntAccPur => row.security_code.contains("intaccpur"),
        }
    }
}

impl fmt::Display for DelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-row inputs to the waterfall, lowercased where matching is case-insensitive.
struct RowFacts {
    account_len: usize,
    account_code: String,
    ambit_first: bool,
    client_name: String,
    security_code: String,
}

/// First matching tag in [`DelTag::WATERFALL`] order.
fn del_tag(row: &RowFacts) -> Option<DelTag> {
    DelTag::WATERFALL.into_iter().find(|tag| tag.matches(row))
}

// ---------------------------------------------------------------------------
// Sales classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesClass {
    GrossSales,
    Redemption,
}

impl SalesClass {
    /// `None` when the canonical type is empty.
    pub fn of(canonical_type: &str) -> Option<Self> {
        if canonical_type.is_empty() {
            None
        } else if INFLOW_TYPES.contains(&canonical_type) {
            Some(Self::GrossSales)
        } else {
            Some(Self::Redemption)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::GrossSales => "Gross Sales",
            Self::Redemption => "Redemption",
        }
    }
}

/// Transfer amount when numeric and above 1, otherwise the net amount.
pub fn revised_amount(transfer: &Value, net: &Value) -> Option<f64> {
    match transfer.as_number() {
        Some(t) if t > 1.0 => Some(t),
        _ => net.as_number(),
    }
}

/// Amount in crores, negative for redemptions. A missing amount counts as zero.
pub fn amount_in_crores(revised: Option<f64>, class: Option<SalesClass>) -> f64 {
    let crores = revised.unwrap_or(0.0) / CRORE;
    if crores == 0.0 {
        return 0.0;
    }
    match class {
        Some(SalesClass::Redemption) => -crores,
        _ => crores,
    }
}

// ---------------------------------------------------------------------------
// Rules from the master workbook
// ---------------------------------------------------------------------------

/// Lookup rules loaded from the Ambit First and Trnx Type Update sheets.
#[derive(Debug, Clone, Default)]
pub struct ClassificationRules {
    /// Normalized client codes of Ambit First accounts.
    pub ambit_first: HashSet<String>,
    /// Trimmed description → canonical type.
    pub replace: HashMap<String, String>,
    /// Trimmed descriptions flagged for deletion.
    pub delete: HashSet<String>,
}

impl ClassificationRules {
    pub fn from_tables(
        ambit_first: &Table,
        trnx_type: &Table,
        lookups: &LookupColumns,
    ) -> Result<Self, MisError> {
        let key_idx = resolve_column(ambit_first, &lookups.ambit_first_key)?;
        let ambit_first_codes: HashSet<String> = ambit_first
            .rows
            .iter()
            .map(|row| normalize_account_code(&row[key_idx]))
            .filter(|code| !code.is_empty())
            .collect();

        if trnx_type.columns.len() < 2 {
            return Err(MisError::MalformedSheet {
                sheet: trnx_type.name.clone(),
                reason: "expected description and replacement in the first two columns".into(),
            });
        }
        // Later rows win on duplicate descriptions.
        let mut replace = HashMap::new();
        for row in &trnx_type.rows {
            let from = row[0].as_text().trim().to_string();
            if !from.is_empty() {
                replace.insert(from, row[1].as_text().trim().to_string());
            }
        }

        let delete = match try_resolve_column(trnx_type, &lookups.trnx_type_delete) {
            Some(idx) => trnx_type
                .rows
                .iter()
                .map(|row| row[idx].as_text().trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
            None => {
                warn!(sheet = %trnx_type.name, "no delete column, no descriptions flagged");
                HashSet::new()
            }
        };

        Ok(Self {
            ambit_first: ambit_first_codes,
            replace,
            delete,
        })
    }

    /// Canonical type for a description. Unmapped descriptions give `""`.
    pub fn canonical_type(&self, description: &str, memo: &str) -> String {
        let description = description.trim();
        if memo.trim() == "Broker Change" && description == "InFlow" {
            return "AUM Trf In".to_string();
        }
        self.replace.get(description).cloned().unwrap_or_default()
    }

    pub fn is_deleted(&self, description: &str) -> bool {
        self.delete.contains(description.trim())
    }

    pub fn is_ambit_first(&self, account: &Value) -> bool {
        self.ambit_first.contains(&normalize_account_code(account))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Column indices of the transaction fields the classifier reads.
#[derive(Debug, Clone, Copy)]
pub struct TransactionFields {
    pub account_code: usize,
    pub security_code: usize,
    pub transfer_amount: usize,
    pub net_amount: usize,
    pub description: usize,
    pub memo: usize,
    pub client_name: usize,
}

impl TransactionFields {
    pub fn resolve(table: &Table, columns: &TransactionColumns) -> Result<Self, MisError> {
        Ok(Self {
            account_code: resolve_column(table, &columns.account_code)?,
            security_code: resolve_column(table, &columns.security_code)?,
            transfer_amount: resolve_column(table, &columns.transfer_amount)?,
            net_amount: resolve_column(table, &columns.net_amount)?,
            description: resolve_column(table, &columns.description)?,
            memo: resolve_column(table, &columns.memo)?,
            client_name: resolve_column(table, &columns.client_name)?,
        })
    }
}

/// Derived fields for one transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub length: usize,
    pub del_tag: Option<DelTag>,
    pub ambit_first: bool,
    pub revised_amount: Option<f64>,
    /// Canonical type, written to both "Consider" and "Trans Type 2".
    pub consider: String,
    pub delete: bool,
    pub sales: Option<SalesClass>,
    pub net_sales: bool,
    pub amount_crores: f64,
}

/// Header names of [`ClassifiedRow::cells`], in order.
pub const CLASSIFIED_COLUMNS: [&str; 10] = [
    "Length",
    "Del Tag",
    "Ambit First",
    "Revised Trnx Amount",
    "Consider",
    "Trans Type 2",
    "Delete",
    "Gross Sales",
    "Net Sales",
    "Amt in Crs",
];

impl ClassifiedRow {
    pub fn cells(&self) -> Vec<Value> {
        vec![
            Value::Number(self.length as f64),
            Value::text(self.del_tag.map(DelTag::label).unwrap_or_default()),
            Value::text(if self.ambit_first { AMBIT_FIRST } else { "" }),
            self.revised_amount.map(Value::Number).unwrap_or(Value::Empty),
            Value::text(self.consider.as_str()),
            Value::text(self.consider.as_str()),
            Value::text(if self.delete { DELETE_FLAG } else { "" }),
            Value::text(self.sales.map(SalesClass::label).unwrap_or_default()),
            Value::text(if self.net_sales { "Net Sales" } else { "0" }),
            Value::Number(self.amount_crores),
        ]
    }

    /// Survives the exclusion waterfall.
    pub fn is_working(&self) -> bool {
        self.del_tag.is_none()
    }

    /// Working, typed and not flagged for deletion.
    pub fn is_final(&self) -> bool {
        self.is_working() && !self.consider.is_empty() && !self.delete
    }
}

/// Classify a single row. The Ambit First flag is settled before the waterfall runs.
pub fn classify_row(
    table: &Table,
    row: usize,
    fields: &TransactionFields,
    rules: &ClassificationRules,
) -> ClassifiedRow {
    let account = table.cell(row, fields.account_code);
    let ambit_first = rules.is_ambit_first(account);

    let facts = RowFacts {
        account_len: account.as_text().chars().count(),
        account_code: normalize_account_code(account),
        ambit_first,
        client_name: table.cell(row, fields.client_name).as_text().to_lowercase(),
        security_code: table.cell(row, fields.security_code).as_text().to_lowercase(),
    };

    let description = table.cell(row, fields.description).as_text();
    let memo = table.cell(row, fields.memo).as_text();
    let consider = rules.canonical_type(&description, &memo);
    let sales = SalesClass::of(&consider);
    let revised = revised_amount(
        table.cell(row, fields.transfer_amount),
        table.cell(row, fields.net_amount),
    );

    ClassifiedRow {
        length: facts.account_len,
        del_tag: del_tag(&facts),
        ambit_first,
        revised_amount: revised,
        net_sales: NET_SALES_TYPES.contains(&consider.as_str()),
        delete: rules.is_deleted(&description),
        amount_crores: amount_in_crores(revised, sales),
        sales,
        consider,
    }
}

/// Classify every transaction row. The output has exactly one entry per input row.
pub fn classify_transactions(
    table: &Table,
    fields: &TransactionFields,
    rules: &ClassificationRules,
) -> Result<Vec<ClassifiedRow>, MisError> {
    let classified: Vec<ClassifiedRow> = (0..table.len())
        .map(|row| classify_row(table, row, fields, rules))
        .collect();
    ensure_row_count(table.len(), classified.len())?;

    let tagged = classified.iter().filter(|c| c.del_tag.is_some()).count();
    let ambit_first = classified.iter().filter(|c| c.ambit_first).count();
    info!(rows = classified.len(), tagged, ambit_first, "transactions classified");
    Ok(classified)
}

pub fn ensure_row_count(expected: usize, actual: usize) -> Result<(), MisError> {
    if expected != actual {
        return Err(MisError::RowCountMismatch { expected, actual });
    }
    Ok(())
}
