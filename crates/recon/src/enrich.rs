//! Enrichment joins layered on top of classified transactions.
//!
//! Four many-to-one left joins: scheme master by security code, client master by
//! account code, employee mapping by RM name, NTB data by family group. Each lookup
//! is keyed uniquely before joining, so a join can never add rows. A miss leaves the
//! fields empty.

use std::collections::HashMap;

use tracing::info;

use crate::classify::{ensure_row_count, ClassifiedRow, TransactionFields};
use crate::config::LookupColumns;
use crate::error::MisError;
use crate::master::KeyNormalizer;
use crate::matcher::{normalize_client_code, normalize_label, resolve_column, resolve_optional};
use crate::model::{Table, Value};

/// Which row wins when a lookup key repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
}

/// A lookup table reduced to one row of attribute values per normalized key.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    rows: HashMap<String, Vec<Value>>,
}

impl Lookup {
    /// `fields` are attribute column indices; `None` yields an always-empty field.
    pub fn build(
        table: &Table,
        key_idx: usize,
        fields: &[Option<usize>],
        normalize: KeyNormalizer,
        keep: Keep,
    ) -> Self {
        let mut rows = HashMap::new();
        for row in 0..table.len() {
            let key = normalize(table.cell(row, key_idx));
            if key.is_empty() || (keep == Keep::First && rows.contains_key(&key)) {
                continue;
            }
            let values = fields
                .iter()
                .map(|f| f.map(|idx| table.cell(row, idx).clone()).unwrap_or(Value::Empty))
                .collect();
            rows.insert(key, values);
        }
        Self { rows }
    }

    pub fn get(&self, key: &str) -> Option<&[Value]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Enrichment fields appended to each transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub product: Value,
    pub asset_class: Value,
    pub category: Value,
    pub manufacturer: Value,
    pub scheme_name: Value,
    pub isin: Value,
    pub family_group: Value,
    pub pan: Value,
    pub rm_name: Value,
    pub banker_name: Value,
    pub banker_group: Value,
    pub banker_tag: Value,
    pub ntb_month: Value,
    pub ntb_fy: Value,
}

/// Header names of [`Enrichment::cells`], in order.
pub const ENRICHED_COLUMNS: [&str; 14] = [
    "Product",
    "Asset Class",
    "Category",
    "Manufacturer",
    "Scheme Name",
    "ISIN",
    "Family Group",
    "PAN",
    "RM Name",
    "Banker Name",
    "Banker Group",
    "Banker Tag",
    "NTB Month",
    "NTB FY",
];

/// Fixed product classification for Ambit First accounts.
pub const AMBIT_FIRST_PRODUCT: [&str; 4] = ["GPC - PMS", "Other NDPMS", "Equity PMS", "GPC - Ambit First"];

impl Enrichment {
    pub fn cells(&self) -> Vec<Value> {
        vec![
            self.product.clone(),
            self.asset_class.clone(),
            self.category.clone(),
            self.manufacturer.clone(),
            self.scheme_name.clone(),
            self.isin.clone(),
            self.family_group.clone(),
            self.pan.clone(),
            self.rm_name.clone(),
            self.banker_name.clone(),
            self.banker_group.clone(),
            self.banker_tag.clone(),
            self.ntb_month.clone(),
            self.ntb_fy.clone(),
        ]
    }
}

/// Lookup sources for the enrichment joins.
#[derive(Debug, Clone)]
pub struct Enricher {
    scheme: Lookup,
    client: Lookup,
    employee: Lookup,
    ntb: Lookup,
}

impl Enricher {
    /// Index the reconciled masters and auxiliary sheets. Join keys are required;
    /// attribute columns are optional.
    pub fn new(
        scheme_master: &Table,
        client_master: &Table,
        employee: &Table,
        ntb: &Table,
        lookups: &LookupColumns,
    ) -> Result<Self, MisError> {
        let s = &lookups.scheme;
        let scheme = Lookup::build(
            scheme_master,
            resolve_column(scheme_master, &s.key)?,
            &[
                resolve_optional(scheme_master, "product", &s.product),
                resolve_optional(scheme_master, "asset_class", &s.asset_class),
                resolve_optional(scheme_master, "category", &s.category),
                resolve_optional(scheme_master, "manufacturer", &s.manufacturer),
                resolve_optional(scheme_master, "scheme_name", &s.scheme_name),
                resolve_optional(scheme_master, "isin", &s.isin),
            ],
            normalize_label,
            Keep::First,
        );

        let c = &lookups.client;
        let client = Lookup::build(
            client_master,
            resolve_column(client_master, &c.key)?,
            &[
                resolve_optional(client_master, "family_group", &c.family_group),
                resolve_optional(client_master, "pan", &c.pan),
                resolve_optional(client_master, "rm_name", &c.rm_name),
            ],
            normalize_client_code,
            Keep::Last,
        );

        let e = &lookups.employee;
        let employee_lookup = Lookup::build(
            employee,
            resolve_column(employee, &e.key)?,
            &[
                resolve_optional(employee, "banker_name", &e.banker_name),
                resolve_optional(employee, "banker_group", &e.banker_group),
                resolve_optional(employee, "banker_tag", &e.banker_tag),
            ],
            normalize_label,
            Keep::First,
        );

        let n = &lookups.ntb;
        let ntb_lookup = Lookup::build(
            ntb,
            resolve_column(ntb, &n.key)?,
            &[
                resolve_optional(ntb, "month", &n.month),
                resolve_optional(ntb, "fy", &n.fy),
            ],
            normalize_label,
            Keep::First,
        );

        Ok(Self {
            scheme,
            client,
            employee: employee_lookup,
            ntb: ntb_lookup,
        })
    }

    pub fn enrich_row(
        &self,
        transactions: &Table,
        row: usize,
        fields: &TransactionFields,
        classified: &ClassifiedRow,
    ) -> Enrichment {
        let mut out = Enrichment::default();

        let security = normalize_label(transactions.cell(row, fields.security_code));
        if let Some(v) = self.scheme.get(&security) {
            out.product = v[0].clone();
            out.asset_class = v[1].clone();
            out.category = v[2].clone();
            out.manufacturer = v[3].clone();
            out.scheme_name = v[4].clone();
            out.isin = v[5].clone();
        }
        if classified.ambit_first {
            let [product, asset_class, category, manufacturer] = AMBIT_FIRST_PRODUCT;
            out.product = Value::text(product);
            out.asset_class = Value::text(asset_class);
            out.category = Value::text(category);
            out.manufacturer = Value::text(manufacturer);
        }

        let account = normalize_client_code(transactions.cell(row, fields.account_code));
        if let Some(v) = self.client.get(&account) {
            out.family_group = v[0].clone();
            out.pan = v[1].clone();
            out.rm_name = v[2].clone();
        }

        if let Some(v) = self.employee.get(&normalize_label(&out.rm_name)) {
            out.banker_name = v[0].clone();
            out.banker_group = v[1].clone();
            out.banker_tag = v[2].clone();
        }

        if let Some(v) = self.ntb.get(&normalize_label(&out.family_group)) {
            out.ntb_month = v[0].clone();
            out.ntb_fy = v[1].clone();
        }

        out
    }
}

/// Enrich every classified transaction. One output per input row.
pub fn enrich_transactions(
    enricher: &Enricher,
    transactions: &Table,
    fields: &TransactionFields,
    classified: &[ClassifiedRow],
) -> Result<Vec<Enrichment>, MisError> {
    ensure_row_count(transactions.len(), classified.len())?;
    let enriched: Vec<Enrichment> = classified
        .iter()
        .enumerate()
        .map(|(row, c)| enricher.enrich_row(transactions, row, fields, c))
        .collect();
    ensure_row_count(transactions.len(), enriched.len())?;

    let scheme_hits = enriched.iter().filter(|e| !e.scheme_name.is_blank()).count();
    let client_hits = enriched.iter().filter(|e| !e.family_group.is_blank()).count();
    info!(rows = enriched.len(), scheme_hits, client_hits, "transactions enriched");
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_transactions, ClassificationRules};
    use crate::config::TransactionColumns;

    fn t(s: &str) -> Value {
        Value::text(s)
    }

    fn table(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        let mut table = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    fn scheme_master() -> Table {
        table(
            "Scheme Master",
            &["SYMBOLID", "Scheme name", "ISIN", "New Product", "New Asset-class", "Category", "New Manufacturer"],
            vec![
                vec![t("INF001"), t("Alpha Bluechip"), t("INE001"), t("MF"), t("Equity"), t("Large Cap"), t("Alpha AMC")],
                vec![t("inf001 "), t("Shadow"), t("X"), t("X"), t("X"), t("X"), t("X")],
            ],
        )
    }

    fn client_master() -> Table {
        table(
            "Client Master",
            &["CLIENTCODE", "GROUPNAME", "PANNUMBER", "RELMGRNAME"],
            vec![
                vec![t("C001"), t("Rao Family (old)"), t("AAAPA0000A"), t("Old RM")],
                vec![t("c001.0"), t("Rao Family"), t("AAAPA1234A"), t("Neha Iyer")],
                vec![t("ND900"), t("Mehta Group"), t("BBBPB1234B"), t("")],
            ],
        )
    }

    fn employee() -> Table {
        table(
            "Employee Mapping Master",
            &["RM Name", "Banker Name", "Banker Group", "Banker Tag"],
            vec![
                vec![t("NEHA IYER"), t("Neha I."), t("West-1"), t("Senior")],
                vec![t("neha iyer"), t("dup"), t("dup"), t("dup")],
            ],
        )
    }

    fn ntb() -> Table {
        table(
            "NTB Data",
            &["Family Group", "NTB Month", "NTB FY"],
            vec![vec![t("rao family"), t("Apr-25"), t("FY26")]],
        )
    }

    fn transactions() -> Table {
        table(
            "Transactions",
            &["WS Account Code", "Security Code", "TRFAMT", "Net Amount", "Tran Desc", "Memo", "Client Name"],
            vec![
                vec![t("C001"), t("INF001"), Value::Empty, Value::Number(100.0), t("Purchase"), t(""), t("Asha Rao")],
                vec![t("ND900.0"), t("INF001"), Value::Empty, Value::Number(100.0), t("Purchase"), t(""), t("Mehta")],
                vec![t("C777"), t("UNKNOWN"), Value::Empty, Value::Number(100.0), t("Purchase"), t(""), t("New")],
            ],
        )
    }

    fn run() -> Vec<Enrichment> {
        let txns = transactions();
        let fields = TransactionFields::resolve(&txns, &TransactionColumns::default()).unwrap();
        let rules = ClassificationRules {
            ambit_first: ["ND900".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let classified = classify_transactions(&txns, &fields, &rules).unwrap();
        let enricher = Enricher::new(
            &scheme_master(),
            &client_master(),
            &employee(),
            &ntb(),
            &LookupColumns::default(),
        )
        .unwrap();
        enrich_transactions(&enricher, &txns, &fields, &classified).unwrap()
    }

    #[test]
    fn full_chain_for_matched_row() {
        let rows = run();
        let e = &rows[0];
        assert_eq!(e.product, t("MF"));
        assert_eq!(e.asset_class, t("Equity"));
        assert_eq!(e.category, t("Large Cap"));
        assert_eq!(e.manufacturer, t("Alpha AMC"));
        assert_eq!(e.scheme_name, t("Alpha Bluechip"));
        assert_eq!(e.isin, t("INE001"));
        // client lookup keeps the last row per code
        assert_eq!(e.family_group, t("Rao Family"));
        assert_eq!(e.pan, t("AAAPA1234A"));
        assert_eq!(e.rm_name, t("Neha Iyer"));
        // employee lookup keeps the first row per RM
        assert_eq!(e.banker_name, t("Neha I."));
        assert_eq!(e.banker_tag, t("Senior"));
        assert_eq!(e.ntb_month, t("Apr-25"));
        assert_eq!(e.ntb_fy, t("FY26"));
    }

    #[test]
    fn ambit_first_product_is_forced() {
        let e = &run()[1];
        assert_eq!(e.product, t("GPC - PMS"));
        assert_eq!(e.asset_class, t("Other NDPMS"));
        assert_eq!(e.category, t("Equity PMS"));
        assert_eq!(e.manufacturer, t("GPC - Ambit First"));
        assert_eq!(e.scheme_name, t("Alpha Bluechip"));
        assert_eq!(e.family_group, t("Mehta Group"));
        assert_eq!(e.banker_name, Value::Empty);
    }

    #[test]
    fn unmatched_row_is_empty_not_an_error() {
        let rows = run();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], Enrichment::default());
        assert_eq!(rows[2].cells().len(), ENRICHED_COLUMNS.len());
    }

    #[test]
    fn missing_attribute_column_leaves_field_empty() {
        let scheme = table("Scheme Master", &["SYMBOLID", "ISIN"], vec![vec![t("S1"), t("INE9")]]);
        let lookup_cols = LookupColumns::default();
        let s = &lookup_cols.scheme;
        let lookup = Lookup::build(
            &scheme,
            0,
            &[resolve_optional(&scheme, "product", &s.product), resolve_optional(&scheme, "isin", &s.isin)],
            normalize_label,
            Keep::First,
        );
        assert_eq!(lookup.get("S1").unwrap(), &[Value::Empty, t("INE9")]);
    }

    #[test]
    fn missing_join_key_aborts() {
        let bad_ntb = table("NTB Data", &["Month"], vec![]);
        let err = Enricher::new(&scheme_master(), &client_master(), &employee(), &bad_ntb, &LookupColumns::default())
            .unwrap_err();
        assert!(matches!(err, MisError::ColumnNotFound { ref table, .. } if table == "NTB Data"));
    }
}
