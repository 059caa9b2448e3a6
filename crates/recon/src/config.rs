use serde::Deserialize;

use crate::error::MisError;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every section is optional; the defaults reproduce the
/// layout of the production master workbook and transaction extract.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MisConfig {
    pub sheets: SheetNames,
    pub transactions: TransactionColumns,
    pub client_master: MasterMapping,
    pub scheme_master: MasterMapping,
    pub lookups: LookupColumns,
    pub output: OutputConfig,
}

impl Default for MisConfig {
    fn default() -> Self {
        Self {
            sheets: SheetNames::default(),
            transactions: TransactionColumns::default(),
            client_master: MasterMapping::client(),
            scheme_master: MasterMapping::scheme(),
            lookups: LookupColumns::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetNames {
    pub client_master: String,
    pub scheme_master: String,
    /// Zero-based header row of the scheme master. The row above it is a title row.
    pub scheme_master_header_row: usize,
    pub ambit_first: String,
    pub trnx_type: String,
    pub employee_mapping: String,
    pub ntb: String,
    pub raw_dump: String,
    pub working: String,
    pub final_view: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            client_master: "Client Master".into(),
            scheme_master: "Scheme Master".into(),
            scheme_master_header_row: 1,
            ambit_first: "Ambit First".into(),
            trnx_type: "Trnx Type Update".into(),
            employee_mapping: "Employee Mapping Master".into(),
            ntb: "NTB Data".into(),
            raw_dump: "Raw Dump".into(),
            working: "Working".into(),
            final_view: "Final".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction extract columns
// ---------------------------------------------------------------------------

/// Candidate spellings for each transaction field, tried in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionColumns {
    pub account_code: Vec<String>,
    pub security_code: Vec<String>,
    pub transfer_amount: Vec<String>,
    pub net_amount: Vec<String>,
    pub description: Vec<String>,
    pub memo: Vec<String>,
    pub client_name: Vec<String>,
}

impl Default for TransactionColumns {
    fn default() -> Self {
        Self {
            account_code: names(&["ws account code", "account code"]),
            security_code: names(&["security code"]),
            transfer_amount: names(&["trfamt", "transfer amount"]),
            net_amount: names(&["net amount", "amount"]),
            description: names(&["tran desc", "transaction description"]),
            memo: names(&["memo", "memo text"]),
            client_name: names(&["client name"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Master reconciliation
// ---------------------------------------------------------------------------

/// A target field and the reference-column spellings that feed it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    pub target: String,
    pub candidates: Vec<String>,
}

impl FieldMapping {
    pub fn new(target: &str, candidates: &[&str]) -> Self {
        Self {
            target: target.to_string(),
            candidates: names(candidates),
        }
    }
}

/// How reference rows are extracted and appended to one master sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasterMapping {
    /// Target name of the key field. Must be one of `fields`.
    pub key: String,
    pub fields: Vec<FieldMapping>,
    /// Blank analyst columns stamped onto every appended row.
    #[serde(default)]
    pub stamp: Vec<String>,
}

impl MasterMapping {
    pub fn client() -> Self {
        let fields = [
            "CLIENTID",
            "CLIENTNAME",
            "CLIENTCODE",
            "PANNUMBER",
            "GROUPNAME",
            "RELMGRNAME",
            "BILLGROUP",
        ]
        .iter()
        .map(|f| FieldMapping::new(f, &[*f]))
        .collect();
        Self {
            key: "CLIENTCODE".into(),
            fields,
            stamp: Vec::new(),
        }
    }

    pub fn scheme() -> Self {
        Self {
            key: "SYMBOLID".into(),
            fields: vec![
                FieldMapping::new("SYMBOLID", &["SYMBOLID"]),
                FieldMapping::new("Scheme name", &["SYMBOLNAME"]),
                FieldMapping::new("ISIN", &["ISINCODE"]),
                FieldMapping::new("Symbolcode5", &["REFSYMBOL5"]),
                FieldMapping::new("DIMNAME15 Old", &["DIMNAME15"]),
                FieldMapping::new("ASTCLSNAME", &["ASTCLSNAME"]),
                FieldMapping::new("DIMNAME13", &["DIMNAME13"]),
            ],
            stamp: names(&["New Product", "New Asset-class", "New Manufacturer"]),
        }
    }

    pub fn key_field(&self) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.target == self.key)
    }
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupColumns {
    /// Client-code column of the Ambit First sheet.
    pub ambit_first_key: Vec<String>,
    /// Delete column of the Trnx Type Update sheet.
    pub trnx_type_delete: Vec<String>,
    pub scheme: SchemeLookup,
    pub client: ClientLookup,
    pub employee: EmployeeLookup,
    pub ntb: NtbLookup,
}

impl Default for LookupColumns {
    fn default() -> Self {
        Self {
            ambit_first_key: names(&["clientcode", "client code"]),
            trnx_type_delete: names(&["delete", "delete flag", "del flag", "del"]),
            scheme: SchemeLookup::default(),
            client: ClientLookup::default(),
            employee: EmployeeLookup::default(),
            ntb: NtbLookup::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemeLookup {
    pub key: Vec<String>,
    pub product: Vec<String>,
    pub asset_class: Vec<String>,
    pub category: Vec<String>,
    pub manufacturer: Vec<String>,
    pub scheme_name: Vec<String>,
    pub isin: Vec<String>,
}

impl Default for SchemeLookup {
    fn default() -> Self {
        Self {
            key: names(&["SYMBOLID"]),
            product: names(&["New Product", "Product"]),
            asset_class: names(&["New Asset-class", "Asset Class", "ASTCLSNAME"]),
            category: names(&["Category", "DIMNAME13"]),
            manufacturer: names(&["New Manufacturer", "Manufacturer", "DIMNAME15 Old"]),
            scheme_name: names(&["Scheme name", "SYMBOLNAME"]),
            isin: names(&["ISIN", "ISINCODE"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientLookup {
    pub key: Vec<String>,
    pub family_group: Vec<String>,
    pub pan: Vec<String>,
    pub rm_name: Vec<String>,
}

impl Default for ClientLookup {
    fn default() -> Self {
        Self {
            key: names(&["CLIENTCODE"]),
            family_group: names(&["GROUPNAME", "Family Group"]),
            pan: names(&["PANNUMBER", "PAN"]),
            rm_name: names(&["RELMGRNAME", "RM Name"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmployeeLookup {
    pub key: Vec<String>,
    pub banker_name: Vec<String>,
    pub banker_group: Vec<String>,
    pub banker_tag: Vec<String>,
}

impl Default for EmployeeLookup {
    fn default() -> Self {
        Self {
            key: names(&["RM Name", "RELMGRNAME", "Relationship Manager"]),
            banker_name: names(&["Banker Name", "Banker"]),
            banker_group: names(&["Banker Group", "Group"]),
            banker_tag: names(&["Banker Tag", "Tag"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NtbLookup {
    pub key: Vec<String>,
    pub month: Vec<String>,
    pub fy: Vec<String>,
}

impl Default for NtbLookup {
    fn default() -> Self {
        Self {
            key: names(&["Family Group", "Group Name", "GROUPNAME"]),
            month: names(&["NTB Month", "Month"]),
            fy: names(&["NTB FY", "FY", "Financial Year"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub report_file: String,
    pub master_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_file: "Transaction_MIS.xlsx".into(),
            master_file: "Updated_Master.xlsx".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MisConfig {
    pub fn from_toml(input: &str) -> Result<Self, MisError> {
        let config: MisConfig =
            toml::from_str(input).map_err(|e| MisError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MisError> {
        let s = &self.sheets;
        for (label, name) in [
            ("sheets.client_master", &s.client_master),
            ("sheets.scheme_master", &s.scheme_master),
            ("sheets.ambit_first", &s.ambit_first),
            ("sheets.trnx_type", &s.trnx_type),
            ("sheets.employee_mapping", &s.employee_mapping),
            ("sheets.ntb", &s.ntb),
            ("sheets.raw_dump", &s.raw_dump),
            ("sheets.working", &s.working),
            ("sheets.final_view", &s.final_view),
            ("output.report_file", &self.output.report_file),
            ("output.master_file", &self.output.master_file),
        ] {
            if name.trim().is_empty() {
                return Err(MisError::ConfigValidation(format!("{label} must not be empty")));
            }
        }
        if s.client_master == s.scheme_master {
            return Err(MisError::ConfigValidation(
                "client and scheme master must be different sheets".into(),
            ));
        }

        let t = &self.transactions;
        let l = &self.lookups;
        for (label, list) in [
            ("transactions.account_code", &t.account_code),
            ("transactions.security_code", &t.security_code),
            ("transactions.transfer_amount", &t.transfer_amount),
            ("transactions.net_amount", &t.net_amount),
            ("transactions.description", &t.description),
            ("transactions.memo", &t.memo),
            ("transactions.client_name", &t.client_name),
            ("lookups.ambit_first_key", &l.ambit_first_key),
            ("lookups.trnx_type_delete", &l.trnx_type_delete),
            ("lookups.scheme.key", &l.scheme.key),
            ("lookups.client.key", &l.client.key),
            ("lookups.employee.key", &l.employee.key),
            ("lookups.ntb.key", &l.ntb.key),
        ] {
            check_candidates(label, list)?;
        }

        for (label, mapping) in [
            ("client_master", &self.client_master),
            ("scheme_master", &self.scheme_master),
        ] {
            if mapping.key_field().is_none() {
                return Err(MisError::ConfigValidation(format!(
                    "{label}: key '{}' is not one of the mapped fields",
                    mapping.key
                )));
            }
            for field in &mapping.fields {
                check_candidates(&format!("{label}.{}", field.target), &field.candidates)?;
            }
        }

        Ok(())
    }
}

fn check_candidates(label: &str, list: &[String]) -> Result<(), MisError> {
    if list.iter().all(|c| c.trim().is_empty()) {
        return Err(MisError::ConfigValidation(format!(
            "{label}: at least one column name is required"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
