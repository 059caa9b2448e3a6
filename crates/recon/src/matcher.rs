//! Column-name and key matching.
//!
//! Source spreadsheets spell the same field many ways ("WS Account Code",
//! "ws_account_code", "WSACCOUNTCODE"). Names are compared after lowercasing and
//! dropping every non-alphanumeric character; keys have their own normalizers.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::MisError;
use crate::model::{Table, Value};

/// Lowercase and strip every character that is not `[a-z0-9]`.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Normalized name → column index. Ties go to the first column in table order.
pub fn column_index_map(columns: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, col) in columns.iter().enumerate() {
        map.entry(normalize_column_name(col)).or_insert(idx);
    }
    map
}

/// Return the index of the first column matching one of `candidates`, trying
/// candidates in order.
pub fn resolve_column(table: &Table, candidates: &[String]) -> Result<usize, MisError> {
    match try_resolve_column(table, candidates) {
        Some(idx) => {
            debug!(table = %table.name, column = %table.columns[idx], "resolved column");
            Ok(idx)
        }
        None => Err(MisError::column_not_found(&table.name, candidates)),
    }
}

/// Optional variant of [`resolve_column`].
pub fn try_resolve_column(table: &Table, candidates: &[String]) -> Option<usize> {
    let index = column_index_map(&table.columns);
    candidates
        .iter()
        .find_map(|c| index.get(&normalize_column_name(c)).copied())
}

/// Resolve an optional attribute column, logging when it is absent.
pub fn resolve_optional(table: &Table, field: &str, candidates: &[String]) -> Option<usize> {
    let idx = try_resolve_column(table, candidates);
    if idx.is_none() {
        warn!(table = %table.name, field, ?candidates, "column not found, field left empty");
    }
    idx
}

// ---------------------------------------------------------------------------
// Key normalizers
// ---------------------------------------------------------------------------

/// Account / client code: trimmed with any trailing ".0" float artifact removed.
/// Case is preserved.
pub fn normalize_account_code(value: &Value) -> String {
    let text = value.as_text();
    let mut s = text.trim();
    while let Some(stripped) = s.strip_suffix(".0") {
        s = stripped.trim_end();
    }
    s.to_string()
}

/// CLIENTCODE key: account-code normalization, upper-cased.
pub fn normalize_client_code(value: &Value) -> String {
    normalize_account_code(value).to_uppercase()
}

/// SYMBOLID key and free-text join keys (security code, RM name, family group).
pub fn normalize_label(value: &Value) -> String {
    value.as_text().trim().to_uppercase()
}
