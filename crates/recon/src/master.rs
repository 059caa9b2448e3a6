//! Master augmentation: append reference records whose key the master lacks.

use std::collections::HashSet;

use tracing::info;

use crate::config::MasterMapping;
use crate::error::MisError;
use crate::matcher::{column_index_map, normalize_column_name, resolve_column, try_resolve_column};
use crate::model::{Table, Value};

/// Normalizes a key cell so both sides of the set difference compare equal.
pub type KeyNormalizer = fn(&Value) -> String;

/// Result of reconciling one master sheet.
#[derive(Debug, Clone)]
pub struct MasterUpdate {
    pub table: Table,
    /// Normalized keys appended, in reference order.
    pub added_keys: Vec<String>,
}

impl MasterUpdate {
    pub fn added(&self) -> usize {
        self.added_keys.len()
    }
}

/// Append to `master` every reference record whose normalized key is absent.
///
/// Existing master rows are untouched. Appended rows follow reference order, take the
/// master's column layout, and carry `""` in every master column the reference does
/// not supply. Reference fields with no master column are dropped.
pub fn reconcile_master(
    reference: &Table,
    master: &Table,
    mapping: &MasterMapping,
    normalize_key: KeyNormalizer,
) -> Result<MasterUpdate, MisError> {
    let key_field = mapping.key_field().ok_or_else(|| {
        MisError::ConfigValidation(format!("key '{}' is not one of the mapped fields", mapping.key))
    })?;
    let ref_key_idx = resolve_column(reference, &key_field.candidates)?;
    let master_key_idx = resolve_column(master, std::slice::from_ref(&mapping.key))?;

    // Reference fields actually present, in mapping order.
    let extracted: Vec<(&str, usize)> = mapping
        .fields
        .iter()
        .filter_map(|f| try_resolve_column(reference, &f.candidates).map(|idx| (f.target.as_str(), idx)))
        .collect();

    let master_keys: HashSet<String> = (0..master.len())
        .map(|row| normalize_key(master.cell(row, master_key_idx)))
        .collect();
    let master_columns = column_index_map(&master.columns);

    let mut table = master.clone();
    let mut added_keys = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for row in 0..reference.len() {
        let key = normalize_key(reference.cell(row, ref_key_idx));
        if key.is_empty() || master_keys.contains(&key) || !seen.insert(key.clone()) {
            continue;
        }

        let mut record: Vec<(&str, Value)> = extracted
            .iter()
            .map(|&(target, idx)| {
                let value = match reference.cell(row, idx) {
                    Value::Empty => Value::blank(),
                    other => other.clone(),
                };
                (target, value)
            })
            .collect();
        record.extend(mapping.stamp.iter().map(|s| (s.as_str(), Value::blank())));

        let mut aligned = vec![Value::blank(); master.columns.len()];
        for (name, value) in record {
            if let Some(&idx) = master_columns.get(&normalize_column_name(name)) {
                aligned[idx] = value;
            }
        }
        table.push_row(aligned);
        added_keys.push(key);
    }

    info!(
        master = %master.name,
        existing = master.len(),
        added = added_keys.len(),
        "master reconciled"
    );

    Ok(MasterUpdate { table, added_keys })
}
