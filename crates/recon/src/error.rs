use thiserror::Error;

#[derive(Debug, Error)]
pub enum MisError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty candidate list, blank sheet name, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// None of the candidate spellings matched a column of the table.
    #[error("table '{table}': missing column, tried {candidates:?}")]
    ColumnNotFound { table: String, candidates: Vec<String> },

    /// Required sheet absent from the master workbook.
    #[error("master workbook: missing sheet '{sheet}'")]
    MissingSheet { sheet: String },

    /// Sheet present but unusable (too few columns, header row out of range).
    #[error("sheet '{sheet}': {reason}")]
    MalformedSheet { sheet: String, reason: String },

    /// Classification changed the number of rows. Always a bug.
    #[error("row count invariant violated: expected {expected} rows, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    /// An input was supplied before the input it depends on.
    #[error("input '{supplied}' supplied before '{required}'")]
    StageOutOfOrder { supplied: &'static str, required: &'static str },

    /// Run requested with an input still missing.
    #[error("missing input: {0}")]
    MissingInput(&'static str),
}

impl MisError {
    pub fn column_not_found(table: &str, candidates: &[String]) -> Self {
        Self::ColumnNotFound {
            table: table.to_string(),
            candidates: candidates.to_vec(),
        }
    }
}
