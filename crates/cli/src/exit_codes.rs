//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | General error (unspecified)                           |
//! | 2    | CLI usage error (bad args, conflicting output paths)  |
//! | 3    | Config file unreadable or invalid                     |
//! | 4    | Input workbook unreadable or missing a sheet          |
//! | 5    | Pipeline error (unresolvable column, row count)       |
//! | 6    | Output could not be written                           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `mis_exit_code` or the command's error handling

use txnmis_recon::MisError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file cannot be read, parsed or validated.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// An input file cannot be opened or lacks a required sheet.
pub const EXIT_INPUT_READ: u8 = 4;

/// The reconciliation pipeline aborted.
pub const EXIT_PIPELINE: u8 = 5;

/// An output workbook cannot be written.
pub const EXIT_WRITE: u8 = 6;

/// Map an engine error to its exit code.
pub fn mis_exit_code(err: &MisError) -> u8 {
    match err {
        MisError::ConfigParse(_) | MisError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        MisError::MissingSheet { .. } | MisError::MalformedSheet { .. } => EXIT_INPUT_READ,
        MisError::StageOutOfOrder { .. } | MisError::MissingInput(_) => EXIT_USAGE,
        MisError::ColumnNotFound { .. } | MisError::RowCountMismatch { .. } => EXIT_PIPELINE,
    }
}

/// Hint printed under an engine error, when one helps.
pub fn mis_hint(err: &MisError) -> Option<&'static str> {
    match err {
        MisError::ColumnNotFound { .. } => {
            Some("add the column's spelling to the candidate list in the --config file")
        }
        MisError::MissingSheet { .. } => Some("sheet names are configurable under [sheets] in the --config file"),
        MisError::RowCountMismatch { .. } => Some("this is a bug; please report it with the input files"),
        _ => None,
    }
}
