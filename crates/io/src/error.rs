use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// File missing, unreadable or not a recognised spreadsheet.
    #[error("cannot open {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("{}: cannot read sheet '{sheet}': {reason}", .path.display())]
    ReadSheet {
        path: PathBuf,
        sheet: String,
        reason: String,
    },

    #[error("{} contains no sheets", .path.display())]
    EmptyWorkbook { path: PathBuf },

    #[error("cannot write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

impl IoError {
    pub(crate) fn open(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
