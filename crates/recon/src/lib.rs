//! `txnmis-recon`: transaction MIS reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded workbooks and tables, returns the updated
//! master and the classified transaction report. No CLI or IO dependencies.

pub mod assemble;
pub mod classify;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod master;
pub mod matcher;
pub mod model;

pub use config::MisConfig;
pub use engine::{run, MasterWorkbook, RunInputs, RunOutputs, StagedInputs};
pub use error::MisError;
pub use model::{RunSummary, Sheet, Table, Value, Workbook};
