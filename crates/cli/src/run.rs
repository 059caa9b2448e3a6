//! `txnmis run` and `txnmis validate`.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tracing::{info, warn};
use txnmis_io::{read_workbook, write_workbook, IoError};
use txnmis_recon::{MisConfig, MisError, RunSummary, StagedInputs, Table, Workbook};

use crate::exit_codes::{mis_exit_code, mis_hint, EXIT_INPUT_READ, EXIT_INVALID_CONFIG, EXIT_USAGE, EXIT_WRITE};
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Transaction extract (first sheet is read)
    #[arg(long, short = 't')]
    pub transactions: PathBuf,

    /// Reference client list (first sheet is read)
    #[arg(long, short = 'c')]
    pub clients: PathBuf,

    /// Reference scheme list (first sheet is read)
    #[arg(long, short = 's')]
    pub schemes: PathBuf,

    /// Master workbook with the Client Master, Scheme Master and lookup sheets
    #[arg(long, short = 'm')]
    pub master: PathBuf,

    /// Directory for the report and the updated master
    #[arg(long, short = 'o', default_value = ".")]
    pub out_dir: PathBuf,

    /// TOML config overriding sheet names, column candidates and output names
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl From<MisError> for CliError {
    fn from(err: MisError) -> Self {
        let error = CliError {
            code: mis_exit_code(&err),
            message: err.to_string(),
            hint: None,
        };
        match mis_hint(&err) {
            Some(hint) => error.with_hint(hint),
            None => error,
        }
    }
}

fn read_err(err: IoError) -> CliError {
    CliError {
        code: EXIT_INPUT_READ,
        message: err.to_string(),
        hint: None,
    }
}

fn write_err(err: IoError) -> CliError {
    CliError {
        code: EXIT_WRITE,
        message: err.to_string(),
        hint: None,
    }
}

fn config_err(msg: impl Into<String>) -> CliError {
    CliError {
        code: EXIT_INVALID_CONFIG,
        message: msg.into(),
        hint: None,
    }
}

/// Load the config file, or the built-in defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<MisConfig, CliError> {
    let Some(path) = path else {
        return Ok(MisConfig::default());
    };
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| config_err(format!("cannot read config {}: {e}", path.display())))?;
    MisConfig::from_toml(&config_str).map_err(|e| config_err(e.to_string()))
}

fn read_first_table(path: &Path) -> Result<Table, CliError> {
    let workbook = read_workbook(path).map_err(read_err)?;
    workbook.first_table(0).map_err(|e| CliError {
        code: EXIT_INPUT_READ,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

#[derive(Serialize)]
struct RunOutput<'a> {
    summary: &'a RunSummary,
    report: String,
    master: String,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let report_path = args.out_dir.join(&config.output.report_file);
    let master_path = args.out_dir.join(&config.output.master_file);
    if report_path == master_path {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("report and master would both be written to {}", report_path.display()),
            hint: Some("set distinct output.report_file and output.master_file".into()),
        });
    }
    for input in [&args.transactions, &args.clients, &args.schemes, &args.master] {
        if same_file(input, &report_path) || same_file(input, &master_path) {
            return Err(CliError {
                code: EXIT_USAGE,
                message: format!("output would overwrite input {}", input.display()),
                hint: Some("choose another --out-dir".into()),
            });
        }
    }

    let inputs = StagedInputs::new()
        .transactions(read_first_table(&args.transactions)?)
        .reference_clients(read_first_table(&args.clients)?)?
        .reference_schemes(read_first_table(&args.schemes)?)?
        .master(read_workbook(&args.master).map_err(read_err)?)?
        .finish()?;

    let outputs = txnmis_recon::run(&config, &inputs)?;

    // Nothing is written unless the whole pipeline succeeded.
    std::fs::create_dir_all(&args.out_dir).map_err(|e| CliError {
        code: EXIT_WRITE,
        message: format!("cannot create {}: {e}", args.out_dir.display()),
        hint: None,
    })?;
    write_outputs(&args.out_dir, &[(&outputs.report.to_workbook(), &report_path), (&outputs.master, &master_path)])?;
    info!(report = %report_path.display(), master = %master_path.display(), "outputs written");

    let s = &outputs.summary;
    if args.json {
        let output = RunOutput {
            summary: s,
            report: report_path.display().to_string(),
            master: master_path.display().to_string(),
        };
        let json_str = serde_json::to_string_pretty(&output).map_err(|e| CliError {
            code: EXIT_WRITE,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{json_str}");
    }

    // Human summary to stderr
    eprintln!(
        "{} new clients, {} new schemes; {} transactions: {} working, {} final",
        s.new_clients, s.new_schemes, s.raw_rows, s.working_rows, s.final_rows,
    );
    eprintln!("wrote {}", report_path.display());
    eprintln!("wrote {}", master_path.display());

    Ok(())
}

/// Save every workbook to a temporary file in `dir`, then move them all into
/// place. A failed save or move leaves none of the outputs behind.
fn write_outputs(dir: &Path, outputs: &[(&Workbook, &Path)]) -> Result<(), CliError> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (workbook, dest) in outputs {
        let tmp = tempfile::Builder::new()
            .prefix(".txnmis-")
            .suffix(".xlsx")
            .tempfile_in(dir)
            .map_err(|e| CliError {
                code: EXIT_WRITE,
                message: format!("cannot create a temporary file in {}: {e}", dir.display()),
                hint: None,
            })?;
        write_workbook(workbook, tmp.path()).map_err(write_err)?;
        staged.push((tmp, *dest));
    }

    let mut placed: Vec<&Path> = Vec::with_capacity(staged.len());
    for (tmp, dest) in staged {
        if let Err(e) = tmp.persist(dest) {
            for done in placed {
                if let Err(rm) = std::fs::remove_file(done) {
                    warn!(path = %done.display(), error = %rm, "could not remove partial output");
                }
            }
            return Err(CliError {
                code: EXIT_WRITE,
                message: format!("cannot write {}: {}", dest.display(), e.error),
                hint: None,
            });
        }
        placed.push(dest);
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    eprintln!(
        "valid: client master '{}' ({} fields), scheme master '{}' ({} fields)",
        config.sheets.client_master,
        config.client_master.fields.len(),
        config.sheets.scheme_master,
        config.scheme_master.fields.len(),
    );
    Ok(())
}
