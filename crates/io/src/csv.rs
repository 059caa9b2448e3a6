// CSV/TSV import
//
// A delimited file becomes a one-sheet workbook named after the file stem.
// Every field is text; the engine coerces numbers where it needs them.

use std::io::Read;
use std::path::Path;

use txnmis_recon::model::{Sheet, Value, Workbook};

use crate::error::IoError;

pub fn import(path: &Path) -> Result<Workbook, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(path, &content, delimiter)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Workbook, IoError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(path, &content, delimiter)
}

/// Records read per candidate delimiter.
const SNIFF_RECORDS: usize = 10;

/// Pick the delimiter that splits the leading records into the most
/// equally wide rows. Quoted fields, embedded newlines included, count as one.
fn sniff_delimiter(content: &str) -> u8 {
    let mut best = (0usize, b',');
    for delim in [b'\t', b';', b',', b'|'] {
        let widths: Vec<usize> = csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes())
            .records()
            .take(SNIFF_RECORDS)
            .map_while(Result::ok)
            .map(|record| record.len())
            .collect();

        let header = widths.first().copied().unwrap_or(0);
        if header <= 1 {
            continue;
        }
        let score = widths.iter().filter(|&&w| w == header).count() * header;
        if score > best.0 {
            best = (score, delim);
        }
    }
    best.1
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::open(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::open(path, e))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(path: &Path, content: &str, delimiter: u8) -> Result<Workbook, IoError> {
    let sheet_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IoError::ReadSheet {
            path: path.to_path_buf(),
            sheet: sheet_name.clone(),
            reason: e.to_string(),
        })?;
        grid.push(
            record
                .iter()
                .map(|field| if field.is_empty() { Value::Empty } else { Value::text(field) })
                .collect(),
        );
    }

    Ok(Workbook::new(vec![Sheet::new(sheet_name, grid)]))
}
