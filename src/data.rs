//! Transaction log loading and dataset profiling

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ErrorKind};
use tracing::{debug, info};

use crate::error::AnalysisError;

/// Columns the cleaning and aggregation stages read.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Description", "Quantity", "InvoiceDate", "Country"];

/// Field values treated as missing, in addition to the empty field.
const NULL_TOKENS: [&str; 8] = ["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

/// Raw delimited table as read from disk, every value still textual
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Header names in file order
    pub headers: Vec<String>,
    /// One entry per data row, `None` for missing values
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Copy of the first `n` rows, like a dataframe `head()`
    pub fn head(&self, n: usize) -> RawTable {
        RawTable {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Per-column non-null counts and inferred value kinds
    pub fn profile(&self) -> TableProfile {
        let columns = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<&str> = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(idx).and_then(|v| v.as_deref()))
                    .collect();

                ColumnProfile {
                    name: name.clone(),
                    non_null: values.len(),
                    nulls: self.rows.len() - values.len(),
                    kind: ColumnKind::infer(&values),
                }
            })
            .collect();

        TableProfile {
            rows: self.rows.len(),
            columns,
        }
    }
}

/// Value kind a column would be read as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    /// No non-null values at all
    Empty,
}

impl ColumnKind {
    fn infer(values: &[&str]) -> Self {
        if values.is_empty() {
            ColumnKind::Empty
        } else if values.iter().all(|v| v.trim().parse::<i64>().is_ok()) {
            ColumnKind::Integer
        } else if values.iter().all(|v| v.trim().parse::<f64>().is_ok()) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    pub name: String,
    pub non_null: usize,
    pub nulls: usize,
    pub kind: ColumnKind,
}

/// Schema and null summary of a raw table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableProfile {
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
}

/// Load an ISO-8859-1 encoded transaction log from disk
///
/// # Arguments
/// * `path` - Path to the delimited file (header row required)
/// * `delimiter` - Field separator byte, usually `b','`
///
/// # Returns
/// * `RawTable` with one row per record and textual values preserved
pub fn load_transactions(path: impl AsRef<Path>, delimiter: u8) -> crate::Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AnalysisError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let table = read_transactions(BufReader::new(file), delimiter, &path.display().to_string())?;

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.headers.len(),
        "loaded transaction log"
    );
    Ok(table)
}

/// Read a transaction log from any byte source
///
/// `input` names the source in error messages. Every row must have as many
/// fields as the header and the header must contain every column in
/// [`REQUIRED_COLUMNS`].
pub fn read_transactions<R: Read>(reader: R, delimiter: u8, input: &str) -> crate::Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .byte_headers()
        .map_err(|e| csv_error(input, e))?
        .iter()
        .map(|field| decode_latin1(field).trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AnalysisError::format(input, "missing header row"));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::format(
            input,
            format!("missing required column(s): {}", missing.join(", ")),
        ));
    }

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    while csv_reader
        .read_byte_record(&mut record)
        .map_err(|e| csv_error(input, e))?
    {
        rows.push(record.iter().map(decode_field).collect());
    }

    debug!(input, rows = rows.len(), "parsed delimited records");
    Ok(RawTable::new(headers, rows))
}

fn csv_error(input: &str, err: csv::Error) -> AnalysisError {
    match err.into_kind() {
        ErrorKind::Io(source) => AnalysisError::FileAccess {
            path: PathBuf::from(input),
            source,
        },
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => {
            let line = pos.map(|p| p.line()).unwrap_or_default();
            AnalysisError::format(
                input,
                format!("line {line} has {len} fields, expected {expected_len}"),
            )
        }
        other => AnalysisError::format(input, format!("{other:?}")),
    }
}

/// ISO-8859-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn decode_field(bytes: &[u8]) -> Option<String> {
    let value = decode_latin1(bytes);
    let token = value.trim();
    if token.is_empty() || NULL_TOKENS.contains(&token) {
        None
    } else {
        Some(value)
    }
}
