//! Error taxonomy shared by every pipeline stage

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input path missing or unreadable.
    #[error("cannot read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited structure or a required column is absent.
    #[error("{input} is not a valid transaction log: {message}")]
    Format { input: String, message: String },

    /// A value failed a required type coercion.
    #[error("record {record}: cannot parse {column} value {value:?}: {message}")]
    Parse {
        record: usize,
        column: &'static str,
        value: String,
        message: String,
    },

    /// A chart could not be drawn or persisted.
    #[error("failed to render chart {chart}: {message}")]
    Render { chart: String, message: String },
}

impl AnalysisError {
    pub(crate) fn format(input: &str, message: impl Into<String>) -> Self {
        Self::Format {
            input: input.to_string(),
            message: message.into(),
        }
    }

    /// Whether the run may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Render { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_render_errors_are_recoverable() {
        let render = AnalysisError::Render {
            chart: "top_countries".to_string(),
            message: "no font".to_string(),
        };
        assert!(render.is_recoverable());

        let parse = AnalysisError::Parse {
            record: 3,
            column: "InvoiceDate",
            value: "not-a-date".to_string(),
            message: "unrecognized timestamp".to_string(),
        };
        assert!(!parse.is_recoverable());
        assert_eq!(
            parse.to_string(),
            "record 3: cannot parse InvoiceDate value \"not-a-date\": unrecognized timestamp"
        );
    }

    #[test]
    fn test_file_access_message_names_path() {
        let err = AnalysisError::FileAccess {
            path: PathBuf::from("missing.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().starts_with("cannot read missing.csv"));
    }
}
