use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read candidates file {path}: {source}")]
    CandidatesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse candidates file: {0}")]
    CandidatesFileParse(#[from] serde_yaml::Error),

    #[error("candidates validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("unknown column \"{0}\"")]
    UnknownColumn(String),

    #[error("row has {got} cells but table has {expected} columns")]
    RowWidth { expected: usize, got: usize },

    #[error("cannot concatenate tables with different columns: {left:?} vs {right:?}")]
    ColumnMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },
}
