use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("CSV reading error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON configuration error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV file is empty or has no readable header: {0}")]
    EmptyCsv(String),

    #[error("Header not recognized (missing columns {missing:?}), first line: {first_line}")]
    UnrecognizedHeader {
        missing: Vec<String>,
        first_line: String,
    },

    #[error("Malformed CSV row at line {line}: {source}")]
    MalformedRow {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid alert: {0}")]
    InvalidAlert(String),

    #[error("Service channel closed")]
    ServiceClosed,

    #[error("Background job failed: {0}")]
    WorkerFailed(String),
}

impl PartialEq for LoaderError {
    fn eq(&self, other: &Self) -> bool {
        use LoaderError::*;
        match (self, other) {
            // Wrapped library errors are not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,
            (SqliteError(_), SqliteError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (EmptyCsv(a), EmptyCsv(b)) => a == b,
            (
                UnrecognizedHeader {
                    missing: m1,
                    first_line: l1,
                },
                UnrecognizedHeader {
                    missing: m2,
                    first_line: l2,
                },
            ) => m1 == m2 && l1 == l2,
            (MalformedRow { line: a, .. }, MalformedRow { line: b, .. }) => a == b,
            (InvalidAlert(a), InvalidAlert(b)) => a == b,

            (ServiceClosed, ServiceClosed) => true,
            (WorkerFailed(a), WorkerFailed(b)) => a == b,

            _ => false,
        }
    }
}
