use thiserror::Error;

/// Error types for one billing check invocation
#[derive(Error, Debug)]
pub enum BillingError {
    /// A required configuration field was not provided
    #[error("Missing required configuration field [{0}]")]
    MissingConfig(&'static str),

    /// A configuration field was provided but could not be parsed
    #[error("Invalid value [{value}] for configuration field [{field}]")]
    InvalidConfig { field: &'static str, value: String },

    /// Error while listing or downloading from the billing bucket
    #[error("Storage access failed: {0}")]
    Storage(String),

    /// The bucket listing contained no archive for the current month
    #[error("No billing archive matches suffix [{0}]")]
    NoMonthlyArchive(String),

    /// The bucket listing contained more than one archive for the current month
    #[error("Multiple billing archives match suffix [{0}]")]
    AmbiguousArchive(String),

    /// The archive or its contents did not have the expected shape
    #[error("Archive error: {0}")]
    Archive(String),

    /// A usage timestamp did not match the export's datetime format
    #[error("Invalid usage timestamp [{0}]")]
    InvalidTimestamp(String),

    /// A blended cost value was not numeric
    #[error("Invalid blended cost [{0}]")]
    InvalidCost(String),

    /// The webhook endpoint rejected the notification
    #[error("Notification delivery failed: {0}")]
    Notification(String),

    /// Error during HTTP communication
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error parsing a JSON configuration document
    #[error("Failed to parse configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reading a row from the billing export
    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    /// The downloaded archive could not be opened or extracted
    #[error("Corrupt billing archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
