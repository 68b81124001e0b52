use thiserror::Error;

/// Errors raised while building [`crate::AppConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Validation failures for an uploaded city list.
///
/// Each variant is reported to the uploader before any discovery process is
/// created; the display strings are the user-facing messages.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("CSV file must have a header and at least one data row.")]
    TooFewLines,

    #[error("CSV must contain 'city' and 'population' columns.")]
    MissingColumns,

    #[error("No valid city data could be parsed from the file.")]
    NoValidRows,

    #[error("Failed to read the file.")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
