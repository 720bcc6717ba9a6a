use thiserror::Error;

/// A located numeric token could not be turned into a number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to convert value '{value}' to a number")]
pub struct NumericFormatError {
    pub value: String,
}

/// Errors that make a single message unprocessable during field extraction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("message has no text")]
    EmptyText,

    #[error("missing required anchors")]
    AnchorMissing,

    #[error(transparent)]
    NumericFormat(#[from] NumericFormatError),
}

/// Errors that route a message to the failure list instead of the output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("invalid message timestamp '{value}'")]
    InvalidTimestamp { value: String },
}

/// Errors raised by exchange adapters.
///
/// These never reach the batch: resolution and aggregation degrade them to
/// "no data".
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("Request to {endpoint} failed with status {status}")]
    Http { endpoint: String, status: u16 },

    #[error("Invalid market data from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}
