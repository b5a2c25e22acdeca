use thiserror::Error;

#[derive(Debug, Error)]
pub enum TcoError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing reference data in {table}: no row for {key}")]
    MissingReference { table: String, key: String },

    #[error("Duplicate reference data in {table}: more than one row for {key}")]
    DuplicateReference { table: String, key: String },

    #[error("Duplicate cost line item: {0}")]
    DuplicateLineItem(String),

    #[error("Unsupported {kind} unit '{unit}'")]
    UnsupportedUnit { kind: String, unit: String },

    #[error("Baseline technology ICEV has no purchase cost in the ledger; subsidies need it as reference")]
    MissingBaseline,

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: String },

    #[error("Reference data error: {0}")]
    ReferenceData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for TcoError {
    fn from(e: serde_json::Error) -> Self {
        TcoError::SerializationError(e.to_string())
    }
}

#[cfg(feature = "csv")]
impl From<csv::Error> for TcoError {
    fn from(e: csv::Error) -> Self {
        TcoError::ReferenceData(e.to_string())
    }
}

impl From<std::io::Error> for TcoError {
    fn from(e: std::io::Error) -> Self {
        TcoError::ReferenceData(e.to_string())
    }
}
