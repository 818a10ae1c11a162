use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Invalid input for {context}: {details}")]
    InputShapeError { context: String, details: String },

    #[error("Subtotal '{subtotal}' is negative ({value}); rendering it would invert the chart")]
    NegativeSubtotalError { subtotal: String, value: f64 },

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to export chart to {path}: {reason}")]
    ExportError { path: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChartError {
    pub(crate) fn input_shape(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InputShapeError {
            context: context.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;
