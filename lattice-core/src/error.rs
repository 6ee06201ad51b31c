use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatticeError {
    /// Operand shapes are incompatible with the requested operation.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    /// Invalid argument value (zero extent, out-of-range index, empty range, ...)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The numeric content of the input cannot be processed.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The backing buffer for a `rows x cols` matrix could not be allocated.
    #[error("failed to allocate a {rows}x{cols} matrix")]
    AllocationFailure { rows: usize, cols: usize },

    /// A model was constructed with invalid hyperparameters.
    #[error("construction error: {0}")]
    ConstructionError(String),
}

impl LatticeError {
    /// Shorthand for a [`LatticeError::DimensionMismatch`] between two `(rows, cols)` shapes.
    pub fn shape_mismatch(expected: (usize, usize), got: (usize, usize)) -> Self {
        LatticeError::DimensionMismatch {
            expected: format!("{}x{}", expected.0, expected.1),
            got: format!("{}x{}", got.0, got.1),
        }
    }
}

pub type Result<T> = std::result::Result<T, LatticeError>;
