pub mod error;
pub mod matrix;
pub mod ops;
pub mod reduce;
pub mod types;

pub use types::{Float, Label};

pub use error::{LatticeError, Result};

pub use matrix::{Matrix, MatrixMut, MatrixRef, MatrixView, MatrixViewMut};
