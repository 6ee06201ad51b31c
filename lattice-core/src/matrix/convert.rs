use nalgebra::DMatrix;

use super::{Matrix, MatrixRef};
use crate::error::{LatticeError, Result};
use crate::types::Float;

impl TryFrom<&DMatrix<Float>> for Matrix {
    type Error = LatticeError;

    /// Copies a (column-major) nalgebra matrix into row-major storage.
    fn try_from(m: &DMatrix<Float>) -> Result<Self> {
        Matrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)])
    }
}

impl From<&Matrix> for DMatrix<Float> {
    fn from(m: &Matrix) -> Self {
        DMatrix::from_row_slice(m.nrows(), m.ncols(), m.as_slice())
    }
}
