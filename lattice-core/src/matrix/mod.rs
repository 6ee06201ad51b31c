//! Dense row-major matrices.
//!
//! [`Matrix`] owns its buffer. [`MatrixView`] and [`MatrixViewMut`] borrow a
//! rectangular sub-block of another matrix and never free anything; the
//! borrow checker keeps them from outliving (or observing a reshape of) the
//! parent.
//!
//! Read access is expressed through [`MatrixRef`] and write access through
//! [`MatrixMut`], so every operation in [`crate::ops`] and [`crate::reduce`]
//! accepts owning matrices and views alike.

#[cfg(feature = "nalgebra")]
mod convert;
mod view;

use std::fmt;
use std::ops::{Index, IndexMut};

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{LatticeError, Result};
use crate::types::Float;

pub use view::{MatrixView, MatrixViewMut};

/// Read-only access to a row-major matrix.
///
/// Rows are always contiguous, even inside a view, which is what lets the
/// hot loops work on plain slices.
pub trait MatrixRef {
    /// Number of rows.
    fn nrows(&self) -> usize;

    /// Number of columns.
    fn ncols(&self) -> usize;

    /// Row `r` as a slice of length [`ncols`](MatrixRef::ncols).
    ///
    /// # Panics
    ///
    /// Panics if `r >= nrows()`.
    fn row(&self, r: usize) -> &[Float];

    /// `true` when the matrix borrows another matrix's buffer.
    fn is_view(&self) -> bool;

    /// `(nrows, ncols)`.
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Total number of elements.
    fn len(&self) -> usize {
        self.nrows() * self.ncols()
    }

    /// Always `false`; a matrix has at least one element.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds-checked element read. Out-of-range indices yield `NaN`.
    fn get(&self, row: usize, col: usize) -> Float {
        if row < self.nrows() && col < self.ncols() {
            self.row(row)[col]
        } else {
            Float::NAN
        }
    }

    /// All elements in row-major order.
    fn iter(&self) -> impl Iterator<Item = Float> + '_ {
        (0..self.nrows()).flat_map(move |r| self.row(r).iter().copied())
    }

    /// Deep copy into a fresh owning matrix with an independent lifetime.
    fn to_matrix(&self) -> Result<Matrix> {
        let mut data = allocate(self.nrows(), self.ncols(), 0.0)?;
        for (r, chunk) in data.chunks_exact_mut(self.ncols()).enumerate() {
            chunk.copy_from_slice(self.row(r));
        }
        Ok(Matrix {
            data,
            nrows: self.nrows(),
            ncols: self.ncols(),
        })
    }
}

/// Write access to a row-major matrix.
pub trait MatrixMut: MatrixRef {
    /// Row `r` as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if `r >= nrows()`.
    fn row_mut(&mut self, r: usize) -> &mut [Float];

    /// Bounds-checked element write.
    ///
    /// # Errors
    ///
    /// [`LatticeError::InvalidParameter`] if `(row, col)` lies outside the matrix.
    fn set(&mut self, row: usize, col: usize, value: Float) -> Result<()> {
        if row >= self.nrows() || col >= self.ncols() {
            return Err(LatticeError::InvalidParameter(format!(
                "index ({row}, {col}) out of bounds for {}x{} matrix",
                self.nrows(),
                self.ncols()
            )));
        }
        self.row_mut(row)[col] = value;
        Ok(())
    }

    /// Applies `f` to every element in place, row by row.
    fn apply(&mut self, mut f: impl FnMut(Float) -> Float) {
        for r in 0..self.nrows() {
            for x in self.row_mut(r) {
                *x = f(*x);
            }
        }
    }
}

/// Owning dense matrix of `f64` in row-major order.
///
/// The buffer always holds exactly `nrows * ncols` elements and both extents
/// are non-zero. It is released once, when the matrix is dropped.
///
/// # Examples
///
/// ```
/// use lattice_core::{Matrix, MatrixRef};
///
/// let m = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
/// assert_eq!(m.get(1, 0), 3.0);
/// assert!(m.get(2, 0).is_nan());
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "MatrixRepr"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    nrows: usize,
    ncols: usize,
    data: Vec<Float>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct MatrixRepr {
    nrows: usize,
    ncols: usize,
    data: Vec<Float>,
}

#[cfg(feature = "serde")]
impl TryFrom<MatrixRepr> for Matrix {
    type Error = LatticeError;

    fn try_from(repr: MatrixRepr) -> Result<Self> {
        Matrix::from_vec(repr.nrows, repr.ncols, repr.data)
    }
}

/// Allocates a `rows x cols` buffer filled with `value`.
///
/// Zero extents are a parameter error; an unrepresentable or unsatisfiable
/// size is an allocation error.
pub(crate) fn allocate(rows: usize, cols: usize, value: Float) -> Result<Vec<Float>> {
    if rows == 0 || cols == 0 {
        return Err(LatticeError::InvalidParameter(format!(
            "matrix extents must be non-zero, got {rows}x{cols}"
        )));
    }
    let len = rows
        .checked_mul(cols)
        .ok_or(LatticeError::AllocationFailure { rows, cols })?;

    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| LatticeError::AllocationFailure { rows, cols })?;
    data.resize(len, value);
    Ok(data)
}

impl Matrix {
    /// Zero-initialized `rows x cols` matrix. Same as [`Matrix::zeros`].
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        Self::zeros(rows, cols)
    }

    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::filled(rows, cols, 0.0)
    }

    pub fn ones(rows: usize, cols: usize) -> Result<Self> {
        Self::filled(rows, cols, 1.0)
    }

    /// Matrix with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: Float) -> Result<Self> {
        Ok(Self {
            data: allocate(rows, cols, value)?,
            nrows: rows,
            ncols: cols,
        })
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Result<Self> {
        let mut m = Self::zeros(n, n)?;
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        Ok(m)
    }

    /// Matrix with elements drawn uniformly from `[lo, hi)` using `rng`.
    ///
    /// # Errors
    ///
    /// [`LatticeError::InvalidParameter`] for zero extents or a range
    /// [`fill_random`](crate::ops::fill_random) rejects.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        lo: Float,
        hi: Float,
        rng: &mut R,
    ) -> Result<Self> {
        let mut m = Self::zeros(rows, cols)?;
        crate::ops::fill_random(&mut m, lo, hi, rng)?;
        Ok(m)
    }

    /// Takes ownership of a row-major buffer.
    ///
    /// # Errors
    ///
    /// [`LatticeError::InvalidParameter`] for zero extents or when
    /// `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Float>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(LatticeError::InvalidParameter(format!(
                "matrix extents must be non-zero, got {rows}x{cols}"
            )));
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(LatticeError::InvalidParameter(format!(
                "buffer of length {} cannot back a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Self {
            data,
            nrows: rows,
            ncols: cols,
        })
    }

    /// Copies a row-major slice.
    pub fn from_slice(rows: usize, cols: usize, data: &[Float]) -> Result<Self> {
        Self::from_vec(rows, cols, data.to_vec())
    }

    /// Builds a matrix from a slice of equally long rows.
    pub fn from_rows(rows: &[&[Float]]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(LatticeError::InvalidParameter(format!(
                "row {i} has {} columns, expected {cols}",
                r.len()
            )));
        }
        Self::from_vec(rows.len(), cols, rows.concat())
    }

    /// Builds a matrix by evaluating `f(row, col)` for every element.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Float) -> Result<Self> {
        let mut m = Self::zeros(rows, cols)?;
        for (i, chunk) in m.data.chunks_exact_mut(cols).enumerate() {
            for (j, x) in chunk.iter_mut().enumerate() {
                *x = f(i, j);
            }
        }
        Ok(m)
    }

    /// The whole buffer in row-major order.
    pub fn as_slice(&self) -> &[Float] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Float] {
        &mut self.data
    }

    /// Consumes the matrix and returns its buffer.
    pub fn into_vec(self) -> Vec<Float> {
        self.data
    }

    /// Borrows the whole matrix as a view.
    pub fn as_view(&self) -> MatrixView<'_> {
        MatrixView::new(&self.data, self.nrows, self.ncols, self.ncols)
    }

    /// Borrows the `rows x cols` block starting at `(start_row, start_col)`.
    ///
    /// # Errors
    ///
    /// [`LatticeError::InvalidParameter`] if the block is empty or exceeds
    /// this matrix.
    pub fn view(
        &self,
        start_row: usize,
        start_col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatrixView<'_>> {
        self.as_view().view(start_row, start_col, rows, cols)
    }

    /// Mutable counterpart of [`Matrix::view`].
    pub fn view_mut(
        &mut self,
        start_row: usize,
        start_col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatrixViewMut<'_>> {
        let range = view::block_range(
            self.shape(),
            self.ncols,
            start_row,
            start_col,
            rows,
            cols,
        )?;
        Ok(MatrixViewMut::new(
            &mut self.data[range],
            rows,
            cols,
            self.ncols,
        ))
    }
}

impl MatrixRef for Matrix {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn row(&self, r: usize) -> &[Float] {
        let start = r * self.ncols;
        &self.data[start..start + self.ncols]
    }

    fn is_view(&self) -> bool {
        false
    }

    fn iter(&self) -> impl Iterator<Item = Float> + '_ {
        self.data.iter().copied()
    }
}

impl MatrixMut for Matrix {
    #[inline]
    fn row_mut(&mut self, r: usize) -> &mut [Float] {
        let start = r * self.ncols;
        let end = start + self.ncols;
        &mut self.data[start..end]
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Float;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &Float {
        assert!(c < self.ncols, "column {c} out of bounds ({})", self.ncols);
        &self.data[r * self.ncols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut Float {
        assert!(c < self.ncols, "column {c} out of bounds ({})", self.ncols);
        &mut self.data[r * self.ncols + c]
    }
}

/// Renders one bracketed row per line.
pub(crate) fn write_rows<M: MatrixRef + ?Sized>(m: &M, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let precision = f.precision().unwrap_or(4);
    for r in 0..m.nrows() {
        write!(f, "[")?;
        for (c, x) in m.row(r).iter().enumerate() {
            if c > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{x:>10.precision$}")?;
        }
        writeln!(f, "]")?;
    }
    Ok(())
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rows(self, f)
    }
}
