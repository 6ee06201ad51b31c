//! Shape-checked arithmetic on matrices and views.
//!
//! Every function that writes into a caller-provided `result` validates all
//! shapes before touching it, so on error `result` is left exactly as it was.
//! Operands and results may be owning [`Matrix`](crate::Matrix) values or
//! views; the borrow checker rules out aliasing between them.

use rand::distr::{Distribution, Uniform};
use rand::Rng;

use crate::error::{LatticeError, Result};
use crate::matrix::{MatrixMut, MatrixRef};
use crate::types::Float;

fn ensure_same_shape<A, B>(a: &A, b: &B) -> Result<()>
where
    A: MatrixRef + ?Sized,
    B: MatrixRef + ?Sized,
{
    if a.shape() != b.shape() {
        return Err(LatticeError::shape_mismatch(a.shape(), b.shape()));
    }
    Ok(())
}

/// Writes `f(a[i, j], b[i, j])` into `result[i, j]`.
fn zip_with<A, B, R>(a: &A, b: &B, result: &mut R, f: impl Fn(Float, Float) -> Float) -> Result<()>
where
    A: MatrixRef + ?Sized,
    B: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    ensure_same_shape(a, b)?;
    ensure_same_shape(a, &*result)?;

    for r in 0..a.nrows() {
        let (ra, rb) = (a.row(r), b.row(r));
        for ((out, &x), &y) in result.row_mut(r).iter_mut().zip(ra).zip(rb) {
            *out = f(x, y);
        }
    }
    Ok(())
}

/// `result = a + b`.
pub fn add<A, B, R>(a: &A, b: &B, result: &mut R) -> Result<()>
where
    A: MatrixRef + ?Sized,
    B: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    zip_with(a, b, result, |x, y| x + y)
}

/// `result = a - b`.
pub fn subtract<A, B, R>(a: &A, b: &B, result: &mut R) -> Result<()>
where
    A: MatrixRef + ?Sized,
    B: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    zip_with(a, b, result, |x, y| x - y)
}

/// Elementwise (Hadamard) product.
pub fn hadamard<A, B, R>(a: &A, b: &B, result: &mut R) -> Result<()>
where
    A: MatrixRef + ?Sized,
    B: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    zip_with(a, b, result, |x, y| x * y)
}

/// Matrix product `result = a * b`.
///
/// Reference triple loop with no blocking. `result` is zeroed and then
/// accumulated into; each `result[i, j]` sums `a[i, k] * b[k, j]` for `k` in
/// increasing order.
///
/// # Errors
///
/// [`LatticeError::DimensionMismatch`] if `a.ncols() != b.nrows()` or
/// `result` is not `a.nrows() x b.ncols()`.
///
/// # Examples
///
/// ```
/// use lattice_core::{ops, Matrix};
///
/// let a = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
/// let b = Matrix::identity(2).unwrap();
/// let mut out = Matrix::zeros(2, 2).unwrap();
/// ops::multiply(&a, &b, &mut out).unwrap();
/// assert_eq!(out, a);
/// ```
pub fn multiply<A, B, R>(a: &A, b: &B, result: &mut R) -> Result<()>
where
    A: MatrixRef + ?Sized,
    B: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    if a.ncols() != b.nrows() {
        return Err(LatticeError::DimensionMismatch {
            expected: format!("right operand with {} rows", a.ncols()),
            got: format!("{}x{}", b.nrows(), b.ncols()),
        });
    }
    let expected = (a.nrows(), b.ncols());
    if result.shape() != expected {
        return Err(LatticeError::shape_mismatch(expected, result.shape()));
    }

    for i in 0..a.nrows() {
        let ra = a.row(i);
        let out = result.row_mut(i);
        out.fill(0.0);
        for (k, &aik) in ra.iter().enumerate() {
            for (o, &bkj) in out.iter_mut().zip(b.row(k)) {
                *o += aik * bkj;
            }
        }
    }
    Ok(())
}

/// `result = s * m`.
pub fn multiply_scalar<M, R>(m: &M, s: Float, result: &mut R) -> Result<()>
where
    M: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    ensure_same_shape(m, &*result)?;
    for r in 0..m.nrows() {
        for (out, &x) in result.row_mut(r).iter_mut().zip(m.row(r)) {
            *out = s * x;
        }
    }
    Ok(())
}

/// `result = mᵀ`. Plain double loop.
pub fn transpose<M, R>(m: &M, result: &mut R) -> Result<()>
where
    M: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    let expected = (m.ncols(), m.nrows());
    if result.shape() != expected {
        return Err(LatticeError::shape_mismatch(expected, result.shape()));
    }
    for i in 0..m.nrows() {
        for (j, &x) in m.row(i).iter().enumerate() {
            result.row_mut(j)[i] = x;
        }
    }
    Ok(())
}

/// Sum of elementwise products over all elements, in row-major order.
///
/// Only the element counts have to agree, so a `1 x n` row vector can be
/// dotted with an `n x 1` column vector.
pub fn dot_product<A, B>(a: &A, b: &B) -> Result<Float>
where
    A: MatrixRef + ?Sized,
    B: MatrixRef + ?Sized,
{
    if a.len() != b.len() {
        return Err(LatticeError::DimensionMismatch {
            expected: format!("{} elements", a.len()),
            got: format!("{} elements", b.len()),
        });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Copies row `idx` of `m` into the `1 x ncols` matrix `result`.
///
/// # Errors
///
/// - [`LatticeError::InvalidParameter`] if `idx >= m.nrows()`
/// - [`LatticeError::DimensionMismatch`] if `result` is not `1 x m.ncols()`
pub fn get_row<M, R>(m: &M, idx: usize, result: &mut R) -> Result<()>
where
    M: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    if idx >= m.nrows() {
        return Err(LatticeError::InvalidParameter(format!(
            "row {idx} out of bounds for {} rows",
            m.nrows()
        )));
    }
    let expected = (1, m.ncols());
    if result.shape() != expected {
        return Err(LatticeError::shape_mismatch(expected, result.shape()));
    }
    result.row_mut(0).copy_from_slice(m.row(idx));
    Ok(())
}

/// Copies column `idx` of `m` into the `nrows x 1` matrix `result`.
///
/// # Errors
///
/// - [`LatticeError::InvalidParameter`] if `idx >= m.ncols()`
/// - [`LatticeError::DimensionMismatch`] if `result` is not `m.nrows() x 1`
pub fn get_col<M, R>(m: &M, idx: usize, result: &mut R) -> Result<()>
where
    M: MatrixRef + ?Sized,
    R: MatrixMut + ?Sized,
{
    if idx >= m.ncols() {
        return Err(LatticeError::InvalidParameter(format!(
            "column {idx} out of bounds for {} columns",
            m.ncols()
        )));
    }
    let expected = (m.nrows(), 1);
    if result.shape() != expected {
        return Err(LatticeError::shape_mismatch(expected, result.shape()));
    }
    for r in 0..m.nrows() {
        result.row_mut(r)[0] = m.row(r)[idx];
    }
    Ok(())
}

/// Sets every element of `m` to `value`.
pub fn fill<M: MatrixMut + ?Sized>(m: &mut M, value: Float) {
    for r in 0..m.nrows() {
        m.row_mut(r).fill(value);
    }
}

/// Fills `m` with values drawn uniformly from `[lo, hi)`.
///
/// The generator is supplied by the caller; seed it for reproducible output.
///
/// # Errors
///
/// [`LatticeError::InvalidParameter`] unless `lo < hi`, both are finite and
/// so is `hi - lo`. `m` is untouched on error.
pub fn fill_random<M, R>(m: &mut M, lo: Float, hi: Float, rng: &mut R) -> Result<()>
where
    M: MatrixMut + ?Sized,
    R: Rng + ?Sized,
{
    let dist = Uniform::new(lo, hi).map_err(|e| {
        LatticeError::InvalidParameter(format!("invalid random range [{lo}, {hi}): {e}"))
    })?;
    for r in 0..m.nrows() {
        for x in m.row_mut(r) {
            *x = dist.sample(rng);
        }
    }
    Ok(())
}
