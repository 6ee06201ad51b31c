//! Reductions over all elements of a matrix.

use crate::error::{LatticeError, Result};
use crate::matrix::{MatrixMut, MatrixRef};
use crate::types::Float;

/// Norms below this are treated as zero by [`normalize`].
pub const NORM_EPSILON: Float = 1e-12;

pub fn sum<M: MatrixRef + ?Sized>(m: &M) -> Float {
    m.iter().sum()
}

/// Sum of squares of all elements.
pub fn norm_squared<M: MatrixRef + ?Sized>(m: &M) -> Float {
    m.iter().map(|x| x * x).sum()
}

/// Frobenius (L2 over all elements) norm.
pub fn norm<M: MatrixRef + ?Sized>(m: &M) -> Float {
    norm_squared(m).sqrt()
}

/// Scales `m` in place so that its [`norm`] becomes 1.
///
/// # Errors
///
/// [`LatticeError::InvalidData`] if the norm is below [`NORM_EPSILON`] (or
/// not finite); `m` is left unchanged.
pub fn normalize<M: MatrixMut + ?Sized>(m: &mut M) -> Result<()> {
    let n = norm(&*m);
    if !n.is_finite() || n < NORM_EPSILON {
        return Err(LatticeError::InvalidData(format!(
            "cannot normalize a matrix with norm {n}"
        )));
    }
    let inv = 1.0 / n;
    m.apply(|x| x * inv);
    Ok(())
}

/// Arithmetic mean of all elements.
pub fn mean<M: MatrixRef + ?Sized>(m: &M) -> Float {
    sum(m) / m.len() as Float
}

/// Population standard deviation of all elements (divides by the element
/// count, not count - 1).
pub fn std<M: MatrixRef + ?Sized>(m: &M) -> Float {
    let mu = mean(m);
    let var = m.iter().map(|x| (x - mu) * (x - mu)).sum::<Float>() / m.len() as Float;
    var.sqrt()
}

/// Smallest element. `NaN`s are skipped unless every element is `NaN`.
pub fn min<M: MatrixRef + ?Sized>(m: &M) -> Float {
    m.iter().reduce(Float::min).unwrap_or(Float::NAN)
}

/// Largest element. `NaN`s are skipped unless every element is `NaN`.
pub fn max<M: MatrixRef + ?Sized>(m: &M) -> Float {
    m.iter().reduce(Float::max).unwrap_or(Float::NAN)
}
