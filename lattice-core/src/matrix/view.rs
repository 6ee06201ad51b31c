use std::fmt;
use std::ops::Range;

use super::{write_rows, MatrixMut, MatrixRef};
use crate::error::{LatticeError, Result};
use crate::types::Float;

/// Validates a sub-block request against a parent of shape `parent` whose
/// rows are `stride` elements apart, and returns the span of the parent
/// buffer the block occupies.
pub(super) fn block_range(
    parent: (usize, usize),
    stride: usize,
    start_row: usize,
    start_col: usize,
    rows: usize,
    cols: usize,
) -> Result<Range<usize>> {
    if rows == 0 || cols == 0 {
        return Err(LatticeError::InvalidParameter(format!(
            "view extents must be non-zero, got {rows}x{cols}"
        )));
    }
    let row_end = start_row.checked_add(rows);
    let col_end = start_col.checked_add(cols);
    match (row_end, col_end) {
        (Some(re), Some(ce)) if re <= parent.0 && ce <= parent.1 => {}
        _ => {
            return Err(LatticeError::InvalidParameter(format!(
                "{rows}x{cols} block at ({start_row}, {start_col}) exceeds {}x{} matrix",
                parent.0, parent.1
            )));
        }
    }

    let offset = start_row * stride + start_col;
    let len = (rows - 1) * stride + cols;
    Ok(offset..offset + len)
}

/// Shared, non-owning view of a rectangular block of another matrix.
///
/// `data` starts at the block's first element; row `r` lives at
/// `data[r * stride..r * stride + ncols]`.
#[derive(Clone, Copy)]
pub struct MatrixView<'a> {
    data: &'a [Float],
    nrows: usize,
    ncols: usize,
    stride: usize,
}

impl<'a> MatrixView<'a> {
    pub(super) fn new(data: &'a [Float], nrows: usize, ncols: usize, stride: usize) -> Self {
        debug_assert!(data.len() >= (nrows - 1) * stride + ncols);
        Self {
            data,
            nrows,
            ncols,
            stride,
        }
    }

    /// Sub-view relative to this view. The result borrows the same parent.
    pub fn view(
        &self,
        start_row: usize,
        start_col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatrixView<'a>> {
        let range = block_range(
            self.shape(),
            self.stride,
            start_row,
            start_col,
            rows,
            cols,
        )?;
        Ok(MatrixView::new(&self.data[range], rows, cols, self.stride))
    }
}

impl MatrixRef for MatrixView<'_> {
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
        assert!(r < self.nrows, "row {r} out of bounds ({})", self.nrows);
        let start = r * self.stride;
        &self.data[start..start + self.ncols]
    }

    fn is_view(&self) -> bool {
        true
    }
}

impl fmt::Debug for MatrixView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("nrows", &self.nrows)
            .field("ncols", &self.ncols)
            .field("stride", &self.stride)
            .finish()
    }
}

impl fmt::Display for MatrixView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rows(self, f)
    }
}

/// Exclusive, non-owning view of a rectangular block of another matrix.
pub struct MatrixViewMut<'a> {
    data: &'a mut [Float],
    nrows: usize,
    ncols: usize,
    stride: usize,
}

impl<'a> MatrixViewMut<'a> {
    pub(super) fn new(data: &'a mut [Float], nrows: usize, ncols: usize, stride: usize) -> Self {
        debug_assert!(data.len() >= (nrows - 1) * stride + ncols);
        Self {
            data,
            nrows,
            ncols,
            stride,
        }
    }

    /// Read-only reborrow of this view.
    pub fn as_view(&self) -> MatrixView<'_> {
        MatrixView::new(&*self.data, self.nrows, self.ncols, self.stride)
    }

    pub fn view(
        &self,
        start_row: usize,
        start_col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatrixView<'_>> {
        self.as_view().view(start_row, start_col, rows, cols)
    }

    pub fn view_mut(
        &mut self,
        start_row: usize,
        start_col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatrixViewMut<'_>> {
        let range = block_range(
            self.shape(),
            self.stride,
            start_row,
            start_col,
            rows,
            cols,
        )?;
        Ok(MatrixViewMut::new(
            &mut self.data[range],
            rows,
            cols,
            self.stride,
        ))
    }
}

impl MatrixRef for MatrixViewMut<'_> {
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
        assert!(r < self.nrows, "row {r} out of bounds ({})", self.nrows);
        let start = r * self.stride;
        &self.data[start..start + self.ncols]
    }

    fn is_view(&self) -> bool {
        true
    }
}

impl MatrixMut for MatrixViewMut<'_> {
    #[inline]
    fn row_mut(&mut self, r: usize) -> &mut [Float] {
        assert!(r < self.nrows, "row {r} out of bounds ({})", self.nrows);
        let start = r * self.stride;
        &mut self.data[start..start + self.ncols]
    }
}

impl fmt::Debug for MatrixViewMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixViewMut")
            .field("nrows", &self.nrows)
            .field("ncols", &self.ncols)
            .field("stride", &self.stride)
            .finish()
    }
}
