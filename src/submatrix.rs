//! Rectangular block views of a dense matrix.
//!
//! A submatrix restricts both index ranges of a matrix. Reads are oblivious
//! to the underlying structure tag; writes verify the tag for every touched
//! absolute position before the first store, and element stores mirror
//! through symmetric and Hermitian adaptors. A block that does not span the
//! whole matrix reports no structure of its own.

use crate::dense::DenseMatrix;
use crate::eval::EvalConfig;
use crate::expr::{impl_mat_ops, MatExpr};
use crate::functor::{AddOp, BinaryFunctor, Conjugate, MultOp, SubOp};
use crate::simd::Scalar;
use crate::structure::Structure;
use crate::{ExprError, Result};
use num_traits::One;
use std::ops::{Add, Div, Mul, Sub};

/// Read-only block view of a dense matrix.
#[derive(Debug, Clone, Copy)]
pub struct Submatrix<'a, T: Scalar> {
    matrix: &'a DenseMatrix<T>,
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
}

fn check_block<T: Scalar>(
    matrix: &DenseMatrix<T>,
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
) -> Result<()> {
    // checked_add keeps pathological offsets from wrapping past the check.
    let row_end = row.checked_add(rows).unwrap_or(usize::MAX);
    if row_end > matrix.rows() {
        return Err(ExprError::OutOfRange {
            index: row_end,
            extent: matrix.rows(),
        });
    }
    let col_end = col.checked_add(cols).unwrap_or(usize::MAX);
    if col_end > matrix.columns() {
        return Err(ExprError::OutOfRange {
            index: col_end,
            extent: matrix.columns(),
        });
    }
    Ok(())
}

/// Block `[row, row + rows) x [col, col + cols)` of `matrix`.
pub fn submatrix<T: Scalar>(
    matrix: &DenseMatrix<T>,
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
) -> Result<Submatrix<'_, T>> {
    check_block(matrix, row, col, rows, cols)?;
    Ok(Submatrix {
        matrix,
        row,
        col,
        rows,
        cols,
    })
}

impl<'a, T: Scalar> Submatrix<'a, T> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row_offset(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn column_offset(&self) -> usize {
        self.col
    }

    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        if i >= self.rows {
            return Err(ExprError::OutOfRange {
                index: i,
                extent: self.rows,
            });
        }
        if j >= self.cols {
            return Err(ExprError::OutOfRange {
                index: j,
                extent: self.cols,
            });
        }
        Ok(self.matrix.get(self.row + i, self.col + j))
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.matrix.get(self.row + i, self.col + j)
    }
}

impl<'a, T: Scalar> MatExpr for Submatrix<'a, T> {
    type Elem = T;

    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.cols
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> T {
        self.matrix.get(self.row + i, self.col + j)
    }

    fn structure(&self) -> Structure {
        // Only the identity block inherits the tag.
        if self.row == 0
            && self.col == 0
            && self.rows == self.matrix.rows()
            && self.cols == self.matrix.columns()
        {
            self.matrix.structure()
        } else {
            Structure::General
        }
    }

    fn can_alias(&self, id: usize) -> bool {
        self.matrix.is_aliased(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.matrix.is_aliased(id)
    }
}

impl_mat_ops!(['a, T: Scalar], Submatrix<'a, T>);

/// Mutable block view of a dense matrix.
#[derive(Debug)]
pub struct SubmatrixMut<'a, T: Scalar> {
    matrix: &'a mut DenseMatrix<T>,
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
}

/// Mutable block `[row, row + rows) x [col, col + cols)` of `matrix`.
pub fn submatrix_mut<T: Scalar>(
    matrix: &mut DenseMatrix<T>,
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
) -> Result<SubmatrixMut<'_, T>> {
    check_block(matrix, row, col, rows, cols)?;
    Ok(SubmatrixMut {
        matrix,
        row,
        col,
        rows,
        cols,
    })
}

impl<'a, T: Scalar> SubmatrixMut<'a, T> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.cols
    }

    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        if i >= self.rows {
            return Err(ExprError::OutOfRange {
                index: i,
                extent: self.rows,
            });
        }
        if j >= self.cols {
            return Err(ExprError::OutOfRange {
                index: j,
                extent: self.cols,
            });
        }
        Ok(self.matrix.get(self.row + i, self.col + j))
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.matrix.get(self.row + i, self.col + j)
    }

    /// Whether the mirror of absolute position `(a, b)` falls inside this
    /// block.
    fn mirror_in_block(&self, a: usize, b: usize) -> bool {
        b >= self.row && b < self.row + self.rows && a >= self.col && a < self.col + self.cols
    }
}

impl<'a, T: Scalar + Conjugate + One> SubmatrixMut<'a, T> {
    /// Structure-checked element write.
    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        if i >= self.rows {
            return Err(ExprError::OutOfRange {
                index: i,
                extent: self.rows,
            });
        }
        if j >= self.cols {
            return Err(ExprError::OutOfRange {
                index: j,
                extent: self.cols,
            });
        }
        self.matrix.set(self.row + i, self.col + j, value)
    }

    /// Plain assignment, `self = src`.
    pub fn assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()> {
        self.assign_with(src, &EvalConfig::default())
    }

    /// Plain assignment with explicit evaluation knobs.
    pub fn assign_with<E: MatExpr<Elem = T>>(&mut self, src: &E, cfg: &EvalConfig) -> Result<()> {
        let _ = cfg;
        self.check_shape(src)?;
        if src.can_alias(self.matrix.storage_id()) {
            let tmp = src.eval();
            self.check_block_structure(&tmp)?;
            self.write_block(&tmp);
        } else {
            self.check_block_structure(src)?;
            self.write_block(src);
        }
        Ok(())
    }

    /// `self += src`, componentwise.
    pub fn add_assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Add<Output = T>,
    {
        self.update(src, AddOp)
    }

    /// `self -= src`, componentwise.
    pub fn sub_assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Sub<Output = T>,
    {
        self.update(src, SubOp)
    }

    /// `self = self o src`, the componentwise (Schur) product.
    pub fn schur_assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Mul<Output = T>,
    {
        self.update(src, MultOp)
    }

    fn update<E, F>(&mut self, src: &E, f: F) -> Result<()>
    where
        E: MatExpr<Elem = T>,
        F: BinaryFunctor<T>,
    {
        self.check_shape(src)?;
        // Reads complete before the first write, which also covers a source
        // aliasing the destination.
        let combined = if src.can_alias(self.matrix.storage_id()) {
            let tmp = src.eval();
            DenseMatrix::from_fn(self.rows, self.cols, |i, j| {
                f.apply(self.get(i, j), tmp.get(i, j))
            })
        } else {
            DenseMatrix::from_fn(self.rows, self.cols, |i, j| {
                f.apply(self.get(i, j), src.get(i, j))
            })
        };
        self.check_block_structure(&combined)?;
        self.write_block(&combined);
        Ok(())
    }

    /// Set every writable element of the block.
    pub fn fill(&mut self, value: T) {
        let s = self.matrix.structure();
        for i in 0..self.rows {
            for j in 0..self.cols {
                let (a, b) = (self.row + i, self.col + j);
                if s.writable(a, b) {
                    self.matrix.store_element(a, b, value);
                }
            }
        }
    }

    /// Multiply every writable element of the block in place.
    pub fn scale(&mut self, factor: T) -> Result<()>
    where
        T: Mul<Output = T>,
    {
        let s = self.matrix.structure();
        if s.is_uni() {
            let touches_diagonal = (0..self.rows)
                .any(|i| self.row + i >= self.col && self.row + i < self.col + self.cols);
            if touches_diagonal {
                return Err(ExprError::StructureViolation(
                    "a unitriangular diagonal cannot be scaled",
                ));
            }
        }
        for i in 0..self.rows {
            for j in 0..self.cols {
                let (a, b) = (self.row + i, self.col + j);
                if s.writable(a, b) {
                    let v = self.matrix.get(a, b) * factor;
                    self.matrix.store_element(a, b, v);
                }
            }
        }
        Ok(())
    }

    /// Divide every writable element of the block in place.
    ///
    /// Subject to the same uni-triangular restriction as [`Self::scale`].
    pub fn unscale(&mut self, divisor: T) -> Result<()>
    where
        T: Div<Output = T>,
    {
        let s = self.matrix.structure();
        if s.is_uni() {
            let touches_diagonal = (0..self.rows)
                .any(|i| self.row + i >= self.col && self.row + i < self.col + self.cols);
            if touches_diagonal {
                return Err(ExprError::StructureViolation(
                    "a unitriangular diagonal cannot be scaled",
                ));
            }
        }
        for i in 0..self.rows {
            for j in 0..self.cols {
                let (a, b) = (self.row + i, self.col + j);
                if s.writable(a, b) {
                    let v = self.matrix.get(a, b) / divisor;
                    self.matrix.store_element(a, b, v);
                }
            }
        }
        Ok(())
    }

    /// Reset every writable element of the block to the default value.
    pub fn reset(&mut self) {
        self.fill(T::default());
    }

    fn check_shape<E: MatExpr<Elem = T>>(&self, src: &E) -> Result<()> {
        if self.rows != src.rows() || self.cols != src.columns() {
            return Err(ExprError::ShapeMismatch(
                [self.rows, self.cols],
                [src.rows(), src.columns()],
            ));
        }
        Ok(())
    }

    /// Verify every absolute position the block would write, before any
    /// mutation.
    fn check_block_structure<E: MatExpr<Elem = T>>(&self, src: &E) -> Result<()> {
        let s = self.matrix.structure();
        if !s.is_restricted() {
            return Ok(());
        }
        for i in 0..self.rows {
            for j in 0..self.cols {
                let (a, b) = (self.row + i, self.col + j);
                if s.writable(a, b) {
                    if s.is_hermitian() && a == b {
                        let v = src.get(i, j);
                        if v.conj() != v {
                            return Err(ExprError::StructureViolation(
                                "the diagonal of a Hermitian matrix must stay real",
                            ));
                        }
                    }
                    // A mirroring adaptor demands that both halves of a
                    // mirror pair inside the block agree.
                    if (s.is_symmetric() || s.is_hermitian())
                        && a != b
                        && self.mirror_in_block(a, b)
                    {
                        let mirrored = src.get(b - self.row, a - self.col);
                        let expected = if s.is_hermitian() {
                            mirrored.conj()
                        } else {
                            mirrored
                        };
                        if src.get(i, j) != expected {
                            return Err(ExprError::StructureViolation(
                                "block source is not mirror-consistent",
                            ));
                        }
                    }
                    continue;
                }
                let implied = if s.implies_unit(a, b) {
                    T::one()
                } else {
                    T::default()
                };
                if src.get(i, j) != implied {
                    return Err(ExprError::StructureViolation(
                        "block source writes outside the matrix's structure",
                    ));
                }
            }
        }
        Ok(())
    }

    fn write_block<E: MatExpr<Elem = T>>(&mut self, src: &E) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                self.matrix
                    .store_element(self.row + i, self.col + j, src.get(i, j));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_bounds_validated() {
        let m: DenseMatrix<f64> = DenseMatrix::zeros(4, 3);
        assert!(submatrix(&m, 1, 1, 3, 2).is_ok());
        assert!(matches!(
            submatrix(&m, 1, 1, 4, 2).unwrap_err(),
            ExprError::OutOfRange { index: 5, extent: 4 }
        ));
        assert!(submatrix(&m, 0, 2, 1, 2).is_err());
        // An end past usize::MAX must not wrap back into range.
        assert!(submatrix(&m, usize::MAX, 0, 2, 1).is_err());
        assert!(submatrix(&m, 0, usize::MAX, 1, 2).is_err());
        assert!(submatrix(&m, 2, 0, usize::MAX, 1).is_err());
    }

    #[test]
    fn test_block_reads_with_offsets() {
        let m = DenseMatrix::from_rows(&[&[1, 2, 3], &[4, 5, 6], &[7, 8, 9]]).unwrap();
        let b = submatrix(&m, 1, 1, 2, 2).unwrap();
        assert_eq!(b.get(0, 0), 5);
        assert_eq!(b.get(1, 1), 9);
        assert!(b.at(2, 0).is_err());
    }

    #[test]
    fn test_partial_block_has_no_structure() {
        let m: DenseMatrix<f64> = DenseMatrix::with_structure(4, Structure::Lower);
        assert_eq!(
            MatExpr::structure(&submatrix(&m, 1, 0, 2, 2).unwrap()),
            Structure::General
        );
        assert_eq!(
            MatExpr::structure(&submatrix(&m, 0, 0, 4, 4).unwrap()),
            Structure::Lower
        );
    }

    #[test]
    fn test_assign_block() {
        let mut m: DenseMatrix<f64> = DenseMatrix::zeros(3, 3);
        let src = DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        submatrix_mut(&mut m, 1, 1, 2, 2)
            .unwrap()
            .assign(&src)
            .unwrap();
        assert_eq!(m.get(1, 1), 1.0);
        assert_eq!(m.get(2, 2), 4.0);
        assert_eq!(m.get(0, 0), 0.0);
    }

    #[test]
    fn test_blocks_as_operands() {
        let m = DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let b = submatrix(&m, 0, 0, 2, 2).unwrap();
        let doubled = (b + b).eval();
        assert_eq!(doubled.get(1, 0), 6.0);
    }

    #[test]
    fn test_structured_block_write_rejected() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::Lower);
        // The block covers position (0, 1), above the diagonal.
        let bad = DenseMatrix::from_rows(&[&[1.0, 1.0], &[1.0, 1.0]]).unwrap();
        let err = submatrix_mut(&mut m, 0, 0, 2, 2)
            .unwrap()
            .assign(&bad)
            .unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        assert_eq!(m.get(0, 0), 0.0);

        let ok = DenseMatrix::from_rows(&[&[1.0, 0.0], &[1.0, 1.0]]).unwrap();
        submatrix_mut(&mut m, 0, 0, 2, 2).unwrap().assign(&ok).unwrap();
        assert_eq!(m.get(1, 0), 1.0);
    }

    #[test]
    fn test_symmetric_block_mirror_consistency() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(2, Structure::Symmetric);
        let bad = DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        assert!(submatrix_mut(&mut m, 0, 0, 2, 2).unwrap().assign(&bad).is_err());

        let ok = DenseMatrix::from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]).unwrap();
        submatrix_mut(&mut m, 0, 0, 2, 2).unwrap().assign(&ok).unwrap();
        assert_eq!(m.get(1, 0), 2.0);
    }

    #[test]
    fn test_hermitian_block_diagonal_stays_real() {
        use num_complex::Complex64;

        let mut m: DenseMatrix<Complex64> = DenseMatrix::with_structure(2, Structure::Hermitian);
        let bad = DenseMatrix::from_rows(&[
            &[Complex64::new(1.0, 1.0), Complex64::new(0.0, 0.0)],
            &[Complex64::new(0.0, 0.0), Complex64::new(2.0, 0.0)],
        ])
        .unwrap();
        assert!(submatrix_mut(&mut m, 0, 0, 2, 2).unwrap().assign(&bad).is_err());
        assert_eq!(m.get(0, 0), Complex64::new(0.0, 0.0));

        let ok = DenseMatrix::from_rows(&[
            &[Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            &[Complex64::new(0.0, 0.0), Complex64::new(2.0, 0.0)],
        ])
        .unwrap();
        submatrix_mut(&mut m, 0, 0, 2, 2).unwrap().assign(&ok).unwrap();
        assert_eq!(m.get(0, 0), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_compound_block_update() {
        let mut m = DenseMatrix::from_rows(&[&[1.0, 1.0], &[1.0, 1.0]]).unwrap();
        let inc = DenseMatrix::from_rows(&[&[2.0]]).unwrap();
        submatrix_mut(&mut m, 1, 0, 1, 1)
            .unwrap()
            .add_assign(&inc)
            .unwrap();
        assert_eq!(m.get(1, 0), 3.0);
        assert_eq!(m.get(0, 0), 1.0);
    }
}
