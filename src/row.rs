//! Row views of a dense matrix.
//!
//! The exact mirror of the column views: contiguous in row-major storage,
//! strided in column-major, with the writable column range of a structured
//! matrix clipped by [`crate::structure::Structure::row_bounds`].

use crate::dense::DenseMatrix;
use crate::eval::{
    assign_into, assign_sparse_lane, check_lane_structure, check_lane_update, update_into,
    EvalConfig, VecTarget,
};
use crate::expr::{impl_vec_ops, VecExpr};
use crate::functor::{AddOp, Conjugate, DivOp, MultOp, SubOp};
use crate::simd::{Pack, Scalar, PACK_WIDTH};
use crate::sparse::SparseVector;
use crate::{ExprError, Result};
use num_traits::One;
use std::ops::{Add, Div, Mul, Sub};

/// Read-only view of one matrix row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a, T: Scalar> {
    matrix: &'a DenseMatrix<T>,
    row: usize,
}

/// View of row `row` of `matrix`.
pub fn row<T: Scalar>(matrix: &DenseMatrix<T>, row_index: usize) -> Result<Row<'_, T>> {
    if row_index >= matrix.rows() {
        return Err(ExprError::OutOfRange {
            index: row_index,
            extent: matrix.rows(),
        });
    }
    Ok(Row {
        matrix,
        row: row_index,
    })
}

/// View of the statically-chosen row `I`; the index is still validated
/// against the runtime extent.
pub fn row_at<const I: usize, T: Scalar>(matrix: &DenseMatrix<T>) -> Result<Row<'_, T>> {
    row(matrix, I)
}

impl<'a, T: Scalar> Row<'a, T> {
    #[inline]
    pub fn index(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matrix.columns()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrix.columns() == 0
    }

    pub fn at(&self, index: usize) -> Result<T> {
        self.matrix.at(self.row, index)
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.matrix.get(self.row, index)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).map(move |j| self.get(j))
    }
}

impl<'a, T: Scalar> VecExpr for Row<'a, T> {
    type Elem = T;
    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn len(&self) -> usize {
        self.matrix.columns()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.matrix.get(self.row, index)
    }

    fn can_simd(&self) -> bool {
        // Contiguous only in row-major storage.
        T::SIMD_ENABLED && self.matrix.order().is_row_major()
    }

    #[inline]
    fn load_pack(&self, index: usize) -> Pack<T> {
        Pack::load(self.matrix.data(), self.matrix.index_of(self.row, index))
    }

    fn can_alias(&self, id: usize) -> bool {
        self.matrix.is_aliased(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.matrix.is_aliased(id)
    }

    fn is_padded(&self) -> bool {
        self.matrix.is_padded() && self.matrix.order().is_row_major()
    }

    fn is_aligned(&self) -> bool {
        self.matrix.order().is_row_major()
            && self.matrix.index_of(self.row, 0) % PACK_WIDTH == 0
    }
}

impl_vec_ops!(['a, T: Scalar], Row<'a, T>);

/// Mutable view of one matrix row.
#[derive(Debug)]
pub struct RowMut<'a, T: Scalar> {
    matrix: &'a mut DenseMatrix<T>,
    row: usize,
}

/// Mutable view of row `row` of `matrix`.
pub fn row_mut<T: Scalar>(matrix: &mut DenseMatrix<T>, row_index: usize) -> Result<RowMut<'_, T>> {
    if row_index >= matrix.rows() {
        return Err(ExprError::OutOfRange {
            index: row_index,
            extent: matrix.rows(),
        });
    }
    Ok(RowMut {
        matrix,
        row: row_index,
    })
}

/// Mutable view of the statically-chosen row `I`.
pub fn row_mut_at<const I: usize, T: Scalar>(
    matrix: &mut DenseMatrix<T>,
) -> Result<RowMut<'_, T>> {
    row_mut(matrix, I)
}

impl<'a, T: Scalar> RowMut<'a, T> {
    #[inline]
    pub fn index(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matrix.columns()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrix.columns() == 0
    }

    pub fn at(&self, index: usize) -> Result<T> {
        self.matrix.at(self.row, index)
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.matrix.get(self.row, index)
    }

    /// Writable column range of this row under the matrix's structure tag.
    fn bounds(&self) -> (usize, usize) {
        self.matrix.structure().row_bounds(self.row, self.len())
    }

    fn unit_at(&self) -> Option<usize> {
        self.matrix.structure().is_uni().then_some(self.row)
    }

    /// Column at which this row crosses a Hermitian diagonal, if any.
    fn real_at(&self) -> Option<usize> {
        self.matrix.structure().is_hermitian().then_some(self.row)
    }
}

impl<'a, T: Scalar + Conjugate + One> RowMut<'a, T> {
    /// Structure-checked element write, mirrored through symmetric and
    /// Hermitian adaptors.
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.matrix.set(self.row, index, value)
    }

    /// Plain assignment, `self = src`.
    pub fn assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()> {
        self.assign_with(src, &EvalConfig::default())
    }

    /// Plain assignment with explicit evaluation knobs.
    pub fn assign_with<E: VecExpr<Elem = T>>(&mut self, src: &E, cfg: &EvalConfig) -> Result<()> {
        if self.len() != src.len() {
            return Err(ExprError::SizeMismatch(self.len(), src.len()));
        }
        let (begin, end) = self.bounds();
        check_lane_structure(begin, end, self.unit_at(), self.real_at(), src)?;
        assign_into(self, src, cfg)
    }

    /// `self += src`, componentwise.
    pub fn add_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Add<Output = T>,
    {
        self.update(src, AddOp)
    }

    /// `self -= src`, componentwise.
    pub fn sub_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Sub<Output = T>,
    {
        self.update(src, SubOp)
    }

    /// `self *= src`, componentwise.
    pub fn mul_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Mul<Output = T>,
    {
        self.update(src, MultOp)
    }

    /// `self /= src`, componentwise.
    pub fn div_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Div<Output = T>,
    {
        self.update(src, DivOp)
    }

    fn update<E, F>(&mut self, src: &E, f: F) -> Result<()>
    where
        E: VecExpr<Elem = T>,
        F: crate::functor::BinaryFunctor<T>,
    {
        if self.len() != src.len() {
            return Err(ExprError::SizeMismatch(self.len(), src.len()));
        }
        let (begin, end) = self.bounds();
        check_lane_update(begin, end, self.unit_at(), self.real_at(), self, src, f)?;
        update_into(self, src, f, &EvalConfig::default())
    }

    /// `self = self x src`, three-element cross product.
    pub fn cross_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Mul<Output = T> + Sub<Output = T>,
    {
        if self.len() != 3 {
            return Err(ExprError::CrossSize(self.len()));
        }
        if src.len() != 3 {
            return Err(ExprError::CrossSize(src.len()));
        }
        let a = [self.get(0), self.get(1), self.get(2)];
        let b = [src.get(0), src.get(1), src.get(2)];
        let c = [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ];
        let (begin, end) = self.bounds();
        for (j, v) in c.iter().enumerate() {
            if j >= begin && j < end {
                continue;
            }
            let implied = if self.unit_at() == Some(j) {
                T::one()
            } else {
                T::default()
            };
            if *v != implied {
                return Err(ExprError::StructureViolation(
                    "cross product writes outside the lane's structure",
                ));
            }
        }
        if let Some(d) = self.real_at() {
            if d < 3 && c[d].conj() != c[d] {
                return Err(ExprError::StructureViolation(
                    "the diagonal of a Hermitian matrix must stay real",
                ));
            }
        }
        for (j, v) in c.into_iter().enumerate() {
            self.matrix.store_element(self.row, j, v);
        }
        Ok(())
    }

    /// Overwrite from a sparse right-hand side, element at a time.
    pub fn assign_sparse(&mut self, src: &SparseVector<T>) -> Result<()> {
        let (begin, end) = self.bounds();
        let unit_at = self.unit_at();
        let real_at = self.real_at();
        assign_sparse_lane(self, src, begin, end, unit_at, real_at)
    }

    /// Multiply the writable range of this row in place.
    pub fn scale(&mut self, factor: T) -> Result<()>
    where
        T: Mul<Output = T>,
    {
        if self.matrix.structure().is_uni() {
            return Err(ExprError::StructureViolation(
                "a unitriangular matrix cannot be scaled",
            ));
        }
        let (begin, end) = self.bounds();
        for j in begin..end {
            let v = self.get(j) * factor;
            self.matrix.store_element(self.row, j, v);
        }
        Ok(())
    }

    /// Divide the writable range of this row in place.
    ///
    /// Subject to the same uni-triangular restriction as [`Self::scale`].
    pub fn unscale(&mut self, divisor: T) -> Result<()>
    where
        T: Div<Output = T>,
    {
        if self.matrix.structure().is_uni() {
            return Err(ExprError::StructureViolation(
                "a unitriangular matrix cannot be scaled",
            ));
        }
        let (begin, end) = self.bounds();
        for j in begin..end {
            let v = self.get(j) / divisor;
            self.matrix.store_element(self.row, j, v);
        }
        Ok(())
    }

    /// Set every writable element of this row.
    pub fn fill(&mut self, value: T) {
        let (begin, end) = self.bounds();
        for j in begin..end {
            self.matrix.store_element(self.row, j, value);
        }
    }

    /// Reset every writable element of this row to the default value.
    pub fn reset(&mut self) {
        self.fill(T::default());
    }
}

impl<'a, T: Scalar + Conjugate + One> VecTarget for RowMut<'a, T> {
    type Elem = T;

    fn len(&self) -> usize {
        self.matrix.columns()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.matrix.get(self.row, index)
    }

    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self.matrix.store_element(self.row, index, value);
    }

    fn storage_id(&self) -> usize {
        self.matrix.storage_id()
    }

    fn can_simd(&self) -> bool {
        T::SIMD_ENABLED && self.matrix.order().is_row_major()
    }

    fn is_padded(&self) -> bool {
        self.matrix.is_padded() && self.matrix.order().is_row_major()
    }

    fn is_aligned(&self) -> bool {
        self.matrix.order().is_row_major()
            && self.matrix.index_of(self.row, 0) % PACK_WIDTH == 0
    }

    fn can_smp_assign(&self) -> bool {
        let s = self.matrix.structure();
        !s.is_symmetric() && !s.is_hermitian()
    }

    fn contiguous_mut(&mut self) -> Option<&mut [T]> {
        let s = self.matrix.structure();
        if !self.matrix.order().is_row_major() || s.is_symmetric() || s.is_hermitian() {
            return None;
        }
        let start = self.matrix.index_of(self.row, 0);
        let extent = if self.matrix.is_padded() {
            self.matrix.spacing()
        } else {
            self.matrix.columns()
        };
        Some(&mut self.matrix.data_mut()[start..start + extent])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseVector;
    use crate::structure::Structure;
    use num_complex::Complex64;

    #[test]
    fn test_index_validated_at_construction() {
        let m: DenseMatrix<f64> = DenseMatrix::zeros(2, 3);
        assert!(row(&m, 1).is_ok());
        assert!(row(&m, 2).is_err());
        assert!(row_at::<9, f64>(&m).is_err());
    }

    #[test]
    fn test_row_reads_across_columns() {
        let m = DenseMatrix::from_rows(&[&[1, 2, 3], &[4, 5, 6]]).unwrap();
        let r = row(&m, 1).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![4, 5, 6]);
        assert!(r.at(3).is_err());
    }

    #[test]
    fn test_row_major_row_is_pack_addressable() {
        let m: DenseMatrix<f64> = DenseMatrix::zeros(4, 4);
        assert!(VecExpr::can_simd(&row(&m, 0).unwrap()));
    }

    #[test]
    fn test_assign_expression_into_row() {
        let mut m: DenseMatrix<f64> = DenseMatrix::zeros(2, 3);
        let a = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        let b = DenseVector::from_slice(&[0.1, 0.2, 0.3]);
        row_mut(&mut m, 0).unwrap().assign(&(&a + &b)).unwrap();
        assert_eq!(m.get(0, 1), 2.2);
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn test_upper_row_clips_left_of_diagonal() {
        // Row 2 of an upper matrix is writable from column 2 on.
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(4, Structure::Upper);
        row_mut(&mut m, 2).unwrap().fill(7.0);
        assert_eq!(m.get(2, 1), 0.0);
        assert_eq!(m.get(2, 2), 7.0);
        assert_eq!(m.get(2, 3), 7.0);
    }

    #[test]
    fn test_hermitian_row_diagonal_stays_real() {
        let mut m: DenseMatrix<Complex64> = DenseMatrix::with_structure(2, Structure::Hermitian);
        let bad = DenseVector::from_slice(&[
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 3.0),
        ]);
        let err = row_mut(&mut m, 1).unwrap().assign(&bad).unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        assert_eq!(m.get(1, 1), Complex64::new(0.0, 0.0));

        let ok = DenseVector::from_slice(&[
            Complex64::new(1.0, 2.0),
            Complex64::new(4.0, 0.0),
        ]);
        row_mut(&mut m, 1).unwrap().assign(&ok).unwrap();
        assert_eq!(m.get(1, 1), Complex64::new(4.0, 0.0));
        assert_eq!(m.get(0, 1), Complex64::new(1.0, -2.0));
    }

    #[test]
    fn test_structured_row_assign_rejects_spill() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::Upper);
        let bad = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        assert!(row_mut(&mut m, 1).unwrap().assign(&bad).is_err());
        let ok = DenseVector::from_slice(&[0.0, 2.0, 3.0]);
        row_mut(&mut m, 1).unwrap().assign(&ok).unwrap();
        assert_eq!(m.get(1, 2), 3.0);
    }
}
