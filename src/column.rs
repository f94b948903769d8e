//! Column views of a dense matrix.
//!
//! A column behaves as a vector whose length is re-derived from the live
//! matrix. Reading is oblivious to the matrix's structure tag; writing runs
//! the lane structure check first, clips fills and scales to the writable
//! row range, and mirrors element stores through symmetric and Hermitian
//! adaptors. The column index is validated once at construction, including
//! for the const-generic constructors.

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

/// Read-only view of one matrix column.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a, T: Scalar> {
    matrix: &'a DenseMatrix<T>,
    col: usize,
}

/// View of column `col` of `matrix`.
pub fn column<T: Scalar>(matrix: &DenseMatrix<T>, col: usize) -> Result<Column<'_, T>> {
    if col >= matrix.columns() {
        return Err(ExprError::OutOfRange {
            index: col,
            extent: matrix.columns(),
        });
    }
    Ok(Column { matrix, col })
}

/// View of the statically-chosen column `J`; the index is still validated
/// against the runtime extent.
pub fn column_at<const J: usize, T: Scalar>(matrix: &DenseMatrix<T>) -> Result<Column<'_, T>> {
    column(matrix, J)
}

impl<'a, T: Scalar> Column<'a, T> {
    #[inline]
    pub fn index(&self) -> usize {
        self.col
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrix.rows() == 0
    }

    pub fn at(&self, index: usize) -> Result<T> {
        self.matrix.at(index, self.col)
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.matrix.get(index, self.col)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

impl<'a, T: Scalar> VecExpr for Column<'a, T> {
    type Elem = T;
    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn len(&self) -> usize {
        self.matrix.rows()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.matrix.get(index, self.col)
    }

    fn can_simd(&self) -> bool {
        // Contiguous only in column-major storage.
        T::SIMD_ENABLED && self.matrix.order().is_column_major()
    }

    #[inline]
    fn load_pack(&self, index: usize) -> Pack<T> {
        Pack::load(self.matrix.data(), self.matrix.index_of(index, self.col))
    }

    fn can_alias(&self, id: usize) -> bool {
        self.matrix.is_aliased(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.matrix.is_aliased(id)
    }

    fn is_padded(&self) -> bool {
        self.matrix.is_padded() && self.matrix.order().is_column_major()
    }

    fn is_aligned(&self) -> bool {
        self.matrix.order().is_column_major()
            && self.matrix.index_of(0, self.col) % PACK_WIDTH == 0
    }
}

impl_vec_ops!(['a, T: Scalar], Column<'a, T>);

/// Mutable view of one matrix column.
#[derive(Debug)]
pub struct ColumnMut<'a, T: Scalar> {
    matrix: &'a mut DenseMatrix<T>,
    col: usize,
}

/// Mutable view of column `col` of `matrix`.
pub fn column_mut<T: Scalar>(matrix: &mut DenseMatrix<T>, col: usize) -> Result<ColumnMut<'_, T>> {
    if col >= matrix.columns() {
        return Err(ExprError::OutOfRange {
            index: col,
            extent: matrix.columns(),
        });
    }
    Ok(ColumnMut { matrix, col })
}

/// Mutable view of the statically-chosen column `J`.
pub fn column_mut_at<const J: usize, T: Scalar>(
    matrix: &mut DenseMatrix<T>,
) -> Result<ColumnMut<'_, T>> {
    column_mut(matrix, J)
}

impl<'a, T: Scalar> ColumnMut<'a, T> {
    #[inline]
    pub fn index(&self) -> usize {
        self.col
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrix.rows() == 0
    }

    pub fn at(&self, index: usize) -> Result<T> {
        self.matrix.at(index, self.col)
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.matrix.get(index, self.col)
    }

    /// Writable row range of this column under the matrix's structure tag.
    fn bounds(&self) -> (usize, usize) {
        self.matrix.structure().column_bounds(self.col, self.len())
    }

    fn unit_at(&self) -> Option<usize> {
        self.matrix.structure().is_uni().then_some(self.col)
    }

    /// Row at which this column crosses a Hermitian diagonal, if any.
    fn real_at(&self) -> Option<usize> {
        self.matrix.structure().is_hermitian().then_some(self.col)
    }
}

impl<'a, T: Scalar + Conjugate + One> ColumnMut<'a, T> {
    /// Structure-checked element write, mirrored through symmetric and
    /// Hermitian adaptors.
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.matrix.set(index, self.col, value)
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
    ///
    /// The computed result must still satisfy the matrix's structure tag.
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
        for (i, v) in c.iter().enumerate() {
            if i >= begin && i < end {
                continue;
            }
            let implied = if self.unit_at() == Some(i) {
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
        for (i, v) in c.into_iter().enumerate() {
            self.matrix.store_element(i, self.col, v);
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

    /// Multiply the writable range of this column in place.
    ///
    /// Rejected for uni-triangular matrices, whose unit diagonal cannot
    /// scale.
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
        for i in begin..end {
            let v = self.get(i) * factor;
            self.matrix.store_element(i, self.col, v);
        }
        Ok(())
    }

    /// Divide the writable range of this column in place.
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
        for i in begin..end {
            let v = self.get(i) / divisor;
            self.matrix.store_element(i, self.col, v);
        }
        Ok(())
    }

    /// Set every writable element of this column.
    pub fn fill(&mut self, value: T) {
        let (begin, end) = self.bounds();
        for i in begin..end {
            self.matrix.store_element(i, self.col, value);
        }
    }

    /// Reset every writable element of this column to the default value.
    pub fn reset(&mut self) {
        self.fill(T::default());
    }
}

impl<'a, T: Scalar + Conjugate + One> VecTarget for ColumnMut<'a, T> {
    type Elem = T;

    fn len(&self) -> usize {
        self.matrix.rows()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.matrix.get(index, self.col)
    }

    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self.matrix.store_element(index, self.col, value);
    }

    fn storage_id(&self) -> usize {
        self.matrix.storage_id()
    }

    fn can_simd(&self) -> bool {
        T::SIMD_ENABLED && self.matrix.order().is_column_major()
    }

    fn is_padded(&self) -> bool {
        self.matrix.is_padded() && self.matrix.order().is_column_major()
    }

    fn is_aligned(&self) -> bool {
        self.matrix.order().is_column_major()
            && self.matrix.index_of(0, self.col) % PACK_WIDTH == 0
    }

    fn can_smp_assign(&self) -> bool {
        let s = self.matrix.structure();
        !s.is_symmetric() && !s.is_hermitian()
    }

    fn contiguous_mut(&mut self) -> Option<&mut [T]> {
        let s = self.matrix.structure();
        if !self.matrix.order().is_column_major() || s.is_symmetric() || s.is_hermitian() {
            // Mirrored stores have side effects; force the elementwise path.
            return None;
        }
        let start = self.matrix.index_of(0, self.col);
        let extent = if self.matrix.is_padded() {
            self.matrix.spacing()
        } else {
            self.matrix.rows()
        };
        Some(&mut self.matrix.data_mut()[start..start + extent])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{StorageOrder, Structure};
    use num_complex::Complex64;

    #[test]
    fn test_index_validated_at_construction() {
        let m: DenseMatrix<f64> = DenseMatrix::zeros(3, 2);
        assert!(column(&m, 1).is_ok());
        assert!(matches!(
            column(&m, 2).unwrap_err(),
            ExprError::OutOfRange { index: 2, extent: 2 }
        ));
        assert!(column_at::<5, f64>(&m).is_err());
    }

    #[test]
    fn test_round_trip_through_column() {
        let mut m: DenseMatrix<f64> = DenseMatrix::zeros(3, 3);
        let src = crate::dense::DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        column_mut(&mut m, 1).unwrap().assign(&src).unwrap();

        let c = column(&m, 1).unwrap();
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(m.get(0, 0), 0.0);
        assert_eq!(m.get(2, 2), 0.0);
    }

    #[test]
    fn test_column_major_column_is_pack_addressable() {
        let rm: DenseMatrix<f64> = DenseMatrix::zeros(4, 4);
        let cm: DenseMatrix<f64> = DenseMatrix::with_order(4, 4, StorageOrder::ColumnMajor);
        assert!(!VecExpr::can_simd(&column(&rm, 0).unwrap()));
        assert!(VecExpr::can_simd(&column(&cm, 0).unwrap()));
    }

    #[test]
    fn test_assign_into_lower_column_requires_zero_top() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::Lower);

        let ok = crate::dense::DenseVector::from_slice(&[0.0, 5.0, 6.0]);
        column_mut(&mut m, 1).unwrap().assign(&ok).unwrap();
        assert_eq!(m.get(1, 1), 5.0);

        let bad = crate::dense::DenseVector::from_slice(&[7.0, 5.0, 6.0]);
        let err = column_mut(&mut m, 1).unwrap().assign(&bad).unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        // Nothing was written.
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(1, 1), 5.0);
    }

    #[test]
    fn test_fill_clips_to_writable_range() {
        // Strictly lower, 5x5, column 2: only rows 3 and 4 are writable.
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(5, Structure::StrictlyLower);
        column_mut(&mut m, 2).unwrap().fill(8.0);
        for i in 0..5 {
            let expected = if i > 2 { 8.0 } else { 0.0 };
            assert_eq!(m.get(i, 2), expected, "row {i}");
        }
    }

    #[test]
    fn test_scale_rejected_for_uni() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::UniLower);
        let err = column_mut(&mut m, 0).unwrap().scale(2.0).unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        assert_eq!(m.get(0, 0), 1.0);
    }

    #[test]
    fn test_symmetric_column_write_mirrors() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::Symmetric);
        let src = crate::dense::DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        column_mut(&mut m, 0).unwrap().assign(&src).unwrap();
        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.get(0, 2), 3.0);
    }

    #[test]
    fn test_hermitian_column_diagonal_stays_real() {
        let mut m: DenseMatrix<Complex64> = DenseMatrix::with_structure(2, Structure::Hermitian);

        let bad = crate::dense::DenseVector::from_slice(&[
            Complex64::new(0.0, 5.0),
            Complex64::new(1.0, 0.0),
        ]);
        let err = column_mut(&mut m, 0).unwrap().assign(&bad).unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        assert_eq!(m.get(0, 0), Complex64::new(0.0, 0.0));

        let ok = crate::dense::DenseVector::from_slice(&[
            Complex64::new(2.0, 0.0),
            Complex64::new(1.0, 1.0),
        ]);
        column_mut(&mut m, 0).unwrap().assign(&ok).unwrap();
        assert_eq!(m.get(0, 0), Complex64::new(2.0, 0.0));
        assert_eq!(m.get(0, 1), Complex64::new(1.0, -1.0));

        // A compound update that turns the diagonal complex is rejected too.
        let delta = crate::dense::DenseVector::from_slice(&[
            Complex64::new(0.0, 1.0),
            Complex64::new(0.0, 0.0),
        ]);
        assert!(column_mut(&mut m, 0).unwrap().add_assign(&delta).is_err());
        assert_eq!(m.get(0, 0), Complex64::new(2.0, 0.0));
    }

    #[test]
    fn test_mirrored_column_refuses_concurrent_stores() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::Symmetric);
        let mut c = column_mut(&mut m, 0).unwrap();
        assert!(!VecTarget::can_smp_assign(&c));
        assert!(c.contiguous_mut().is_none());

        let mut g: DenseMatrix<f64> =
            DenseMatrix::with_order(3, 3, StorageOrder::ColumnMajor);
        assert!(VecTarget::can_smp_assign(&column_mut(&mut g, 0).unwrap()));
    }

    #[test]
    fn test_sparse_into_structured_column() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(4, Structure::Lower);
        let ok = SparseVector::from_pairs(4, &[(2, 3.0)]).unwrap();
        column_mut(&mut m, 1).unwrap().assign_sparse(&ok).unwrap();
        assert_eq!(m.get(2, 1), 3.0);

        let bad = SparseVector::from_pairs(4, &[(0, 3.0)]).unwrap();
        assert!(column_mut(&mut m, 1)
            .unwrap()
            .assign_sparse(&bad)
            .is_err());
    }
}
