//! Contiguous slice views of a dense vector.
//!
//! A subvector is a zero-copy window `[offset, offset + len)` over a dense
//! vector. The immutable view participates in expressions like any other
//! vector operand; the mutable view carries the full assignment surface.
//! The window is validated once at construction.

use crate::dense::DenseVector;
use crate::eval::{
    assign_into, assign_sparse_into, cross_into, update_into, EvalConfig, VecTarget,
};
use crate::expr::{impl_vec_ops, VecExpr};
use crate::functor::{AddOp, DivOp, MultOp, SubOp};
use crate::simd::{Pack, Scalar, PACK_WIDTH};
use crate::sparse::SparseVector;
use crate::{ExprError, Result};
use std::ops::{Add, Div, Mul, Sub};

/// Read-only window over a dense vector.
#[derive(Debug, Clone, Copy)]
pub struct Subvector<'a, T: Scalar> {
    vector: &'a DenseVector<T>,
    offset: usize,
    len: usize,
}

/// View `[offset, offset + len)` of `vector`.
pub fn subvector<T: Scalar>(
    vector: &DenseVector<T>,
    offset: usize,
    len: usize,
) -> Result<Subvector<'_, T>> {
    // checked_add keeps pathological offsets from wrapping past the check.
    let end = offset.checked_add(len).unwrap_or(usize::MAX);
    if end > vector.len() {
        return Err(ExprError::OutOfRange {
            index: end,
            extent: vector.len(),
        });
    }
    Ok(Subvector {
        vector,
        offset,
        len,
    })
}

impl<'a, T: Scalar> Subvector<'a, T> {
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounds-checked element access.
    pub fn at(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(ExprError::OutOfRange {
                index,
                extent: self.len,
            });
        }
        Ok(self.vector.get(self.offset + index))
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        debug_assert!(index < self.len, "subvector index out of bounds");
        self.vector.get(self.offset + index)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}

impl<'a, T: Scalar> VecExpr for Subvector<'a, T> {
    type Elem = T;
    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        Subvector::get(self, index)
    }

    fn can_simd(&self) -> bool {
        T::SIMD_ENABLED
    }

    #[inline]
    fn load_pack(&self, index: usize) -> Pack<T> {
        Pack::load(self.vector.storage(), self.offset + index)
    }

    fn can_alias(&self, id: usize) -> bool {
        self.vector.is_aliased(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.vector.is_aliased(id)
    }

    fn is_padded(&self) -> bool {
        // Only a full-width window inherits the padding of its vector.
        self.offset == 0 && self.len == self.vector.len() && self.vector.is_padded()
    }

    fn is_aligned(&self) -> bool {
        self.offset % PACK_WIDTH == 0
    }
}

impl_vec_ops!(['a, T: Scalar], Subvector<'a, T>);

/// Mutable window over a dense vector.
#[derive(Debug)]
pub struct SubvectorMut<'a, T: Scalar> {
    vector: &'a mut DenseVector<T>,
    offset: usize,
    len: usize,
}

/// Mutable view `[offset, offset + len)` of `vector`.
pub fn subvector_mut<T: Scalar>(
    vector: &mut DenseVector<T>,
    offset: usize,
    len: usize,
) -> Result<SubvectorMut<'_, T>> {
    let end = offset.checked_add(len).unwrap_or(usize::MAX);
    if end > vector.len() {
        return Err(ExprError::OutOfRange {
            index: end,
            extent: vector.len(),
        });
    }
    Ok(SubvectorMut {
        vector,
        offset,
        len,
    })
}

impl<'a, T: Scalar> SubvectorMut<'a, T> {
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn at(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(ExprError::OutOfRange {
                index,
                extent: self.len,
            });
        }
        Ok(self.vector.get(self.offset + index))
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        debug_assert!(index < self.len, "subvector index out of bounds");
        self.vector.get(self.offset + index)
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        debug_assert!(index < self.len, "subvector index out of bounds");
        self.vector.set(self.offset + index, value);
    }

    /// Plain assignment, `self = src`.
    pub fn assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()> {
        assign_into(self, src, &EvalConfig::default())
    }

    /// Plain assignment with explicit evaluation knobs.
    pub fn assign_with<E: VecExpr<Elem = T>>(&mut self, src: &E, cfg: &EvalConfig) -> Result<()> {
        assign_into(self, src, cfg)
    }

    /// `self += src`, componentwise.
    pub fn add_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Add<Output = T>,
    {
        update_into(self, src, AddOp, &EvalConfig::default())
    }

    /// `self -= src`, componentwise.
    pub fn sub_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Sub<Output = T>,
    {
        update_into(self, src, SubOp, &EvalConfig::default())
    }

    /// `self *= src`, componentwise.
    pub fn mul_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Mul<Output = T>,
    {
        update_into(self, src, MultOp, &EvalConfig::default())
    }

    /// `self /= src`, componentwise.
    pub fn div_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Div<Output = T>,
    {
        update_into(self, src, DivOp, &EvalConfig::default())
    }

    /// `self = self x src`, three-element cross product.
    pub fn cross_assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Mul<Output = T> + Sub<Output = T>,
    {
        cross_into(self, src)
    }

    /// Overwrite from a sparse right-hand side.
    pub fn assign_sparse(&mut self, src: &SparseVector<T>) -> Result<()> {
        assign_sparse_into(self, src)
    }

    /// Multiply every element of the window in place.
    pub fn scale(&mut self, factor: T)
    where
        T: Mul<Output = T>,
    {
        for i in 0..self.len {
            let v = self.get(i) * factor;
            self.set(i, v);
        }
    }

    /// Divide every element of the window in place.
    pub fn unscale(&mut self, divisor: T)
    where
        T: Div<Output = T>,
    {
        for i in 0..self.len {
            let v = self.get(i) / divisor;
            self.set(i, v);
        }
    }

    /// Set every element of the window.
    pub fn fill(&mut self, value: T) {
        for i in 0..self.len {
            self.set(i, value);
        }
    }

    /// Reset every element of the window to the default value.
    pub fn reset(&mut self) {
        self.fill(T::default());
    }
}

impl<'a, T: Scalar> VecTarget for SubvectorMut<'a, T> {
    type Elem = T;

    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        SubvectorMut::get(self, index)
    }

    #[inline]
    fn set(&mut self, index: usize, value: T) {
        SubvectorMut::set(self, index, value);
    }

    fn storage_id(&self) -> usize {
        self.vector.storage_id()
    }

    fn can_simd(&self) -> bool {
        T::SIMD_ENABLED
    }

    fn is_padded(&self) -> bool {
        false
    }

    fn is_aligned(&self) -> bool {
        self.offset % PACK_WIDTH == 0
    }

    fn can_smp_assign(&self) -> bool {
        true
    }

    fn contiguous_mut(&mut self) -> Option<&mut [T]> {
        let range = self.offset..self.offset + self.len;
        Some(&mut self.vector.storage_mut()[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds_validated() {
        let mut v = DenseVector::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert!(subvector(&v, 1, 3).is_ok());
        assert!(matches!(
            subvector(&v, 2, 3).unwrap_err(),
            ExprError::OutOfRange { index: 5, extent: 4 }
        ));
        // An end past usize::MAX must not wrap back into range.
        assert!(subvector(&v, usize::MAX, 2).is_err());
        assert!(subvector(&v, 2, usize::MAX).is_err());
        assert!(subvector_mut(&mut v, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_window_alignment_follows_offset() {
        let v: DenseVector<f64> = DenseVector::zeros(3 * PACK_WIDTH);
        assert!(VecExpr::is_aligned(&subvector(&v, 0, PACK_WIDTH).unwrap()));
        assert!(VecExpr::is_aligned(
            &subvector(&v, PACK_WIDTH, PACK_WIDTH).unwrap()
        ));
        assert!(!VecExpr::is_aligned(&subvector(&v, 3, PACK_WIDTH).unwrap()));
    }

    #[test]
    fn test_reads_offset_into_vector() {
        let v = DenseVector::from_slice(&[10, 20, 30, 40]);
        let sv = subvector(&v, 1, 2).unwrap();
        assert_eq!(sv.get(0), 20);
        assert_eq!(sv.at(1).unwrap(), 30);
        assert!(sv.at(2).is_err());
        assert_eq!(sv.iter().collect::<Vec<_>>(), vec![20, 30]);
    }

    #[test]
    fn test_assign_expression_into_window() {
        let a = DenseVector::from_slice(&[1.0, 2.0]);
        let b = DenseVector::from_slice(&[10.0, 20.0]);
        let mut v = DenseVector::from_slice(&[0.0; 4]);
        let mut sv = subvector_mut(&mut v, 1, 2).unwrap();
        sv.assign(&(&a + &b)).unwrap();
        assert_eq!(v.as_slice(), &[0.0, 11.0, 22.0, 0.0]);
    }

    #[test]
    fn test_windows_as_operands() {
        let v = DenseVector::from_slice(&[1, 2, 3, 4, 5, 6]);
        let lo = subvector(&v, 0, 3).unwrap();
        let hi = subvector(&v, 3, 3).unwrap();
        let sum = (lo + hi).eval();
        assert_eq!(sum.as_slice(), &[5, 7, 9]);
    }

    #[test]
    fn test_compound_and_fill() {
        let mut v = DenseVector::from_slice(&[1.0, 1.0, 1.0, 1.0]);
        let inc = DenseVector::from_slice(&[5.0, 5.0]);
        {
            let mut sv = subvector_mut(&mut v, 0, 2).unwrap();
            sv.add_assign(&inc).unwrap();
        }
        {
            let mut sv = subvector_mut(&mut v, 2, 2).unwrap();
            sv.fill(9.0);
            sv.scale(2.0);
            sv.unscale(3.0);
        }
        assert_eq!(v.as_slice(), &[6.0, 6.0, 6.0, 6.0]);
    }
}
