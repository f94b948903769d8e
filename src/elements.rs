//! Arbitrary element selections of a dense vector.
//!
//! An elements view gathers a caller-chosen list of indices into a
//! vector-shaped operand. Selections are typically short, so the index list
//! lives in a small-vector that stays inline for up to eight indices.
//! Indices may repeat in a read-only selection; never pack-addressable.

use crate::dense::DenseVector;
use crate::eval::{
    assign_into, assign_sparse_into, cross_into, update_into, EvalConfig, VecTarget,
};
use crate::expr::{impl_vec_ops, VecExpr};
use crate::functor::{AddOp, DivOp, MultOp, SubOp};
use crate::simd::{Pack, Scalar, PACK_WIDTH};
use crate::sparse::SparseVector;
use crate::{ExprError, Result};
use smallvec::SmallVec;
use std::ops::{Add, Div, Mul, Sub};

type IndexList = SmallVec<[usize; 8]>;

fn validate(indices: &[usize], extent: usize) -> Result<IndexList> {
    for &i in indices {
        if i >= extent {
            return Err(ExprError::OutOfRange { index: i, extent });
        }
    }
    Ok(IndexList::from_slice(indices))
}

/// Read-only selection of vector elements.
#[derive(Debug, Clone)]
pub struct Elements<'a, T: Scalar> {
    vector: &'a DenseVector<T>,
    indices: IndexList,
}

/// Selection `indices` of `vector`, in the given order.
pub fn elements<'a, T: Scalar>(
    vector: &'a DenseVector<T>,
    indices: &[usize],
) -> Result<Elements<'a, T>> {
    let indices = validate(indices, vector.len())?;
    Ok(Elements { vector, indices })
}

impl<'a, T: Scalar> Elements<'a, T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The selected index at position `index`.
    pub fn index_of(&self, index: usize) -> usize {
        self.indices[index]
    }

    pub fn at(&self, index: usize) -> Result<T> {
        if index >= self.indices.len() {
            return Err(ExprError::OutOfRange {
                index,
                extent: self.indices.len(),
            });
        }
        Ok(self.vector.get(self.indices[index]))
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.vector.get(self.indices[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.indices.iter().map(move |&i| self.vector.get(i))
    }
}

impl<'a, T: Scalar> VecExpr for Elements<'a, T> {
    type Elem = T;
    // A gather has no packed form.
    const SIMD_ENABLED: bool = false;

    fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        Elements::get(self, index)
    }

    fn can_simd(&self) -> bool {
        false
    }

    fn load_pack(&self, index: usize) -> Pack<T> {
        let mut lanes = [T::default(); PACK_WIDTH];
        for (k, lane) in lanes.iter_mut().enumerate() {
            if index + k < self.indices.len() {
                *lane = self.get(index + k);
            }
        }
        Pack(lanes)
    }

    fn can_alias(&self, id: usize) -> bool {
        self.vector.is_aliased(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.vector.is_aliased(id)
    }

    fn is_aligned(&self) -> bool {
        false
    }
}

impl_vec_ops!(['a, T: Scalar], Elements<'a, T>);

/// Mutable selection of vector elements.
///
/// Rejects duplicate indices: two selection positions writing the same
/// element would make the assignment order-dependent.
#[derive(Debug)]
pub struct ElementsMut<'a, T: Scalar> {
    vector: &'a mut DenseVector<T>,
    indices: IndexList,
}

/// Mutable selection `indices` of `vector`.
pub fn elements_mut<'a, T: Scalar>(
    vector: &'a mut DenseVector<T>,
    indices: &[usize],
) -> Result<ElementsMut<'a, T>> {
    let indices = validate(indices, vector.len())?;
    let mut sorted: IndexList = indices.clone();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(ExprError::StructureViolation(
            "a mutable selection may not repeat an index",
        ));
    }
    Ok(ElementsMut { vector, indices })
}

impl<'a, T: Scalar> ElementsMut<'a, T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn at(&self, index: usize) -> Result<T> {
        if index >= self.indices.len() {
            return Err(ExprError::OutOfRange {
                index,
                extent: self.indices.len(),
            });
        }
        Ok(self.vector.get(self.indices[index]))
    }

    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.vector.get(self.indices[index])
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        let i = self.indices[index];
        self.vector.set(i, value);
    }

    /// Plain assignment, `self = src`.
    pub fn assign<E: VecExpr<Elem = T>>(&mut self, src: &E) -> Result<()> {
        assign_into(self, src, &EvalConfig::default())
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

    /// Multiply every selected element in place.
    pub fn scale(&mut self, factor: T)
    where
        T: Mul<Output = T>,
    {
        for i in 0..self.len() {
            let v = self.get(i) * factor;
            self.set(i, v);
        }
    }

    /// Divide every selected element in place.
    pub fn unscale(&mut self, divisor: T)
    where
        T: Div<Output = T>,
    {
        for i in 0..self.len() {
            let v = self.get(i) / divisor;
            self.set(i, v);
        }
    }

    /// Set every selected element.
    pub fn fill(&mut self, value: T) {
        for i in 0..self.len() {
            self.set(i, value);
        }
    }

    /// Reset every selected element to the default value.
    pub fn reset(&mut self) {
        self.fill(T::default());
    }
}

impl<'a, T: Scalar> VecTarget for ElementsMut<'a, T> {
    type Elem = T;

    fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        ElementsMut::get(self, index)
    }

    #[inline]
    fn set(&mut self, index: usize, value: T) {
        ElementsMut::set(self, index, value);
    }

    fn storage_id(&self) -> usize {
        self.vector.storage_id()
    }

    fn can_simd(&self) -> bool {
        false
    }

    fn is_padded(&self) -> bool {
        false
    }

    fn is_aligned(&self) -> bool {
        false
    }

    fn can_smp_assign(&self) -> bool {
        // A scatter is kept on the sequential path.
        false
    }

    fn contiguous_mut(&mut self) -> Option<&mut [T]> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_validated_at_construction() {
        let v = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        assert!(elements(&v, &[0, 2]).is_ok());
        assert!(matches!(
            elements(&v, &[0, 3]).unwrap_err(),
            ExprError::OutOfRange { index: 3, extent: 3 }
        ));
    }

    #[test]
    fn test_gather_in_selection_order() {
        let v = DenseVector::from_slice(&[10, 20, 30, 40]);
        let e = elements(&v, &[3, 0, 3]).unwrap();
        assert_eq!(e.iter().collect::<Vec<_>>(), vec![40, 10, 40]);
        assert_eq!(e.index_of(1), 0);
    }

    #[test]
    fn test_mutable_selection_rejects_duplicates() {
        let mut v = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        assert!(elements_mut(&mut v, &[0, 2]).is_ok());
        assert!(elements_mut(&mut v, &[2, 0, 2]).is_err());
    }

    #[test]
    fn test_scatter_assignment() {
        let src = DenseVector::from_slice(&[7.0, 8.0]);
        let mut v = DenseVector::from_slice(&[0.0; 4]);
        elements_mut(&mut v, &[3, 1]).unwrap().assign(&src).unwrap();
        assert_eq!(v.as_slice(), &[0.0, 8.0, 0.0, 7.0]);
    }

    #[test]
    fn test_selection_as_operand() {
        let v = DenseVector::from_slice(&[1, 2, 3, 4]);
        let evens = elements(&v, &[0, 2]).unwrap();
        let odds = elements(&v, &[1, 3]).unwrap();
        let sum = (evens + odds).eval();
        assert_eq!(sum.as_slice(), &[3, 7]);
    }

    #[test]
    fn test_selection_never_pack_addressable() {
        let v = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        let e = elements(&v, &[0, 1]).unwrap();
        assert!(!VecExpr::can_simd(&e));
    }
}
