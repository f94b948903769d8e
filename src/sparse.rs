//! Sparse vector collaborator: sorted index/value storage.
//!
//! The assignment layer consumes a sparse right-hand side one index/value
//! pair at a time from sorted-index iteration, which is what allows it to
//! skip the alias temporary on that path.

use crate::simd::Scalar;
use crate::{ExprError, Result};

/// A sparse vector holding only its non-default elements, sorted by index.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector<T: Scalar> {
    len: usize,
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: Scalar> SparseVector<T> {
    /// An empty sparse vector of logical length `len`.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from index/value pairs; indices need not be pre-sorted.
    ///
    /// A duplicate or out-of-range index is rejected.
    pub fn from_pairs(len: usize, pairs: &[(usize, T)]) -> Result<Self> {
        let mut sorted: Vec<(usize, T)> = pairs.to_vec();
        sorted.sort_by_key(|(i, _)| *i);
        let mut indices = Vec::with_capacity(sorted.len());
        let mut values = Vec::with_capacity(sorted.len());
        for (i, v) in sorted {
            if i >= len {
                return Err(ExprError::OutOfRange {
                    index: i,
                    extent: len,
                });
            }
            if indices.last() == Some(&i) {
                return Err(ExprError::StructureViolation(
                    "duplicate index in sparse constructor",
                ));
            }
            indices.push(i);
            values.push(v);
        }
        Ok(Self {
            len,
            indices,
            values,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored elements.
    #[inline]
    pub fn non_zeros(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Element access; absent positions read as the default value.
    pub fn get(&self, index: usize) -> T {
        debug_assert!(index < self.len, "sparse index out of bounds");
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => T::default(),
        }
    }

    /// Bounds-checked element access.
    pub fn at(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(ExprError::OutOfRange {
                index,
                extent: self.len,
            });
        }
        Ok(self.get(index))
    }

    /// Insert or overwrite one element.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        if index >= self.len {
            return Err(ExprError::OutOfRange {
                index,
                extent: self.len,
            });
        }
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos] = value,
            Err(pos) => {
                self.indices.insert(pos, index);
                self.values.insert(pos, value);
            }
        }
        Ok(())
    }

    /// Drop all stored elements.
    pub fn reset(&mut self) {
        self.indices.clear();
        self.values.clear();
    }

    /// Sorted iteration over the stored `(index, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Identity of the backing allocation, for alias analysis.
    #[inline]
    pub fn storage_id(&self) -> usize {
        self.values.as_ptr() as usize
    }

    #[inline]
    pub fn is_aliased(&self, id: usize) -> bool {
        self.storage_id() == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_sorts() {
        let v = SparseVector::from_pairs(6, &[(4, 2.0), (1, 5.0)]).unwrap();
        let pairs: Vec<_> = v.iter().collect();
        assert_eq!(pairs, vec![(1, 5.0), (4, 2.0)]);
        assert_eq!(v.non_zeros(), 2);
    }

    #[test]
    fn test_absent_reads_default() {
        let v = SparseVector::from_pairs(4, &[(2, 7.0)]).unwrap();
        assert_eq!(v.get(1), 0.0);
        assert_eq!(v.get(2), 7.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(SparseVector::from_pairs(3, &[(3, 1.0)]).is_err());
        let mut v: SparseVector<f64> = SparseVector::new(3);
        assert!(v.insert(5, 1.0).is_err());
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut v: SparseVector<i32> = SparseVector::new(10);
        v.insert(7, 1).unwrap();
        v.insert(2, 2).unwrap();
        v.insert(7, 3).unwrap();
        let pairs: Vec<_> = v.iter().collect();
        assert_eq!(pairs, vec![(2, 2), (7, 3)]);
    }
}
