//! Dense containers: the storage collaborators the view and expression
//! layers bind to.
//!
//! Both containers expose the narrow interface the rest of the crate
//! consumes: extents, checked `at` plus unchecked `get`, raw `data`,
//! iteration, `storage_id`/`is_aliased` for alias analysis, `capacity` and
//! `non_zeros`. The matrix carries its storage order and its structural
//! adaptor as tags fixed at construction; every mutation is checked against
//! the adaptor so a declared guarantee can never be silently violated.

use crate::functor::Conjugate;
use crate::simd::{Scalar, PACK_WIDTH};
use crate::structure::{StorageOrder, Structure};
use crate::{ExprError, Result};
use num_traits::One;

/// Round a length up to the next multiple of the pack width.
#[inline]
fn padded_len(len: usize) -> usize {
    len.div_ceil(PACK_WIDTH) * PACK_WIDTH
}

/// An owned dense vector with contiguous storage.
///
/// Optionally padded to a pack-width multiple so the packed kernels can skip
/// their scalar remainder tail.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector<T: Scalar> {
    data: Vec<T>,
    len: usize,
    padded: bool,
}

impl<T: Scalar> DenseVector<T> {
    /// A vector of `len` default ("zero") elements.
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![T::default(); len],
            len,
            padded: false,
        }
    }

    /// A zero vector whose storage is padded to a pack-width multiple.
    pub fn zeros_padded(len: usize) -> Self {
        Self {
            data: vec![T::default(); padded_len(len)],
            len,
            padded: true,
        }
    }

    pub fn from_slice(values: &[T]) -> Self {
        Self {
            data: values.to_vec(),
            len: values.len(),
            padded: false,
        }
    }

    /// Build from a function of the index.
    pub fn from_fn(len: usize, f: impl FnMut(usize) -> T) -> Self {
        Self {
            data: (0..len).map(f).collect(),
            len,
            padded: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity in elements, including padding.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Whether the storage is padded to a pack-width multiple.
    #[inline]
    pub fn is_padded(&self) -> bool {
        self.padded
    }

    /// Number of elements differing from the default value.
    pub fn non_zeros(&self) -> usize {
        self.as_slice().iter().filter(|v| **v != T::default()).count()
    }

    /// Reset every element to the default value.
    pub fn reset(&mut self) {
        self.data.fill(T::default());
    }

    /// Bounds-checked element access.
    pub fn at(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(ExprError::OutOfRange {
                index,
                extent: self.len,
            });
        }
        Ok(self.data[index])
    }

    /// Unchecked-by-default subscript (debug-asserted).
    #[inline]
    pub fn get(&self, index: usize) -> T {
        debug_assert!(index < self.len, "vector index out of bounds");
        self.data[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        debug_assert!(index < self.len, "vector index out of bounds");
        self.data[index] = value;
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data[..self.len]
    }

    /// Backing storage including padding.
    #[inline]
    pub(crate) fn storage(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub(crate) fn storage_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Identity of the backing allocation, for alias analysis.
    #[inline]
    pub fn storage_id(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// Whether `id` names this vector's backing allocation.
    #[inline]
    pub fn is_aliased(&self, id: usize) -> bool {
        self.storage_id() == id
    }
}

/// An owned dense matrix with a storage-order tag and a structural adaptor
/// tag, both fixed at construction.
///
/// `spacing` is the allocated distance between consecutive major lines
/// (rows for row-major, columns for column-major); it exceeds the minor
/// extent when the storage is padded.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T: Scalar> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
    spacing: usize,
    order: StorageOrder,
    structure: Structure,
    padded: bool,
}

impl<T: Scalar> DenseMatrix<T> {
    /// A general row-major matrix of default elements.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::with_order(rows, cols, StorageOrder::RowMajor)
    }

    /// A general matrix of default elements with the given storage order.
    pub fn with_order(rows: usize, cols: usize, order: StorageOrder) -> Self {
        let spacing = match order {
            StorageOrder::RowMajor => cols,
            StorageOrder::ColumnMajor => rows,
        };
        let lines = match order {
            StorageOrder::RowMajor => rows,
            StorageOrder::ColumnMajor => cols,
        };
        Self {
            data: vec![T::default(); spacing * lines],
            rows,
            cols,
            spacing,
            order,
            structure: Structure::General,
            padded: false,
        }
    }

    /// A general matrix whose minor extent is padded to a pack-width
    /// multiple.
    pub fn zeros_padded(rows: usize, cols: usize, order: StorageOrder) -> Self {
        let (spacing, lines) = match order {
            StorageOrder::RowMajor => (padded_len(cols), rows),
            StorageOrder::ColumnMajor => (padded_len(rows), cols),
        };
        Self {
            data: vec![T::default(); spacing * lines],
            rows,
            cols,
            spacing,
            order,
            structure: Structure::General,
            padded: true,
        }
    }

    /// Build a row-major matrix from row slices.
    ///
    /// All rows must have the same length.
    pub fn from_rows(rows: &[&[T]]) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |r| r.len());
        for r in rows {
            if r.len() != ncols {
                return Err(ExprError::SizeMismatch(ncols, r.len()));
            }
        }
        let mut data = Vec::with_capacity(nrows * ncols);
        for r in rows {
            data.extend_from_slice(r);
        }
        Ok(Self {
            data,
            rows: nrows,
            cols: ncols,
            spacing: ncols,
            order: StorageOrder::RowMajor,
            structure: Structure::General,
            padded: false,
        })
    }

    /// Build a row-major matrix from a function of the index pair.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut m = Self::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                let v = f(i, j);
                m.data[i * cols + j] = v;
            }
        }
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.cols
    }

    /// Allocated distance between consecutive major lines.
    #[inline]
    pub fn spacing(&self) -> usize {
        self.spacing
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_padded(&self) -> bool {
        self.padded
    }

    #[inline]
    pub fn order(&self) -> StorageOrder {
        self.order
    }

    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }

    /// Number of elements differing from the default value.
    pub fn non_zeros(&self) -> usize {
        let mut count = 0;
        for i in 0..self.rows {
            for j in 0..self.cols {
                if self.get(i, j) != T::default() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Linear storage index of element `(i, j)`.
    #[inline]
    pub(crate) fn index_of(&self, i: usize, j: usize) -> usize {
        match self.order {
            StorageOrder::RowMajor => i * self.spacing + j,
            StorageOrder::ColumnMajor => j * self.spacing + i,
        }
    }

    /// Bounds-checked element access.
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
        Ok(self.data[self.index_of(i, j)])
    }

    /// Unchecked-by-default subscript (debug-asserted).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        debug_assert!(i < self.rows && j < self.cols, "matrix index out of bounds");
        self.data[self.index_of(i, j)]
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Identity of the backing allocation, for alias analysis.
    #[inline]
    pub fn storage_id(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// Whether `id` names this matrix's backing allocation.
    #[inline]
    pub fn is_aliased(&self, id: usize) -> bool {
        self.storage_id() == id
    }

    /// Reset every freely-writable element to the default value.
    ///
    /// Structurally-implied elements (the unit diagonal of a uni-triangular
    /// adaptor included) keep their implied values.
    pub fn reset(&mut self) {
        for i in 0..self.rows {
            for j in 0..self.cols {
                if self.structure.writable(i, j) {
                    let idx = self.index_of(i, j);
                    self.data[idx] = T::default();
                }
            }
        }
    }

    /// Write raw storage without a structure check.
    ///
    /// Reserved for the evaluation layer, which performs the structure check
    /// once per statement before any mutation.
    #[inline]
    pub(crate) fn set_unchecked(&mut self, i: usize, j: usize, value: T) {
        let idx = self.index_of(i, j);
        self.data[idx] = value;
    }

    /// Attach a structure tag computed by the expression layer. The caller
    /// guarantees the stored elements already satisfy the tag.
    #[inline]
    pub(crate) fn set_structure_tag(&mut self, structure: Structure) {
        self.structure = structure;
    }
}

impl<T: Scalar + Conjugate> DenseMatrix<T> {
    /// A square matrix carrying a structural adaptor tag.
    ///
    /// Uni-triangular adaptors store their implied unit diagonal.
    pub fn with_structure(n: usize, structure: Structure) -> Self
    where
        T: One,
    {
        let mut m = Self::zeros(n, n);
        m.structure = structure;
        if structure.is_uni() {
            for i in 0..n {
                m.data[i * n + i] = T::one();
            }
        }
        m
    }

    /// Structure-checked element write.
    ///
    /// Rejects any write that would change a structurally-implied value and
    /// mirrors writes through symmetric and Hermitian adaptors. The diagonal
    /// of a Hermitian adaptor only accepts self-conjugate values.
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
        if self.structure.is_hermitian() && i == j && value.conj() != value {
            return Err(ExprError::StructureViolation(
                "the diagonal of a Hermitian matrix must stay real",
            ));
        }
        if !self.structure.writable(i, j) {
            // The stored value at a restricted position is its implied value.
            if value != self.data[self.index_of(i, j)] {
                return Err(ExprError::StructureViolation(
                    "write would change a structurally-implied element",
                ));
            }
            return Ok(());
        }
        let idx = self.index_of(i, j);
        self.data[idx] = value;
        match self.structure {
            Structure::Symmetric if i != j => {
                let m = self.index_of(j, i);
                self.data[m] = value;
            }
            Structure::Hermitian if i != j => {
                let m = self.index_of(j, i);
                self.data[m] = value.conj();
            }
            _ => {}
        }
        Ok(())
    }

    /// Mirroring write without the structure check.
    ///
    /// Reserved for the view assignment pipeline, which verifies the
    /// structure once per statement before the first write; mirroring into
    /// the symmetric or Hermitian counterpart still applies per element.
    #[inline]
    pub(crate) fn store_element(&mut self, i: usize, j: usize, value: T) {
        let idx = self.index_of(i, j);
        self.data[idx] = value;
        match self.structure {
            Structure::Symmetric if i != j => {
                let m = self.index_of(j, i);
                self.data[m] = value;
            }
            Structure::Hermitian if i != j => {
                let m = self.index_of(j, i);
                self.data[m] = value.conj();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_vector_basics() {
        let v = DenseVector::from_slice(&[1.0, 0.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.non_zeros(), 2);
        assert_eq!(v.get(2), 3.0);
        assert!(v.at(3).is_err());
    }

    #[test]
    fn test_vector_padding() {
        let v: DenseVector<f64> = DenseVector::zeros_padded(10);
        assert_eq!(v.len(), 10);
        assert_eq!(v.capacity(), 16);
        assert!(v.is_padded());
    }

    #[test]
    fn test_matrix_orders_agree() {
        let rm = DenseMatrix::from_fn(3, 4, |i, j| (10 * i + j) as i64);
        let mut cm = DenseMatrix::with_order(3, 4, StorageOrder::ColumnMajor);
        for i in 0..3 {
            for j in 0..4 {
                cm.set(i, j, (10 * i + j) as i64).unwrap();
            }
        }
        for i in 0..3 {
            for j in 0..4 {
                assert_eq!(rm.get(i, j), cm.get(i, j));
            }
        }
        assert_eq!(rm.spacing(), 4);
        assert_eq!(cm.spacing(), 3);
    }

    #[test]
    fn test_lower_adaptor_rejects_upper_write() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(4, Structure::Lower);
        m.set(2, 1, 5.0).unwrap();
        m.set(2, 2, 7.0).unwrap();
        let err = m.set(1, 2, 1.0).unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        // Writing the implied zero is a no-op, not an error.
        m.set(1, 2, 0.0).unwrap();
    }

    #[test]
    fn test_uni_lower_diagonal_is_fixed() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::UniLower);
        assert_eq!(m.get(1, 1), 1.0);
        assert!(m.set(1, 1, 2.0).is_err());
        m.set(1, 1, 1.0).unwrap();
        m.set(2, 0, 4.0).unwrap();
    }

    #[test]
    fn test_symmetric_mirrors_writes() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::Symmetric);
        m.set(0, 2, 9.0).unwrap();
        assert_eq!(m.get(2, 0), 9.0);
    }

    #[test]
    fn test_hermitian_mirrors_conjugate() {
        let mut m: DenseMatrix<Complex64> = DenseMatrix::with_structure(2, Structure::Hermitian);
        m.set(0, 1, Complex64::new(1.0, 2.0)).unwrap();
        assert_eq!(m.get(1, 0), Complex64::new(1.0, -2.0));
    }

    #[test]
    fn test_hermitian_diagonal_stays_real() {
        let mut m: DenseMatrix<Complex64> = DenseMatrix::with_structure(2, Structure::Hermitian);
        let err = m.set(0, 0, Complex64::new(1.0, 2.0)).unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        assert_eq!(m.get(0, 0), Complex64::new(0.0, 0.0));
        m.set(0, 0, Complex64::new(1.5, 0.0)).unwrap();
        assert_eq!(m.get(0, 0), Complex64::new(1.5, 0.0));
    }

    #[test]
    fn test_from_fn_accepts_stateful_closures() {
        let mut next = 0;
        let v = DenseVector::from_fn(3, |_| {
            next += 1;
            next
        });
        assert_eq!(v.as_slice(), &[1, 2, 3]);

        let mut calls = 0;
        let m = DenseMatrix::from_fn(2, 2, |i, j| {
            calls += 1;
            (2 * i + j) as i64
        });
        assert_eq!(m.get(1, 1), 3);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_reset_preserves_implied_values() {
        let mut m: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::UniLower);
        m.set(2, 1, 5.0).unwrap();
        m.reset();
        assert_eq!(m.get(2, 1), 0.0);
        assert_eq!(m.get(1, 1), 1.0);
    }

    #[test]
    fn test_alias_identity() {
        let a: DenseVector<f64> = DenseVector::zeros(4);
        let b: DenseVector<f64> = DenseVector::zeros(4);
        assert!(a.is_aliased(a.storage_id()));
        assert!(!a.is_aliased(b.storage_id()));
    }
}
