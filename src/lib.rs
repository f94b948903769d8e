//! Structure-aware lazy expression evaluation for dense and sparse containers.
//!
//! This crate implements the core of an expression-template linear-algebra
//! library: arithmetic written in ordinary algebraic notation is captured as a
//! lazily-evaluated expression tree, analyzed for structural properties
//! (symmetry, triangularity, storage order, SIMD-combinability, aliasing) and
//! lowered to a single fused loop on assignment, with no intermediate heap
//! allocation on the non-aliased path.
//!
//! # Core Types
//!
//! - [`DenseVector`] / [`DenseMatrix`]: owned storage with a [`StorageOrder`]
//!   tag and an optional structural adaptor tag ([`Structure`]) enforced on
//!   every mutation
//! - [`SparseVector`]: sorted index/value storage
//! - Views ([`Subvector`], [`Column`], [`Row`], [`Elements`], [`Submatrix`]
//!   and their `Mut` variants): zero-copy proxies over a sub-region of a
//!   container, obeying the same vector/matrix contracts
//! - Expression nodes ([`VecBin`], [`VecMap`], [`VecScale`], [`MatBin`],
//!   [`MatMap`]): unevaluated operation trees built by `+`, `-`, `*`, `/`
//!
//! # Evaluation
//!
//! Assignment of an expression into a container or view runs the pipeline
//! size check -> structure check -> alias resolution -> kernel dispatch. The
//! kernel is chosen from the compile-time SIMD-combinability of the element
//! type plus runtime contiguity, size and aliasing:
//!
//! - unrolled-by-4 packed loop with single-pack and scalar tails
//! - streaming-store variant when the working set exceeds the configured
//!   cache fraction and the source does not alias the destination
//! - scalar loop otherwise
//! - chunked shared-memory-parallel kernel behind the `parallel` feature
//!
//! All knobs live in an explicit [`EvalConfig`] rather than process-wide
//! flags, so both kernel paths can be exercised deterministically.
//!
//! # Example
//!
//! ```rust
//! use exprmat::{column, column_mut, DenseMatrix, DenseVector};
//!
//! let mut a = DenseMatrix::from_rows(&[
//!     &[1.0, 2.0],
//!     &[3.0, 4.0],
//! ]).unwrap();
//!
//! let b = DenseVector::from_slice(&[10.0, 20.0]);
//! let c = DenseVector::from_slice(&[1.0, 2.0]);
//!
//! // Capture `b + c` lazily, then materialize it into column 1 of `a`.
//! let mut col = column_mut(&mut a, 1).unwrap();
//! col.assign(&(&b + &c)).unwrap();
//!
//! assert_eq!(column(&a, 1).unwrap().get(0), 11.0);
//! assert_eq!(column(&a, 1).unwrap().get(1), 22.0);
//! ```

mod column;
mod dense;
mod elements;
mod eval;
mod expr;
mod functor;
mod promote;
mod row;
mod simd;
mod sparse;
mod structure;
mod submatrix;
mod subvector;

// ============================================================================
// Containers
// ============================================================================
pub use dense::{DenseMatrix, DenseVector};
pub use sparse::SparseVector;

// ============================================================================
// Structural tags and queries
// ============================================================================
pub use structure::{Density, StorageOrder, Structure};

// ============================================================================
// Operation functors
// ============================================================================
pub use functor::{
    AddOp, AsinOp, BinaryFunctor, ConjOp, Conjugate, DivOp, MultOp, NegOp, SubOp, UnaryFunctor,
};

// ============================================================================
// Element traits
// ============================================================================
pub use promote::Promote;
pub use simd::{Pack, Scalar, PACK_WIDTH};

// ============================================================================
// Expression nodes
// ============================================================================
pub use expr::{asin, conj, MatBin, MatExpr, MatMap, VecBin, VecExpr, VecMap, VecScale};

// ============================================================================
// Views
// ============================================================================
pub use column::{column, column_at, column_mut, column_mut_at, Column, ColumnMut};
pub use elements::{elements, elements_mut, Elements, ElementsMut};
pub use row::{row, row_at, row_mut, row_mut_at, Row, RowMut};
pub use submatrix::{submatrix, submatrix_mut, Submatrix, SubmatrixMut};
pub use subvector::{subvector, subvector_mut, Subvector, SubvectorMut};

// ============================================================================
// Evaluation strategy
// ============================================================================
pub use eval::{
    assign_into, assign_matrix_into, assign_sparse_into, cross_into, update_into,
    update_matrix_into, EvalConfig, VecTarget,
};

// ============================================================================
// Constants
// ============================================================================

/// Last-level cache capacity assumed by the streaming-store heuristic.
///
/// An assignment whose working set exceeds a third of this size bypasses the
/// read-before-write path to avoid cache pollution. Tunable per statement via
/// [`EvalConfig::cache_size`].
pub const CACHE_SIZE: usize = 3 * 1024 * 1024;

/// Minimum element count before the shared-memory-parallel kernel is
/// considered. Tunable via [`EvalConfig::smp_threshold`].
pub const SMP_THRESHOLD: usize = 64 * 1024;

// ============================================================================
// Error types
// ============================================================================

/// Errors raised by container, view and assignment operations.
///
/// All runtime errors are raised synchronously at the violating call; nothing
/// is retried or deferred. Invalid element-type combinations are rejected at
/// compile time by a missing [`Promote`] bound and never reach this enum.
#[derive(Debug, thiserror::Error)]
pub enum ExprError {
    /// Runtime index outside the valid range at view construction or checked
    /// element access.
    #[error("index {index} out of range for extent {extent}")]
    OutOfRange { index: usize, extent: usize },

    /// Operand lengths incompatible for the requested operation.
    #[error("size mismatch: {0} vs {1}")]
    SizeMismatch(usize, usize),

    /// Operand shapes incompatible for the requested matrix operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch([usize; 2], [usize; 2]),

    /// An assignment would break the declared structural invariant of a
    /// restricted container.
    #[error("structure violation: {0}")]
    StructureViolation(&'static str),

    /// Cross-product assignment on a view whose length is not 3.
    #[error("cross product requires length 3, got {0}")]
    CrossSize(usize),
}

/// Result type for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, ExprError>;
