//! Assignment pipeline and loop kernels.
//!
//! Every statement that materializes an expression runs the same pipeline:
//! size check, structure check, alias resolution, kernel dispatch. The
//! kernels are chosen from the compile-time SIMD-combinability of the tree
//! plus runtime contiguity and padding of the destination, never from global
//! state: all knobs live in an explicit [`EvalConfig`] handed to the call.
//!
//! The packed kernel is unrolled by four packs, followed by a single-pack
//! tail and a scalar tail; when both sides are padded to a pack-width
//! multiple the scalar tail is skipped and the final partial pack spills
//! into the padding. Oversized non-aliased assignments switch the packed
//! stores to streaming stores.

use crate::dense::{DenseMatrix, DenseVector};
use crate::expr::{MatExpr, VecExpr};
use crate::functor::{AddOp, BinaryFunctor, Conjugate, DivOp, MultOp, SubOp};
use crate::simd::{Pack, Scalar, PACK_WIDTH};
use crate::sparse::SparseVector;
use crate::structure::Structure;
use crate::{ExprError, Result, CACHE_SIZE, SMP_THRESHOLD};
use num_traits::One;
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Configuration
// ============================================================================

/// Per-statement evaluation knobs.
///
/// Passed explicitly to every assignment; the `Default` instance mirrors the
/// crate-level constants. Tests pin both kernel paths by toggling these
/// fields rather than rebuilding with different feature flags.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Allow non-temporal stores for oversized non-aliased assignments.
    pub use_streaming: bool,
    /// Assumed last-level cache capacity in bytes.
    pub cache_size: usize,
    /// Minimum element count before the parallel kernel is considered.
    pub smp_threshold: usize,
    /// Allow the chunked parallel kernel (requires the `parallel` feature).
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            use_streaming: false,
            cache_size: CACHE_SIZE,
            smp_threshold: SMP_THRESHOLD,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl EvalConfig {
    /// Whether an assignment of `len` elements of `T` should bypass the
    /// cache. Streaming pays off once the working set of the statement
    /// (destination plus operands, estimated at three arrays) no longer
    /// fits.
    fn streams<T>(&self, len: usize) -> bool {
        self.use_streaming && len > self.cache_size / (3 * std::mem::size_of::<T>())
    }
}

// ============================================================================
// Destination abstraction
// ============================================================================

/// A mutable vector-shaped destination for the assignment kernels.
///
/// Implemented by the dense vector and every mutable vector-shaped view.
/// `set` must be valid for every index below `len()`; destinations whose
/// positions carry structural constraints run their structure check before
/// handing themselves to a kernel.
pub trait VecTarget {
    type Elem: Scalar;

    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Self::Elem;

    fn set(&mut self, index: usize, value: Self::Elem);

    /// Identity of the backing allocation, for alias analysis.
    fn storage_id(&self) -> usize;

    /// Runtime pack-addressability.
    fn can_simd(&self) -> bool;

    /// Whether the contiguous storage extends to a pack-width multiple.
    fn is_padded(&self) -> bool;

    /// Whether pack stores at pack-multiple indices hit aligned storage.
    fn is_aligned(&self) -> bool;

    /// Whether disjoint index ranges of this destination may be written by
    /// concurrent workers.
    fn can_smp_assign(&self) -> bool;

    /// The destination elements as one contiguous slice, padding included,
    /// when elementwise `set` carries no side effects (no mirroring into a
    /// symmetric counterpart). `None` forces the scalar kernel.
    fn contiguous_mut(&mut self) -> Option<&mut [Self::Elem]>;
}

impl<T: Scalar> VecTarget for DenseVector<T> {
    type Elem = T;

    fn len(&self) -> usize {
        DenseVector::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        DenseVector::get(self, index)
    }

    #[inline]
    fn set(&mut self, index: usize, value: T) {
        DenseVector::set(self, index, value);
    }

    fn storage_id(&self) -> usize {
        DenseVector::storage_id(self)
    }

    fn can_simd(&self) -> bool {
        T::SIMD_ENABLED
    }

    fn is_padded(&self) -> bool {
        DenseVector::is_padded(self)
    }

    fn is_aligned(&self) -> bool {
        true
    }

    fn can_smp_assign(&self) -> bool {
        true
    }

    fn contiguous_mut(&mut self) -> Option<&mut [T]> {
        Some(self.storage_mut())
    }
}

// ============================================================================
// Vector assignment
// ============================================================================

/// Materialize `src` into `dest`: size check, alias resolution, kernel
/// dispatch.
///
/// When the source may reference the destination's storage it is evaluated
/// into a temporary first; otherwise the fused loop reads the operands
/// directly and nothing is allocated.
pub fn assign_into<D, E>(dest: &mut D, src: &E, cfg: &EvalConfig) -> Result<()>
where
    D: VecTarget,
    E: VecExpr<Elem = D::Elem>,
{
    if dest.len() != src.len() {
        return Err(ExprError::SizeMismatch(dest.len(), src.len()));
    }
    if src.can_alias(dest.storage_id()) {
        let tmp = src.eval();
        assign_resolved(dest, &tmp, cfg);
    } else {
        assign_resolved(dest, src, cfg);
    }
    Ok(())
}

/// Fold `src` into `dest` with `f`: `dest[i] = f(dest[i], src[i])`.
pub fn update_into<D, E, F>(dest: &mut D, src: &E, f: F, cfg: &EvalConfig) -> Result<()>
where
    D: VecTarget,
    E: VecExpr<Elem = D::Elem>,
    F: BinaryFunctor<D::Elem>,
{
    if dest.len() != src.len() {
        return Err(ExprError::SizeMismatch(dest.len(), src.len()));
    }
    if src.can_alias(dest.storage_id()) {
        let tmp = src.eval();
        update_resolved(dest, &tmp, f, cfg);
    } else {
        update_resolved(dest, src, f, cfg);
    }
    Ok(())
}

/// Replace `dest` by `dest x src` (three-element cross product).
///
/// Both operands are read fully before the first write, so the right-hand
/// side may alias the destination.
pub fn cross_into<D, E>(dest: &mut D, rhs: &E) -> Result<()>
where
    D: VecTarget,
    E: VecExpr<Elem = D::Elem>,
    D::Elem: Mul<Output = D::Elem> + Sub<Output = D::Elem>,
{
    if dest.len() != 3 {
        return Err(ExprError::CrossSize(dest.len()));
    }
    if rhs.len() != 3 {
        return Err(ExprError::CrossSize(rhs.len()));
    }
    let a = [dest.get(0), dest.get(1), dest.get(2)];
    let b = [rhs.get(0), rhs.get(1), rhs.get(2)];
    dest.set(0, a[1] * b[2] - a[2] * b[1]);
    dest.set(1, a[2] * b[0] - a[0] * b[2]);
    dest.set(2, a[0] * b[1] - a[1] * b[0]);
    Ok(())
}

/// Element-at-a-time assignment of a sparse right-hand side.
///
/// The destination is reset, then only the stored pairs are written; the
/// sparse operand owns its storage, so no alias temporary is needed.
pub fn assign_sparse_into<D>(dest: &mut D, src: &SparseVector<D::Elem>) -> Result<()>
where
    D: VecTarget,
{
    if dest.len() != src.len() {
        return Err(ExprError::SizeMismatch(dest.len(), src.len()));
    }
    for i in 0..dest.len() {
        dest.set(i, D::Elem::default());
    }
    for (i, v) in src.iter() {
        dest.set(i, v);
    }
    Ok(())
}

fn assign_resolved<D, E>(dest: &mut D, src: &E, cfg: &EvalConfig)
where
    D: VecTarget,
    E: VecExpr<Elem = D::Elem>,
{
    let len = dest.len();

    #[cfg(feature = "parallel")]
    if cfg.parallel && len >= cfg.smp_threshold && dest.can_smp_assign() && src.can_smp_assign() {
        if let Some(out) = dest.contiguous_mut() {
            parallel_assign(&mut out[..len], src);
            return;
        }
    }

    if E::SIMD_ENABLED && D::Elem::SIMD_ENABLED && src.can_simd() && dest.can_simd() {
        let remainder = !(dest.is_padded() && src.is_padded());
        // Non-temporal stores require an aligned destination.
        let stream = cfg.streams::<D::Elem>(len) && dest.is_aligned();
        if let Some(out) = dest.contiguous_mut() {
            packed_assign(out, src, len, remainder, stream);
            return;
        }
    }
    scalar_assign(dest, src, len);
}

fn update_resolved<D, E, F>(dest: &mut D, src: &E, f: F, cfg: &EvalConfig)
where
    D: VecTarget,
    E: VecExpr<Elem = D::Elem>,
    F: BinaryFunctor<D::Elem>,
{
    let len = dest.len();
    // Updates read the destination, so streaming stores never apply.
    let _ = cfg;

    if E::SIMD_ENABLED && D::Elem::SIMD_ENABLED && F::SIMD_ENABLED && src.can_simd() && dest.can_simd()
    {
        let remainder = !(dest.is_padded() && src.is_padded());
        if let Some(out) = dest.contiguous_mut() {
            packed_update(out, src, f, len, remainder);
            return;
        }
    }
    let even = len & !1;
    let mut i = 0;
    while i < even {
        dest.set(i, f.apply(dest.get(i), src.get(i)));
        dest.set(i + 1, f.apply(dest.get(i + 1), src.get(i + 1)));
        i += 2;
    }
    if i < len {
        dest.set(i, f.apply(dest.get(i), src.get(i)));
    }
}

/// Packed kernel: four packs per iteration, then single packs, then the
/// scalar tail. Without a remainder the final partial pack spills into the
/// padding instead.
fn packed_assign<T, E>(out: &mut [T], src: &E, len: usize, remainder: bool, stream: bool)
where
    T: Scalar,
    E: VecExpr<Elem = T>,
{
    const W: usize = PACK_WIDTH;
    let ipos = if remainder { len - len % W } else { len };
    let mut i = 0;
    while i + 4 * W <= ipos {
        write_pack(src.load_pack(i), out, i, stream);
        write_pack(src.load_pack(i + W), out, i + W, stream);
        write_pack(src.load_pack(i + 2 * W), out, i + 2 * W, stream);
        write_pack(src.load_pack(i + 3 * W), out, i + 3 * W, stream);
        i += 4 * W;
    }
    while i + W <= ipos {
        write_pack(src.load_pack(i), out, i, stream);
        i += W;
    }
    if !remainder && i < len {
        write_pack(src.load_pack(i), out, i, stream);
        return;
    }
    while i < len {
        out[i] = src.get(i);
        i += 1;
    }
}

#[inline(always)]
fn write_pack<T: Scalar>(p: Pack<T>, out: &mut [T], at: usize, stream: bool) {
    if stream {
        p.stream(out, at);
    } else {
        p.store(out, at);
    }
}

fn packed_update<T, E, F>(out: &mut [T], src: &E, f: F, len: usize, remainder: bool)
where
    T: Scalar,
    E: VecExpr<Elem = T>,
    F: BinaryFunctor<T>,
{
    const W: usize = PACK_WIDTH;
    let ipos = if remainder { len - len % W } else { len };
    let mut i = 0;
    while i + W <= ipos {
        let d = Pack::load(out, i);
        f.apply_pack(d, src.load_pack(i)).store(out, i);
        i += W;
    }
    if !remainder && i < len {
        let d = Pack::load(out, i);
        f.apply_pack(d, src.load_pack(i)).store(out, i);
        return;
    }
    while i < len {
        out[i] = f.apply(out[i], src.get(i));
        i += 1;
    }
}

/// Scalar fallback, unrolled by two.
fn scalar_assign<D, E>(dest: &mut D, src: &E, len: usize)
where
    D: VecTarget,
    E: VecExpr<Elem = D::Elem>,
{
    let even = len & !1;
    let mut i = 0;
    while i < even {
        dest.set(i, src.get(i));
        dest.set(i + 1, src.get(i + 1));
        i += 2;
    }
    if i < len {
        dest.set(i, src.get(i));
    }
}

/// Chunked parallel kernel. Chunks are pack-width multiples so the workers
/// never share a cache line boundary mid-pack.
#[cfg(feature = "parallel")]
fn parallel_assign<T, E>(out: &mut [T], src: &E)
where
    T: Scalar,
    E: VecExpr<Elem = T>,
{
    use rayon::prelude::*;

    const CHUNK: usize = 512 * PACK_WIDTH;
    out.par_chunks_mut(CHUNK).enumerate().for_each(|(c, slice)| {
        let base = c * CHUNK;
        for (k, slot) in slice.iter_mut().enumerate() {
            *slot = src.get(base + k);
        }
    });
}

// ============================================================================
// Matrix assignment
// ============================================================================

/// Whether a source carrying structure `src` statically satisfies the
/// constraint of a destination tagged `dst`, making the per-element
/// structure scan unnecessary.
fn covers(dst: Structure, src: Structure) -> bool {
    match dst {
        Structure::General => true,
        Structure::Symmetric => src.is_symmetric(),
        Structure::Hermitian => src.is_hermitian(),
        Structure::Lower => src.is_lower(),
        Structure::Upper => src.is_upper(),
        Structure::StrictlyLower => src.is_strictly_lower(),
        Structure::StrictlyUpper => src.is_strictly_upper(),
        Structure::UniLower => src.is_uni_lower(),
        Structure::UniUpper => src.is_uni_upper(),
        Structure::Diagonal => src == Structure::Diagonal,
    }
}

/// Verify that the evaluated `src` satisfies the destination tag, before any
/// mutation.
fn check_matrix_structure<T, E>(dst: Structure, src: &E) -> Result<()>
where
    T: Scalar + Conjugate + One,
    E: MatExpr<Elem = T>,
{
    if covers(dst, src.structure()) {
        return Ok(());
    }
    match dst {
        Structure::Symmetric => {
            for i in 0..src.rows() {
                for j in 0..i {
                    if src.get(i, j) != src.get(j, i) {
                        return Err(ExprError::StructureViolation(
                            "source of a symmetric assignment is not symmetric",
                        ));
                    }
                }
            }
        }
        Structure::Hermitian => {
            for i in 0..src.rows() {
                for j in 0..=i {
                    if src.get(i, j) != src.get(j, i).conj() {
                        return Err(ExprError::StructureViolation(
                            "source of a Hermitian assignment is not Hermitian",
                        ));
                    }
                }
            }
        }
        _ => {
            for i in 0..src.rows() {
                for j in 0..src.columns() {
                    if dst.writable(i, j) {
                        continue;
                    }
                    let implied = if dst.implies_unit(i, j) {
                        T::one()
                    } else {
                        T::default()
                    };
                    if src.get(i, j) != implied {
                        return Err(ExprError::StructureViolation(
                            "source writes outside the destination's structure",
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Materialize a matrix expression into a dense matrix: shape check,
/// structure check, alias resolution, elementwise write.
///
/// The destination keeps its own structure tag; the source must satisfy it,
/// which the pipeline verifies before the first write.
pub fn assign_matrix_into<T, E>(dest: &mut DenseMatrix<T>, src: &E, cfg: &EvalConfig) -> Result<()>
where
    T: Scalar + Conjugate + One,
    E: MatExpr<Elem = T>,
{
    let _ = cfg;
    let (dr, dc) = (dest.rows(), dest.columns());
    if dr != src.rows() || dc != src.columns() {
        return Err(ExprError::ShapeMismatch(
            [dr, dc],
            [src.rows(), src.columns()],
        ));
    }
    if src.can_alias(dest.storage_id()) {
        let tmp = src.eval();
        check_matrix_structure(dest.structure(), &tmp)?;
        write_matrix(dest, &tmp);
    } else {
        check_matrix_structure(dest.structure(), src)?;
        write_matrix(dest, src);
    }
    debug_assert!(matrix_intact(dest), "structural invariant broken");
    Ok(())
}

/// Fold a matrix expression into a dense matrix with `f`.
pub fn update_matrix_into<T, E, F>(
    dest: &mut DenseMatrix<T>,
    src: &E,
    f: F,
    cfg: &EvalConfig,
) -> Result<()>
where
    T: Scalar + Conjugate + One,
    E: MatExpr<Elem = T>,
    F: BinaryFunctor<T>,
{
    let _ = cfg;
    let (dr, dc) = (dest.rows(), dest.columns());
    if dr != src.rows() || dc != src.columns() {
        return Err(ExprError::ShapeMismatch(
            [dr, dc],
            [src.rows(), src.columns()],
        ));
    }
    if src.can_alias(dest.storage_id()) {
        let tmp = src.eval();
        update_matrix_resolved(dest, &tmp, f)
    } else {
        update_matrix_resolved(dest, src, f)
    }
}

fn update_matrix_resolved<T, E, F>(dest: &mut DenseMatrix<T>, src: &E, f: F) -> Result<()>
where
    T: Scalar + Conjugate + One,
    E: MatExpr<Elem = T>,
    F: BinaryFunctor<T>,
{
    let (dr, dc) = (dest.rows(), dest.columns());
    // The combined value must still satisfy the destination tag; check
    // before the first write.
    let dst_struct = dest.structure();
    if dst_struct.is_restricted() {
        for i in 0..dr {
            for j in 0..dc {
                let combined = f.apply(dest.get(i, j), src.get(i, j));
                let ok = match dst_struct {
                    Structure::Symmetric => {
                        combined == f.apply(dest.get(j, i), src.get(j, i))
                    }
                    Structure::Hermitian => {
                        combined == f.apply(dest.get(j, i), src.get(j, i)).conj()
                    }
                    _ if dst_struct.writable(i, j) => true,
                    _ => {
                        let implied = if dst_struct.implies_unit(i, j) {
                            T::one()
                        } else {
                            T::default()
                        };
                        combined == implied
                    }
                };
                if !ok {
                    return Err(ExprError::StructureViolation(
                        "compound assignment would break the destination's structure",
                    ));
                }
            }
        }
    }
    for i in 0..dr {
        for j in 0..dc {
            let v = f.apply(dest.get(i, j), src.get(i, j));
            dest.set_unchecked(i, j, v);
        }
    }
    debug_assert!(matrix_intact(dest), "structural invariant broken");
    Ok(())
}

fn write_matrix<T, E>(dest: &mut DenseMatrix<T>, src: &E)
where
    T: Scalar,
    E: MatExpr<Elem = T>,
{
    for i in 0..dest.rows() {
        for j in 0..dest.columns() {
            dest.set_unchecked(i, j, src.get(i, j));
        }
    }
}

/// Debug-build re-validation of a restricted matrix after a bulk write.
fn matrix_intact<T: Scalar>(m: &DenseMatrix<T>) -> bool {
    let s = m.structure();
    if !s.is_restricted() || s.is_symmetric() || s.is_hermitian() || s.is_uni() {
        // Mirror and unit checks need Conjugate/One; the bulk writers above
        // already verified those cases pre-write.
        return true;
    }
    for i in 0..m.rows() {
        for j in 0..m.columns() {
            if !s.writable(i, j) && m.get(i, j) != T::default() {
                return false;
            }
        }
    }
    true
}

// ============================================================================
// Lane structure checks (columns and rows of restricted matrices)
// ============================================================================

/// Verify that a vector source may be assigned into a matrix lane whose
/// writable range is `[begin, end)`, with an implied unit at `unit_at` and a
/// real-valued diagonal crossing at `real_at` (Hermitian lanes).
///
/// Positions outside the range must carry exactly their implied value.
/// Runs before any mutation.
pub(crate) fn check_lane_structure<T, E>(
    begin: usize,
    end: usize,
    unit_at: Option<usize>,
    real_at: Option<usize>,
    src: &E,
) -> Result<()>
where
    T: Scalar + Conjugate + One,
    E: VecExpr<Elem = T>,
{
    if let Some(d) = real_at {
        if d < src.len() && src.get(d).conj() != src.get(d) {
            return Err(ExprError::StructureViolation(
                "the diagonal of a Hermitian matrix must stay real",
            ));
        }
    }
    for i in 0..src.len() {
        if i >= begin && i < end {
            continue;
        }
        let implied = if unit_at == Some(i) {
            T::one()
        } else {
            T::default()
        };
        if src.get(i) != implied {
            return Err(ExprError::StructureViolation(
                "source writes outside the lane's structure",
            ));
        }
    }
    Ok(())
}

/// Same check for a compound update: the folded value at every restricted
/// position must equal its implied value.
pub(crate) fn check_lane_update<D, E, F>(
    begin: usize,
    end: usize,
    unit_at: Option<usize>,
    real_at: Option<usize>,
    dest: &D,
    src: &E,
    f: F,
) -> Result<()>
where
    D: VecTarget,
    D::Elem: Conjugate + One,
    E: VecExpr<Elem = D::Elem>,
    F: BinaryFunctor<D::Elem>,
{
    if let Some(d) = real_at {
        if d < src.len() {
            let combined = f.apply(dest.get(d), src.get(d));
            if combined.conj() != combined {
                return Err(ExprError::StructureViolation(
                    "the diagonal of a Hermitian matrix must stay real",
                ));
            }
        }
    }
    for i in 0..src.len() {
        if i >= begin && i < end {
            continue;
        }
        let implied = if unit_at == Some(i) {
            D::Elem::one()
        } else {
            D::Elem::default()
        };
        if f.apply(dest.get(i), src.get(i)) != implied {
            return Err(ExprError::StructureViolation(
                "compound assignment would break the lane's structure",
            ));
        }
    }
    Ok(())
}

/// Sparse right-hand side into a structure-clipped lane: restricted
/// positions are verified against their implied values, writable ones are
/// reset and overwritten pair by pair.
pub(crate) fn assign_sparse_lane<D>(
    dest: &mut D,
    src: &SparseVector<D::Elem>,
    begin: usize,
    end: usize,
    unit_at: Option<usize>,
    real_at: Option<usize>,
) -> Result<()>
where
    D: VecTarget,
    D::Elem: Conjugate + One,
{
    if dest.len() != src.len() {
        return Err(ExprError::SizeMismatch(dest.len(), src.len()));
    }
    if let Some(d) = real_at {
        if d < src.len() && src.get(d).conj() != src.get(d) {
            return Err(ExprError::StructureViolation(
                "the diagonal of a Hermitian matrix must stay real",
            ));
        }
    }
    for i in 0..dest.len() {
        if i >= begin && i < end {
            continue;
        }
        let implied = if unit_at == Some(i) {
            D::Elem::one()
        } else {
            D::Elem::default()
        };
        if src.get(i) != implied {
            return Err(ExprError::StructureViolation(
                "sparse source writes outside the lane's structure",
            ));
        }
    }
    for i in begin..end {
        dest.set(i, D::Elem::default());
    }
    for (i, v) in src.iter() {
        if i >= begin && i < end {
            dest.set(i, v);
        }
    }
    Ok(())
}

// ============================================================================
// Container-level assignment surface
// ============================================================================

impl<T: Scalar> DenseVector<T> {
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

    /// Overwrite from a sparse right-hand side, element at a time.
    pub fn assign_sparse(&mut self, src: &SparseVector<T>) -> Result<()> {
        assign_sparse_into(self, src)
    }

    /// Multiply every element in place.
    pub fn scale(&mut self, factor: T)
    where
        T: Mul<Output = T>,
    {
        for i in 0..self.len() {
            let v = self.get(i) * factor;
            self.set(i, v);
        }
    }

    /// Divide every element in place.
    pub fn unscale(&mut self, divisor: T)
    where
        T: Div<Output = T>,
    {
        for i in 0..self.len() {
            let v = self.get(i) / divisor;
            self.set(i, v);
        }
    }

    /// Set every element.
    pub fn fill(&mut self, value: T) {
        for i in 0..self.len() {
            self.set(i, value);
        }
    }
}

impl<T: Scalar + Conjugate + One> DenseMatrix<T> {
    /// Plain assignment, `self = src`.
    pub fn assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()> {
        assign_matrix_into(self, src, &EvalConfig::default())
    }

    /// `self += src`, componentwise.
    pub fn add_assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Add<Output = T>,
    {
        update_matrix_into(self, src, AddOp, &EvalConfig::default())
    }

    /// `self -= src`, componentwise.
    pub fn sub_assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Sub<Output = T>,
    {
        update_matrix_into(self, src, SubOp, &EvalConfig::default())
    }

    /// `self = self o src`, the componentwise (Schur) product.
    pub fn schur_assign<E: MatExpr<Elem = T>>(&mut self, src: &E) -> Result<()>
    where
        T: Mul<Output = T>,
    {
        update_matrix_into(self, src, MultOp, &EvalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_assign_from_expression() {
        let a = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        let b = DenseVector::from_slice(&[0.5, 0.5, 0.5]);
        let mut out: DenseVector<f64> = DenseVector::zeros(3);
        out.assign(&(&a + &b)).unwrap();
        assert_eq!(out.as_slice(), &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_size_mismatch_leaves_destination_unchanged() {
        let a = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        let mut out = DenseVector::from_slice(&[9.0, 9.0, 9.0, 9.0]);
        let err = out.assign(&a).unwrap_err();
        assert!(matches!(err, ExprError::SizeMismatch(4, 3)));
        assert_eq!(out.as_slice(), &[9.0, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_compound_updates() {
        let b = DenseVector::from_slice(&[1.0, 2.0]);
        let mut a = DenseVector::from_slice(&[10.0, 20.0]);
        a.add_assign(&b).unwrap();
        assert_eq!(a.as_slice(), &[11.0, 22.0]);
        a.sub_assign(&b).unwrap();
        assert_eq!(a.as_slice(), &[10.0, 20.0]);
        a.mul_assign(&b).unwrap();
        assert_eq!(a.as_slice(), &[10.0, 40.0]);
        a.div_assign(&b).unwrap();
        assert_eq!(a.as_slice(), &[10.0, 20.0]);
    }

    #[test]
    fn test_cross_assign() {
        let mut a = DenseVector::from_slice(&[1.0, 0.0, 0.0]);
        let b = DenseVector::from_slice(&[0.0, 1.0, 0.0]);
        a.cross_assign(&b).unwrap();
        assert_eq!(a.as_slice(), &[0.0, 0.0, 1.0]);

        let mut short = DenseVector::from_slice(&[1.0, 2.0]);
        assert!(matches!(
            short.cross_assign(&b).unwrap_err(),
            ExprError::CrossSize(2)
        ));
    }

    #[test]
    fn test_sparse_rhs_element_at_a_time() {
        let s = SparseVector::from_pairs(5, &[(1, 4.0), (3, 6.0)]).unwrap();
        let mut d = DenseVector::from_slice(&[9.0; 5]);
        d.assign_sparse(&s).unwrap();
        assert_eq!(d.as_slice(), &[0.0, 4.0, 0.0, 6.0, 0.0]);
    }

    #[test]
    fn test_packed_and_scalar_paths_agree_bitwise() {
        // Integer elements make any divergence visible without tolerance.
        for len in 0..(4 * PACK_WIDTH + 3) {
            let a = DenseVector::from_fn(len, |i| i as i64);
            let b = DenseVector::from_fn(len, |i| (3 * i + 1) as i64);
            let e = &a + &b;

            let mut packed: DenseVector<i64> = DenseVector::zeros_padded(len);
            assign_into(&mut packed, &e, &EvalConfig::default()).unwrap();

            let mut scalar: DenseVector<i64> = DenseVector::zeros(len);
            scalar_assign(&mut scalar, &e, len);

            assert_eq!(packed.as_slice(), scalar.as_slice());
        }
    }

    #[test]
    fn test_streaming_config_is_equivalent() {
        let cfg = EvalConfig {
            use_streaming: true,
            cache_size: 8, // force the heuristic on
            ..EvalConfig::default()
        };
        let a = DenseVector::from_fn(100, |i| i as f64);
        let b = DenseVector::from_fn(100, |i| 2.0 * i as f64);
        let mut plain: DenseVector<f64> = DenseVector::zeros(100);
        let mut streamed: DenseVector<f64> = DenseVector::zeros(100);
        plain.assign(&(&a + &b)).unwrap();
        streamed.assign_with(&(&a + &b), &cfg).unwrap();
        assert_eq!(plain.as_slice(), streamed.as_slice());
    }

    #[test]
    fn test_alias_temporary_branch() {
        // An expression that conservatively claims to alias everything: the
        // pipeline must evaluate it into a temporary before writing.
        struct Pessimistic(DenseVector<f64>);
        impl VecExpr for Pessimistic {
            type Elem = f64;
            const SIMD_ENABLED: bool = false;
            const IS_COMPUTATION: bool = true;
            fn len(&self) -> usize {
                self.0.len()
            }
            fn get(&self, i: usize) -> f64 {
                VecExpr::get(&self.0, i)
            }
            fn can_simd(&self) -> bool {
                false
            }
            fn load_pack(&self, i: usize) -> Pack<f64> {
                VecExpr::load_pack(&self.0, i)
            }
            fn can_alias(&self, _id: usize) -> bool {
                true
            }
            fn is_aliased(&self, _id: usize) -> bool {
                false
            }
        }

        let src = Pessimistic(DenseVector::from_slice(&[1.0, 2.0, 3.0]));
        let mut out: DenseVector<f64> = DenseVector::zeros(3);
        out.assign(&src).unwrap();
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_concurrency_and_alignment_queries() {
        let v = DenseVector::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert!(VecTarget::can_smp_assign(&v));
        assert!(VecTarget::is_aligned(&v));

        let e = &v + &v;
        assert!(VecExpr::can_smp_assign(&e));
        assert!(VecExpr::is_aligned(&e));
    }

    #[test]
    fn test_matrix_assign_respects_lower_tag() {
        let mut dest: DenseMatrix<f64> = DenseMatrix::with_structure(3, Structure::Lower);

        let ok = DenseMatrix::from_fn(3, 3, |i, j| if i >= j { 1.0 } else { 0.0 });
        dest.assign(&ok).unwrap();
        assert_eq!(dest.get(2, 0), 1.0);

        let bad = DenseMatrix::from_fn(3, 3, |i, j| (i + j) as f64);
        let err = dest.assign(&bad).unwrap_err();
        assert!(matches!(err, ExprError::StructureViolation(_)));
        // Failed assignment must not have touched the destination.
        assert_eq!(dest.get(2, 0), 1.0);
        assert_eq!(dest.get(0, 2), 0.0);
    }

    #[test]
    fn test_matrix_assign_symmetric_source_skips_scan() {
        let mut a: DenseMatrix<f64> = DenseMatrix::with_structure(2, Structure::Symmetric);
        let mut b: DenseMatrix<f64> = DenseMatrix::with_structure(2, Structure::Symmetric);
        a.set(0, 1, 3.0).unwrap();
        b.set(0, 1, 1.0).unwrap();

        let mut dest: DenseMatrix<f64> = DenseMatrix::with_structure(2, Structure::Symmetric);
        dest.assign(&(&a - &b)).unwrap();
        assert_eq!(dest.get(0, 1), 2.0);
        assert_eq!(dest.get(1, 0), 2.0);
    }

    #[test]
    fn test_matrix_compound_structure_check() {
        let mut dest: DenseMatrix<f64> = DenseMatrix::with_structure(2, Structure::UniLower);
        // Adding a strictly-lower delta keeps the unit diagonal.
        let mut delta: DenseMatrix<f64> =
            DenseMatrix::with_structure(2, Structure::StrictlyLower);
        delta.set(1, 0, 5.0).unwrap();
        dest.add_assign(&delta).unwrap();
        assert_eq!(dest.get(1, 0), 5.0);
        assert_eq!(dest.get(0, 0), 1.0);

        // A general increment that disturbs the diagonal is rejected.
        let bad = DenseMatrix::from_fn(2, 2, |i, j| (i == j) as u8 as f64);
        assert!(dest.add_assign(&bad).is_err());
    }
}
