//! Lazily-evaluated expression trees over vectors and matrices.
//!
//! An arithmetic operator on containers, views or other expressions builds a
//! type-level tree node instead of computing anything. Each node carries its
//! operands by value (references are operands too), answers the same size,
//! aliasing and SIMD-combinability queries as a primary container, and is
//! consumed by a single assignment statement.
//!
//! Matrix nodes additionally compute the structural property of their result
//! once, at construction, from their operand structures via the functor's
//! propagation rule; the cached tag is never re-derived at runtime.

use crate::dense::{DenseMatrix, DenseVector};
use crate::functor::{AsinOp, BinaryFunctor, ConjOp, Conjugate, UnaryFunctor};
use crate::promote::Promote;
use crate::simd::{Pack, Scalar, PACK_WIDTH};
use crate::structure::Structure;
use std::ops;

// ============================================================================
// Vector expressions
// ============================================================================

/// An unevaluated vector-shaped computation.
///
/// Implemented by dense containers, vector-shaped views and the expression
/// nodes below. The SIMD facets come in a compile-time half
/// (`SIMD_ENABLED`: the element type and every operation in the tree have a
/// batched form) and a runtime half (`can_simd`: every leaf is currently
/// pack-addressable).
pub trait VecExpr: Sync {
    type Elem: Scalar;

    /// Compile-time SIMD-combinability of the whole tree.
    const SIMD_ENABLED: bool;

    /// Whether this is a computation rather than a storable value.
    const IS_COMPUTATION: bool = false;

    fn len(&self) -> usize;

    /// Evaluate the element at `index`.
    fn get(&self, index: usize) -> Self::Elem;

    /// Runtime pack-addressability of every leaf.
    fn can_simd(&self) -> bool;

    /// Load one pack starting at `index`. Callers must ensure the pack fits
    /// within `len()` (or the padded capacity when `is_padded()`).
    fn load_pack(&self, index: usize) -> Pack<Self::Elem>;

    /// Whether this expression may reference the storage named by `id`.
    /// Allowed to overapproximate.
    fn can_alias(&self, id: usize) -> bool;

    /// Whether this expression currently references the storage named by
    /// `id`. Must be exact.
    fn is_aliased(&self, id: usize) -> bool;

    /// Whether every leaf is padded to a pack-width multiple, letting the
    /// kernels skip their scalar remainder tail.
    fn is_padded(&self) -> bool {
        false
    }

    /// Whether pack loads at pack-multiple indices hit aligned storage.
    fn is_aligned(&self) -> bool {
        true
    }

    /// Whether disjoint index ranges of this expression may be evaluated by
    /// concurrent workers.
    fn can_smp_assign(&self) -> bool {
        true
    }

    /// Materialize into the natural result type.
    fn eval(&self) -> DenseVector<Self::Elem> {
        let mut out = DenseVector::zeros(self.len());
        for i in 0..self.len() {
            out.set(i, self.get(i));
        }
        out
    }

    /// Scale every element by `factor`, lazily.
    fn scaled<S>(self, factor: S) -> VecScale<Self, S>
    where
        Self: Sized,
        VecScale<Self, S>: VecExpr,
    {
        VecScale { expr: self, factor }
    }
}

impl<E: VecExpr> VecExpr for &E {
    type Elem = E::Elem;
    const SIMD_ENABLED: bool = E::SIMD_ENABLED;
    const IS_COMPUTATION: bool = E::IS_COMPUTATION;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Self::Elem {
        (**self).get(index)
    }

    fn can_simd(&self) -> bool {
        (**self).can_simd()
    }

    fn load_pack(&self, index: usize) -> Pack<Self::Elem> {
        (**self).load_pack(index)
    }

    fn can_alias(&self, id: usize) -> bool {
        (**self).can_alias(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        (**self).is_aliased(id)
    }

    fn is_padded(&self) -> bool {
        (**self).is_padded()
    }

    fn is_aligned(&self) -> bool {
        (**self).is_aligned()
    }

    fn can_smp_assign(&self) -> bool {
        (**self).can_smp_assign()
    }
}

impl<T: Scalar> VecExpr for DenseVector<T> {
    type Elem = T;
    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn len(&self) -> usize {
        DenseVector::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        DenseVector::get(self, index)
    }

    fn can_simd(&self) -> bool {
        T::SIMD_ENABLED
    }

    #[inline]
    fn load_pack(&self, index: usize) -> Pack<T> {
        Pack::load(self.storage(), index)
    }

    fn can_alias(&self, id: usize) -> bool {
        self.is_aliased(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        DenseVector::is_aliased(self, id)
    }

    fn is_padded(&self) -> bool {
        DenseVector::is_padded(self)
    }

    fn eval(&self) -> DenseVector<T> {
        self.clone()
    }
}

/// Componentwise binary operation node.
#[derive(Debug, Clone, Copy)]
pub struct VecBin<L, R, F> {
    lhs: L,
    rhs: R,
    f: F,
}

impl<L: VecExpr, R: VecExpr<Elem = L::Elem>, F: BinaryFunctor<L::Elem>> VecBin<L, R, F> {
    pub fn new(lhs: L, rhs: R, f: F) -> Self {
        debug_assert_eq!(lhs.len(), rhs.len(), "operand lengths differ");
        Self { lhs, rhs, f }
    }
}

impl<L, R, F> VecExpr for VecBin<L, R, F>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
    F: BinaryFunctor<L::Elem>,
{
    type Elem = L::Elem;
    const SIMD_ENABLED: bool = L::SIMD_ENABLED && R::SIMD_ENABLED && F::SIMD_ENABLED;
    const IS_COMPUTATION: bool = true;

    fn len(&self) -> usize {
        self.lhs.len()
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Elem {
        self.f.apply(self.lhs.get(index), self.rhs.get(index))
    }

    fn can_simd(&self) -> bool {
        self.lhs.can_simd() && self.rhs.can_simd()
    }

    #[inline]
    fn load_pack(&self, index: usize) -> Pack<Self::Elem> {
        self.f
            .apply_pack(self.lhs.load_pack(index), self.rhs.load_pack(index))
    }

    fn can_alias(&self, id: usize) -> bool {
        self.lhs.can_alias(id) || self.rhs.can_alias(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.lhs.is_aliased(id) || self.rhs.is_aliased(id)
    }

    fn is_padded(&self) -> bool {
        self.lhs.is_padded() && self.rhs.is_padded()
    }

    fn is_aligned(&self) -> bool {
        self.lhs.is_aligned() && self.rhs.is_aligned()
    }

    fn can_smp_assign(&self) -> bool {
        self.lhs.can_smp_assign() && self.rhs.can_smp_assign()
    }
}

/// Elementwise unary operation node.
#[derive(Debug, Clone, Copy)]
pub struct VecMap<E, F> {
    expr: E,
    f: F,
}

impl<E: VecExpr, F: UnaryFunctor<E::Elem>> VecMap<E, F> {
    pub fn new(expr: E, f: F) -> Self {
        Self { expr, f }
    }
}

impl<E, F> VecExpr for VecMap<E, F>
where
    E: VecExpr,
    F: UnaryFunctor<E::Elem>,
{
    type Elem = E::Elem;
    const SIMD_ENABLED: bool = E::SIMD_ENABLED && F::SIMD_ENABLED;
    const IS_COMPUTATION: bool = true;

    fn len(&self) -> usize {
        self.expr.len()
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Elem {
        self.f.apply(self.expr.get(index))
    }

    fn can_simd(&self) -> bool {
        self.expr.can_simd()
    }

    #[inline]
    fn load_pack(&self, index: usize) -> Pack<Self::Elem> {
        self.f.apply_pack(self.expr.load_pack(index))
    }

    fn can_alias(&self, id: usize) -> bool {
        self.expr.can_alias(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.expr.is_aliased(id)
    }

    fn is_padded(&self) -> bool {
        self.expr.is_padded()
    }

    fn is_aligned(&self) -> bool {
        self.expr.is_aligned()
    }

    fn can_smp_assign(&self) -> bool {
        self.expr.can_smp_assign()
    }
}

/// Vector-times-scalar node with element-type promotion.
///
/// The element type of the result is `<E::Elem as Promote<S>>::Output`, the
/// type the real multiplication operator produces; complex-by-scalar scaling
/// therefore promotes via the common-type rule, never the identity rule.
#[derive(Debug, Clone, Copy)]
pub struct VecScale<E, S> {
    expr: E,
    factor: S,
}

impl<E, S> VecScale<E, S>
where
    Self: VecExpr,
{
    pub fn new(expr: E, factor: S) -> Self {
        Self { expr, factor }
    }
}

impl<E, S> VecExpr for VecScale<E, S>
where
    E: VecExpr,
    S: Copy + Send + Sync + 'static,
    E::Elem: Promote<S> + ops::Mul<S, Output = <E::Elem as Promote<S>>::Output>,
    <E::Elem as Promote<S>>::Output: Scalar,
{
    type Elem = <E::Elem as Promote<S>>::Output;
    const SIMD_ENABLED: bool =
        E::SIMD_ENABLED && <<E::Elem as Promote<S>>::Output as Scalar>::SIMD_ENABLED;
    const IS_COMPUTATION: bool = true;

    fn len(&self) -> usize {
        self.expr.len()
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Elem {
        self.expr.get(index) * self.factor
    }

    fn can_simd(&self) -> bool {
        self.expr.can_simd()
    }

    #[inline]
    fn load_pack(&self, index: usize) -> Pack<Self::Elem> {
        let p = self.expr.load_pack(index);
        let mut lanes = [Self::Elem::default(); PACK_WIDTH];
        for k in 0..PACK_WIDTH {
            lanes[k] = p.0[k] * self.factor;
        }
        Pack(lanes)
    }

    fn can_alias(&self, id: usize) -> bool {
        self.expr.can_alias(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.expr.is_aliased(id)
    }

    fn is_padded(&self) -> bool {
        self.expr.is_padded()
    }

    fn is_aligned(&self) -> bool {
        self.expr.is_aligned()
    }

    fn can_smp_assign(&self) -> bool {
        self.expr.can_smp_assign()
    }
}

/// Lazy elementwise arcsine.
pub fn asin<E>(expr: E) -> VecMap<E, AsinOp>
where
    E: VecExpr,
    AsinOp: UnaryFunctor<E::Elem>,
{
    VecMap::new(expr, AsinOp)
}

/// Lazy elementwise complex conjugation.
pub fn conj<E>(expr: E) -> VecMap<E, ConjOp>
where
    E: VecExpr,
    E::Elem: Conjugate,
{
    VecMap::new(expr, ConjOp)
}

/// Implement the componentwise operator sugar (`+`, `-`, `*`, `/`, unary
/// `-`) for one operand type. Every operand type is listed explicitly, which
/// keeps the impls coherent without a blanket over foreign traits.
macro_rules! impl_vec_ops {
    ([ $($gen:tt)* ], $lhs:ty) => {
        impl<$($gen)*, RhsE> std::ops::Add<RhsE> for $lhs
        where
            $lhs: $crate::expr::VecExpr,
            <$lhs as $crate::expr::VecExpr>::Elem:
                std::ops::Add<Output = <$lhs as $crate::expr::VecExpr>::Elem>,
            RhsE: $crate::expr::VecExpr<Elem = <$lhs as $crate::expr::VecExpr>::Elem>,
        {
            type Output = $crate::expr::VecBin<$lhs, RhsE, $crate::functor::AddOp>;

            #[inline]
            fn add(self, rhs: RhsE) -> Self::Output {
                $crate::expr::VecBin::new(self, rhs, $crate::functor::AddOp)
            }
        }

        impl<$($gen)*, RhsE> std::ops::Sub<RhsE> for $lhs
        where
            $lhs: $crate::expr::VecExpr,
            <$lhs as $crate::expr::VecExpr>::Elem:
                std::ops::Sub<Output = <$lhs as $crate::expr::VecExpr>::Elem>,
            RhsE: $crate::expr::VecExpr<Elem = <$lhs as $crate::expr::VecExpr>::Elem>,
        {
            type Output = $crate::expr::VecBin<$lhs, RhsE, $crate::functor::SubOp>;

            #[inline]
            fn sub(self, rhs: RhsE) -> Self::Output {
                $crate::expr::VecBin::new(self, rhs, $crate::functor::SubOp)
            }
        }

        impl<$($gen)*, RhsE> std::ops::Mul<RhsE> for $lhs
        where
            $lhs: $crate::expr::VecExpr,
            <$lhs as $crate::expr::VecExpr>::Elem:
                std::ops::Mul<Output = <$lhs as $crate::expr::VecExpr>::Elem>,
            RhsE: $crate::expr::VecExpr<Elem = <$lhs as $crate::expr::VecExpr>::Elem>,
        {
            type Output = $crate::expr::VecBin<$lhs, RhsE, $crate::functor::MultOp>;

            #[inline]
            fn mul(self, rhs: RhsE) -> Self::Output {
                $crate::expr::VecBin::new(self, rhs, $crate::functor::MultOp)
            }
        }

        impl<$($gen)*, RhsE> std::ops::Div<RhsE> for $lhs
        where
            $lhs: $crate::expr::VecExpr,
            <$lhs as $crate::expr::VecExpr>::Elem:
                std::ops::Div<Output = <$lhs as $crate::expr::VecExpr>::Elem>,
            RhsE: $crate::expr::VecExpr<Elem = <$lhs as $crate::expr::VecExpr>::Elem>,
        {
            type Output = $crate::expr::VecBin<$lhs, RhsE, $crate::functor::DivOp>;

            #[inline]
            fn div(self, rhs: RhsE) -> Self::Output {
                $crate::expr::VecBin::new(self, rhs, $crate::functor::DivOp)
            }
        }

        impl<$($gen)*> std::ops::Neg for $lhs
        where
            $lhs: $crate::expr::VecExpr,
            <$lhs as $crate::expr::VecExpr>::Elem:
                std::ops::Neg<Output = <$lhs as $crate::expr::VecExpr>::Elem>,
        {
            type Output = $crate::expr::VecMap<$lhs, $crate::functor::NegOp>;

            #[inline]
            fn neg(self) -> Self::Output {
                $crate::expr::VecMap::new(self, $crate::functor::NegOp)
            }
        }
    };
}

pub(crate) use impl_vec_ops;

impl_vec_ops!(['a, T: Scalar], &'a DenseVector<T>);
impl_vec_ops!([L: Copy, R: Copy, F: Copy], VecBin<L, R, F>);
impl_vec_ops!([E: Copy, F: Copy], VecMap<E, F>);
impl_vec_ops!([E: Copy, S: Copy], VecScale<E, S>);

// ============================================================================
// Matrix expressions
// ============================================================================

/// An unevaluated matrix-shaped computation.
///
/// The structural property of a node's result is computed once at
/// construction from its operand structures and cached; `structure()` reads
/// the cache.
pub trait MatExpr {
    type Elem: Scalar;

    const IS_COMPUTATION: bool = false;

    fn rows(&self) -> usize;

    fn columns(&self) -> usize;

    fn get(&self, i: usize, j: usize) -> Self::Elem;

    /// Structural property of the (eventual) result.
    fn structure(&self) -> Structure;

    fn can_alias(&self, id: usize) -> bool;

    fn is_aliased(&self, id: usize) -> bool;

    /// Materialize into a dense matrix carrying the propagated structure
    /// tag.
    fn eval(&self) -> DenseMatrix<Self::Elem> {
        let mut out = DenseMatrix::zeros(self.rows(), self.columns());
        for i in 0..self.rows() {
            for j in 0..self.columns() {
                out.set_unchecked(i, j, self.get(i, j));
            }
        }
        out.set_structure_tag(self.structure());
        out
    }
}

impl<E: MatExpr> MatExpr for &E {
    type Elem = E::Elem;
    const IS_COMPUTATION: bool = E::IS_COMPUTATION;

    fn rows(&self) -> usize {
        (**self).rows()
    }

    fn columns(&self) -> usize {
        (**self).columns()
    }

    fn get(&self, i: usize, j: usize) -> Self::Elem {
        (**self).get(i, j)
    }

    fn structure(&self) -> Structure {
        (**self).structure()
    }

    fn can_alias(&self, id: usize) -> bool {
        (**self).can_alias(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        (**self).is_aliased(id)
    }
}

impl<T: Scalar> MatExpr for DenseMatrix<T> {
    type Elem = T;

    fn rows(&self) -> usize {
        DenseMatrix::rows(self)
    }

    fn columns(&self) -> usize {
        DenseMatrix::columns(self)
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> T {
        DenseMatrix::get(self, i, j)
    }

    fn structure(&self) -> Structure {
        DenseMatrix::structure(self)
    }

    fn can_alias(&self, id: usize) -> bool {
        self.is_aliased(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        DenseMatrix::is_aliased(self, id)
    }

    fn eval(&self) -> DenseMatrix<T> {
        self.clone()
    }
}

/// Elementwise binary matrix operation node with a cached result structure.
#[derive(Debug, Clone, Copy)]
pub struct MatBin<L, R, F> {
    lhs: L,
    rhs: R,
    f: F,
    structure: Structure,
}

impl<L, R, F> MatBin<L, R, F>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
    F: BinaryFunctor<L::Elem>,
{
    pub fn new(lhs: L, rhs: R, f: F) -> Self {
        debug_assert_eq!(lhs.rows(), rhs.rows(), "operand row counts differ");
        debug_assert_eq!(lhs.columns(), rhs.columns(), "operand column counts differ");
        // Computed once here, never re-derived.
        let structure = f.yields(lhs.structure(), rhs.structure());
        Self {
            lhs,
            rhs,
            f,
            structure,
        }
    }
}

impl<L, R, F> MatExpr for MatBin<L, R, F>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
    F: BinaryFunctor<L::Elem>,
{
    type Elem = L::Elem;
    const IS_COMPUTATION: bool = true;

    fn rows(&self) -> usize {
        self.lhs.rows()
    }

    fn columns(&self) -> usize {
        self.lhs.columns()
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> Self::Elem {
        self.f.apply(self.lhs.get(i, j), self.rhs.get(i, j))
    }

    fn structure(&self) -> Structure {
        self.structure
    }

    fn can_alias(&self, id: usize) -> bool {
        self.lhs.can_alias(id) || self.rhs.can_alias(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.lhs.is_aliased(id) || self.rhs.is_aliased(id)
    }
}

/// Elementwise unary matrix operation node with a cached result structure.
#[derive(Debug, Clone, Copy)]
pub struct MatMap<E, F> {
    expr: E,
    f: F,
    structure: Structure,
}

impl<E, F> MatMap<E, F>
where
    E: MatExpr,
    F: UnaryFunctor<E::Elem>,
{
    pub fn new(expr: E, f: F) -> Self {
        let structure = f.yields(expr.structure());
        Self {
            expr,
            f,
            structure,
        }
    }
}

impl<E, F> MatExpr for MatMap<E, F>
where
    E: MatExpr,
    F: UnaryFunctor<E::Elem>,
{
    type Elem = E::Elem;
    const IS_COMPUTATION: bool = true;

    fn rows(&self) -> usize {
        self.expr.rows()
    }

    fn columns(&self) -> usize {
        self.expr.columns()
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> Self::Elem {
        self.f.apply(self.expr.get(i, j))
    }

    fn structure(&self) -> Structure {
        self.structure
    }

    fn can_alias(&self, id: usize) -> bool {
        self.expr.can_alias(id)
    }

    fn is_aliased(&self, id: usize) -> bool {
        self.expr.is_aliased(id)
    }
}

/// Operator sugar for the elementwise matrix operations.
macro_rules! impl_mat_ops {
    ([ $($gen:tt)* ], $lhs:ty) => {
        impl<$($gen)*, RhsE> std::ops::Add<RhsE> for $lhs
        where
            $lhs: $crate::expr::MatExpr,
            <$lhs as $crate::expr::MatExpr>::Elem:
                std::ops::Add<Output = <$lhs as $crate::expr::MatExpr>::Elem>,
            RhsE: $crate::expr::MatExpr<Elem = <$lhs as $crate::expr::MatExpr>::Elem>,
        {
            type Output = $crate::expr::MatBin<$lhs, RhsE, $crate::functor::AddOp>;

            #[inline]
            fn add(self, rhs: RhsE) -> Self::Output {
                $crate::expr::MatBin::new(self, rhs, $crate::functor::AddOp)
            }
        }

        impl<$($gen)*, RhsE> std::ops::Sub<RhsE> for $lhs
        where
            $lhs: $crate::expr::MatExpr,
            <$lhs as $crate::expr::MatExpr>::Elem:
                std::ops::Sub<Output = <$lhs as $crate::expr::MatExpr>::Elem>,
            RhsE: $crate::expr::MatExpr<Elem = <$lhs as $crate::expr::MatExpr>::Elem>,
        {
            type Output = $crate::expr::MatBin<$lhs, RhsE, $crate::functor::SubOp>;

            #[inline]
            fn sub(self, rhs: RhsE) -> Self::Output {
                $crate::expr::MatBin::new(self, rhs, $crate::functor::SubOp)
            }
        }

        impl<$($gen)*, RhsE> std::ops::Mul<RhsE> for $lhs
        where
            $lhs: $crate::expr::MatExpr,
            <$lhs as $crate::expr::MatExpr>::Elem:
                std::ops::Mul<Output = <$lhs as $crate::expr::MatExpr>::Elem>,
            RhsE: $crate::expr::MatExpr<Elem = <$lhs as $crate::expr::MatExpr>::Elem>,
        {
            type Output = $crate::expr::MatBin<$lhs, RhsE, $crate::functor::MultOp>;

            #[inline]
            fn mul(self, rhs: RhsE) -> Self::Output {
                $crate::expr::MatBin::new(self, rhs, $crate::functor::MultOp)
            }
        }

        impl<$($gen)*> std::ops::Neg for $lhs
        where
            $lhs: $crate::expr::MatExpr,
            <$lhs as $crate::expr::MatExpr>::Elem:
                std::ops::Neg<Output = <$lhs as $crate::expr::MatExpr>::Elem>,
        {
            type Output = $crate::expr::MatMap<$lhs, $crate::functor::NegOp>;

            #[inline]
            fn neg(self) -> Self::Output {
                $crate::expr::MatMap::new(self, $crate::functor::NegOp)
            }
        }
    };
}

pub(crate) use impl_mat_ops;

impl_mat_ops!(['a, T: Scalar], &'a DenseMatrix<T>);
impl_mat_ops!([L: Copy, R: Copy, F: Copy], MatBin<L, R, F>);
impl_mat_ops!([E: Copy, F: Copy], MatMap<E, F>);
