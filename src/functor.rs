//! Operation functors: one stateless tag per elementary operation.
//!
//! Each functor exposes three facets consumed by the expression layer:
//! a scalar apply, a compile-time SIMD-combinability query, and a packed
//! apply. The packed default maps the scalar apply over the lanes, so the
//! two paths are bit-for-bit consistent by construction; a backend override
//! may reassociate floating-point reductions but must not change results
//! outright.
//!
//! Each functor also publishes how it propagates structural properties via
//! `yields`, under a conservative-truth policy: a property is claimed only
//! when the algebraic identity guarantees it for every valid input.

use crate::simd::{Pack, Scalar};
use crate::structure::Structure;
use num_complex::Complex;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A two-operand elementary operation.
pub trait BinaryFunctor<T: Scalar>: Copy + Default + Send + Sync + 'static {
    /// Scalar apply. Referentially transparent.
    fn apply(self, a: T, b: T) -> T;

    /// Whether a batched form exists for this element type.
    const SIMD_ENABLED: bool;

    /// Batched apply on packed operands.
    #[inline(always)]
    fn apply_pack(self, a: Pack<T>, b: Pack<T>) -> Pack<T> {
        a.zip(b, |x, y| self.apply(x, y))
    }

    /// Structural property of the result, given the operand structures.
    fn yields(self, lhs: Structure, rhs: Structure) -> Structure;
}

/// A one-operand elementary operation.
pub trait UnaryFunctor<T: Scalar>: Copy + Default + Send + Sync + 'static {
    fn apply(self, a: T) -> T;

    const SIMD_ENABLED: bool;

    #[inline(always)]
    fn apply_pack(self, a: Pack<T>) -> Pack<T> {
        a.map(|x| self.apply(x))
    }

    fn yields(self, arg: Structure) -> Structure;
}

/// Pick the strongest structure implied by a set of guaranteed properties.
///
/// A result that is both lower and upper triangular is diagonal; a uni
/// variant outranks strictly, which outranks plain triangular.
fn strongest(
    sym: bool,
    herm: bool,
    lower: bool,
    strictly_lower: bool,
    uni_lower: bool,
    upper: bool,
    strictly_upper: bool,
    uni_upper: bool,
) -> Structure {
    let any_lower = lower || strictly_lower || uni_lower;
    let any_upper = upper || strictly_upper || uni_upper;
    if any_lower && any_upper {
        Structure::Diagonal
    } else if uni_lower {
        Structure::UniLower
    } else if strictly_lower {
        Structure::StrictlyLower
    } else if any_lower {
        Structure::Lower
    } else if uni_upper {
        Structure::UniUpper
    } else if strictly_upper {
        Structure::StrictlyUpper
    } else if any_upper {
        Structure::Upper
    } else if herm {
        Structure::Hermitian
    } else if sym {
        Structure::Symmetric
    } else {
        Structure::General
    }
}

/// Elementwise addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOp;

/// Elementwise subtraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubOp;

/// Elementwise (Schur) multiplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultOp;

/// Elementwise division.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DivOp;

impl<T: Scalar + Add<Output = T>> BinaryFunctor<T> for AddOp {
    #[inline(always)]
    fn apply(self, a: T, b: T) -> T {
        a + b
    }

    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn yields(self, lhs: Structure, rhs: Structure) -> Structure {
        strongest(
            lhs.is_symmetric() && rhs.is_symmetric(),
            lhs.is_hermitian() && rhs.is_hermitian(),
            lhs.is_lower() && rhs.is_lower(),
            lhs.is_strictly_lower() && rhs.is_strictly_lower(),
            // Unit plus zero diagonal commutes, so either operand order
            // yields a unit diagonal.
            (lhs.is_uni_lower() && rhs.is_strictly_lower())
                || (lhs.is_strictly_lower() && rhs.is_uni_lower()),
            lhs.is_upper() && rhs.is_upper(),
            lhs.is_strictly_upper() && rhs.is_strictly_upper(),
            (lhs.is_uni_upper() && rhs.is_strictly_upper())
                || (lhs.is_strictly_upper() && rhs.is_uni_upper()),
        )
    }
}

impl<T: Scalar + Sub<Output = T>> BinaryFunctor<T> for SubOp {
    #[inline(always)]
    fn apply(self, a: T, b: T) -> T {
        a - b
    }

    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn yields(self, lhs: Structure, rhs: Structure) -> Structure {
        strongest(
            lhs.is_symmetric() && rhs.is_symmetric(),
            lhs.is_hermitian() && rhs.is_hermitian(),
            lhs.is_lower() && rhs.is_lower(),
            lhs.is_strictly_lower() && rhs.is_strictly_lower(),
            // Order-dependent: 1 - 0 = 1 on the diagonal, but 0 - 1 = -1.
            // Only uni-lower minus strictly-lower keeps the unit diagonal.
            lhs.is_uni_lower() && rhs.is_strictly_lower(),
            lhs.is_upper() && rhs.is_upper(),
            lhs.is_strictly_upper() && rhs.is_strictly_upper(),
            lhs.is_uni_upper() && rhs.is_strictly_upper(),
        )
    }
}

impl<T: Scalar + Mul<Output = T>> BinaryFunctor<T> for MultOp {
    #[inline(always)]
    fn apply(self, a: T, b: T) -> T {
        a * b
    }

    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn yields(self, lhs: Structure, rhs: Structure) -> Structure {
        strongest(
            lhs.is_symmetric() && rhs.is_symmetric(),
            lhs.is_hermitian() && rhs.is_hermitian(),
            // The elementwise product is zero wherever either factor is.
            lhs.is_lower() || rhs.is_lower(),
            lhs.is_strictly_lower() || rhs.is_strictly_lower(),
            lhs.is_uni_lower() && rhs.is_uni_lower(),
            lhs.is_upper() || rhs.is_upper(),
            lhs.is_strictly_upper() || rhs.is_strictly_upper(),
            lhs.is_uni_upper() && rhs.is_uni_upper(),
        )
    }
}

impl<T: Scalar + Div<Output = T>> BinaryFunctor<T> for DivOp {
    #[inline(always)]
    fn apply(self, a: T, b: T) -> T {
        a / b
    }

    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn yields(self, lhs: Structure, rhs: Structure) -> Structure {
        strongest(
            lhs.is_symmetric() && rhs.is_symmetric(),
            lhs.is_hermitian() && rhs.is_hermitian(),
            // Only the numerator's zero pattern survives division.
            lhs.is_lower(),
            lhs.is_strictly_lower(),
            lhs.is_uni_lower() && rhs.is_uni_lower(),
            lhs.is_upper(),
            lhs.is_strictly_upper(),
            lhs.is_uni_upper() && rhs.is_uni_upper(),
        )
    }
}

/// Elementwise negation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NegOp;

impl<T: Scalar + Neg<Output = T>> UnaryFunctor<T> for NegOp {
    #[inline(always)]
    fn apply(self, a: T) -> T {
        -a
    }

    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    fn yields(self, arg: Structure) -> Structure {
        match arg {
            // Negation turns the implicit unit diagonal into -1.
            Structure::UniLower => Structure::Lower,
            Structure::UniUpper => Structure::Upper,
            other => other,
        }
    }
}

/// Values that expose a complex conjugate; the identity for real types.
pub trait Conjugate: Copy {
    fn conj(self) -> Self;
}

macro_rules! impl_conjugate_real {
    ($($t:ty),*) => {
        $(
            impl Conjugate for $t {
                #[inline(always)]
                fn conj(self) -> Self {
                    self
                }
            }
        )*
    };
}

impl_conjugate_real!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Conjugate for Complex<f32> {
    #[inline(always)]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

impl Conjugate for Complex<f64> {
    #[inline(always)]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

/// Elementwise complex conjugation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConjOp;

impl<T: Scalar + Conjugate> UnaryFunctor<T> for ConjOp {
    #[inline(always)]
    fn apply(self, a: T) -> T {
        a.conj()
    }

    const SIMD_ENABLED: bool = T::SIMD_ENABLED;

    // conj fixes 0 and 1 and commutes with transposition, so every
    // structural property survives.
    fn yields(self, arg: Structure) -> Structure {
        arg
    }
}

/// Elementwise arcsine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsinOp;

impl<T: Scalar + num_traits::Float> UnaryFunctor<T> for AsinOp {
    #[inline(always)]
    fn apply(self, a: T) -> T {
        a.asin()
    }

    // No packed arcsine in the capability layer.
    const SIMD_ENABLED: bool = false;

    fn yields(self, arg: Structure) -> Structure {
        match arg {
            // asin(0) = 0: zero patterns survive. asin(1) != 1: the unit
            // diagonal does not.
            Structure::UniLower => Structure::Lower,
            Structure::UniUpper => Structure::Upper,
            Structure::Hermitian => Structure::General,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::PACK_WIDTH;

    fn sub_yields(lhs: Structure, rhs: Structure) -> Structure {
        <SubOp as BinaryFunctor<f64>>::yields(SubOp, lhs, rhs)
    }

    fn add_yields(lhs: Structure, rhs: Structure) -> Structure {
        <AddOp as BinaryFunctor<f64>>::yields(AddOp, lhs, rhs)
    }

    #[test]
    fn test_sub_symmetric_closure() {
        assert_eq!(
            sub_yields(Structure::Symmetric, Structure::Symmetric),
            Structure::Symmetric
        );
        assert_eq!(
            sub_yields(Structure::Symmetric, Structure::General),
            Structure::General
        );
    }

    #[test]
    fn test_sub_uni_lower_is_order_dependent() {
        // 1 - 0 = 1 on the diagonal: unit diagonal survives.
        assert_eq!(
            sub_yields(Structure::UniLower, Structure::StrictlyLower),
            Structure::UniLower
        );
        // 0 - 1 = -1: only plain lower remains.
        assert_eq!(
            sub_yields(Structure::StrictlyLower, Structure::UniLower),
            Structure::Lower
        );
    }

    #[test]
    fn test_add_uni_lower_commutes() {
        assert_eq!(
            add_yields(Structure::UniLower, Structure::StrictlyLower),
            Structure::UniLower
        );
        assert_eq!(
            add_yields(Structure::StrictlyLower, Structure::UniLower),
            Structure::UniLower
        );
        // uni + uni has a diagonal of 2.
        assert_eq!(
            add_yields(Structure::UniLower, Structure::UniLower),
            Structure::Lower
        );
    }

    #[test]
    fn test_schur_mixed_triangles_are_diagonal() {
        let y = <MultOp as BinaryFunctor<f64>>::yields(MultOp, Structure::Lower, Structure::Upper);
        assert_eq!(y, Structure::Diagonal);
    }

    #[test]
    fn test_schur_lower_absorbs() {
        let y =
            <MultOp as BinaryFunctor<f64>>::yields(MultOp, Structure::StrictlyLower, Structure::General);
        assert_eq!(y, Structure::StrictlyLower);
    }

    #[test]
    fn test_div_keeps_numerator_pattern_only() {
        let y = <DivOp as BinaryFunctor<f64>>::yields(DivOp, Structure::General, Structure::Lower);
        assert_eq!(y, Structure::General);
        let y = <DivOp as BinaryFunctor<f64>>::yields(DivOp, Structure::Lower, Structure::General);
        assert_eq!(y, Structure::Lower);
    }

    #[test]
    fn test_neg_drops_unit_diagonal() {
        assert_eq!(
            <NegOp as UnaryFunctor<f64>>::yields(NegOp, Structure::UniLower),
            Structure::Lower
        );
        assert_eq!(
            <NegOp as UnaryFunctor<f64>>::yields(NegOp, Structure::StrictlyUpper),
            Structure::StrictlyUpper
        );
    }

    #[test]
    fn test_asin_fixes_zero_not_one() {
        assert_eq!(
            <AsinOp as UnaryFunctor<f64>>::yields(AsinOp, Structure::StrictlyLower),
            Structure::StrictlyLower
        );
        assert_eq!(
            <AsinOp as UnaryFunctor<f64>>::yields(AsinOp, Structure::UniUpper),
            Structure::Upper
        );
    }

    #[test]
    fn test_pack_apply_matches_scalar() {
        let a: Vec<i64> = (0..PACK_WIDTH as i64).collect();
        let b: Vec<i64> = (10..10 + PACK_WIDTH as i64).collect();

        let pa = Pack::load(&a, 0);
        let pb = Pack::load(&b, 0);
        let packed = SubOp.apply_pack(pa, pb);

        for i in 0..PACK_WIDTH {
            assert_eq!(packed.0[i], SubOp.apply(a[i], b[i]));
        }
    }

    #[test]
    fn test_simd_query_tracks_element_type() {
        assert!(<AddOp as BinaryFunctor<f64>>::SIMD_ENABLED);
        assert!(!<AddOp as BinaryFunctor<num_complex::Complex64>>::SIMD_ENABLED);
        assert!(!<AsinOp as UnaryFunctor<f64>>::SIMD_ENABLED);
    }
}
