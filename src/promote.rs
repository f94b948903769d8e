//! Element-type result promotion.
//!
//! [`Promote`] models the real promotion rules of the arithmetic operators:
//! `<T1 as Promote<T2>>::Output` is the concrete type produced by evaluating
//! `t1 * t2` (equivalently `+`, `-`, `/`) on values of those types. The model
//! is verified against the operators themselves by compile-time equivalence in
//! the tests below, never by duplicating the rules textually.
//!
//! Two deliberately separate rule paths:
//! - two identical built-ins promote by identity (`f64 * f64 -> f64`);
//! - a complex number and its scalar component promote by the common-type
//!   rule (`Complex<f64> * f64 -> Complex<f64>`).
//!
//! The paths must stay separately specializable: a common-type rule between
//! two *different* complex representations has no well-defined answer, so no
//! such impl exists. An operand pair with no valid result simply has no
//! `Promote` impl; overload resolution excludes the combination at compile
//! time with no runtime failure mode.

use num_complex::Complex;

/// Result type of combining `Self` with `Rhs` under an arithmetic operator.
pub trait Promote<Rhs = Self> {
    type Output;
}

// Identity rule: two identical built-in types.
macro_rules! impl_promote_identity {
    ($($t:ty),*) => {
        $(
            impl Promote for $t {
                type Output = $t;
            }
        )*
    };
}

impl_promote_identity!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// Common-type rule: complex with its scalar component, either operand order.
impl Promote<f32> for Complex<f32> {
    type Output = Complex<f32>;
}

impl Promote<f64> for Complex<f64> {
    type Output = Complex<f64>;
}

impl Promote<Complex<f32>> for f32 {
    type Output = Complex<f32>;
}

impl Promote<Complex<f64>> for f64 {
    type Output = Complex<f64>;
}

// Two identical complex types recurse into the component rule.
impl Promote for Complex<f32> {
    type Output = Complex<f32>;
}

impl Promote for Complex<f64> {
    type Output = Complex<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::{Add, Mul};

    // Compiles only when both parameters resolve to the same type.
    trait SameAs<T> {}
    impl<T> SameAs<T> for T {}

    fn promote_models_mul<T1, T2>()
    where
        T1: Promote<T2> + Mul<T2>,
        <T1 as Promote<T2>>::Output: SameAs<<T1 as Mul<T2>>::Output>,
    {
    }

    fn promote_models_add<T1, T2>()
    where
        T1: Promote<T2> + Add<T2>,
        <T1 as Promote<T2>>::Output: SameAs<<T1 as Add<T2>>::Output>,
    {
    }

    #[test]
    fn test_identity_rule_matches_operators() {
        promote_models_mul::<f32, f32>();
        promote_models_mul::<f64, f64>();
        promote_models_mul::<i32, i32>();
        promote_models_mul::<u64, u64>();
        promote_models_add::<f64, f64>();
        promote_models_add::<i8, i8>();
    }

    #[test]
    fn test_common_type_rule_matches_operators() {
        promote_models_mul::<Complex<f64>, f64>();
        promote_models_mul::<f64, Complex<f64>>();
        promote_models_mul::<Complex<f32>, f32>();
        promote_models_mul::<Complex<f64>, Complex<f64>>();
        promote_models_add::<Complex<f64>, f64>();
    }
}
