//! SIMD capability layer consumed by the evaluation kernels.
//!
//! The rest of the crate never touches intrinsics. It sees exactly the
//! narrow interface an intrinsics backend would provide: a per-element-type
//! enablement flag, a pack width, and `load`/`store`/`stream` primitives over
//! slices. The portable implementation below keeps every lane operation a
//! straight-line array op so the backend scheduler (here: the autovectorizer)
//! can do the actual lane work.

use num_complex::Complex;
use std::fmt::Debug;

/// Number of lanes in a [`Pack`].
///
/// One batch per element type; 8 lanes of `f64` is a 512-bit batch, matching
/// the widest register file the kernels are shaped for.
pub const PACK_WIDTH: usize = 8;

/// Element types storable in containers and processable by the kernels.
///
/// `SIMD_ENABLED` is the compile-time SIMD-combinability flag: `true` only
/// when values of this type can be processed as packed lanes. Unknown user
/// types default to `false` (conservative), which routes every kernel through
/// the scalar path.
pub trait Scalar: Copy + PartialEq + Default + Debug + Send + Sync + 'static {
    const SIMD_ENABLED: bool = false;
}

macro_rules! impl_scalar_simd {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                const SIMD_ENABLED: bool = true;
            }
        )*
    };
}

impl_scalar_simd!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// Complex lanes interleave real/imaginary parts; the packed kernels do not
// handle that layout, so complex stays on the scalar path.
impl Scalar for Complex<f32> {}
impl Scalar for Complex<f64> {}

/// A batch of [`PACK_WIDTH`] lanes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pack<T: Scalar>(pub [T; PACK_WIDTH]);

impl<T: Scalar> Pack<T> {
    /// Broadcast a single value into every lane.
    #[inline(always)]
    pub fn splat(value: T) -> Self {
        Pack([value; PACK_WIDTH])
    }

    /// Load one pack starting at `slice[at]`.
    ///
    /// # Panics
    /// Panics if fewer than [`PACK_WIDTH`] elements remain.
    #[inline(always)]
    pub fn load(slice: &[T], at: usize) -> Self {
        let mut lanes = [T::default(); PACK_WIDTH];
        lanes.copy_from_slice(&slice[at..at + PACK_WIDTH]);
        Pack(lanes)
    }

    /// Unaligned load. The portable backend has no alignment distinction;
    /// the separate entry point mirrors the capability interface.
    #[inline(always)]
    pub fn loadu(slice: &[T], at: usize) -> Self {
        Self::load(slice, at)
    }

    /// Store this pack starting at `slice[at]`.
    #[inline(always)]
    pub fn store(self, slice: &mut [T], at: usize) {
        slice[at..at + PACK_WIDTH].copy_from_slice(&self.0);
    }

    /// Unaligned store.
    #[inline(always)]
    pub fn storeu(self, slice: &mut [T], at: usize) {
        self.store(slice, at)
    }

    /// Non-temporal store: no read-before-write of the destination line.
    ///
    /// The portable backend lowers this to a plain store; the distinct entry
    /// point exists so the streaming kernel stays a separate, testable path.
    #[inline(always)]
    pub fn stream(self, slice: &mut [T], at: usize) {
        self.store(slice, at)
    }

    /// Lane-wise unary map.
    #[inline(always)]
    pub fn map(self, f: impl Fn(T) -> T) -> Self {
        let mut lanes = [T::default(); PACK_WIDTH];
        for i in 0..PACK_WIDTH {
            lanes[i] = f(self.0[i]);
        }
        Pack(lanes)
    }

    /// Lane-wise binary zip.
    #[inline(always)]
    pub fn zip(self, other: Self, f: impl Fn(T, T) -> T) -> Self {
        let mut lanes = [T::default(); PACK_WIDTH];
        for i in 0..PACK_WIDTH {
            lanes[i] = f(self.0[i], other.0[i]);
        }
        Pack(lanes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_simd_flags() {
        assert!(f64::SIMD_ENABLED);
        assert!(i32::SIMD_ENABLED);
        assert!(!Complex64::SIMD_ENABLED);
    }

    #[test]
    fn test_load_store_roundtrip() {
        let src: Vec<i64> = (0..16).collect();
        let mut dst = vec![0i64; 16];

        Pack::load(&src, 0).store(&mut dst, 0);
        Pack::load(&src, 8).store(&mut dst, 8);
        assert_eq!(src, dst);
    }

    #[test]
    fn test_stream_matches_store() {
        let src: Vec<f64> = (0..8).map(|x| x as f64).collect();
        let mut a = vec![0.0; 8];
        let mut b = vec![0.0; 8];

        Pack::load(&src, 0).store(&mut a, 0);
        Pack::load(&src, 0).stream(&mut b, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zip_add() {
        let a = Pack::splat(2.0f64);
        let b = Pack::splat(3.0f64);
        let c = a.zip(b, |x, y| x + y);
        assert_eq!(c, Pack::splat(5.0));
    }
}
