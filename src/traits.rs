use core::fmt::Debug;
use num_traits::{Float, FloatConst, Num, One, Zero};

/// Trait for types that can be stored in a [`DynMatrix`](crate::DynMatrix).
///
/// Blanket-implemented for all types satisfying the bounds.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num> Scalar for T {}

/// Trait for the real floating-point element types the filter runs on.
///
/// Required by everything that needs `sqrt`, `sin`/`cos`, `atan2` or a
/// finiteness check. Implemented for `f32` and `f64`.
pub trait FloatScalar: Scalar + Float + FloatConst + Send + Sync + 'static {
    /// Convert an `f64` constant into `Self`.
    ///
    /// Every `FloatScalar` can represent (a rounding of) any finite `f64`,
    /// so this never fails for the literals used in the crate.
    #[inline]
    fn lit(v: f64) -> Self {
        <Self as num_traits::NumCast>::from(v).unwrap_or_else(Self::nan)
    }

    /// Convert a step index into `Self`.
    #[inline]
    fn from_index(i: usize) -> Self {
        <Self as num_traits::NumCast>::from(i).unwrap_or_else(Self::nan)
    }
}

impl<T: Scalar + Float + FloatConst + Send + Sync + 'static> FloatScalar for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pi<T: FloatScalar>() -> T {
        T::lit(2.0) * T::PI()
    }

    #[test]
    fn literal_conversion() {
        assert_eq!(f64::lit(0.5), 0.5);
        assert_eq!(f32::lit(0.5), 0.5_f32);
        assert_eq!(f64::from_index(42), 42.0);
    }

    #[test]
    fn generic_constants() {
        assert!((two_pi::<f64>() - core::f64::consts::TAU).abs() < 1e-15);
        assert!((two_pi::<f32>() - core::f32::consts::TAU).abs() < 1e-6);
    }
}
