use std::fmt::Debug;

use super::DTypeTensor;

/// Scalar primitives that kernels are written against.
///
/// Integer arithmetic wraps on overflow. For floats `lowest`/`highest` are
/// the infinities, so folding `max`/`min` from them is exact for every input.
pub trait Element: Copy + Debug + PartialEq + PartialOrd + Send + Sync + 'static {
    fn zero() -> Self;

    fn one() -> Self;

    fn lowest() -> Self;

    fn highest() -> Self;

    fn add(self, rhs: Self) -> Self;

    fn mul(self, rhs: Self) -> Self;

    fn max(self, rhs: Self) -> Self;

    fn min(self, rhs: Self) -> Self;

    fn slice(tensor: &DTypeTensor) -> Option<&[Self]>;

    fn slice_mut(tensor: &mut DTypeTensor) -> Option<&mut [Self]>;
}

macro_rules! impl_float {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            fn zero() -> Self {
                0.0
            }

            fn one() -> Self {
                1.0
            }

            fn lowest() -> Self {
                <$t>::NEG_INFINITY
            }

            fn highest() -> Self {
                <$t>::INFINITY
            }

            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }

            fn max(self, rhs: Self) -> Self {
                <$t>::max(self, rhs)
            }

            fn min(self, rhs: Self) -> Self {
                <$t>::min(self, rhs)
            }

            fn slice(tensor: &DTypeTensor) -> Option<&[Self]> {
                if let DTypeTensor::$variant(x) = tensor { Some(x.as_slice()) } else { None }
            }

            fn slice_mut(tensor: &mut DTypeTensor) -> Option<&mut [Self]> {
                if let DTypeTensor::$variant(x) = tensor { Some(x.as_mut_slice()) } else { None }
            }
        }
    };
}

macro_rules! impl_int {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            fn zero() -> Self {
                0
            }

            fn one() -> Self {
                1
            }

            fn lowest() -> Self {
                <$t>::MIN
            }

            fn highest() -> Self {
                <$t>::MAX
            }

            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            fn mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }

            fn max(self, rhs: Self) -> Self {
                Ord::max(self, rhs)
            }

            fn min(self, rhs: Self) -> Self {
                Ord::min(self, rhs)
            }

            fn slice(tensor: &DTypeTensor) -> Option<&[Self]> {
                if let DTypeTensor::$variant(x) = tensor { Some(x.as_slice()) } else { None }
            }

            fn slice_mut(tensor: &mut DTypeTensor) -> Option<&mut [Self]> {
                if let DTypeTensor::$variant(x) = tensor { Some(x.as_mut_slice()) } else { None }
            }
        }
    };
}

impl_float!(f32, F32);
impl_float!(f64, F64);
impl_int!(i32, I32);
impl_int!(i64, I64);
