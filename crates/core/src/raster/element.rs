//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Output sample types (`u8`, `u16`, `f32`) and the working type (`f64`)
/// all implement it, which lets quantization be written once.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert an `f64` into this type.
    ///
    /// Integer targets truncate toward zero and saturate at the type bounds;
    /// NaN becomes zero. Float targets are a plain cast.
    fn from_f64_saturating(value: f64) -> Self {
        if value.is_nan() {
            return Self::zero();
        }
        if Self::is_float() {
            return NumCast::from(value).unwrap_or_else(Self::zero);
        }
        let lo = Self::min_value().to_f64().unwrap_or(f64::MIN);
        let hi = Self::max_value().to_f64().unwrap_or(f64::MAX);
        NumCast::from(value.trunc().clamp(lo, hi)).unwrap_or_else(Self::zero)
    }
}

macro_rules! impl_raster_element {
    ($t:ty, $float:expr) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_float() -> bool {
                $float
            }
        }
    };
}

impl_raster_element!(u8, false);
impl_raster_element!(u16, false);
impl_raster_element!(u32, false);
impl_raster_element!(i16, false);
impl_raster_element!(i32, false);
impl_raster_element!(f32, true);
impl_raster_element!(f64, true);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_integer_conversion() {
        assert_eq!(u8::from_f64_saturating(127.5), 127);
        assert_eq!(u8::from_f64_saturating(300.0), 255);
        assert_eq!(u8::from_f64_saturating(-4.0), 0);
        assert_eq!(u16::from_f64_saturating(65535.9), 65535);
        assert_eq!(u8::from_f64_saturating(f64::NAN), 0);
    }

    #[test]
    fn test_float_conversion_is_plain_cast() {
        assert_eq!(f32::from_f64_saturating(0.25), 0.25f32);
        assert_eq!(f32::from_f64_saturating(-1.5), -1.5f32);
    }
}
