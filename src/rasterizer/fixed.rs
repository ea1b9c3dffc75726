//! Fixed-point arithmetic
//!
//! 16.16 fixed point as used by every part of the renderer. Multiplies and
//! divides go through a 64-bit intermediate so results are deterministic
//! across platforms.

use std::fmt;

/// A real number stored as a 32-bit integer with 16 fractional bits
pub type Fixed = i32;

pub const FRACBITS: u32 = 16;
pub const FRACUNIT: Fixed = 1 << FRACBITS;

/// Largest integer part a fixed value can carry
const WHOLE_MAX: f64 = (1i64 << (31 - FRACBITS)) as f64;

/// Error for conversions that cannot be represented in 16.16
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedError {
    /// Integer part does not fit, or the value is not finite
    OutOfRange(f64),
}

impl fmt::Display for FixedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedError::OutOfRange(v) => write!(f, "{} does not fit in 16.16 fixed point", v),
        }
    }
}

impl std::error::Error for FixedError {}

/// Multiply two fixed values. Wraps if the product leaves the 32-bit range.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    ((a as i64 * b as i64) >> FRACBITS) as Fixed
}

/// Divide two fixed values, saturating to `i32::MAX`/`i32::MIN` when the
/// quotient would not fit.
///
/// `b == 0` is a caller error. Debug builds stop on it; release builds fall
/// into the saturating branch, so the divide itself can never fault.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    debug_assert!(b != 0, "fixed_div: division by zero ({} / 0)", a);

    if (a.unsigned_abs() >> (FRACBITS - 2)) >= b.unsigned_abs() {
        if (a ^ b) < 0 {
            i32::MIN
        } else {
            i32::MAX
        }
    } else {
        (((a as i64) << FRACBITS) / b as i64) as Fixed
    }
}

/// Convert to floating point. Exact for every fixed value.
#[inline]
pub fn fixed_to_float(f: Fixed) -> f64 {
    let whole = (f >> FRACBITS) as f64;
    let frac = (f & (FRACUNIT - 1)) as f64 / FRACUNIT as f64;
    whole + frac
}

/// Convert from floating point, truncating the fraction toward zero.
pub fn float_to_fixed(d: f64) -> Result<Fixed, FixedError> {
    if !d.is_finite() || d >= WHOLE_MAX || d < -WHOLE_MAX {
        return Err(FixedError::OutOfRange(d));
    }
    let whole = d.trunc() as i32;
    let frac = ((d - whole as f64) * FRACUNIT as f64) as i32;
    Ok((whole << FRACBITS) + frac)
}

/// Convert from floating point, clamping to the representable range.
///
/// The automap converts frame distances back into map units with this; on
/// very large levels a fully zoomed out window can exceed 16.16 range.
#[inline]
pub fn float_to_fixed_saturating(d: f64) -> Fixed {
    // `as` saturates and maps NaN to zero.
    (d * FRACUNIT as f64) as Fixed
}

/// Integer to fixed
#[inline]
pub const fn int_to_fixed(i: i32) -> Fixed {
    i << FRACBITS
}

/// Binary angle measurement: the full circle maps onto the u32 range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Angle(pub u32);

impl Angle {
    pub const EAST: Angle = Angle(0);
    pub const NORTH: Angle = Angle(0x4000_0000);
    pub const WEST: Angle = Angle(0x8000_0000);
    pub const SOUTH: Angle = Angle(0xC000_0000);

    pub fn from_degrees(deg: f64) -> Self {
        let turns = (deg / 360.0).rem_euclid(1.0);
        Angle((turns * 4_294_967_296.0) as u64 as u32)
    }

    pub fn to_radians(self) -> f64 {
        self.0 as f64 / 4_294_967_296.0 * std::f64::consts::TAU
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Rotate a fixed-point vector around the origin
pub fn rotate(x: Fixed, y: Fixed, angle: Angle) -> (Fixed, Fixed) {
    let rad = angle.to_radians();
    let cos = float_to_fixed_saturating(rad.cos());
    let sin = float_to_fixed_saturating(rad.sin());

    let rx = fixed_mul(x, cos).wrapping_sub(fixed_mul(y, sin));
    let ry = fixed_mul(x, sin).wrapping_add(fixed_mul(y, cos));
    (rx, ry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_basic() {
        assert_eq!(fixed_mul(int_to_fixed(3), int_to_fixed(4)), int_to_fixed(12));
        assert_eq!(fixed_mul(FRACUNIT / 2, FRACUNIT / 2), FRACUNIT / 4);
        assert_eq!(fixed_mul(int_to_fixed(-3), FRACUNIT / 2), -(3 * FRACUNIT / 2));
    }

    #[test]
    fn test_div_basic() {
        assert_eq!(fixed_div(int_to_fixed(12), int_to_fixed(4)), int_to_fixed(3));
        assert_eq!(fixed_div(FRACUNIT, int_to_fixed(2)), FRACUNIT / 2);
        assert_eq!(fixed_div(int_to_fixed(-9), int_to_fixed(3)), int_to_fixed(-3));
    }

    #[test]
    fn test_div_saturates() {
        assert_eq!(fixed_div(i32::MAX, 1), i32::MAX);
        assert_eq!(fixed_div(i32::MAX, -1), i32::MIN);
        assert_eq!(fixed_div(i32::MIN, 1), i32::MIN);
        assert_eq!(fixed_div(i32::MIN, -1), i32::MAX);
        assert_eq!(fixed_div(int_to_fixed(20000), 4), i32::MAX);
    }

    #[test]
    fn test_div_of_mul_recovers_operand() {
        // Sweep a grid of operands and check div(mul(a, b), b) stays within
        // a couple of ulps whenever neither step overflows.
        let values: Vec<Fixed> = (-40..=40)
            .map(|i| i * 1237 * 97 + (i & 3) * 31)
            .chain([FRACUNIT, -FRACUNIT, FRACUNIT / 3, 7 * FRACUNIT + 5])
            .collect();

        for &a in &values {
            for &b in &values {
                if b == 0 {
                    continue;
                }
                let wide = (a as i64 * b as i64) >> FRACBITS;
                if wide.abs() > (i32::MAX as i64) >> 2 {
                    continue;
                }
                let product = fixed_mul(a, b);
                if (product.unsigned_abs() >> (FRACBITS - 2)) >= b.unsigned_abs() {
                    continue;
                }
                let back = fixed_div(product, b);
                // Truncation in the multiply loses up to one ulp of the
                // product, which the divide scales by 1/b.
                let tolerance = (FRACUNIT as i64 / (b.unsigned_abs() as i64).max(1)) + 1;
                assert!(
                    ((back as i64) - (a as i64)).abs() <= tolerance,
                    "a={} b={} back={}",
                    a,
                    b,
                    back
                );
            }
        }
    }

    #[test]
    fn test_float_round_trip() {
        for raw in [0, 1, -1, FRACUNIT, -FRACUNIT, 0x7FFF_FFFF, i32::MIN, 123_456_789, -98_304] {
            let f = fixed_to_float(raw);
            assert_eq!(float_to_fixed(f).unwrap(), raw);
        }
        assert_eq!(fixed_to_float(-98_304), -1.5);
    }

    #[test]
    fn test_float_to_fixed_out_of_range() {
        assert!(float_to_fixed(32767.5).is_ok());
        assert!(float_to_fixed(-32768.0).is_ok());
        assert_eq!(float_to_fixed(32768.0), Err(FixedError::OutOfRange(32768.0)));
        assert!(float_to_fixed(-32768.5).is_err());
        assert!(float_to_fixed(-32769.0).is_err());
        assert!(float_to_fixed(f64::NAN).is_err());
        assert!(float_to_fixed(f64::INFINITY).is_err());
    }

    #[test]
    fn test_saturating_conversion() {
        assert_eq!(float_to_fixed_saturating(1.0), FRACUNIT);
        assert_eq!(float_to_fixed_saturating(1.0e9), i32::MAX);
        assert_eq!(float_to_fixed_saturating(-1.0e9), i32::MIN);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let (x, y) = rotate(FRACUNIT, 0, Angle::NORTH);
        assert!(x.abs() <= 1);
        assert!((y - FRACUNIT).abs() <= 1);
    }
}
