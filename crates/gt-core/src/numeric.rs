use crate::CoreError;

/// Floating point type used throughout the engine.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Accept `v` only if it lies in the closed interval [0, 1].
pub fn ensure_unit_interval(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(CoreError::OutOfRange {
            what,
            value: v,
            range: "[0, 1]",
        })
    }
}

/// Linear blend `a*(1-c) + b*c`.
///
/// Written so that `c == 0` returns `a` and `c == 1` returns `b` exactly
/// for finite inputs.
#[inline]
pub fn blend(a: Real, b: Real, c: Real) -> Real {
    a * (1.0 - c) + b * c
}

/// Symmetric, non-negative difference between two values.
///
/// Absolute below unit magnitude, relative above it. NaN maps to +inf so a
/// broken value can never pass a tolerance check.
#[inline]
pub fn scaled_residual(a: Real, b: Real) -> Real {
    let r = (a - b).abs() / 1.0_f64.max(a.abs()).max(b.abs());
    if r.is_nan() { Real::INFINITY } else { r }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn blend_hits_both_endpoints(a in -1e9f64..1e9, b in -1e9f64..1e9) {
            prop_assert_eq!(blend(a, b, 0.0), a);
            prop_assert_eq!(blend(a, b, 1.0), b);
        }

        #[test]
        fn scaled_residual_is_symmetric_and_non_negative(a in -1e9f64..1e9, b in -1e9f64..1e9) {
            let r = scaled_residual(a, b);
            prop_assert!(r >= 0.0);
            prop_assert_eq!(r, scaled_residual(b, a));
        }
    }
}
