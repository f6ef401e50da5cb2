use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute plus relative tolerance pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Slack allowed around `reference`.
    pub fn slack(&self, reference: Real) -> Real {
        self.abs + self.rel * reference.abs()
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// `value > limit` beyond the tolerance band around `limit`.
pub fn exceeds(value: Real, limit: Real, tol: Tolerances) -> bool {
    value > limit + tol.slack(limit)
}

/// `value < limit` beyond the tolerance band around `limit`.
pub fn falls_below(value: Real, limit: Real, tol: Tolerances) -> bool {
    value < limit - tol.slack(limit)
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero() {
        assert!(ensure_positive(0.0, "x").is_err());
        assert!(ensure_positive(-1.0, "x").is_err());
        assert_eq!(ensure_positive(2.5, "x").unwrap(), 2.5);
    }

    #[test]
    fn exceeds_respects_band() {
        let tol = Tolerances { abs: 0.0, rel: 1e-6 };
        assert!(!exceeds(100.00001, 100.0, tol));
        assert!(exceeds(100.01, 100.0, tol));
        assert!(!falls_below(99.99999, 100.0, tol));
        assert!(falls_below(99.9, 100.0, tol));
    }

    proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerances::default();
            prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }

        #[test]
        fn value_never_both_exceeds_and_falls_below(v in -1e3f64..1e3, limit in -1e3f64..1e3) {
            let tol = Tolerances::default();
            prop_assert!(!(exceeds(v, limit, tol) && falls_below(v, limit, tol)));
        }
    }
}
