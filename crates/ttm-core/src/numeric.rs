use crate::TtmError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute + relative tolerance pair.
#[derive(Clone, Copy, Debug)]
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
    /// Tolerance for comparing solver time-directory names.
    pub const TIME: Tolerances = Tolerances {
        abs: 1e-6,
        rel: 1e-12,
    };
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TtmError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TtmError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, TtmError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(TtmError::NonPositive { what, value: v })
    }
}

/// Snap floating noise (e.g. from a 90° rotation) onto a 1e-9 grid.
pub fn snap(v: Real) -> Real {
    (v * 1e9).round() / 1e9
}

/// Format a simulated time the way solver time directories are named
/// (integral times without a fractional part).
pub fn time_name(t: Real) -> String {
    if nearly_equal(t, t.round(), Tolerances::TIME) {
        format!("{}", t.round() as i64)
    } else {
        let s = format!("{t:.6}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
