/// Returns true if `a` and `b` differ by less than `precision`.
#[must_use]
pub fn almost_eq(a: f64, b: f64, precision: f64) -> bool {
    (a - b).abs() < precision
}

/// Asserts that two floating point expressions are within `$prec` of each other.
#[macro_export]
macro_rules! assert_almost_eq {
    ($a:expr, $b:expr, $prec:expr $(,)?) => {
        if !$crate::numeric::almost_eq($a, $b, $prec) {
            panic!(
                "assertion failed: `abs(left - right) < {:e}`, (left: `{}`, right: `{}`)",
                $prec, $a, $b
            );
        }
    };
}
