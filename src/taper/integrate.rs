/// Absolute tolerance for stem volume integrals, in m³.
pub const VOLUME_TOLERANCE: f64 = 1e-9;

const MAX_DEPTH: u32 = 24;

/// Integrate `f` over `[a, b]` with adaptive Simpson quadrature.
///
/// Returns 0 for empty or reversed intervals.
pub fn adaptive_simpson<F>(f: F, a: f64, b: f64, tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    if !(b > a) {
        return 0.0;
    }
    let fa = f(a);
    let fb = f(b);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let whole = simpson(a, b, fa, fm, fb);
    refine(&f, a, b, fa, fm, fb, whole, tolerance, MAX_DEPTH)
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn refine<F>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tolerance: f64,
    depth: u32,
) -> f64
where
    F: Fn(f64) -> f64,
{
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tolerance {
        return left + right + delta / 15.0;
    }
    refine(f, a, m, fa, flm, fm, left, tolerance / 2.0, depth - 1)
        + refine(f, m, b, fm, frm, fb, right, tolerance / 2.0, depth - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_exact() {
        let v = adaptive_simpson(|x| x * x, 0.0, 3.0, 1e-12);
        assert!((v - 9.0).abs() < 1e-10);
    }

    #[test]
    fn test_reversed_interval_is_zero() {
        assert_eq!(adaptive_simpson(|x| x, 2.0, 1.0, 1e-9), 0.0);
        assert_eq!(adaptive_simpson(|x| x, 1.0, 1.0, 1e-9), 0.0);
    }

    #[test]
    fn test_kinked_function() {
        let v = adaptive_simpson(|x: f64| (x - 1.0).abs(), 0.0, 3.0, 1e-10);
        assert!((v - 2.5).abs() < 1e-8);
    }

    #[test]
    fn test_log_function() {
        // integral of ln(1 + x) over [0, 1] = 2 ln 2 - 1
        let v = adaptive_simpson(|x: f64| (1.0 + x).ln(), 0.0, 1.0, 1e-12);
        assert!((v - (2.0 * 2f64.ln() - 1.0)).abs() < 1e-10);
    }
}
