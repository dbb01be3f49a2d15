//! Step-count to probability transform.
//!
//! A boundary walk of half-width `n` over fair bits stops after `n²` steps on
//! average. How far a walk's actual stopping time sits from that expectation
//! is mapped to a one-sided tail probability through a fixed 11th-degree
//! polynomial fitted to the first-passage-time distribution, and from there to
//! a surprisal in bits.
//!
//! The coefficients are an empirical constant of the method. Results are only
//! comparable with other RWBA implementations if they are used verbatim.

use serde::Serialize;

/// Coefficients of `x¹ … x¹¹`, in ascending degree.
pub const TAIL_COEFFICIENTS: [f64; 11] = [
    1.3671649364575,
    0.043433149991109,
    -2.16454907883120,
    -1.16398609859974,
    -15.9478516592348,
    -86.4404062808434,
    -201.9161410163,
    -265.2908149166,
    -205.91445301453,
    -88.495808283824,
    -16.271768076703,
];

/// Lower clamp for subtrial probabilities, so surprisal stays finite.
pub const P_FLOOR: f64 = 1e-10;

/// Decimal places kept on a subtrial surprisal.
const SURPRISAL_PLACES: i32 = 5;

/// Evaluate the tail polynomial at `x` (expected in `[-1, 0]`).
///
/// Terms are summed in ascending degree and powers go through libm `pow`, so
/// the result matches reference implementations to the last bit.
pub fn tail_polynomial(x: f64) -> f64 {
    TAIL_COEFFICIENTS
        .iter()
        .enumerate()
        .fold(0.0, |acc, (i, &c)| acc + c * x.powf((i + 1) as f64))
}

/// Probability and information content of one walk's stopping time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Significance {
    /// One-sided tail probability, clamped to `[P_FLOOR, 1.0]`.
    pub p: f64,
    /// `log2(1/p)`, rounded to 5 decimal places.
    pub surprisal: f64,
}

/// Map a walk's stopping step count to its tail probability and surprisal.
///
/// `boundary` must be nonzero; callers validate it through
/// [`WalkBoundary`](crate::trial::WalkBoundary).
pub fn step_significance(steps: usize, boundary: usize) -> Significance {
    let avg = (boundary * boundary) as f64;
    let x = -((steps as f64 - avg) / avg).abs();
    let xx = tail_polynomial(x);

    let p = if x < 0.0 { 0.5 + xx } else { 0.5 - xx };
    let p = p.clamp(P_FLOOR, 1.0);

    Significance {
        p,
        surprisal: round_to((1.0 / p).log2(), SURPRISAL_PLACES),
    }
}

/// Round half away from zero to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_zero_at_origin() {
        assert_eq!(tail_polynomial(0.0), 0.0);
    }

    #[test]
    fn test_polynomial_reference_points() {
        assert!((tail_polynomial(-0.1) - (-0.134_143_237_633_013_83)).abs() < 1e-12);
        assert!((tail_polynomial(-0.5) - (-0.462_287_877_381_737_5)).abs() < 1e-12);
        assert!((tail_polynomial(-0.95) - (-0.499_988_660_482_420_85)).abs() < 1e-12);
    }

    #[test]
    fn test_expected_step_count_is_even_odds() {
        let sig = step_significance(961, 31);
        assert_eq!(sig.p, 0.5);
        assert_eq!(sig.surprisal, 1.0);
    }

    #[test]
    fn test_fast_exit_hits_floor() {
        // Exiting after exactly n steps is far enough out that the fit dips
        // below zero; the floor keeps the surprisal finite.
        let sig = step_significance(31, 31);
        assert_eq!(sig.p, P_FLOOR);
        assert_eq!(sig.surprisal, 33.21928);
    }

    #[test]
    fn test_known_step_counts() {
        let sig = step_significance(500, 31);
        assert!((sig.p - 0.044_556_420_186_970_37).abs() < 1e-12);
        assert_eq!(sig.surprisal, 4.48822);

        let sig = step_significance(1, 31);
        assert_eq!(sig.surprisal, 16.19388);
    }

    #[test]
    fn test_p_always_within_bounds() {
        for n in [1usize, 2, 5, 31] {
            for steps in 1..=21 * n * n {
                let sig = step_significance(steps, n);
                assert!(
                    (P_FLOOR..=1.0).contains(&sig.p),
                    "n={n} steps={steps} p={}",
                    sig.p
                );
                assert!(sig.surprisal >= 0.0);
            }
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.1234567, 6), 0.123457);
        assert_eq!(round_to(2.0, 4), 2.0);
    }
}
