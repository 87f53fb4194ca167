//! Closed-form error-rate references
//!
//! Approximate bit and symbol error rates of the 64-QAM link over AWGN and over Rayleigh fading
//! with maximum-ratio diversity combining, used to sanity-check the Monte Carlo estimates. The
//! Gaussian tail probability is computed from a rational approximation of the error function.
//! [`curves`] evaluates every reference over a common Eb/N0 grid and packages the result for
//! persistence.

use serde::{Deserialize, Serialize};

use crate::{qam, utils};

/// Modulation order as a floating-point value
#[allow(clippy::cast_precision_loss)]
const ORDER: f64 = qam::MODULATION_ORDER as f64;

/// Bits per symbol as a floating-point value
#[allow(clippy::cast_precision_loss)]
const BITS: f64 = qam::BITS_PER_SYMBOL as f64;

/// Smallest reported bit error rate; fading references are floored here
const BER_FLOOR: f64 = 1e-10;

/// Returns the Gaussian tail probability `Q(x)`.
///
/// `Q(x)` is the probability that a standard normal variable exceeds `x`. Accurate to better
/// than `1e-7` over the whole real line.
///
/// # Examples
///
/// ```
/// use float_eq::assert_float_eq;
/// use mimo_ofdm_stbc::theory;
///
/// assert_float_eq!(theory::q_function(0.0), 0.5, abs <= 1e-7);
/// ```
#[must_use]
pub fn q_function(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

/// Returns the approximate bit error rate of square 64-QAM over AWGN.
///
/// Uses the standard square-QAM approximation
/// `BER = (4/k) (1 - 1/sqrt(M)) Q(sqrt(3 k (Eb/N0) / (M-1)))` with `M = 64` and `k = 6`.
///
/// # Parameters
///
/// - `ebn0_db`: Ratio (dB) of energy per information bit to noise power spectral density.
///
/// # Examples
///
/// ```
/// use mimo_ofdm_stbc::theory;
///
/// let ber = theory::ber_awgn(10.0);
/// assert!(ber > 0.0 && ber < 0.1);
/// ```
#[must_use]
pub fn ber_awgn(ebn0_db: f64) -> f64 {
    let argument = (3.0 * symbol_snr(ebn0_db) / (ORDER - 1.0)).sqrt();
    (4.0 / BITS) * (1.0 - 1.0 / ORDER.sqrt()) * q_function(argument)
}

/// Returns the approximate bit error rate of 64-QAM over Rayleigh fading with diversity.
///
/// Models maximum-ratio combining over `diversity_order` independently fading branches, the
/// diversity a 2x2 Alamouti link provides, via
/// `BER = (4/k) (1 - 1/sqrt(M)) ((1-p) p)^L sum of C(L-1+i, i) p^i for i < L` with
/// `p = 1 / (1 + 3 gamma_s / ((M-1) L))` and `gamma_s = k (Eb/N0)`. The approximation is
/// meaningful from moderate SNR upward; the result is floored at `1e-10`.
///
/// # Parameters
///
/// - `ebn0_db`: Ratio (dB) of energy per information bit to noise power spectral density.
///
/// - `diversity_order`: Number of independently fading branches combined at the receiver.
#[must_use]
pub fn ber_rayleigh(ebn0_db: f64, diversity_order: usize) -> f64 {
    let gamma_s = symbol_snr(ebn0_db);
    if gamma_s <= 0.0 {
        return 0.5;
    }
    #[allow(clippy::cast_precision_loss)]
    let branches = diversity_order as f64;
    let p = 1.0 / (1.0 + 3.0 * gamma_s / ((ORDER - 1.0) * branches));
    let mut combining_sum = 0.0;
    let mut p_power = 1.0;
    for term in 0 .. diversity_order {
        combining_sum += binomial(diversity_order - 1 + term, term) * p_power;
        p_power *= p;
    }
    let ber =
        (4.0 / BITS) * (1.0 - 1.0 / ORDER.sqrt()) * ((1.0 - p) * p).powf(branches) * combining_sum;
    ber.max(BER_FLOOR)
}

/// Returns the asymptotic high-SNR bit error rate of 64-QAM over Rayleigh fading with diversity.
///
/// A one-line alternative to [`ber_rayleigh`]: `BER = 0.5 / (1 + gamma_s)^L`, clamped to
/// `[1e-10, 0.5]`. Decays with the full diversity slope but ignores the modulation constants, so
/// it only tracks the detailed reference to within an SNR offset.
#[must_use]
pub fn ber_rayleigh_high_snr(ebn0_db: f64, diversity_order: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let branches = diversity_order as f64;
    let ber = 0.5 / (1.0 + symbol_snr(ebn0_db)).powf(branches);
    ber.clamp(BER_FLOOR, 0.5)
}

/// Returns the approximate symbol error rate of square 64-QAM over AWGN.
///
/// Combines the per-axis error probability `P = 2 (1 - 1/sqrt(M)) Q(sqrt(3 k (Eb/N0) / (M-1)))`
/// of the two pulse-amplitude axes into `SER = 1 - (1 - P)^2`.
///
/// # Parameters
///
/// - `ebn0_db`: Ratio (dB) of energy per information bit to noise power spectral density.
#[must_use]
pub fn ser_awgn(ebn0_db: f64) -> f64 {
    let argument = (3.0 * symbol_snr(ebn0_db) / (ORDER - 1.0)).sqrt();
    let per_axis = 2.0 * (1.0 - 1.0 / ORDER.sqrt()) * q_function(argument);
    1.0 - (1.0 - per_axis).powi(2)
}

/// Returns the approximate symbol error rate of 64-QAM over Rayleigh fading with diversity.
///
/// Scales [`ber_rayleigh`] by the nearest-neighbor multiplicity, `SER = min(4 BER, 1)`.
#[must_use]
pub fn ser_rayleigh(ebn0_db: f64, diversity_order: usize) -> f64 {
    (4.0 * ber_rayleigh(ebn0_db, diversity_order)).min(1.0)
}

/// Theoretical error-rate curves evaluated over a common Eb/N0 grid
///
/// The fading curves are evaluated at diversity order two, matching a 2x2 Alamouti link.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct TheoreticalCurves {
    /// Eb/N0 grid (dB)
    pub ebn0_db: Vec<f64>,
    /// Bit error rate over AWGN
    pub ber_awgn: Vec<f64>,
    /// Bit error rate over Rayleigh fading with diversity order two
    pub ber_rayleigh_div2: Vec<f64>,
    /// High-SNR approximation of the Rayleigh bit error rate
    pub ber_rayleigh_div2_simple: Vec<f64>,
    /// Symbol error rate over AWGN
    pub ser_awgn: Vec<f64>,
    /// Symbol error rate over Rayleigh fading with diversity order two
    pub ser_rayleigh_div2: Vec<f64>,
}

/// Returns every theoretical reference evaluated over a given Eb/N0 grid.
///
/// # Parameters
///
/// - `ebn0_db`: Eb/N0 grid (dB) to evaluate the curves on.
#[must_use]
pub fn curves(ebn0_db: &[f64]) -> TheoreticalCurves {
    TheoreticalCurves {
        ebn0_db: ebn0_db.to_vec(),
        ber_awgn: ebn0_db.iter().map(|&x| ber_awgn(x)).collect(),
        ber_rayleigh_div2: ebn0_db.iter().map(|&x| ber_rayleigh(x, 2)).collect(),
        ber_rayleigh_div2_simple: ebn0_db.iter().map(|&x| ber_rayleigh_high_snr(x, 2)).collect(),
        ser_awgn: ebn0_db.iter().map(|&x| ser_awgn(x)).collect(),
        ser_rayleigh_div2: ebn0_db.iter().map(|&x| ser_rayleigh(x, 2)).collect(),
    }
}

/// Returns the average symbol SNR `Es/N0` (linear) at a given Eb/N0 (dB).
fn symbol_snr(ebn0_db: f64) -> f64 {
    BITS * utils::undb(ebn0_db)
}

/// Returns the error function via a rational approximation (max error `1.2e-7`).
fn erf(x: f64) -> f64 {
    const COEFFS: [f64; 10] = [
        -1.265_512_23,
        1.000_023_68,
        0.374_091_96,
        0.096_784_18,
        -0.186_288_06,
        0.278_868_07,
        -1.135_203_98,
        1.488_515_87,
        -0.822_152_23,
        0.170_872_77,
    ];
    let t = 1.0 / (1.0 + 0.5 * x.abs());
    let mut polynomial = 0.0;
    for &coefficient in COEFFS.iter().rev() {
        polynomial = polynomial * t + coefficient;
    }
    let tau = t * (polynomial - x * x).exp();
    if x >= 0.0 {
        1.0 - tau
    } else {
        tau - 1.0
    }
}

/// Returns the complementary error function.
fn erfc(x: f64) -> f64 {
    1.0 - erf(x)
}

/// Returns the binomial coefficient `C(n, k)` as a float.
#[allow(clippy::cast_precision_loss)]
fn binomial(n: usize, k: usize) -> f64 {
    let mut result = 1.0_f64;
    for i in 0 .. k {
        result *= (n - i) as f64 / (i + 1) as f64;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn test_q_function() {
        assert_float_eq!(q_function(0.0), 0.5, abs <= 1e-7);
        assert_float_eq!(q_function(1.0), 0.158_655_3, abs <= 1e-6);
        assert_float_eq!(q_function(2.0), 0.022_750_1, abs <= 1e-6);
        assert_float_eq!(q_function(-1.0), 1.0 - q_function(1.0), abs <= 1e-12);
        assert!(q_function(8.0) < 1e-14);
    }

    #[test]
    fn test_binomial() {
        assert_float_eq!(binomial(0, 0), 1.0, abs <= 0.0);
        assert_float_eq!(binomial(3, 1), 3.0, abs <= 0.0);
        assert_float_eq!(binomial(5, 2), 10.0, abs <= 1e-12);
        assert_float_eq!(binomial(4, 4), 1.0, abs <= 1e-12);
        assert_float_eq!(binomial(6, 3), 20.0, abs <= 1e-12);
    }

    #[test]
    fn test_ber_awgn() {
        let grid = [0.0, 5.0, 10.0, 15.0, 20.0];
        for window in grid.windows(2) {
            assert!(ber_awgn(window[0]) > ber_awgn(window[1]));
        }
        for &ebn0_db in &grid {
            let ber = ber_awgn(ebn0_db);
            assert!(ber > 0.0 && ber < 0.5);
        }
        // At very low SNR the Q function tends to 1/2 and the BER to its cap of 7/24
        assert_float_eq!(ber_awgn(-100.0), 7.0 / 24.0, abs <= 1e-3);
    }

    #[test]
    fn test_ber_rayleigh() {
        // Fading costs SNR relative to AWGN
        assert!(ber_rayleigh(10.0, 2) > ber_awgn(10.0));
        assert!(ber_rayleigh(20.0, 2) > ber_awgn(20.0));
        // More diversity branches help
        assert!(ber_rayleigh(15.0, 2) < ber_rayleigh(15.0, 1));
        // Decreasing where the approximation is meaningful
        let grid = [10.0, 15.0, 20.0, 25.0, 30.0];
        for window in grid.windows(2) {
            assert!(ber_rayleigh(window[0], 2) > ber_rayleigh(window[1], 2));
        }
        // Floored once the formula falls below the reporting floor
        assert_float_eq!(ber_rayleigh(100.0, 2), 1e-10, abs <= 1e-20);
        // Vanishing symbol SNR means coin-flip bits
        assert_float_eq!(ber_rayleigh(f64::NEG_INFINITY, 2), 0.5, abs <= 0.0);
    }

    #[test]
    fn test_ber_rayleigh_high_snr() {
        assert_float_eq!(ber_rayleigh_high_snr(-100.0, 2), 0.5, abs <= 1e-6);
        assert_float_eq!(ber_rayleigh_high_snr(50.0, 2), 1e-10, abs <= 1e-20);
        let grid = [0.0, 10.0, 20.0, 30.0];
        for window in grid.windows(2) {
            assert!(
                ber_rayleigh_high_snr(window[0], 2) > ber_rayleigh_high_snr(window[1], 2)
            );
        }
        // Tracks the same diversity slope: ~2 decades per 10 dB at high SNR
        let ratio = ber_rayleigh_high_snr(20.0, 2) / ber_rayleigh_high_snr(30.0, 2);
        assert!(ratio > 50.0 && ratio < 150.0);
    }

    #[test]
    fn test_ser_awgn() {
        let grid = [0.0, 5.0, 10.0, 15.0, 20.0];
        for &ebn0_db in &grid {
            let ser = ser_awgn(ebn0_db);
            assert!(ser > 0.0 && ser < 1.0);
            // A symbol error needs at least one bit error
            assert!(ser >= ber_awgn(ebn0_db));
        }
        for window in grid.windows(2) {
            assert!(ser_awgn(window[0]) > ser_awgn(window[1]));
        }
    }

    #[test]
    fn test_ser_rayleigh() {
        // Saturates at one when the scaled bit error rate would exceed certainty
        assert_float_eq!(ser_rayleigh(f64::NEG_INFINITY, 2), 1.0, abs <= 0.0);
        let ber = ber_rayleigh(20.0, 2);
        assert_float_eq!(ser_rayleigh(20.0, 2), 4.0 * ber, abs <= 0.0);
        assert!(ser_rayleigh(20.0, 2) > ser_rayleigh(30.0, 2));
    }

    #[test]
    fn test_curves() {
        let grid = [0.0, 10.0, 20.0];
        let reference = curves(&grid);
        assert_eq!(reference.ebn0_db, grid.to_vec());
        assert_eq!(reference.ber_awgn.len(), grid.len());
        assert_eq!(reference.ser_rayleigh_div2.len(), grid.len());
        assert_float_eq!(reference.ber_awgn[1], ber_awgn(10.0), abs <= 0.0);
        assert_float_eq!(reference.ber_rayleigh_div2[2], ber_rayleigh(20.0, 2), abs <= 0.0);
        assert_float_eq!(
            reference.ber_rayleigh_div2_simple[0],
            ber_rayleigh_high_snr(0.0, 2),
            abs <= 0.0
        );
        assert_float_eq!(reference.ser_awgn[1], ser_awgn(10.0), abs <= 0.0);
        // Empty grid gives empty curves
        assert!(curves(&[]).ber_awgn.is_empty());
    }
}
