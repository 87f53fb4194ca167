//! # Some useful functions shared across the simulator
//!
//! The [`random_bits`] function returns a given number of random bits from an explicit generator;
//! the [`error_count`] function returns the number of errors in a sequence with respect to a
//! reference sequence; the [`db`] and [`undb`] functions convert between linear and decibel
//! scales; and the [`mean_power`] function returns the average squared magnitude of a complex
//! signal.
//!
//! # Examples
//!
//! The code below illustrates the usage of the functions in this module.
//! ```
//! use mimo_ofdm_stbc::utils;
//!
//! let mut rng = rand::rng();
//! let bits = utils::random_bits(&mut rng, 24);
//! let err_count = utils::error_count(&bits, &bits);
//! assert_eq!(err_count, 0);
//! assert_eq!(utils::db(100.0), 20.0);
//! ```

use num_complex::Complex64;
use rand::Rng;

use crate::Bit;

/// Returns given number of random bits.
///
/// # Parameters
///
/// - `rng`: Random number generator to be used.
///
/// - `num_bits`: Number of random bits to be generated.
///
/// # Returns
///
/// - `bits`: Random bits.
pub fn random_bits<R: Rng + ?Sized>(rng: &mut R, num_bits: usize) -> Vec<Bit> {
    (0 .. num_bits)
        .map(|_| {
            if rng.random_bool(0.5) {
                Bit::One
            } else {
                Bit::Zero
            }
        })
        .collect()
}

/// Returns number of errors in a sequence with respect to a reference sequence.
///
/// # Parameters
///
/// - `seq`: Sequence in which errors must be counted.
///
/// - `ref_seq`: Reference sequence to which the given sequence is compared.
///
/// # Returns
///
/// - `err_count`: Number of positions in which the two sequences differ. If they are of different
///   lengths, then the longer sequence is effectively truncated to the length of the shorter one.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    ref_seq
        .iter()
        .zip(seq.iter())
        .filter(|&(x, y)| x != y)
        .count()
}

/// Returns the decibel value of a linear power ratio.
#[must_use]
pub fn db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Returns the linear power ratio for a decibel value.
#[must_use]
pub fn undb(decibels: f64) -> f64 {
    10f64.powf(decibels / 10.0)
}

/// Returns average squared magnitude of a complex signal (`0.0` for an empty signal).
#[must_use]
pub fn mean_power(signal: &[Complex64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let num_samples = signal.len() as f64;
    signal.iter().map(Complex64::norm_sqr).sum::<f64>() / num_samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use Bit::{One, Zero};

    #[test]
    fn test_random_bits() {
        let mut rng = StdRng::seed_from_u64(0);
        let num_bits = 0;
        assert!(random_bits(&mut rng, num_bits).is_empty());
        let num_bits = 10000;
        let bits = random_bits(&mut rng, num_bits);
        let num_zeros = bits.iter().filter(|&b| *b == Zero).count();
        let num_ones = bits.iter().filter(|&b| *b == One).count();
        assert!(num_zeros > 9 * num_bits / 20 && num_ones > 9 * num_bits / 20);
    }

    #[test]
    fn test_error_count() {
        assert_eq!(error_count(&[], &[One, Zero]), 0);
        assert_eq!(error_count(&[One, Zero], &[]), 0);
        // Longer `seq`
        let ref_seq = [One, Zero, Zero, One, One, One, Zero, Zero];
        let seq = [One, One, Zero, Zero, One, One, Zero, Zero, Zero, One];
        assert_eq!(error_count(&seq, &ref_seq), 2);
        // Shorter `seq`
        let ref_seq = [One, Zero, Zero, One, One, One, Zero, Zero, Zero, One];
        let seq = [One, One, Zero, Zero, One, One, Zero, Zero];
        assert_eq!(error_count(&seq, &ref_seq), 2);
    }

    #[test]
    fn test_db_undb() {
        assert_float_eq!(db(1.0), 0.0, abs <= 1e-12);
        assert_float_eq!(db(1000.0), 30.0, abs <= 1e-12);
        assert_float_eq!(undb(0.0), 1.0, abs <= 1e-12);
        assert_float_eq!(undb(db(42.0)), 42.0, abs <= 1e-9);
    }

    #[test]
    fn test_mean_power() {
        assert_float_eq!(mean_power(&[]), 0.0, abs <= 1e-12);
        let signal = [Complex64::new(3.0, 4.0), Complex64::new(0.0, 0.0)];
        assert_float_eq!(mean_power(&signal), 12.5, abs <= 1e-12);
    }
}
