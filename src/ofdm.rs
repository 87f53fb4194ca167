//! OFDM modulation and demodulation with cyclic prefix
//!
//! An [`OfdmFramer`] turns a block of frequency-domain symbols (one per subcarrier) into a
//! time-domain signal by an inverse FFT, then prepends the last `cyclic_prefix_len` time samples
//! as a cyclic prefix; demodulation drops the prefix and applies the forward FFT. The inverse
//! transform is scaled by `1/num_subcarriers` so that demodulation exactly inverts modulation on
//! an undistorted signal. [`OfdmFramer::frame`] and [`OfdmFramer::deframe`] extend both
//! directions to symbol streams longer than one block, zero-padding the final block.

use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::Error;

/// OFDM modulator/demodulator for a fixed subcarrier count and cyclic prefix length
pub struct OfdmFramer {
    /// Number of subcarriers (equal to the FFT size)
    num_subcarriers: usize,
    /// Cyclic prefix length in time samples
    cyclic_prefix_len: usize,
    /// Planned forward FFT of size `num_subcarriers`
    forward: Arc<dyn Fft<f64>>,
    /// Planned inverse FFT of size `num_subcarriers`
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for OfdmFramer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfdmFramer")
            .field("num_subcarriers", &self.num_subcarriers)
            .field("cyclic_prefix_len", &self.cyclic_prefix_len)
            .finish_non_exhaustive()
    }
}

impl OfdmFramer {
    /// Returns a framer for a given subcarrier count and cyclic prefix length.
    ///
    /// # Parameters
    ///
    /// - `num_subcarriers`: Number of subcarriers, equal to the FFT size. Must be positive.
    ///
    /// - `cyclic_prefix_len`: Cyclic prefix length in time samples. Cannot exceed
    ///   `num_subcarriers`, since the prefix is a copy of the tail of one transformed block.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_subcarriers` is zero or if `cyclic_prefix_len` exceeds
    /// `num_subcarriers`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mimo_ofdm_stbc::ofdm::OfdmFramer;
    ///
    /// let framer = OfdmFramer::new(64, 16)?;
    /// assert_eq!(framer.symbol_len(), 80);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(num_subcarriers: usize, cyclic_prefix_len: usize) -> Result<Self, Error> {
        if num_subcarriers == 0 {
            return Err(Error::InvalidInput(
                "Number of subcarriers must be a positive integer".to_string(),
            ));
        }
        if cyclic_prefix_len > num_subcarriers {
            return Err(Error::InvalidInput(format!(
                "Cyclic prefix length ({cyclic_prefix_len}) cannot exceed the number of \
                 subcarriers ({num_subcarriers})"
            )));
        }
        let mut planner = FftPlanner::new();
        Ok(Self {
            num_subcarriers,
            cyclic_prefix_len,
            forward: planner.plan_fft_forward(num_subcarriers),
            inverse: planner.plan_fft_inverse(num_subcarriers),
        })
    }

    /// Returns the number of subcarriers (FFT size).
    #[must_use]
    pub fn num_subcarriers(&self) -> usize {
        self.num_subcarriers
    }

    /// Returns the cyclic prefix length in time samples.
    #[must_use]
    pub fn cyclic_prefix_len(&self) -> usize {
        self.cyclic_prefix_len
    }

    /// Returns the length of one OFDM symbol in time samples, prefix included.
    #[must_use]
    pub fn symbol_len(&self) -> usize {
        self.num_subcarriers + self.cyclic_prefix_len
    }

    /// Returns the number of OFDM symbols needed to carry a given number of symbols.
    #[must_use]
    pub fn num_blocks(&self, num_symbols: usize) -> usize {
        num_symbols.div_ceil(self.num_subcarriers)
    }

    /// Returns the time-domain signal for one block of frequency-domain symbols.
    ///
    /// # Parameters
    ///
    /// - `symbols`: Frequency-domain symbols, one per subcarrier. The length must equal
    ///   `self.num_subcarriers()`.
    ///
    /// # Returns
    ///
    /// - `signal`: Time-domain samples of length `self.symbol_len()`, with the cyclic prefix
    ///   (a copy of the final `self.cyclic_prefix_len()` samples) at the front.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of symbols differs from the number of subcarriers.
    pub fn modulate(&self, symbols: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        if symbols.len() != self.num_subcarriers {
            return Err(Error::InvalidInput(format!(
                "Expected {} frequency-domain symbols, found {}",
                self.num_subcarriers,
                symbols.len()
            )));
        }
        let mut time_signal = symbols.to_vec();
        self.inverse.process(&mut time_signal);
        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / self.num_subcarriers as f64;
        for sample in &mut time_signal {
            *sample *= scale;
        }
        let mut signal = Vec::with_capacity(self.symbol_len());
        signal.extend_from_slice(&time_signal[self.num_subcarriers - self.cyclic_prefix_len ..]);
        signal.extend_from_slice(&time_signal);
        Ok(signal)
    }

    /// Returns the frequency-domain symbols for one received OFDM symbol.
    ///
    /// # Parameters
    ///
    /// - `signal`: Time-domain samples of one OFDM symbol, prefix included. The length must
    ///   equal `self.symbol_len()`.
    ///
    /// # Returns
    ///
    /// - `symbols`: One frequency-domain symbol per subcarrier.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal length differs from `self.symbol_len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mimo_ofdm_stbc::ofdm::OfdmFramer;
    /// use mimo_ofdm_stbc::Complex64;
    ///
    /// let framer = OfdmFramer::new(4, 1)?;
    /// let symbols = vec![
    ///     Complex64::new(1.0, 0.0),
    ///     Complex64::new(0.0, 1.0),
    ///     Complex64::new(-1.0, 0.0),
    ///     Complex64::new(0.0, -1.0),
    /// ];
    /// let recovered = framer.demodulate(&framer.modulate(&symbols)?)?;
    /// for (x, y) in recovered.iter().zip(&symbols) {
    ///     assert!((x - y).norm() < 1e-10);
    /// }
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn demodulate(&self, signal: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        if signal.len() != self.symbol_len() {
            return Err(Error::InvalidInput(format!(
                "Expected {} time-domain samples, found {}",
                self.symbol_len(),
                signal.len()
            )));
        }
        let mut symbols = signal[self.cyclic_prefix_len ..].to_vec();
        self.forward.process(&mut symbols);
        Ok(symbols)
    }

    /// Returns the time-domain signal carrying a stream of frequency-domain symbols.
    ///
    /// The stream is chunked into blocks of `self.num_subcarriers()` symbols, the final block
    /// being zero-padded if short, and each block is OFDM-modulated in turn.
    ///
    /// # Parameters
    ///
    /// - `symbols`: Frequency-domain symbols; any number, including zero.
    ///
    /// # Returns
    ///
    /// - `signal`: Concatenated time-domain OFDM symbols, of length
    ///   `self.num_blocks(symbols.len()) * self.symbol_len()`.
    ///
    /// # Errors
    ///
    /// Propagates errors from per-block modulation (cannot occur for chunked input).
    pub fn frame(&self, symbols: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        let mut signal = Vec::with_capacity(self.num_blocks(symbols.len()) * self.symbol_len());
        for block in symbols.chunks(self.num_subcarriers) {
            if block.len() == self.num_subcarriers {
                signal.extend(self.modulate(block)?);
            } else {
                let mut padded = block.to_vec();
                padded.resize(self.num_subcarriers, Complex64::new(0.0, 0.0));
                signal.extend(self.modulate(&padded)?);
            }
        }
        Ok(signal)
    }

    /// Returns the frequency-domain symbols carried by a framed time-domain signal.
    ///
    /// # Parameters
    ///
    /// - `signal`: Received time-domain samples.
    ///
    /// - `num_blocks`: Number of OFDM symbols in the signal, as supplied to the transmit side
    ///   via `self.num_blocks`.
    ///
    /// # Returns
    ///
    /// - `symbols`: `num_blocks * self.num_subcarriers()` frequency-domain symbols, including
    ///   any zero padding added by [`OfdmFramer::frame`].
    ///
    /// # Errors
    ///
    /// Returns an error if the signal length differs from `num_blocks * self.symbol_len()`.
    pub fn deframe(
        &self,
        signal: &[Complex64],
        num_blocks: usize,
    ) -> Result<Vec<Complex64>, Error> {
        if signal.len() != num_blocks * self.symbol_len() {
            return Err(Error::InvalidInput(format!(
                "Expected {} time-domain samples for {num_blocks} OFDM symbols, found {}",
                num_blocks * self.symbol_len(),
                signal.len()
            )));
        }
        let mut symbols = Vec::with_capacity(num_blocks * self.num_subcarriers);
        for block in signal.chunks_exact(self.symbol_len()) {
            symbols.extend(self.demodulate(block)?);
        }
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    fn random_symbols<R: Rng>(rng: &mut R, num_symbols: usize) -> Vec<Complex64> {
        (0 .. num_symbols)
            .map(|_| {
                Complex64::new(
                    rng.sample::<f64, _>(StandardNormal),
                    rng.sample::<f64, _>(StandardNormal),
                )
            })
            .collect()
    }

    fn assert_symbols_close(actual: &[Complex64], expected: &[Complex64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (x, y) in actual.iter().zip(expected) {
            assert_float_eq!(x.re, y.re, abs <= tol);
            assert_float_eq!(x.im, y.im, abs <= tol);
        }
    }

    #[test]
    fn test_new() {
        // Invalid input
        assert!(OfdmFramer::new(0, 0).is_err());
        assert!(OfdmFramer::new(8, 9).is_err());
        // Valid input
        assert!(OfdmFramer::new(8, 8).is_ok());
        let framer = OfdmFramer::new(64, 16).unwrap();
        assert_eq!(framer.num_subcarriers(), 64);
        assert_eq!(framer.cyclic_prefix_len(), 16);
        assert_eq!(framer.symbol_len(), 80);
    }

    #[test]
    fn test_modulate_prefix_copies_tail() {
        let mut rng = StdRng::seed_from_u64(1);
        let framer = OfdmFramer::new(64, 16).unwrap();
        // Invalid input
        assert!(framer.modulate(&random_symbols(&mut rng, 63)).is_err());
        // Valid input
        let signal = framer.modulate(&random_symbols(&mut rng, 64)).unwrap();
        assert_eq!(signal.len(), 80);
        assert_symbols_close(&signal[.. 16], &signal[64 ..], 1e-12);
    }

    #[test]
    fn test_modulate_flat_spectrum_gives_unit_impulse() {
        // All-ones subcarriers transform to a single unit sample at the head of the block,
        // pinning the 1/N inverse-transform convention
        let framer = OfdmFramer::new(8, 2).unwrap();
        let signal = framer.modulate(&[Complex64::new(1.0, 0.0); 8]).unwrap();
        assert_float_eq!(signal[2].re, 1.0, abs <= 1e-12);
        assert_float_eq!(signal[2].im, 0.0, abs <= 1e-12);
        for (index, sample) in signal.iter().enumerate() {
            if index != 2 {
                assert_float_eq!(sample.norm(), 0.0, abs <= 1e-12);
            }
        }
    }

    #[test]
    fn test_modulate_demodulate_round_trip() {
        let mut rng = StdRng::seed_from_u64(2);
        let framer = OfdmFramer::new(64, 16).unwrap();
        let symbols = random_symbols(&mut rng, 64);
        let recovered = framer.demodulate(&framer.modulate(&symbols).unwrap()).unwrap();
        assert_symbols_close(&recovered, &symbols, 1e-10);
    }

    #[test]
    fn test_demodulate() {
        let framer = OfdmFramer::new(16, 4).unwrap();
        // Invalid input
        assert!(framer.demodulate(&[Complex64::new(0.0, 0.0); 16]).is_err());
        // Valid input
        assert!(framer.demodulate(&[Complex64::new(0.0, 0.0); 20]).is_ok());
    }

    #[test]
    fn test_frame_deframe_with_padding() {
        let mut rng = StdRng::seed_from_u64(3);
        let framer = OfdmFramer::new(64, 16).unwrap();
        let symbols = random_symbols(&mut rng, 100);
        let num_blocks = framer.num_blocks(symbols.len());
        assert_eq!(num_blocks, 2);
        let signal = framer.frame(&symbols).unwrap();
        assert_eq!(signal.len(), 160);
        let recovered = framer.deframe(&signal, num_blocks).unwrap();
        assert_eq!(recovered.len(), 128);
        assert_symbols_close(&recovered[.. 100], &symbols, 1e-10);
        let zeros = [Complex64::new(0.0, 0.0); 28];
        assert_symbols_close(&recovered[100 ..], &zeros, 1e-10);
    }

    #[test]
    fn test_frame_empty_stream() {
        let framer = OfdmFramer::new(8, 2).unwrap();
        assert!(framer.frame(&[]).unwrap().is_empty());
        assert!(framer.deframe(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_deframe_length_check() {
        let framer = OfdmFramer::new(8, 2).unwrap();
        let signal = [Complex64::new(0.0, 0.0); 15];
        assert!(framer.deframe(&signal, 2).is_err());
    }
}
