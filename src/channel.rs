//! Fading channel model and noise injection
//!
//! A [`ChannelMatrix`] holds one complex gain per receive/transmit antenna pair and models flat
//! Rayleigh fading when drawn from [`ChannelMatrix::rayleigh`]: each entry has independent
//! Gaussian real and imaginary parts of variance `0.5`, so its squared magnitude averages to
//! one. The matrix is applied to a multi-antenna signal by superposing the transmit rows at each
//! receive antenna. [`add_awgn`] injects complex Gaussian noise calibrated to a target
//! signal-to-noise ratio measured against the signal's own mean power, and
//! [`snr_from_ebn0`]/[`ebn0_from_snr`] convert between the SNR and Eb/N0 scales. For OFDM links
//! with delay spread, [`FrequencyResponse`] generalizes the flat matrix to a multipath impulse
//! response viewed per subcarrier.

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use rustfft::FftPlanner;

use crate::{utils, AntennaSignal, Error};

/// Complex channel gains for every receive/transmit antenna pair of a flat-fading channel
#[derive(Clone, PartialEq, Debug)]
pub struct ChannelMatrix {
    /// Number of receive antennas (rows)
    num_rx: usize,
    /// Number of transmit antennas (columns)
    num_tx: usize,
    /// Channel gains in row-major `[rx][tx]` order
    gains: Vec<Complex64>,
}

impl ChannelMatrix {
    /// Returns the channel matrix holding given gains.
    ///
    /// # Parameters
    ///
    /// - `num_rx`: Number of receive antennas (rows).
    ///
    /// - `num_tx`: Number of transmit antennas (columns).
    ///
    /// - `gains`: Channel gains in row-major `[rx][tx]` order; exactly `num_rx * num_tx` values.
    ///
    /// # Errors
    ///
    /// Returns an error if either antenna count is zero or if the number of gains differs from
    /// `num_rx * num_tx`.
    pub fn from_gains(
        num_rx: usize,
        num_tx: usize,
        gains: Vec<Complex64>,
    ) -> Result<Self, Error> {
        if num_rx == 0 || num_tx == 0 {
            return Err(Error::InvalidInput(
                "Channel matrix must have at least one receive and one transmit antenna"
                    .to_string(),
            ));
        }
        if gains.len() != num_rx * num_tx {
            return Err(Error::InvalidInput(format!(
                "Expected {} channel gains for {num_rx} x {num_tx} antennas, found {}",
                num_rx * num_tx,
                gains.len()
            )));
        }
        Ok(Self { num_rx, num_tx, gains })
    }

    /// Returns a channel matrix with every gain equal to one.
    #[must_use]
    pub fn all_ones(num_rx: usize, num_tx: usize) -> Self {
        Self {
            num_rx,
            num_tx,
            gains: vec![Complex64::new(1.0, 0.0); num_rx * num_tx],
        }
    }

    /// Returns a flat Rayleigh-fading channel matrix.
    ///
    /// Each entry is an independent complex Gaussian with real and imaginary parts of variance
    /// `0.5`, giving unit expected squared magnitude per entry.
    ///
    /// # Parameters
    ///
    /// - `rng`: Random number generator to be used.
    ///
    /// - `num_rx`: Number of receive antennas (rows).
    ///
    /// - `num_tx`: Number of transmit antennas (columns).
    pub fn rayleigh<R: Rng + ?Sized>(rng: &mut R, num_rx: usize, num_tx: usize) -> Self {
        let gains = (0 .. num_rx * num_tx)
            .map(|_| {
                Complex64::new(
                    rng.sample::<f64, _>(StandardNormal),
                    rng.sample::<f64, _>(StandardNormal),
                ) * FRAC_1_SQRT_2
            })
            .collect();
        Self { num_rx, num_tx, gains }
    }

    /// Returns the number of receive antennas (rows).
    #[must_use]
    pub fn num_rx(&self) -> usize {
        self.num_rx
    }

    /// Returns the number of transmit antennas (columns).
    #[must_use]
    pub fn num_tx(&self) -> usize {
        self.num_tx
    }

    /// Returns the gain for one receive/transmit antenna pair.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn gain(&self, rx_index: usize, tx_index: usize) -> Complex64 {
        assert!(rx_index < self.num_rx && tx_index < self.num_tx);
        self.gains[rx_index * self.num_tx + tx_index]
    }

    /// Returns the total channel power, the sum of `|h|^2` over all antenna pairs.
    #[must_use]
    pub fn total_power(&self) -> f64 {
        self.gains.iter().map(Complex64::norm_sqr).sum()
    }

    /// Returns the received signal after the channel acts on a transmitted signal.
    ///
    /// Each receive row is the superposition of all transmit rows weighted by the corresponding
    /// channel gains: `received[rx] = sum over tx of gain(rx, tx) * transmitted[tx]`. The channel
    /// is flat, so there is no filtering across samples.
    ///
    /// # Parameters
    ///
    /// - `transmitted`: Transmitted signal with one row per transmit antenna.
    ///
    /// # Errors
    ///
    /// Returns an error if the transmitted antenna count differs from `self.num_tx()`.
    pub fn apply(&self, transmitted: &AntennaSignal) -> Result<AntennaSignal, Error> {
        if transmitted.num_antennas() != self.num_tx {
            return Err(Error::DimensionMismatch(format!(
                "Transmitted signal has {} antenna rows but the channel matrix has {} transmit \
                 columns",
                transmitted.num_antennas(),
                self.num_tx
            )));
        }
        let mut received = AntennaSignal::zeros(self.num_rx, transmitted.num_samples());
        for rx in 0 .. self.num_rx {
            for tx in 0 .. self.num_tx {
                let gain = self.gain(rx, tx);
                for (out, sample) in received.row_mut(rx).iter_mut().zip(transmitted.row(tx)) {
                    *out += gain * sample;
                }
            }
        }
        Ok(received)
    }
}

/// Per-subcarrier frequency response of a multipath MIMO channel
///
/// Obtained by Fourier-transforming a multi-tap Rayleigh impulse response for each antenna pair.
/// This is the extension point for frequency-selective simulation; the flat-fading measurement
/// pipeline does not use it.
#[derive(Clone, PartialEq, Debug)]
pub struct FrequencyResponse {
    /// Number of receive antennas
    num_rx: usize,
    /// Number of transmit antennas
    num_tx: usize,
    /// Number of subcarriers
    num_subcarriers: usize,
    /// Response values in `[rx][tx][subcarrier]` order
    values: Vec<Complex64>,
}

impl FrequencyResponse {
    /// Returns the frequency response of a freshly drawn multipath Rayleigh channel.
    ///
    /// Each antenna pair receives `num_taps` independent Rayleigh taps (unit mean power per
    /// tap); the taps are zero-padded to the subcarrier count and Fourier-transformed into one
    /// response value per subcarrier.
    ///
    /// # Parameters
    ///
    /// - `rng`: Random number generator to be used.
    ///
    /// - `num_rx`: Number of receive antennas.
    ///
    /// - `num_tx`: Number of transmit antennas.
    ///
    /// - `num_taps`: Number of impulse-response taps per antenna pair.
    ///
    /// - `num_subcarriers`: Number of subcarriers to evaluate the response on.
    ///
    /// # Errors
    ///
    /// Returns an error if any count is zero or if `num_taps` exceeds `num_subcarriers`.
    pub fn rayleigh<R: Rng + ?Sized>(
        rng: &mut R,
        num_rx: usize,
        num_tx: usize,
        num_taps: usize,
        num_subcarriers: usize,
    ) -> Result<Self, Error> {
        if num_rx == 0 || num_tx == 0 || num_taps == 0 || num_subcarriers == 0 {
            return Err(Error::InvalidInput(
                "Antenna, tap, and subcarrier counts must all be positive".to_string(),
            ));
        }
        if num_taps > num_subcarriers {
            return Err(Error::InvalidInput(format!(
                "Number of taps ({num_taps}) cannot exceed the number of subcarriers \
                 ({num_subcarriers})"
            )));
        }
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(num_subcarriers);
        let mut values = Vec::with_capacity(num_rx * num_tx * num_subcarriers);
        for _ in 0 .. num_rx * num_tx {
            let mut buffer = vec![Complex64::new(0.0, 0.0); num_subcarriers];
            for tap in buffer.iter_mut().take(num_taps) {
                *tap = Complex64::new(
                    rng.sample::<f64, _>(StandardNormal),
                    rng.sample::<f64, _>(StandardNormal),
                ) * FRAC_1_SQRT_2;
            }
            forward.process(&mut buffer);
            values.extend(buffer);
        }
        Ok(Self { num_rx, num_tx, num_subcarriers, values })
    }

    /// Returns the number of receive antennas.
    #[must_use]
    pub fn num_rx(&self) -> usize {
        self.num_rx
    }

    /// Returns the number of transmit antennas.
    #[must_use]
    pub fn num_tx(&self) -> usize {
        self.num_tx
    }

    /// Returns the number of subcarriers.
    #[must_use]
    pub fn num_subcarriers(&self) -> usize {
        self.num_subcarriers
    }

    /// Returns the response for one antenna pair at one subcarrier.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    #[must_use]
    pub fn gain(&self, rx_index: usize, tx_index: usize, subcarrier: usize) -> Complex64 {
        assert!(rx_index < self.num_rx && tx_index < self.num_tx);
        assert!(subcarrier < self.num_subcarriers);
        self.values[(rx_index * self.num_tx + tx_index) * self.num_subcarriers + subcarrier]
    }

    /// Returns the flat channel matrix seen by one subcarrier.
    ///
    /// # Panics
    ///
    /// Panics if `subcarrier` is out of range.
    #[must_use]
    pub fn at_subcarrier(&self, subcarrier: usize) -> ChannelMatrix {
        let gains = (0 .. self.num_rx)
            .flat_map(|rx| (0 .. self.num_tx).map(move |tx| (rx, tx)))
            .map(|(rx, tx)| self.gain(rx, tx, subcarrier))
            .collect();
        ChannelMatrix {
            num_rx: self.num_rx,
            num_tx: self.num_tx,
            gains,
        }
    }
}

/// Returns a noisy copy of a signal along with the noise that was added.
///
/// The noise power is the signal's mean power divided by the linear SNR, split evenly between
/// the real and imaginary components of each complex noise sample.
///
/// # Parameters
///
/// - `rng`: Random number generator to be used.
///
/// - `signal`: Signal to which noise must be added.
///
/// - `snr_db`: Target ratio (dB) of mean signal power to noise power.
///
/// # Returns
///
/// - `noisy_signal`: Sum of the signal and the noise.
///
/// - `noise`: The noise term alone, exposed for diagnostic use.
///
/// # Examples
///
/// ```
/// use mimo_ofdm_stbc::{channel, Complex64};
///
/// let mut rng = rand::rng();
/// let signal = vec![Complex64::new(1.0, 0.0); 100];
/// let (noisy_signal, noise) = channel::add_awgn(&mut rng, &signal, 20.0);
/// assert_eq!(noisy_signal.len(), signal.len());
/// for ((x, n), s) in noisy_signal.iter().zip(&noise).zip(&signal) {
///     assert!((x - n - s).norm() < 1e-12);
/// }
/// ```
pub fn add_awgn<R: Rng + ?Sized>(
    rng: &mut R,
    signal: &[Complex64],
    snr_db: f64,
) -> (Vec<Complex64>, Vec<Complex64>) {
    let noise_power = utils::mean_power(signal) / utils::undb(snr_db);
    let sigma = (noise_power / 2.0).sqrt();
    let noise: Vec<Complex64> = (0 .. signal.len())
        .map(|_| {
            Complex64::new(
                sigma * rng.sample::<f64, _>(StandardNormal),
                sigma * rng.sample::<f64, _>(StandardNormal),
            )
        })
        .collect();
    let noisy_signal = signal.iter().zip(&noise).map(|(s, n)| s + n).collect();
    (noisy_signal, noise)
}

/// Returns the SNR (dB) corresponding to a given Eb/N0 (dB).
///
/// # Parameters
///
/// - `ebn0_db`: Ratio (dB) of energy per information bit to noise power spectral density.
///
/// - `bits_per_symbol`: Number of bits carried by one modulation symbol.
///
/// - `code_rate`: Code rate of the transmission (`1.0` when uncoded).
#[must_use]
pub fn snr_from_ebn0(ebn0_db: f64, bits_per_symbol: usize, code_rate: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let bits = bits_per_symbol as f64;
    ebn0_db + utils::db(bits * code_rate)
}

/// Returns the Eb/N0 (dB) corresponding to a given SNR (dB).
///
/// Inverse of [`snr_from_ebn0`] over the same `bits_per_symbol` and `code_rate`.
#[must_use]
pub fn ebn0_from_snr(snr_db: f64, bits_per_symbol: usize, code_rate: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let bits = bits_per_symbol as f64;
    snr_db - utils::db(bits * code_rate)
}
