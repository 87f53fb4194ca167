//! Alamouti space-time block encoder and decoder
//!
//! The encoder maps each consecutive symbol pair `(s0, s1)` onto two transmit antennas over two
//! time slots: slot one carries `(s0, s1)` and slot two carries `(-conj(s1), conj(s0))`. This
//! orthogonal structure lets the decoder recover both symbols by linear combining: with a known
//! channel, the combined estimates are scaled copies of the transmitted symbols plus noise, and
//! dividing by the total channel power makes them unbiased (maximum-ratio combining). Two symbols
//! over two slots means the code transmits at full rate ([`CODE_RATE`]).

use itertools::Itertools;
use num_complex::Complex64;

use crate::channel::ChannelMatrix;
use crate::{AntennaSignal, Error};

/// Number of transmit antennas used by the Alamouti code
pub const NUM_TX_ANTENNAS: usize = 2;

/// Code rate of the Alamouti code (two symbols per two time slots)
pub const CODE_RATE: f64 = 1.0;

/// Returns the space-time code matrix for given symbols.
///
/// # Parameters
///
/// - `symbols`: Symbols to be encoded. An odd number of symbols is padded with one zero symbol.
///
/// # Returns
///
/// - `code_matrix`: Signal with [`NUM_TX_ANTENNAS`] antenna rows and `2 * ceil(len / 2)` time
///   slots, holding the Alamouti code blocks described above.
///
/// # Examples
///
/// ```
/// use mimo_ofdm_stbc::{stbc, Complex64};
///
/// let symbols = [Complex64::new(1.0, 0.5), Complex64::new(-0.5, 1.0)];
/// let code_matrix = stbc::encode(&symbols);
/// assert_eq!(code_matrix.num_antennas(), 2);
/// assert_eq!(code_matrix.num_samples(), 2);
/// assert_eq!(code_matrix.row(0)[1], -symbols[1].conj());
/// assert_eq!(code_matrix.row(1)[1], symbols[0].conj());
/// ```
#[must_use]
pub fn encode(symbols: &[Complex64]) -> AntennaSignal {
    let num_slots = 2 * symbols.len().div_ceil(2);
    let mut padded = symbols.to_vec();
    padded.resize(num_slots, Complex64::new(0.0, 0.0));
    let mut code_matrix = AntennaSignal::zeros(NUM_TX_ANTENNAS, num_slots);
    for (pair_index, (s0, s1)) in padded.iter().tuples().enumerate() {
        let slot = 2 * pair_index;
        code_matrix.row_mut(0)[slot] = *s0;
        code_matrix.row_mut(0)[slot + 1] = -s1.conj();
        code_matrix.row_mut(1)[slot] = *s1;
        code_matrix.row_mut(1)[slot + 1] = s0.conj();
    }
    code_matrix
}

/// Returns symbol estimates recovered from a received signal with a known channel.
///
/// For each pair of time slots and each receive antenna with channel gains `(h0, h1)` and
/// received samples `(r0, r1)`, the decoder accumulates
///
/// - `s0_est += conj(h0) * r0 + h1 * conj(r1)`
/// - `s1_est += conj(h1) * r0 - h0 * conj(r1)`
///
/// over all receive antennas, then divides both estimates by the total channel power (the sum of
/// `|h|^2` over every receive/transmit pair).
///
/// # Parameters
///
/// - `received`: Received signal, one row per receive antenna, with an even number of time slots.
///
/// - `channel`: Known channel matrix with exactly [`NUM_TX_ANTENNAS`] transmit columns and one
///   row per receive antenna of `received`.
///
/// # Returns
///
/// - `estimates`: One symbol estimate per time slot (the zero symbol padded by [`encode`] onto an
///   odd-length input is estimated like any other).
///
/// # Errors
///
/// Returns an error if the channel does not have exactly [`NUM_TX_ANTENNAS`] transmit columns,
/// if the receive antenna counts of `received` and `channel` differ, if the number of time slots
/// is odd, or if the total channel power is zero (no signal to combine).
///
/// # Examples
///
/// ```
/// use mimo_ofdm_stbc::channel::ChannelMatrix;
/// use mimo_ofdm_stbc::{stbc, Complex64};
///
/// let symbols = [Complex64::new(1.0, -1.0), Complex64::new(-0.5, 0.5)];
/// let gains = vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
/// let channel = ChannelMatrix::from_gains(1, 2, gains)?;
/// let received = channel.apply(&stbc::encode(&symbols))?;
/// let estimates = stbc::decode(&received, &channel)?;
/// assert!((estimates[0] - symbols[0]).norm() < 1e-12);
/// assert!((estimates[1] - symbols[1]).norm() < 1e-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode(received: &AntennaSignal, channel: &ChannelMatrix) -> Result<Vec<Complex64>, Error> {
    check_decode_inputs(received, channel)?;
    let total_power = channel.total_power();
    if total_power <= 0.0 {
        return Err(Error::DegenerateChannel(
            "Total channel power is zero, so the combined estimates cannot be normalized"
                .to_string(),
        ));
    }
    let num_slots = received.num_samples();
    let mut estimates = Vec::with_capacity(num_slots);
    for slot in (0 .. num_slots).step_by(2) {
        let mut s0_est = Complex64::new(0.0, 0.0);
        let mut s1_est = Complex64::new(0.0, 0.0);
        for rx in 0 .. channel.num_rx() {
            let h0 = channel.gain(rx, 0);
            let h1 = channel.gain(rx, 1);
            let r0 = received.row(rx)[slot];
            let r1 = received.row(rx)[slot + 1];
            s0_est += h0.conj() * r0 + h1 * r1.conj();
            s1_est += h1.conj() * r0 - h0 * r1.conj();
        }
        estimates.push(s0_est / total_power);
        estimates.push(s1_est / total_power);
    }
    Ok(estimates)
}

/// Returns symbol estimates recovered without channel knowledge, assuming an all-ones channel.
///
/// Only useful for illustrating how much the decoder depends on channel state information; over
/// a fading channel the estimates are badly degraded.
///
/// # Parameters
///
/// - `received`: Received signal, one row per receive antenna, with an even number of time slots.
///
/// # Errors
///
/// Returns an error under the same slot-count condition as [`decode`].
pub fn decode_without_csi(received: &AntennaSignal) -> Result<Vec<Complex64>, Error> {
    let flat_channel = ChannelMatrix::all_ones(received.num_antennas(), NUM_TX_ANTENNAS);
    decode(received, &flat_channel)
}

/// Checks dimensions of the decoder inputs.
fn check_decode_inputs(received: &AntennaSignal, channel: &ChannelMatrix) -> Result<(), Error> {
    if channel.num_tx() != NUM_TX_ANTENNAS {
        return Err(Error::DimensionMismatch(format!(
            "Alamouti decoding requires a channel matrix with {NUM_TX_ANTENNAS} transmit \
             columns, found {}",
            channel.num_tx()
        )));
    }
    if received.num_antennas() != channel.num_rx() {
        return Err(Error::DimensionMismatch(format!(
            "Received signal has {} antenna rows but the channel matrix has {} receive rows",
            received.num_antennas(),
            channel.num_rx()
        )));
    }
    if received.num_samples() % 2 != 0 {
        return Err(Error::InvalidInput(format!(
            "Number of received time slots ({}) must be even",
            received.num_samples()
        )));
    }
    Ok(())
}
