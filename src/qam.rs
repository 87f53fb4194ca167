//! 64-QAM modulator and demodulator
//!
//! Bits are mapped six at a time onto a square 64-point constellation: the first three bits of
//! each group select the in-phase amplitude and the last three select the quadrature amplitude,
//! each through the plain binary index `4*b0 + 2*b1 + b2` (not Gray-coded). The eight amplitude
//! levels per axis are `{-7, -5, -3, -1, 1, 3, 5, 7}` scaled so that the amplitude table has unit
//! mean square. Demodulation is hard-decision: each received component is sliced to the nearest
//! amplitude level independently on the two axes.

use num_complex::Complex64;

use crate::{Bit, Error};

/// Number of bits carried by one 64-QAM symbol
pub const BITS_PER_SYMBOL: usize = 6;

/// Number of points in the constellation
pub const MODULATION_ORDER: usize = 64;

/// Unnormalized amplitude levels for one axis, in index order
const RAW_AMPLITUDES: [f64; 8] = [-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0];

/// Returns the amplitude levels for one axis, scaled to unit mean square.
fn amplitude_levels() -> [f64; 8] {
    #[allow(clippy::cast_precision_loss)]
    let num_levels = RAW_AMPLITUDES.len() as f64;
    let mean_square = RAW_AMPLITUDES.iter().map(|a| a * a).sum::<f64>() / num_levels;
    let scale = mean_square.sqrt();
    RAW_AMPLITUDES.map(|a| a / scale)
}

/// Returns 64-QAM symbols corresponding to given bits.
///
/// # Parameters
///
/// - `bits`: Bits to be mapped to symbols. The number of bits must be a multiple of `6`.
///
/// # Returns
///
/// - `symbols`: One complex symbol per group of `6` bits.
///
/// # Errors
///
/// Returns an error if the number of bits is not a multiple of `6`.
///
/// # Examples
///
/// ```
/// use mimo_ofdm_stbc::qam;
/// use mimo_ofdm_stbc::Bit::{One, Zero};
///
/// let bits = [One, Zero, One, One, Zero, Zero];
/// let symbols = qam::modulate(&bits)?;
/// assert_eq!(symbols.len(), 1);
/// assert_eq!(qam::demodulate(&symbols), bits);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn modulate(bits: &[Bit]) -> Result<Vec<Complex64>, Error> {
    if bits.len() % BITS_PER_SYMBOL != 0 {
        return Err(Error::InvalidInput(format!(
            "Number of bits ({}) must be a multiple of {BITS_PER_SYMBOL}",
            bits.len()
        )));
    }
    let levels = amplitude_levels();
    Ok(bits
        .chunks_exact(BITS_PER_SYMBOL)
        .map(|group| {
            let in_phase = levels[axis_index(&group[.. 3])];
            let quadrature = levels[axis_index(&group[3 ..])];
            Complex64::new(in_phase, quadrature)
        })
        .collect())
}

/// Returns bits corresponding to given 64-QAM symbols, by hard decision.
///
/// # Parameters
///
/// - `symbols`: Symbols to be demodulated. Each component is sliced to the nearest amplitude
///   level of the corresponding axis, so the symbols need not lie exactly on the constellation.
///
/// # Returns
///
/// - `bits`: Six bits per symbol (in-phase group first, then quadrature group).
#[must_use]
pub fn demodulate(symbols: &[Complex64]) -> Vec<Bit> {
    let levels = amplitude_levels();
    let mut bits = Vec::with_capacity(symbols.len() * BITS_PER_SYMBOL);
    for symbol in symbols {
        let in_phase_index = nearest_level_index(symbol.re, &levels);
        let quadrature_index = nearest_level_index(symbol.im, &levels);
        bits.extend_from_slice(&axis_bits(in_phase_index));
        bits.extend_from_slice(&axis_bits(quadrature_index));
    }
    bits
}

/// Returns the axis index in `0 .. 8` selected by three bits (most significant first).
fn axis_index(bits: &[Bit]) -> usize {
    4 * (bits[0] as usize) + 2 * (bits[1] as usize) + (bits[2] as usize)
}

/// Returns the three bits (most significant first) encoding an axis index.
fn axis_bits(index: usize) -> [Bit; 3] {
    [bit_at(index, 2), bit_at(index, 1), bit_at(index, 0)]
}

/// Returns the bit at a given position of an index.
fn bit_at(index: usize, position: u32) -> Bit {
    if (index >> position) & 1 == 1 {
        Bit::One
    } else {
        Bit::Zero
    }
}

/// Returns the index of the amplitude level closest to a received component.
fn nearest_level_index(value: f64, levels: &[f64; 8]) -> usize {
    let mut best_index = 0;
    let mut best_distance = f64::INFINITY;
    for (index, level) in levels.iter().enumerate() {
        let distance = (value - level).abs();
        if distance < best_distance {
            best_distance = distance;
            best_index = index;
        }
    }
    best_index
}
