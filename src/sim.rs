//! Simulator to evaluate error-rate performance of 2x2 Alamouti MIMO-OFDM over Rayleigh fading

use std::fs::File;
use std::io::{BufReader, BufWriter};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channel::{self, ChannelMatrix};
use crate::ofdm::OfdmFramer;
use crate::{qam, stbc, theory, utils, AntennaSignal, Error};

/// Absolute tolerance when matching re-modulated symbols to transmitted symbols
const SYMBOL_MATCH_ATOL: f64 = 1e-3;

/// Relative tolerance when matching re-modulated symbols to transmitted symbols
const SYMBOL_MATCH_RTOL: f64 = 1e-3;

/// Parameters for Monte Carlo simulation of the MIMO-OFDM link over flat Rayleigh fading
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimParams {
    /// Number of transmit antennas (the Alamouti space-time code fixes this at two)
    pub num_tx_antennas: usize,
    /// Number of receive antennas
    pub num_rx_antennas: usize,
    /// Number of OFDM subcarriers, and 64-QAM symbols per frame
    pub num_subcarriers: usize,
    /// Cyclic prefix length in time samples
    pub cyclic_prefix_len: usize,
    /// Ratio (dB) of energy per information bit to noise power spectral density
    pub ebn0_db: f64,
    /// Number of frames to be simulated
    pub num_frames: usize,
}

/// Error and transmission counts accumulated over simulated frames
#[derive(Clone, PartialEq, Debug, Copy, Default)]
pub struct FrameCounts {
    /// Number of bit errors counted
    pub num_bit_errors: usize,
    /// Number of bits transmitted
    pub num_bits: usize,
    /// Number of symbol errors counted
    pub num_symbol_errors: usize,
    /// Number of symbols transmitted
    pub num_symbols: usize,
}

impl FrameCounts {
    /// Returns the counts of two sets of frames combined.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            num_bit_errors: self.num_bit_errors + other.num_bit_errors,
            num_bits: self.num_bits + other.num_bits,
            num_symbol_errors: self.num_symbol_errors + other.num_symbol_errors,
            num_symbols: self.num_symbols + other.num_symbols,
        }
    }
}

/// Results of a Monte Carlo simulation at one Eb/N0 point
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimResults {
    /// Simulation parameters
    pub params: SimParams,
    /// Number of bit errors counted
    pub num_bit_errors: usize,
    /// Number of bits transmitted
    pub num_bits: usize,
    /// Number of symbol errors counted
    pub num_symbol_errors: usize,
    /// Number of symbols transmitted
    pub num_symbols: usize,
}

impl SimResults {
    /// Returns the measured bit error rate, or zero if no bits were transmitted.
    #[must_use]
    pub fn ber(&self) -> f64 {
        error_rate(self.num_bit_errors, self.num_bits)
    }

    /// Returns the measured symbol error rate, or zero if no symbols were transmitted.
    #[must_use]
    pub fn ser(&self) -> f64 {
        error_rate(self.num_symbol_errors, self.num_symbols)
    }
}

/// Measured error rates over an Eb/N0 sweep, as saved to disk
///
/// The three sequences are parallel: entry `n` of each refers to the same sweep point.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SweepRecord {
    /// Eb/N0 (dB) of each sweep point
    pub ebn0_db: Vec<f64>,
    /// Measured bit error rate at each sweep point
    pub ber: Vec<f64>,
    /// Measured symbol error rate at each sweep point
    pub ser: Vec<f64>,
}

impl SweepRecord {
    /// Returns the record of measured error rates for a sequence of finalized results.
    #[must_use]
    pub fn new(all_results: &[SimResults]) -> Self {
        Self {
            ebn0_db: all_results
                .iter()
                .map(|results| results.params.ebn0_db)
                .collect(),
            ber: all_results.iter().map(SimResults::ber).collect(),
            ser: all_results.iter().map(SimResults::ser).collect(),
        }
    }
}

/// Returns the error counts from one frame sent through the fading channel.
///
/// One frame carries `params.num_subcarriers` random 64-QAM symbols. The symbols are Alamouti
/// encoded across two transmit antennas, OFDM framed per antenna, passed through a freshly drawn
/// flat Rayleigh channel with additive white Gaussian noise at the SNR corresponding to
/// `params.ebn0_db`, then OFDM deframed, space-time decoded with perfect channel knowledge, and
/// sliced back to bits. Symbol errors are counted after re-modulating the received bits, so a
/// symbol counts as correct only if every bit mapped onto it was recovered.
///
/// # Parameters
///
/// - `rng`: Random number generator to be used.
///
/// - `params`: Simulation parameters.
///
/// - `framer`: OFDM framer, sized for `params.num_subcarriers` subcarriers.
///
/// # Errors
///
/// Returns an error if the framer size differs from `params.num_subcarriers`, if the drawn
/// channel has zero total power, or if any pipeline stage reports mismatched dimensions.
pub fn simulate_frame<R: Rng + ?Sized>(
    rng: &mut R,
    params: &SimParams,
    framer: &OfdmFramer,
) -> Result<FrameCounts, Error> {
    if framer.num_subcarriers() != params.num_subcarriers {
        return Err(Error::DimensionMismatch(format!(
            "OFDM framer spans {} subcarriers but the simulation parameters specify {}",
            framer.num_subcarriers(),
            params.num_subcarriers
        )));
    }
    let tx_bits = utils::random_bits(rng, params.num_subcarriers * qam::BITS_PER_SYMBOL);
    let tx_symbols = qam::modulate(&tx_bits)?;
    let encoded = stbc::encode(&tx_symbols);
    let num_slots = encoded.num_samples();
    let num_blocks = framer.num_blocks(num_slots);

    let mut framed_rows = Vec::with_capacity(encoded.num_antennas());
    for row in encoded.rows() {
        framed_rows.push(framer.frame(row)?);
    }
    let transmitted = AntennaSignal::from_rows(&framed_rows)?;

    let fading = ChannelMatrix::rayleigh(rng, params.num_rx_antennas, params.num_tx_antennas);
    let received = fading.apply(&transmitted)?;

    let snr_db = channel::snr_from_ebn0(params.ebn0_db, qam::BITS_PER_SYMBOL, stbc::CODE_RATE);
    let mut slot_rows = Vec::with_capacity(received.num_antennas());
    for rx in 0 .. received.num_antennas() {
        let (noisy_row, _) = channel::add_awgn(rng, received.row(rx), snr_db);
        let mut slots = framer.deframe(&noisy_row, num_blocks)?;
        slots.truncate(num_slots);
        slot_rows.push(slots);
    }
    let rx_slots = AntennaSignal::from_rows(&slot_rows)?;

    let mut rx_symbols = stbc::decode(&rx_slots, &fading)?;
    rx_symbols.truncate(tx_symbols.len());
    let rx_bits = qam::demodulate(&rx_symbols);
    let rx_remapped = qam::modulate(&rx_bits)?;

    let num_symbol_errors = tx_symbols
        .iter()
        .zip(&rx_remapped)
        .filter(|&(tx, rx)| (tx - rx).norm() > SYMBOL_MATCH_ATOL + SYMBOL_MATCH_RTOL * rx.norm())
        .count();
    Ok(FrameCounts {
        num_bit_errors: utils::error_count(&rx_bits, &tx_bits),
        num_bits: tx_bits.len(),
        num_symbol_errors,
        num_symbols: tx_symbols.len().min(rx_remapped.len()),
    })
}

/// Returns results of Monte Carlo simulation at one Eb/N0 point.
///
/// Frames are simulated in parallel. Each frame trial draws its own generator from `seed` and
/// the frame index, so the results depend only on the parameters and the seed, never on how the
/// trials are scheduled across threads. A frame whose channel draw turns out degenerate is
/// counted as transmitting nothing.
///
/// # Parameters
///
/// - `params`: Simulation parameters.
///
/// - `seed`: Seed from which every frame trial derives its random number generator.
///
/// # Errors
///
/// Returns an error if the simulation parameters are invalid.
///
/// # Examples
///
/// ```
/// use mimo_ofdm_stbc::sim::{self, SimParams};
///
/// let params = SimParams {
///     num_tx_antennas: 2,
///     num_rx_antennas: 2,
///     num_subcarriers: 8,
///     cyclic_prefix_len: 2,
///     ebn0_db: 30.0,
///     num_frames: 4,
/// };
/// let results = sim::run_fading_sim(&params, 7)?;
/// assert_eq!(results.num_bits, 4 * 8 * 6);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn run_fading_sim(params: &SimParams, seed: u64) -> Result<SimResults, Error> {
    check_sim_params(params)?;
    let framer = OfdmFramer::new(params.num_subcarriers, params.cyclic_prefix_len)?;
    let counts = (0 .. params.num_frames)
        .into_par_iter()
        .map(|frame_index| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(frame_index as u64));
            match simulate_frame(&mut rng, params, &framer) {
                Err(Error::DegenerateChannel(_)) => Ok(FrameCounts::default()),
                result => result,
            }
        })
        .try_reduce(FrameCounts::default, |first, second| Ok(first.merge(second)))?;
    Ok(SimResults {
        params: *params,
        num_bit_errors: counts.num_bit_errors,
        num_bits: counts.num_bits,
        num_symbol_errors: counts.num_symbol_errors,
        num_symbols: counts.num_symbols,
    })
}

/// Runs Monte Carlo simulations over a sweep of Eb/N0 points and saves results to a JSON file.
///
/// Prints the measured error rates for each point to standard output next to the closed-form
/// Rayleigh reference at the transmit diversity order, and rewrites the JSON results file as
/// each point finishes, so partial sweeps are preserved.
///
/// # Parameters
///
/// - `all_params`: Simulation parameters for the sweep points, in the order to be simulated.
///
/// - `base_seed`: Seed for the whole sweep; each point derives an independent stream from it.
///
/// - `json_filename`: Name of JSON file to which results must be saved.
///
/// # Errors
///
/// Returns an error if any point has invalid parameters or if the results file cannot be
/// written.
pub fn run_fading_sims(
    all_params: &[SimParams],
    base_seed: u64,
    json_filename: &str,
) -> Result<(), Error> {
    let mut all_results = Vec::with_capacity(all_params.len());
    for (point_index, params) in all_params.iter().enumerate() {
        let results = run_fading_sim(params, point_seed(base_seed, point_index))?;
        println!(
            "Eb/N0 = {:5.1} dB: BER = {:.6e}, SER = {:.6e}, theory BER = {:.6e}",
            params.ebn0_db,
            results.ber(),
            results.ser(),
            theory::ber_rayleigh(params.ebn0_db, stbc::NUM_TX_ANTENNAS),
        );
        all_results.push(results);
        save_results_to_json_file(&all_results, json_filename)?;
    }
    Ok(())
}

/// Saves simulation results to a JSON file as parallel Eb/N0, BER, and SER sequences.
///
/// # Parameters
///
/// - `all_results`: Results to be saved, one entry per finalized sweep point.
///
/// - `json_filename`: Name of JSON file to which results must be saved.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_results_to_json_file(
    all_results: &[SimResults],
    json_filename: &str,
) -> Result<(), Error> {
    let file = File::create(json_filename)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &SweepRecord::new(all_results))?;
    Ok(())
}

/// Loads previously saved simulation results from a JSON file.
///
/// # Parameters
///
/// - `json_filename`: Name of JSON file from which results must be loaded.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or does not hold a valid sweep record.
pub fn load_results_from_json_file(json_filename: &str) -> Result<SweepRecord, Error> {
    let file = File::open(json_filename)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Checks validity of simulation parameters.
fn check_sim_params(params: &SimParams) -> Result<(), Error> {
    if params.num_tx_antennas != stbc::NUM_TX_ANTENNAS {
        return Err(Error::InvalidInput(format!(
            "Number of transmit antennas must be {} for Alamouti space-time coding, found {}",
            stbc::NUM_TX_ANTENNAS,
            params.num_tx_antennas
        )));
    }
    if params.num_rx_antennas == 0 {
        return Err(Error::InvalidInput(
            "Number of receive antennas cannot be zero".to_string(),
        ));
    }
    if params.num_frames == 0 {
        return Err(Error::InvalidInput(
            "Number of frames cannot be zero".to_string(),
        ));
    }
    Ok(())
}

/// Returns the seed for one sweep point.
///
/// Points are strided `2^32` apart so their per-frame generator streams never collide.
fn point_seed(base_seed: u64, point_index: usize) -> u64 {
    base_seed.wrapping_add((point_index as u64) << 32)
}

/// Returns `num_errors / num_total`, or zero when nothing was transmitted.
#[allow(clippy::cast_precision_loss)]
fn error_rate(num_errors: usize, num_total: usize) -> f64 {
    if num_total == 0 {
        0.0
    } else {
        num_errors as f64 / num_total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    fn params_for_test(ebn0_db: f64, num_frames: usize) -> SimParams {
        SimParams {
            num_tx_antennas: 2,
            num_rx_antennas: 2,
            num_subcarriers: 64,
            cyclic_prefix_len: 16,
            ebn0_db,
            num_frames,
        }
    }

    #[test]
    fn test_check_sim_params() {
        // Invalid input
        let mut params = params_for_test(10.0, 100);
        params.num_tx_antennas = 1;
        assert!(check_sim_params(&params).is_err());
        let mut params = params_for_test(10.0, 100);
        params.num_rx_antennas = 0;
        assert!(check_sim_params(&params).is_err());
        let params = params_for_test(10.0, 0);
        assert!(check_sim_params(&params).is_err());
        // Valid input
        assert!(check_sim_params(&params_for_test(10.0, 100)).is_ok());
    }

    #[test]
    fn test_simulate_frame_noiseless_recovery() {
        let mut rng = StdRng::seed_from_u64(31);
        let params = params_for_test(80.0, 1);
        let framer = OfdmFramer::new(64, 16).unwrap();
        let counts = simulate_frame(&mut rng, &params, &framer).unwrap();
        assert_eq!(counts.num_bits, 384);
        assert_eq!(counts.num_symbols, 64);
        assert_eq!(counts.num_bit_errors, 0);
        assert_eq!(counts.num_symbol_errors, 0);
    }

    #[test]
    fn test_simulate_frame_framer_mismatch() {
        let mut rng = StdRng::seed_from_u64(32);
        let params = params_for_test(10.0, 1);
        let framer = OfdmFramer::new(32, 8).unwrap();
        assert!(matches!(
            simulate_frame(&mut rng, &params, &framer),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_simulate_frame_with_padding() {
        // Five subcarriers give an odd symbol count, exercising both padding paths
        let mut rng = StdRng::seed_from_u64(33);
        let mut params = params_for_test(70.0, 1);
        params.num_subcarriers = 5;
        params.cyclic_prefix_len = 2;
        let framer = OfdmFramer::new(5, 2).unwrap();
        let counts = simulate_frame(&mut rng, &params, &framer).unwrap();
        assert_eq!(counts.num_bits, 30);
        assert_eq!(counts.num_symbols, 5);
        assert_eq!(counts.num_bit_errors, 0);
        assert_eq!(counts.num_symbol_errors, 0);
    }

    #[test]
    fn test_frame_counts_merge() {
        let first = FrameCounts {
            num_bit_errors: 3,
            num_bits: 384,
            num_symbol_errors: 2,
            num_symbols: 64,
        };
        let second = FrameCounts {
            num_bit_errors: 1,
            num_bits: 384,
            num_symbol_errors: 1,
            num_symbols: 64,
        };
        let merged = first.merge(second);
        assert_eq!(merged.num_bit_errors, 4);
        assert_eq!(merged.num_bits, 768);
        assert_eq!(merged.num_symbol_errors, 3);
        assert_eq!(merged.num_symbols, 128);
    }

    #[test]
    fn test_run_fading_sim_invalid_params() {
        let mut params = params_for_test(10.0, 10);
        params.num_tx_antennas = 3;
        assert!(run_fading_sim(&params, 0).is_err());
        let mut params = params_for_test(10.0, 10);
        params.cyclic_prefix_len = 65;
        assert!(run_fading_sim(&params, 0).is_err());
    }

    #[test]
    fn test_run_fading_sim_reproducible() {
        let params = params_for_test(12.0, 20);
        let first = run_fading_sim(&params, 99).unwrap();
        let second = run_fading_sim(&params, 99).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_fading_sim_ber_monotonic() {
        let seed = 1234;
        let num_frames = 200;
        let low = run_fading_sim(&params_for_test(0.0, num_frames), seed).unwrap();
        let mid = run_fading_sim(&params_for_test(15.0, num_frames), seed).unwrap();
        let high = run_fading_sim(&params_for_test(30.0, num_frames), seed).unwrap();
        assert!(low.ber() > mid.ber() && mid.ber() > high.ber());
        assert!(low.ber() > 0.05 && high.ber() < 0.01);
        for results in [&low, &mid, &high] {
            assert!(results.ser() >= results.ber());
            assert_eq!(results.num_bits, num_frames * 384);
            assert_eq!(results.num_symbols, num_frames * 64);
        }
    }

    #[test]
    fn test_sweep_record_new() {
        let results = SimResults {
            params: params_for_test(4.0, 10),
            num_bit_errors: 12,
            num_bits: 3840,
            num_symbol_errors: 5,
            num_symbols: 640,
        };
        let record = SweepRecord::new(&[results]);
        assert_eq!(record.ebn0_db, vec![4.0]);
        assert_float_eq!(record.ber[0], 12.0 / 3840.0, abs <= 1e-15);
        assert_float_eq!(record.ser[0], 5.0 / 640.0, abs <= 1e-15);
        // Zero denominators report zero rates
        let idle = SimResults {
            params: params_for_test(4.0, 10),
            num_bit_errors: 0,
            num_bits: 0,
            num_symbol_errors: 0,
            num_symbols: 0,
        };
        assert_float_eq!(idle.ber(), 0.0, abs <= 0.0);
        assert_float_eq!(idle.ser(), 0.0, abs <= 0.0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let json_path = std::env::temp_dir().join("mimo_ofdm_stbc_test_results.json");
        let json_filename = json_path.to_str().unwrap();
        let all_results = [
            SimResults {
                params: params_for_test(0.0, 10),
                num_bit_errors: 100,
                num_bits: 3840,
                num_symbol_errors: 60,
                num_symbols: 640,
            },
            SimResults {
                params: params_for_test(2.0, 10),
                num_bit_errors: 50,
                num_bits: 3840,
                num_symbol_errors: 30,
                num_symbols: 640,
            },
        ];
        save_results_to_json_file(&all_results, json_filename).unwrap();
        let record = load_results_from_json_file(json_filename).unwrap();
        assert_eq!(record, SweepRecord::new(&all_results));
        std::fs::remove_file(&json_path).unwrap();
        // Missing file
        assert!(load_results_from_json_file(json_filename).is_err());
    }
}
