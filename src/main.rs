//! This crate simulates the BER-versus-Eb/N0 and SER-versus-Eb/N0 performance of a 2x2 MIMO-OFDM
//! link with Alamouti space-time coding and 64-QAM over a flat Rayleigh-fading channel.
//! Simulation parameters are specified on the command line, and simulation results are saved to
//! a JSON file.
//!
//! Build the executable with `cargo build --release` and then run
//! `./target/release/mimo-ofdm-stbc -h` for help on the command-line interface.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use anyhow::Result;
use clap::{crate_name, crate_version, value_parser, Arg, ArgMatches, Command};
use mimo_ofdm_stbc::{sim, stbc};
use rand::Rng;
use std::time::Instant;

/// Main function
fn main() -> Result<()> {
    let timer = Instant::now();
    let matches = command_line_parser().get_matches();
    let seed = seed_from_matches(&matches).unwrap_or_else(|| rand::rng().random());
    let json_filename = &json_filename_from_matches(&matches);
    eprintln!("Seed: {seed}");
    sim::run_fading_sims(&all_sim_params(&matches), seed, json_filename)?;
    eprintln!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Evaluates error-rate performance of 2x2 Alamouti MIMO-OFDM over Rayleigh fading")
        .arg(first_ebn0_db())
        .arg(ebn0_step_db())
        .arg(num_ebn0())
        .arg(num_frames())
        .arg(num_subcarriers())
        .arg(cyclic_prefix_len())
        .arg(num_rx_antennas())
        .arg(seed())
        .arg(json_filename())
}

/// Returns argument for first Eb/N0 (dB).
fn first_ebn0_db() -> Arg {
    Arg::new("first_ebn0_db")
        .short('r')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("0.0")
        .help("First Eb/N0 (dB)")
}

/// Returns argument for Eb/N0 step (dB).
fn ebn0_step_db() -> Arg {
    Arg::new("ebn0_step_db")
        .short('p')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("2.0")
        .help("Eb/N0 step (dB)")
}

/// Returns argument for number of Eb/N0 values.
fn num_ebn0() -> Arg {
    Arg::new("num_ebn0")
        .short('s')
        .value_parser(value_parser!(u32))
        .default_value("16")
        .help("Number of Eb/N0 values")
}

/// Returns argument for number of frames to be simulated per Eb/N0 value.
fn num_frames() -> Arg {
    Arg::new("num_frames")
        .short('n')
        .value_parser(value_parser!(usize))
        .default_value("100")
        .help("Number of frames to be simulated per Eb/N0 value")
}

/// Returns argument for number of OFDM subcarriers.
fn num_subcarriers() -> Arg {
    Arg::new("num_subcarriers")
        .short('c')
        .value_parser(value_parser!(usize))
        .default_value("64")
        .help("Number of OFDM subcarriers")
}

/// Returns argument for cyclic prefix length in time samples.
fn cyclic_prefix_len() -> Arg {
    Arg::new("cyclic_prefix_len")
        .short('l')
        .value_parser(value_parser!(usize))
        .default_value("16")
        .help("Cyclic prefix length in time samples")
}

/// Returns argument for number of receive antennas.
fn num_rx_antennas() -> Arg {
    Arg::new("num_rx_antennas")
        .short('x')
        .value_parser(value_parser!(usize))
        .default_value("2")
        .help("Number of receive antennas")
}

/// Returns argument for seed for the random number generators.
fn seed() -> Arg {
    Arg::new("seed")
        .short('d')
        .value_parser(value_parser!(u64))
        .help("Seed for the random number generators (drawn at random when omitted)")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value("results.json")
        .help("Name of JSON file to which results must be saved")
}

/// Returns simulation parameters based on command-line arguments.
fn all_sim_params(matches: &ArgMatches) -> Vec<sim::SimParams> {
    let mut all_params = Vec::new();
    for ebn0_db in all_ebn0_db_from_matches(matches) {
        all_params.push(sim::SimParams {
            num_tx_antennas: stbc::NUM_TX_ANTENNAS,
            num_rx_antennas: num_rx_antennas_from_matches(matches),
            num_subcarriers: num_subcarriers_from_matches(matches),
            cyclic_prefix_len: cyclic_prefix_len_from_matches(matches),
            ebn0_db,
            num_frames: num_frames_from_matches(matches),
        });
    }
    // OK to unwrap: All command-line arguments read above have default values, so an error
    // cannot occur in any of the associated functions called above.
    all_params
}

/// Returns all Eb/N0 (dB) values.
fn all_ebn0_db_from_matches(matches: &ArgMatches) -> Vec<f64> {
    let first_ebn0_db: f64 = *matches.get_one("first_ebn0_db").unwrap();
    let ebn0_step_db: f64 = *matches.get_one("ebn0_step_db").unwrap();
    let num_ebn0: u32 = *matches.get_one("num_ebn0").unwrap();
    (0 .. num_ebn0)
        .map(|n| first_ebn0_db + ebn0_step_db * f64::from(n))
        .collect()
}

/// Returns number of frames to be simulated per Eb/N0 value.
fn num_frames_from_matches(matches: &ArgMatches) -> usize {
    *matches.get_one("num_frames").unwrap()
}

/// Returns number of OFDM subcarriers.
fn num_subcarriers_from_matches(matches: &ArgMatches) -> usize {
    *matches.get_one("num_subcarriers").unwrap()
}

/// Returns cyclic prefix length in time samples.
fn cyclic_prefix_len_from_matches(matches: &ArgMatches) -> usize {
    *matches.get_one("cyclic_prefix_len").unwrap()
}

/// Returns number of receive antennas.
fn num_rx_antennas_from_matches(matches: &ArgMatches) -> usize {
    *matches.get_one("num_rx_antennas").unwrap()
}

/// Returns seed for the random number generators, if one was given.
fn seed_from_matches(matches: &ArgMatches) -> Option<u64> {
    matches.get_one("seed").copied()
}

/// Returns name of JSON file to which simulation results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("json_filename")
        .unwrap()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_line_for_test() -> Vec<&'static str> {
        vec![
            crate_name!(),
            "-r",
            "6.0",
            "-p",
            "0.5",
            "-s",
            "4",
            "-n",
            "50",
            "-c",
            "32",
            "-l",
            "8",
            "-x",
            "1",
            "-d",
            "42",
            "-f",
            "results.json",
        ]
    }

    #[test]
    fn test_command_line_parser() {
        assert!(command_line_parser()
            .try_get_matches_from(command_line_for_test())
            .is_ok());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_all_sim_params() {
        let matches = command_line_parser().get_matches_from(command_line_for_test());
        let all_params = all_sim_params(&matches);
        let all_ebn0_db = [6.0, 6.5, 7.0, 7.5];
        assert_eq!(all_params.len(), 4);
        for (idx, &params) in all_params.iter().enumerate() {
            assert_eq!(params.num_tx_antennas, 2);
            assert_eq!(params.num_rx_antennas, 1);
            assert_eq!(params.num_subcarriers, 32);
            assert_eq!(params.cyclic_prefix_len, 8);
            assert_eq!(params.ebn0_db, all_ebn0_db[idx]);
            assert_eq!(params.num_frames, 50);
        }
        assert_eq!(seed_from_matches(&matches), Some(42));
        assert_eq!(json_filename_from_matches(&matches), "results.json");
    }

    #[test]
    fn test_seed_defaults_to_none() {
        let matches = command_line_parser().get_matches_from(vec![crate_name!()]);
        assert_eq!(seed_from_matches(&matches), None);
    }
}
