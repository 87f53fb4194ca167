//! This crate implements a link-level simulator for a 2x2 multiple-input/multiple-output (MIMO)
//! transmission chain that combines the Alamouti space-time block code (STBC) with orthogonal
//! frequency-division multiplexing (OFDM) and 64-ary quadrature amplitude modulation (64-QAM).
//! Random bits are mapped to constellation symbols, space-time encoded across two transmit
//! antennas, OFDM-framed with a cyclic prefix, passed through a flat Rayleigh-fading channel with
//! additive white Gaussian noise, and recovered by maximum-ratio combining with known channel
//! state. A Monte Carlo driver sweeps Eb/N0 and estimates the bit and symbol error rates at each
//! point, for comparison against the closed-form curves in [`theory`].

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

use thiserror::Error;

pub use num_complex::Complex64;

pub mod channel;
pub mod ofdm;
pub mod qam;
pub mod sim;
pub mod stbc;
pub mod theory;
pub mod utils;

/// Custom error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// Dimension mismatch between a signal and a channel matrix
    #[error("{0}")]
    DimensionMismatch(String),
    /// Degenerate channel error (no channel power to combine over)
    #[error("{0}")]
    DegenerateChannel(String),
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
}

/// Enumeration of binary symbol values
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub enum Bit {
    /// Binary symbol `0`
    Zero = 0,
    /// Binary symbol `1`
    One = 1,
}

/// Samples for a bank of antennas, with one row of complex samples per antenna.
///
/// All rows have the same length, so the struct behaves as a dense matrix whose row index is an
/// antenna and whose column index is a time slot or sample. Both the space-time encoder output
/// and the signals entering/leaving the channel are carried in this form.
#[derive(Clone, PartialEq, Debug)]
pub struct AntennaSignal {
    /// Number of antennas (rows)
    num_antennas: usize,
    /// Number of samples per antenna (columns)
    num_samples: usize,
    /// Sample values in row-major order
    samples: Vec<Complex64>,
}

impl AntennaSignal {
    /// Returns an all-zero signal for a given number of antennas and samples.
    ///
    /// # Parameters
    ///
    /// - `num_antennas`: Number of antennas (rows).
    ///
    /// - `num_samples`: Number of samples per antenna (columns).
    #[must_use]
    pub fn zeros(num_antennas: usize, num_samples: usize) -> Self {
        Self {
            num_antennas,
            num_samples,
            samples: vec![Complex64::new(0.0, 0.0); num_antennas * num_samples],
        }
    }

    /// Returns the signal holding given per-antenna sample rows.
    ///
    /// # Parameters
    ///
    /// - `rows`: Sample row for each antenna. All rows must have the same length.
    ///
    /// # Errors
    ///
    /// Returns an error if `rows` is empty or if its rows have unequal lengths.
    ///
    /// # Examples
    ///
    /// ```
    /// use mimo_ofdm_stbc::{AntennaSignal, Complex64};
    ///
    /// let rows = [
    ///     vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, -1.0)],
    ///     vec![Complex64::new(0.5, 0.5), Complex64::new(-1.0, 0.0)],
    /// ];
    /// let signal = AntennaSignal::from_rows(&rows)?;
    /// assert_eq!(signal.num_antennas(), 2);
    /// assert_eq!(signal.num_samples(), 2);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_rows(rows: &[Vec<Complex64>]) -> Result<Self, Error> {
        let Some(first_row) = rows.first() else {
            return Err(Error::InvalidInput(
                "Antenna signal must have at least one antenna".to_string(),
            ));
        };
        let num_samples = first_row.len();
        if rows.iter().any(|row| row.len() != num_samples) {
            return Err(Error::InvalidInput(format!(
                "All antenna rows must have the same length (expected {num_samples})"
            )));
        }
        Ok(Self {
            num_antennas: rows.len(),
            num_samples,
            samples: rows.iter().flatten().copied().collect(),
        })
    }

    /// Returns the number of antennas (rows).
    #[must_use]
    pub fn num_antennas(&self) -> usize {
        self.num_antennas
    }

    /// Returns the number of samples per antenna (columns).
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Returns the samples for one antenna.
    ///
    /// # Panics
    ///
    /// Panics if `antenna_index >= self.num_antennas()`.
    #[must_use]
    pub fn row(&self, antenna_index: usize) -> &[Complex64] {
        let start = antenna_index * self.num_samples;
        &self.samples[start .. start + self.num_samples]
    }

    /// Returns mutable samples for one antenna.
    ///
    /// # Panics
    ///
    /// Panics if `antenna_index >= self.num_antennas()`.
    pub fn row_mut(&mut self, antenna_index: usize) -> &mut [Complex64] {
        let start = antenna_index * self.num_samples;
        &mut self.samples[start .. start + self.num_samples]
    }

    /// Returns an iterator over per-antenna sample rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Complex64]> {
        (0 .. self.num_antennas).map(|antenna_index| self.row(antenna_index))
    }
}
