//! # Some useful functions for simulating the decoding chain
//!
//! The [`random_payload`] function returns a given number of random bytes; the [`awgn_channel`]
//! function adds white Gaussian noise to a sequence of transmitted symbol levels; and the
//! [`error_count`] function returns the number of errors in a sequence with respect to a
//! reference sequence.
//!
//! # Examples
//!
//! The code below illustrates the usage of the functions in this module.
//! ```
//! use vsb_trellis::utils;
//!
//! let num_bytes = 207;
//! let snr_db = 20.0;
//! let payload = utils::random_payload(num_bytes);
//! let noisy = utils::awgn_channel(&[-7.0, 5.0, 1.0, -3.0], snr_db);
//! let err_count = utils::error_count(&payload, &payload);
//! assert_eq!(err_count, 0);
//! ```

use rand::Rng;
use rand_distr::StandardNormal;

/// Mean power of the eight nominal 8-VSB symbol levels
const MEAN_SYMBOL_POWER: f64 = 21.0;

/// Returns given number of random bytes.
///
/// # Parameters
///
/// - `num_bytes`: Number of random bytes to be generated.
///
/// # Returns
///
/// - `bytes`: Random bytes.
#[must_use]
pub fn random_payload(num_bytes: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    (0 .. num_bytes).map(|_| rng.random::<u8>()).collect()
}

/// Returns AWGN channel output corresponding to given transmitted symbol levels.
///
/// # Parameters
///
/// - `symbols`: Nominal symbol levels to be transmitted.
///
/// - `snr_db`: Ratio (dB) of mean symbol power to noise power at the channel output (the eight
///   nominal levels have mean power `21`, so the noise variance is
///   `21.0 / 10f64.powf(0.1 * snr_db)`).
///
/// # Returns
///
/// - `samples`: Noisy channel samples corresponding to the transmitted symbols.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn awgn_channel(symbols: &[f32], snr_db: f64) -> Vec<f32> {
    let mut rng = rand::rng();
    let noise_std = (MEAN_SYMBOL_POWER / 10f64.powf(0.1 * snr_db)).sqrt();
    symbols
        .iter()
        .map(|&x| x + (noise_std * rng.sample::<f64, _>(StandardNormal)) as f32)
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
/// - `err_count`: Number of positions in which the two sequences differ. If they are of
///   different lengths, then the longer sequence is effectively truncated to the length of the
///   shorter one.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    ref_seq
        .iter()
        .zip(seq.iter())
        .filter(|&(x, y)| x != y)
        .count()
}
