//! Simulator to evaluate the 8-VSB trellis decoding chain over an AWGN channel

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;

use crate::{
    utils, Error, PlInfo, SegmentEncoder, TrellisDecoder, NCODERS, RS_ENCODED_LENGTH,
    SEGMENTS_PER_FIELD, SEGMENT_LENGTH,
};

/// Parameters for trellis decoding chain simulation over an AWGN channel
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SimParams {
    /// Number of twelve-segment batches to be transmitted
    pub num_batches: u32,
    /// Ratio (dB) of mean symbol power to noise power at AWGN channel output
    pub snr_db: f64,
}

/// Results of trellis decoding chain simulation over an AWGN channel
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SimResults {
    /// Simulation parameters
    pub params: SimParams,
    /// Number of bytes whose decisions were compared to the transmitted payload
    pub num_bytes: usize,
    /// Number of byte errors
    pub num_byte_errors: usize,
    /// Byte error rate
    pub byte_error_rate: f64,
    /// Best path metric of each of the twelve decoders after the last batch
    pub decoder_metrics: Vec<f32>,
}

/// Checks validity of simulation parameters.
fn check_sim_params(params: &SimParams) -> Result<(), Error> {
    if params.num_batches == 0 {
        return Err(Error::InvalidInput(
            "Number of batches cannot be zero".to_string(),
        ));
    }
    Ok(())
}

/// Runs one simulation of the trellis decoding chain over an AWGN channel.
///
/// Random payload bytes are trellis-coded into data segments, passed through an AWGN channel,
/// and decoded. The decoding stage has a fixed latency of one twelve-segment batch, so the
/// decisions for the last transmitted batch never emerge; the byte error rate is measured over
/// the first `num_batches - 1` payload batches.
///
/// # Parameters
///
/// - `params`: Simulation parameters.
///
/// # Returns
///
/// - `results`: Simulation results.
///
/// # Errors
///
/// Returns an error if `params.num_batches` is zero.
///
/// # Examples
///
/// ```
/// use vsb_trellis::sim::{run_awgn_sim, SimParams};
///
/// let params = SimParams {
///     num_batches: 2,
///     snr_db: 25.0,
/// };
/// let results = run_awgn_sim(&params)?;
/// assert_eq!(results.byte_error_rate, 0.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn run_awgn_sim(params: &SimParams) -> Result<SimResults, Error> {
    check_sim_params(params)?;
    let batch_len = NCODERS * RS_ENCODED_LENGTH;
    let mut encoder = SegmentEncoder::new();
    let mut decoder = TrellisDecoder::new();
    let mut prev_payload: Option<Vec<u8>> = None;
    let mut num_bytes = 0;
    let mut num_byte_errors = 0;
    for _ in 0 .. params.num_batches {
        let payload = utils::random_payload(batch_len);
        let segments = encoder.encode(&payload)?;
        let mut noisy = Vec::with_capacity(segments.len());
        for segment in &segments {
            let mut noisy_segment = [0f32; SEGMENT_LENGTH];
            noisy_segment.copy_from_slice(&utils::awgn_channel(segment, params.snr_db));
            noisy.push(noisy_segment);
        }
        let mut tags = Vec::with_capacity(NCODERS);
        for n in 0 .. NCODERS as u64 {
            let position = decoder.position() + n;
            let segno = (position % u64::from(SEGMENTS_PER_FIELD)) as u16;
            let field = ((position / u64::from(SEGMENTS_PER_FIELD)) % 2) as u8;
            tags.push((position, PlInfo::new(segno, field)?));
        }
        let decoded = decoder.process(&noisy, &tags)?;
        // The first output batch carries the fifo priming bytes, not payload.
        if let Some(ref_payload) = prev_payload {
            let batch_bytes: Vec<u8> = decoded.iter().flat_map(|segment| segment.bytes).collect();
            num_bytes += batch_len;
            num_byte_errors += utils::error_count(&batch_bytes, &ref_payload);
        }
        prev_payload = Some(payload);
    }
    let byte_error_rate = if num_bytes == 0 {
        0.0
    } else {
        num_byte_errors as f64 / num_bytes as f64
    };
    Ok(SimResults {
        params: *params,
        num_bytes,
        num_byte_errors,
        byte_error_rate,
        decoder_metrics: decoder.decoder_metrics().to_vec(),
    })
}

/// Runs simulations of the trellis decoding chain for all given parameter sets, and saves the
/// results to a JSON file.
///
/// The simulations for the different parameter sets run in parallel.
///
/// # Parameters
///
/// - `all_params`: Parameters for all simulations to be run.
///
/// - `json_filename`: Name of JSON file to which simulation results must be saved.
///
/// # Errors
///
/// Returns an error if any parameter set is invalid, or if the results cannot be written to the
/// given file.
pub fn run_awgn_sims(all_params: &[SimParams], json_filename: &str) -> Result<(), Error> {
    let all_results: Vec<SimResults> = all_params
        .par_iter()
        .map(run_awgn_sim)
        .collect::<Result<_, _>>()?;
    let writer = BufWriter::new(File::create(json_filename)?);
    serde_json::to_writer_pretty(writer, &all_results)?;
    Ok(())
}
