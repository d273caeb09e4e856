//! This crate implements the trellis decoding stage of an 8-level vestigial-sideband (8-VSB)
//! digital broadcast receiver. The transmitter time-division-interleaves a rate-2/3 trellis code
//! across twelve independent coders; this crate demultiplexes noisy channel samples back into
//! twelve per-coder symbol streams, runs twelve independent Viterbi decoders, realigns their
//! decision latency with per-coder delay-compensation fifos, and reassembles packed output
//! segments together with their frame-position metadata, delayed by exactly twelve segments. A
//! reference transmit side (trellis coder and segment multiplexer) is included for simulation
//! and testing.

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

mod decoder;
mod encoder;
mod fifo;
mod mux;
mod plinfo;
pub mod sim;
pub mod utils;
mod viterbi;

pub use decoder::{DecodedSegment, TrellisDecoder};
pub use encoder::{SegmentEncoder, TrellisEncoder, SEGMENT_SYNC_LEVELS};
pub use fifo::DelayFifo;
pub use mux::InterleaveMap;
pub use plinfo::PlInfo;
pub use viterbi::{SequenceDecoder, SingleViterbi};

/// Number of channel samples in one data segment
pub const SEGMENT_LENGTH: usize = 832;

/// Number of segment-sync symbols at the start of every data segment (excluded from decoding)
pub const SEGMENT_SYNC_LENGTH: usize = 4;

/// Number of interleaved trellis coders
pub const NCODERS: usize = 12;

/// Number of Reed-Solomon-encoded bytes recovered per data segment
pub const RS_ENCODED_LENGTH: usize = 207;

/// Number of symbols assigned to one coder over a batch of [`NCODERS`] segments: the
/// `(832 - 4) * 12` data symbols of a batch split evenly twelve ways
pub const SYMBOLS_PER_CODER: usize = SEGMENT_LENGTH - SEGMENT_SYNC_LENGTH;

/// Number of data segments in one broadcast field
pub const SEGMENTS_PER_FIELD: u16 = 312;

/// Nominal 8-VSB symbol levels, indexed by the 3-bit `(Z2, Z1, Z0)` coder output
pub const SYMBOL_LEVELS: [f32; 8] = [-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0];

/// One data segment of channel samples
pub type SampleSegment = [f32; SEGMENT_LENGTH];

/// Custom error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// Missing frame-position tag at an input stream position
    #[error("no pipeline info tag at stream position {0}")]
    MissingTag(u64),
    /// File read/write error
    #[error("{0}")]
    FileReadWrite(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWrite(#[from] serde_json::Error),
}
