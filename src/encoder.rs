//! Reference transmit side: trellis coder and segment multiplexer

use crate::{
    Error, InterleaveMap, SampleSegment, NCODERS, RS_ENCODED_LENGTH, SEGMENT_LENGTH,
    SEGMENT_SYNC_LENGTH, SYMBOLS_PER_CODER, SYMBOL_LEVELS,
};

/// Nominal levels of the four segment-sync symbols inserted at the start of every segment
pub const SEGMENT_SYNC_LEVELS: [f32; 4] = [5.0, -5.0, -5.0, 5.0];

/// One rate-2/3 trellis coder with differential precoder.
///
/// The upper input bit passes through a one-symbol differential precoder; the lower input bit
/// drives a feedback coder with two delay elements whose second element is emitted as the
/// low output bit. The three output bits select one of the eight nominal symbol levels.
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub struct TrellisEncoder {
    /// Differential precoder memory
    precoder: u8,
    /// First delay element of the feedback coder
    s1: u8,
    /// Second delay element of the feedback coder (emitted as Z0)
    s0: u8,
}

impl TrellisEncoder {
    /// Returns a coder in the all-zero state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            precoder: 0,
            s1: 0,
            s0: 0,
        }
    }

    /// Encodes one dibit and returns the nominal level of the transmitted symbol.
    ///
    /// Only the low two bits of `dibit` are used.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsb_trellis::TrellisEncoder;
    ///
    /// let mut coder = TrellisEncoder::new();
    /// assert_eq!(coder.encode(0), -7.0);
    /// assert_eq!(coder.encode(3), 5.0);
    /// ```
    pub fn encode(&mut self, dibit: u8) -> f32 {
        let x2 = (dibit >> 1) & 1;
        let x1 = dibit & 1;
        let y2 = x2 ^ self.precoder;
        let z0 = self.s0;
        self.precoder = y2;
        self.s0 = self.s1;
        self.s1 = x1 ^ z0;
        SYMBOL_LEVELS[usize::from((y2 << 2) | (x1 << 1) | z0)]
    }

    /// Restores the all-zero coder state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for TrellisEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Transmit-side multiplexer: twelve trellis coders fed round-robin through the interleave map.
///
/// Encodes batches of `12 * 207` bytes into twelve 832-sample data segments of nominal symbol
/// levels, inserting the segment-sync pattern at the first four offsets of every segment. The
/// coders keep their state across calls, exactly like the transmitter they model.
#[derive(Debug)]
pub struct SegmentEncoder {
    /// Interleave map shared with the receive side
    map: InterleaveMap,
    /// One coder per interleave phase
    coders: Vec<TrellisEncoder>,
}

impl SegmentEncoder {
    /// Returns a segment encoder with all twelve coders in the all-zero state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: InterleaveMap::new(),
            coders: vec![TrellisEncoder::new(); NCODERS],
        }
    }

    /// Encodes the given bytes into data segments of nominal symbol levels.
    ///
    /// # Parameters
    ///
    /// - `bytes`: Bytes to be transmitted; the length must be a multiple of `12 * 207` (one
    ///   batch of twelve segments).
    ///
    /// # Returns
    ///
    /// - `segments`: One 832-sample segment per 207 input bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes.len()` is not a multiple of `12 * 207`.
    pub fn encode(&mut self, bytes: &[u8]) -> Result<Vec<SampleSegment>, Error> {
        let batch_len = NCODERS * RS_ENCODED_LENGTH;
        if bytes.len() % batch_len != 0 {
            return Err(Error::InvalidInput(format!(
                "Number of bytes to encode must be a multiple of {batch_len}, found {}",
                bytes.len()
            )));
        }
        let mut segments = Vec::with_capacity(bytes.len() / RS_ENCODED_LENGTH);
        for batch in bytes.chunks_exact(batch_len) {
            let mut batch_segments = [[0f32; SEGMENT_LENGTH]; NCODERS];
            for (coder, trellis) in self.coders.iter_mut().enumerate() {
                for slot in 0 .. SYMBOLS_PER_CODER {
                    let dbwhere = self.map.dibit_offset(coder, slot);
                    let dibit = (batch[dbwhere >> 3] >> (dbwhere & 0x7)) & 0x3;
                    let swhere = self.map.sample_offset(coder, slot);
                    batch_segments[swhere / SEGMENT_LENGTH][swhere % SEGMENT_LENGTH] =
                        trellis.encode(dibit);
                }
            }
            for segment in &mut batch_segments {
                segment[.. SEGMENT_SYNC_LENGTH].copy_from_slice(&SEGMENT_SYNC_LEVELS);
            }
            segments.extend_from_slice(&batch_segments);
        }
        Ok(segments)
    }

    /// Restores all twelve coders to the all-zero state.
    pub fn reset(&mut self) {
        for coder in &mut self.coders {
            coder.reset();
        }
    }
}

impl Default for SegmentEncoder {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests_of_segment_encoder {
    use super::*;

    #[test]
    fn test_encode_rejects_partial_batch() {
        let mut encoder = SegmentEncoder::new();
        assert!(encoder.encode(&[0; RS_ENCODED_LENGTH]).is_err());
        assert!(encoder
            .encode(&vec![0; NCODERS * RS_ENCODED_LENGTH - 1])
            .is_err());
    }

    #[test]
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    fn test_encode_shape_and_sync() {
        let mut encoder = SegmentEncoder::new();
        let bytes: Vec<u8> = (0 .. 2 * NCODERS * RS_ENCODED_LENGTH)
            .map(|i| (i % 251) as u8)
            .collect();
        let segments = encoder.encode(&bytes).unwrap();
        assert_eq!(segments.len(), 2 * NCODERS);
        for segment in &segments {
            assert_eq!(segment[.. SEGMENT_SYNC_LENGTH], SEGMENT_SYNC_LEVELS);
            for &sample in &segment[SEGMENT_SYNC_LENGTH ..] {
                assert!(SYMBOL_LEVELS.contains(&sample));
            }
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn test_reset_makes_encoding_repeatable() {
        let mut encoder = SegmentEncoder::new();
        let bytes: Vec<u8> = (0 .. NCODERS * RS_ENCODED_LENGTH)
            .map(|i| (i * 31 + 7) as u8)
            .collect();
        let first = encoder.encode(&bytes).unwrap();
        encoder.reset();
        let second = encoder.encode(&bytes).unwrap();
        assert_eq!(first, second);
    }
}
