//! Static interleave map between coders, channel samples, and packed output bits

use crate::{NCODERS, RS_ENCODED_LENGTH, SEGMENT_LENGTH, SEGMENT_SYNC_LENGTH, SYMBOLS_PER_CODER};

/// Interleave map for a batch of [`NCODERS`] data segments.
///
/// The transmitter splits the encoded byte stream round-robin across twelve trellis coders:
/// byte `n` of a batch feeds coder `n % 12` (its four dibits taken MSB pair first), and data
/// symbol `j` of every segment carries the next output of coder `j % 12`. This table inverts
/// that commutation for the receiver: for each coder and each of its [`SYMBOLS_PER_CODER`]
/// slots per batch, it gives the absolute sample offset the slot reads from and the absolute
/// bit offset its decoded dibit occupies in the packed output. Both mappings are bijective
/// over a batch; no data sample and no output bit is covered twice or left out.
#[derive(Eq, PartialEq, Debug)]
pub struct InterleaveMap {
    /// Sample offset within a 12-segment batch for each (coder, slot)
    sample_offsets: Vec<usize>,
    /// Bit offset within the packed 12-segment output for each (coder, slot)
    dibit_offsets: Vec<usize>,
}

impl InterleaveMap {
    /// Returns the interleave map for a batch of [`NCODERS`] segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsb_trellis::InterleaveMap;
    ///
    /// let map = InterleaveMap::new();
    /// assert_eq!(map.sample_offset(0, 0), 4);
    /// assert_eq!(map.dibit_offset(0, 0), 6);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        let slots_per_segment = SYMBOLS_PER_CODER / NCODERS;
        let mut sample_offsets = Vec::with_capacity(NCODERS * SYMBOLS_PER_CODER);
        let mut dibit_offsets = Vec::with_capacity(NCODERS * SYMBOLS_PER_CODER);
        for coder in 0 .. NCODERS {
            for slot in 0 .. SYMBOLS_PER_CODER {
                let segment = slot / slots_per_segment;
                let round = slot % slots_per_segment;
                sample_offsets
                    .push(segment * SEGMENT_LENGTH + SEGMENT_SYNC_LENGTH + NCODERS * round + coder);
                let byte = NCODERS * (slot / 4) + coder;
                dibit_offsets.push(8 * byte + 6 - 2 * (slot % 4));
            }
        }
        Self {
            sample_offsets,
            dibit_offsets,
        }
    }

    /// Returns the absolute sample offset, within a batch of [`NCODERS`] concatenated input
    /// segments, of the symbol feeding the given slot of the given coder.
    #[must_use]
    pub fn sample_offset(&self, coder: usize, slot: usize) -> usize {
        self.sample_offsets[coder * SYMBOLS_PER_CODER + slot]
    }

    /// Returns the absolute bit offset, within the packed output of a batch of [`NCODERS`]
    /// segments, occupied by the dibit decoded from the given slot of the given coder. The
    /// offset is always even; the in-byte shift is one of 0, 2, 4 or 6.
    #[must_use]
    pub fn dibit_offset(&self, coder: usize, slot: usize) -> usize {
        self.dibit_offsets[coder * SYMBOLS_PER_CODER + slot]
    }
}

impl Default for InterleaveMap {
    fn default() -> Self {
        Self::new()
    }
}
