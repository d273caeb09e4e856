//! Trellis decoding stage: symbol demultiplexer, decoder bank, delay-compensation fifos,
//! dibit packer, and frame-position metadata propagation

use crate::fifo::DelayFifo;
use crate::viterbi::{SequenceDecoder, SingleViterbi};
use crate::{
    Error, InterleaveMap, PlInfo, SampleSegment, NCODERS, RS_ENCODED_LENGTH, SEGMENT_LENGTH,
    SYMBOLS_PER_CODER,
};

/// One convolutionally-decoded output segment (Reed-Solomon correction still to be applied
/// downstream).
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub struct DecodedSegment {
    /// Position of this segment in the output stream (equal to its input segment position;
    /// output volume matches input volume one-for-one, only the content is delayed)
    pub position: u64,
    /// Frame-position tag of the input segment at this position, advanced by the twelve-segment
    /// pipeline latency
    pub info: PlInfo,
    /// Packed decoded bytes
    pub bytes: [u8; RS_ENCODED_LENGTH],
}

/// One coder's decoder paired with its delay-compensation fifo. The twelve lanes are fully
/// independent; nothing is shared between them.
#[derive(Debug)]
struct CoderLane<D> {
    viterbi: D,
    fifo: DelayFifo,
}

/// Trellis decoding stage for the interleaved rate-2/3 code of an 8-VSB receiver.
///
/// Twelve independent sequence decoders run over the twelve interleaved symbol streams of each
/// 12-segment input batch. Every decoded dibit passes through its lane's fixed-capacity fifo
/// (capacity `832 - 4 - delay`), which absorbs the decoder's decision latency so that the
/// reassembled output is aligned to segment boundaries. The net result is a pipeline latency of
/// exactly twelve complete segments, and the frame-position tag attached to each output segment
/// is the corresponding input tag advanced by those twelve segments.
///
/// The stage is a synchronous, single-threaded transform: [`process`](Self::process) takes
/// `&mut self`, so concurrent invocation is ruled out by the type system. It never fabricates
/// metadata; a missing tag fails the whole invocation before any state is touched.
///
/// # Examples
///
/// ```
/// use vsb_trellis::{PlInfo, SegmentEncoder, TrellisDecoder, NCODERS, RS_ENCODED_LENGTH};
///
/// let mut encoder = SegmentEncoder::new();
/// let mut decoder = TrellisDecoder::new();
/// let bytes = vec![0u8; NCODERS * RS_ENCODED_LENGTH];
/// let segments = encoder.encode(&bytes)?;
/// let tags: Vec<(u64, PlInfo)> = (0 .. NCODERS as u64)
///     .map(|p| Ok((p, PlInfo::new(p as u16, 0)?)))
///     .collect::<Result<_, vsb_trellis::Error>>()?;
/// let decoded = decoder.process(&segments, &tags)?;
/// assert_eq!(decoded.len(), NCODERS);
/// assert_eq!(decoded[0].info, PlInfo::new(12, 0)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct TrellisDecoder<D: SequenceDecoder = SingleViterbi> {
    /// Interleave map for the 12-segment batch
    map: InterleaveMap,
    /// Twelve independent decoder/fifo lanes
    lanes: Vec<CoderLane<D>>,
    /// Stream position of the next input segment
    position: u64,
}

impl TrellisDecoder {
    /// Returns a decoding stage with twelve [`SingleViterbi`] decoders.
    #[must_use]
    pub fn new() -> Self {
        Self::build((0 .. NCODERS).map(|_| SingleViterbi::new()).collect())
    }
}

impl Default for TrellisDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SequenceDecoder> TrellisDecoder<D> {
    /// Returns a decoding stage using the given sequence decoders, one per coder.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of decoders is not twelve, or if any decoder's delay is
    /// `832 - 4` symbols or more (such a delay cannot be compensated within one batch, and the
    /// twelve-segment pipeline latency would no longer hold).
    pub fn with_decoders(decoders: Vec<D>) -> Result<Self, Error> {
        if decoders.len() != NCODERS {
            return Err(Error::InvalidInput(format!(
                "Expected {NCODERS} sequence decoders, found {}",
                decoders.len()
            )));
        }
        if let Some(delay) = decoders
            .iter()
            .map(SequenceDecoder::delay)
            .find(|&delay| delay >= SYMBOLS_PER_CODER)
        {
            return Err(Error::InvalidInput(format!(
                "Decoder delay must be less than {SYMBOLS_PER_CODER} symbols, found {delay}"
            )));
        }
        Ok(Self::build(decoders))
    }

    /// Builds the stage from decoders already known to be valid. Each lane's fifo capacity is
    /// derived once from its decoder's delay and never changes.
    fn build(decoders: Vec<D>) -> Self {
        let lanes = decoders
            .into_iter()
            .map(|viterbi| {
                let fifo = DelayFifo::new(SYMBOLS_PER_CODER - viterbi.delay());
                CoderLane { viterbi, fifo }
            })
            .collect();
        Self {
            map: InterleaveMap::new(),
            lanes,
            position: 0,
        }
    }

    /// Decodes a batch of input segments.
    ///
    /// # Parameters
    ///
    /// - `segments`: Batch of consecutive input segments; the batch size must be a multiple of
    ///   twelve so that symbol-to-coder alignment is never split across calls.
    ///
    /// - `tags`: Frame-position tags as `(stream position, tag)` pairs. Every input segment
    ///   position covered by this call must carry exactly one tag; positions outside the batch
    ///   are ignored.
    ///
    /// # Returns
    ///
    /// - `decoded`: One output segment per input segment, in stream order. The packed content
    ///   is delayed by twelve segments relative to the input (the first twelve output segments
    ///   after construction or reset carry fifo warm-up fill), and each tag is the input tag at
    ///   the same position advanced by twelve segments.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size is not a multiple of twelve, or if any input position
    /// lacks a tag or carries more than one. On error nothing is decoded: no output is produced
    /// and no decoder or fifo state changes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn process(
        &mut self,
        segments: &[SampleSegment],
        tags: &[(u64, PlInfo)],
    ) -> Result<Vec<DecodedSegment>, Error> {
        if segments.len() % NCODERS != 0 {
            return Err(Error::InvalidInput(format!(
                "Batch size must be a multiple of {NCODERS}, found {}",
                segments.len()
            )));
        }
        // Resolve every tag up front so a bad batch leaves the stage untouched.
        let mut batch_tags = Vec::with_capacity(segments.len());
        for offset in 0 .. segments.len() as u64 {
            batch_tags.push(Self::tag_at(tags, self.position + offset)?);
        }

        let mut decoded = Vec::with_capacity(segments.len());
        let mut symbols = vec![0f32; NCODERS * SYMBOLS_PER_CODER];
        let mut dibits = vec![0u8; NCODERS * SYMBOLS_PER_CODER];
        for (chunk_index, chunk) in segments.chunks_exact(NCODERS).enumerate() {
            // Gather a contiguous symbol buffer for each coder.
            for coder in 0 .. NCODERS {
                for slot in 0 .. SYMBOLS_PER_CODER {
                    let swhere = self.map.sample_offset(coder, slot);
                    symbols[coder * SYMBOLS_PER_CODER + slot] =
                        chunk[swhere / SEGMENT_LENGTH][swhere % SEGMENT_LENGTH];
                }
            }
            // Run each decoder over its own subset of the input symbols.
            for (coder, lane) in self.lanes.iter_mut().enumerate() {
                for slot in 0 .. SYMBOLS_PER_CODER {
                    dibits[coder * SYMBOLS_PER_CODER + slot] =
                        lane.viterbi.decode(symbols[coder * SYMBOLS_PER_CODER + slot]);
                }
            }
            // Realign each dibit through its lane's fifo and pack it into the batch buffer.
            let mut packed = [0u8; NCODERS * RS_ENCODED_LENGTH];
            for (coder, lane) in self.lanes.iter_mut().enumerate() {
                for slot in 0 .. SYMBOLS_PER_CODER {
                    let aligned = lane.fifo.stuff(dibits[coder * SYMBOLS_PER_CODER + slot]);
                    let dbwhere = self.map.dibit_offset(coder, slot);
                    let shift = dbwhere & 0x7;
                    packed[dbwhere >> 3] =
                        (packed[dbwhere >> 3] & !(0x03 << shift)) | (aligned << shift);
                }
            }
            // Slice the batch buffer into output segments and reattach the metadata, advanced
            // by the twelve-segment pipeline latency.
            for (j, bytes) in packed.chunks_exact(RS_ENCODED_LENGTH).enumerate() {
                let seg_index = chunk_index * NCODERS + j;
                let mut segment_bytes = [0u8; RS_ENCODED_LENGTH];
                segment_bytes.copy_from_slice(bytes);
                decoded.push(DecodedSegment {
                    position: self.position + seg_index as u64,
                    info: batch_tags[seg_index].delayed(NCODERS as u16),
                    bytes: segment_bytes,
                });
            }
        }
        self.position += segments.len() as u64;
        Ok(decoded)
    }

    /// Clears every decoder and every fifo and rewinds the stream position, returning the stage
    /// to its post-construction condition. Used when the upstream synchronizer re-acquires after
    /// signal loss.
    pub fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.viterbi.reset();
            lane.fifo.reset();
        }
        self.position = 0;
    }

    /// Returns the best surviving path metric of each of the twelve decoders, for external
    /// health monitoring. Does not mutate decoder state.
    #[must_use]
    pub fn decoder_metrics(&self) -> [f32; NCODERS] {
        let mut metrics = [0f32; NCODERS];
        for (metric, lane) in metrics.iter_mut().zip(&self.lanes) {
            *metric = lane.viterbi.best_metric();
        }
        metrics
    }

    /// Returns the stream position of the next input segment.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the single tag attached at the given stream position.
    fn tag_at(tags: &[(u64, PlInfo)], position: u64) -> Result<PlInfo, Error> {
        let mut matches = tags.iter().filter(|&&(p, _)| p == position);
        let Some(&(_, info)) = matches.next() else {
            return Err(Error::MissingTag(position));
        };
        if matches.next().is_some() {
            return Err(Error::InvalidInput(format!(
                "More than one pipeline info tag at stream position {position}"
            )));
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests_of_trellis_decoder {
    use std::collections::VecDeque;

    use float_eq::assert_float_eq;

    use super::*;
    use crate::{SegmentEncoder, SEGMENTS_PER_FIELD, SEGMENT_SYNC_LENGTH};

    /// Slicer with a configurable artificial decision latency, for exercising the realignment
    /// logic in isolation from any real trellis algorithm.
    #[derive(Debug)]
    struct FakeDecoder {
        delay: usize,
        pending: VecDeque<u8>,
    }

    impl FakeDecoder {
        fn new(delay: usize) -> Self {
            Self {
                delay,
                pending: VecDeque::from(vec![0; delay]),
            }
        }
    }

    impl SequenceDecoder for FakeDecoder {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        fn decode(&mut self, sample: f32) -> u8 {
            self.pending.push_back((sample as u8) & 0x3);
            self.pending.pop_front().unwrap()
        }

        fn delay(&self) -> usize {
            self.delay
        }

        fn best_metric(&self) -> f32 {
            0.0
        }

        fn reset(&mut self) {
            self.pending = VecDeque::from(vec![0; self.delay]);
        }
    }

    /// Dibit transmitted on coder `coder`, slot `slot` in the synthetic fake-decoder batches.
    #[allow(clippy::cast_possible_truncation)]
    fn test_dibit(coder: usize, slot: usize) -> u8 {
        ((3 * coder + 5 * slot + 1) % 4) as u8
    }

    /// Builds one batch of input segments whose data samples are the raw dibit values placed
    /// per the interleave map (the fake decoder slices them back out).
    fn fake_batch(map: &InterleaveMap) -> Vec<SampleSegment> {
        let mut segments = vec![[0f32; SEGMENT_LENGTH]; NCODERS];
        for coder in 0 .. NCODERS {
            for slot in 0 .. SYMBOLS_PER_CODER {
                let swhere = map.sample_offset(coder, slot);
                segments[swhere / SEGMENT_LENGTH][swhere % SEGMENT_LENGTH] =
                    f32::from(test_dibit(coder, slot));
            }
        }
        segments
    }

    /// Packs the synthetic dibits the way a correct decode of one batch must come out.
    fn fake_batch_packed(map: &InterleaveMap) -> Vec<[u8; RS_ENCODED_LENGTH]> {
        let mut packed = [0u8; NCODERS * RS_ENCODED_LENGTH];
        for coder in 0 .. NCODERS {
            for slot in 0 .. SYMBOLS_PER_CODER {
                let dbwhere = map.dibit_offset(coder, slot);
                let shift = dbwhere & 0x7;
                packed[dbwhere >> 3] |= test_dibit(coder, slot) << shift;
            }
        }
        packed
            .chunks_exact(RS_ENCODED_LENGTH)
            .map(|bytes| {
                let mut segment = [0u8; RS_ENCODED_LENGTH];
                segment.copy_from_slice(bytes);
                segment
            })
            .collect()
    }

    /// One tag per stream position, counting segments through the frame structure.
    #[allow(clippy::cast_possible_truncation)]
    fn tags_from(start: u64, count: usize) -> Vec<(u64, PlInfo)> {
        (start .. start + count as u64)
            .map(|p| {
                let segno = (p % u64::from(SEGMENTS_PER_FIELD)) as u16;
                let field = ((p / u64::from(SEGMENTS_PER_FIELD)) % 2) as u8;
                (p, PlInfo::new(segno, field).unwrap())
            })
            .collect()
    }

    fn fake_stage(delay: usize) -> TrellisDecoder<FakeDecoder> {
        let decoders = (0 .. NCODERS).map(|_| FakeDecoder::new(delay)).collect();
        TrellisDecoder::with_decoders(decoders).unwrap()
    }

    #[test]
    fn test_with_decoders() {
        // Wrong decoder count
        let decoders: Vec<FakeDecoder> = (0 .. 11).map(|_| FakeDecoder::new(3)).collect();
        assert!(TrellisDecoder::with_decoders(decoders).is_err());
        // Delay too large to compensate within one batch
        let decoders: Vec<FakeDecoder> = (0 .. NCODERS)
            .map(|_| FakeDecoder::new(SYMBOLS_PER_CODER))
            .collect();
        assert!(TrellisDecoder::with_decoders(decoders).is_err());
        // Valid input
        let decoders: Vec<FakeDecoder> = (0 .. NCODERS).map(|_| FakeDecoder::new(3)).collect();
        assert!(TrellisDecoder::with_decoders(decoders).is_ok());
    }

    #[test]
    fn test_rejects_batch_not_multiple_of_twelve() {
        let mut stage = fake_stage(5);
        let segments = vec![[0f32; SEGMENT_LENGTH]; 7];
        let result = stage.process(&segments, &tags_from(0, 7));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_missing_tag_with_no_partial_output() {
        let mut stage = fake_stage(5);
        let batch = fake_batch(&InterleaveMap::new());
        // Two chunks of twelve; the tag for position 17 (second chunk) is missing.
        let segments: Vec<SampleSegment> =
            batch.iter().chain(batch.iter()).copied().collect();
        let mut tags = tags_from(0, 2 * NCODERS);
        tags.retain(|&(p, _)| p != 17);
        let result = stage.process(&segments, &tags);
        assert!(matches!(result, Err(Error::MissingTag(17))));
        // The failed call produced nothing and touched nothing: reprocessing with full tags
        // behaves exactly like a fresh stage.
        let decoded = stage.process(&segments, &tags_from(0, 2 * NCODERS)).unwrap();
        let mut fresh = fake_stage(5);
        let expected = fresh.process(&segments, &tags_from(0, 2 * NCODERS)).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_rejects_duplicate_tag() {
        let mut stage = fake_stage(5);
        let batch = fake_batch(&InterleaveMap::new());
        let mut tags = tags_from(0, NCODERS);
        tags.push((3, PlInfo::new(200, 1).unwrap()));
        let result = stage.process(&batch, &tags);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_end_to_end_with_fake_decoder() {
        let map = InterleaveMap::new();
        let batch = fake_batch(&map);
        let expected = fake_batch_packed(&map);
        let mut stage = fake_stage(5);

        // First batch: fifo warm-up fill plus decoder warm-up, all zeros.
        let first = stage.process(&batch, &tags_from(0, NCODERS)).unwrap();
        assert_eq!(first.len(), NCODERS);
        for (j, segment) in first.iter().enumerate() {
            assert_eq!(segment.position, j as u64);
            assert_eq!(segment.bytes, [0u8; RS_ENCODED_LENGTH]);
        }

        // Second batch: the realigned content of the first batch, delayed by twelve segments.
        let second = stage.process(&batch, &tags_from(NCODERS as u64, NCODERS)).unwrap();
        for (j, segment) in second.iter().enumerate() {
            assert_eq!(segment.position, (NCODERS + j) as u64);
            assert_eq!(segment.bytes, expected[j]);
        }
    }

    #[test]
    fn test_output_tags_advance_by_twelve() {
        let batch = fake_batch(&InterleaveMap::new());
        let mut stage = fake_stage(5);
        // Start twelve segments before the end of field 0 so every advance wraps into field 1.
        let start = u64::from(SEGMENTS_PER_FIELD) - NCODERS as u64;
        while stage.position() < start {
            stage
                .process(&batch, &tags_from(stage.position(), NCODERS))
                .unwrap();
        }
        let tags = tags_from(start, NCODERS);
        let decoded = stage.process(&batch, &tags).unwrap();
        for (&(p, info), segment) in tags.iter().zip(&decoded) {
            assert_eq!(segment.position, p);
            assert_eq!(segment.info, info.delayed(NCODERS as u16));
        }
        // Spot-check the wraparound arithmetic explicitly: segno 300 of field 0 comes out as
        // segno 0 of field 1, and so on.
        assert_eq!(decoded[0].info, PlInfo::new(0, 1).unwrap());
        assert!(decoded[0].info.first_in_field());
        assert_eq!(decoded[5].info, PlInfo::new(5, 1).unwrap());
        assert_eq!(decoded[11].info, PlInfo::new(11, 1).unwrap());
    }

    #[test]
    fn test_reset_matches_fresh_stage() {
        let batch = fake_batch(&InterleaveMap::new());
        let mut stage = fake_stage(9);
        for _ in 0 .. 3 {
            stage
                .process(&batch, &tags_from(stage.position(), NCODERS))
                .unwrap();
        }
        stage.reset();
        assert_eq!(stage.position(), 0);
        let after_reset = stage.process(&batch, &tags_from(0, NCODERS)).unwrap();
        let mut fresh = fake_stage(9);
        let from_fresh = fresh.process(&batch, &tags_from(0, NCODERS)).unwrap();
        assert_eq!(after_reset, from_fresh);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn test_end_to_end_with_viterbi_noiseless() {
        // Two batches of known bytes through the reference transmitter; the second output
        // batch must reproduce the first batch's payload exactly.
        let mut encoder = SegmentEncoder::new();
        let payload_a: Vec<u8> = (0 .. NCODERS * RS_ENCODED_LENGTH)
            .map(|i| ((i * 7 + 3) % 256) as u8)
            .collect();
        let payload_b: Vec<u8> = (0 .. NCODERS * RS_ENCODED_LENGTH)
            .map(|i| ((i * 13 + 101) % 256) as u8)
            .collect();
        let segments_a = encoder.encode(&payload_a).unwrap();
        let segments_b = encoder.encode(&payload_b).unwrap();

        let mut stage = TrellisDecoder::new();
        let first = stage.process(&segments_a, &tags_from(0, NCODERS)).unwrap();
        assert_eq!(first.len(), NCODERS);
        let second = stage
            .process(&segments_b, &tags_from(NCODERS as u64, NCODERS))
            .unwrap();
        let recovered: Vec<u8> = second.iter().flat_map(|s| s.bytes).collect();
        assert_eq!(recovered, payload_a);
        // Noiseless channel: every decoder's winning metric is zero.
        for metric in stage.decoder_metrics() {
            assert_float_eq!(metric, 0.0, abs <= 1e-4);
        }
    }

    #[test]
    fn test_fifo_capacity_matches_decoder_delay() {
        let stage = fake_stage(100);
        for lane in &stage.lanes {
            assert_eq!(
                lane.fifo.capacity(),
                SEGMENT_LENGTH - SEGMENT_SYNC_LENGTH - lane.viterbi.delay()
            );
        }
    }
}
