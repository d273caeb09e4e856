//! Single-coder Viterbi decoder for the 8-VSB rate-2/3 trellis code

use crate::SYMBOL_LEVELS;

const INF: f32 = 1e30;

/// Number of trellis states: one precoder bit and two coder delay bits
const NUM_STATES: usize = 8;

/// Traceback window length in symbols
const TB_LEN: usize = 32;

/// Interface of one maximum-likelihood sequence decoder with a fixed decision latency.
///
/// The decoding stage treats each of its twelve decoders as a black box behind this trait; any
/// algorithm honoring the contract is substitutable, which also allows testing the realignment
/// logic against a trivial decoder with a small, configurable latency.
pub trait SequenceDecoder {
    /// Consumes one channel sample and returns one decoded dibit in `0..=3`. The value returned
    /// by the `n`-th call is the decision for the sample given to call `n - delay()`; the first
    /// `delay()` return values are indeterminate warm-up output.
    fn decode(&mut self, sample: f32) -> u8;

    /// Returns the fixed decision latency in symbols.
    fn delay(&self) -> usize;

    /// Returns the best surviving path metric, for health monitoring only.
    fn best_metric(&self) -> f32;

    /// Clears all internal state.
    fn reset(&mut self);
}

/// Viterbi decoder for one of the twelve interleaved trellis coders.
///
/// The transmitted code is the A/53 rate-2/3 trellis code: the upper input bit passes through a
/// one-symbol differential precoder, the lower input bit through a feedback coder with two delay
/// elements, and the three output bits select one of the eight nominal symbol levels. The
/// decoder runs the Viterbi algorithm over the eight combined states with squared Euclidean
/// branch metrics, renormalizing the path metrics every step, and commits the decision that
/// falls off a 32-symbol traceback window, so [`delay`](SequenceDecoder::delay) is 31 symbols.
#[derive(Clone, Debug, Copy)]
pub struct SingleViterbi {
    /// Next state for each (state, input dibit)
    next_state: [[u8; 4]; NUM_STATES],
    /// Nominal transmitted level for each (state, input dibit)
    level: [[f32; 4]; NUM_STATES],
    /// Accumulated path metrics, renormalized every step
    path_metrics: [f32; NUM_STATES],
    /// Survivor decisions for the last `TB_LEN` steps, packed as `prev_state << 2 | dibit`
    traceback: [[u8; NUM_STATES]; TB_LEN],
    /// Next write index into the traceback window
    tb_pos: usize,
    /// Winning metric increment of the latest step
    best_metric: f32,
}

impl SingleViterbi {
    /// Returns a decoder in its initial state (all-zero coder state assumed).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        let mut next_state = [[0u8; 4]; NUM_STATES];
        let mut level = [[0f32; 4]; NUM_STATES];
        for (state, (next_row, level_row)) in
            next_state.iter_mut().zip(level.iter_mut()).enumerate()
        {
            let y2_last = (state >> 2) & 1;
            let s1 = (state >> 1) & 1;
            let s0 = state & 1;
            for dibit in 0 .. 4 {
                let x2 = (dibit >> 1) & 1;
                let x1 = dibit & 1;
                // Differential precoder on the upper bit; the lower bit drives the feedback
                // coder whose second delay element is emitted as Z0.
                let y2 = x2 ^ y2_last;
                let z0 = s0;
                next_row[dibit] = ((y2 << 2) | ((x1 ^ s0) << 1) | s1) as u8;
                level_row[dibit] = SYMBOL_LEVELS[(y2 << 2) | (x1 << 1) | z0];
            }
        }
        let mut path_metrics = [INF; NUM_STATES];
        path_metrics[0] = 0.0;
        Self {
            next_state,
            level,
            path_metrics,
            traceback: [[0; NUM_STATES]; TB_LEN],
            tb_pos: 0,
            best_metric: 0.0,
        }
    }
}

impl Default for SingleViterbi {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceDecoder for SingleViterbi {
    #[allow(clippy::cast_possible_truncation)]
    fn decode(&mut self, sample: f32) -> u8 {
        // Add-compare-select over all branches into each next state.
        let mut new_metrics = [INF; NUM_STATES];
        let mut decisions = [0u8; NUM_STATES];
        for state in 0 .. NUM_STATES {
            for dibit in 0 .. 4 {
                let next = usize::from(self.next_state[state][dibit]);
                let diff = sample - self.level[state][dibit];
                let metric = self.path_metrics[state] + diff * diff;
                if metric < new_metrics[next] {
                    new_metrics[next] = metric;
                    decisions[next] = ((state << 2) | dibit) as u8;
                }
            }
        }
        let min_metric = new_metrics.iter().copied().fold(INF, f32::min);
        self.best_metric = min_metric;
        for metric in &mut new_metrics {
            *metric -= min_metric;
        }
        self.path_metrics = new_metrics;
        self.traceback[self.tb_pos] = decisions;
        self.tb_pos = (self.tb_pos + 1) % TB_LEN;
        // Trace the survivor path back through the whole window from the best end state; the
        // decision that falls off the far end is final.
        let mut state = 0;
        let mut best = self.path_metrics[0];
        for (s, &metric) in self.path_metrics.iter().enumerate().skip(1) {
            if metric < best {
                best = metric;
                state = s;
            }
        }
        let mut dibit = 0;
        for step in 1 ..= TB_LEN {
            let entry = self.traceback[(self.tb_pos + TB_LEN - step) % TB_LEN][state];
            dibit = entry & 0x3;
            state = usize::from(entry >> 2);
        }
        dibit
    }

    fn delay(&self) -> usize {
        TB_LEN - 1
    }

    fn best_metric(&self) -> f32 {
        self.best_metric
    }

    fn reset(&mut self) {
        self.path_metrics = [INF; NUM_STATES];
        self.path_metrics[0] = 0.0;
        self.traceback = [[0; NUM_STATES]; TB_LEN];
        self.tb_pos = 0;
        self.best_metric = 0.0;
    }
}
