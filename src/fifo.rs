//! Delay-compensation fifo for decoded dibits

/// Fixed-capacity circular buffer that realigns the output timing of one trellis decoder.
///
/// Each of the twelve decoders emits its decision for a symbol `D` steps in the past, where `D`
/// is that decoder's fixed decision latency. Buffering exactly `832 - 4 - D` dibits between the
/// decoder and the dibit packer makes every coder's output land on the same logical segment
/// boundary, and gives the whole decoding stage a pipeline latency of exactly twelve segments
/// regardless of `D`. The capacity is fixed at construction and never changes; getting it wrong
/// corrupts bit alignment in the reassembled output without any detectable error.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DelayFifo {
    /// Buffered dibits, reused circularly
    buf: Vec<u8>,
    /// Index of the oldest buffered dibit (the next one to pop)
    pos: usize,
}

impl DelayFifo {
    /// Returns a fifo of the given capacity, filled with the initial dibit value `0`.
    ///
    /// A capacity of `0` is allowed; such a fifo passes every dibit straight through.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            pos: 0,
        }
    }

    /// Pushes a dibit into the fifo and pops the oldest buffered dibit.
    ///
    /// The first `capacity` calls after construction (or after [`reset`](Self::reset)) return
    /// the initial fill value `0`; from then on, call `i + capacity` returns the dibit pushed
    /// by call `i`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsb_trellis::DelayFifo;
    ///
    /// let mut fifo = DelayFifo::new(2);
    /// assert_eq!(fifo.stuff(1), 0);
    /// assert_eq!(fifo.stuff(2), 0);
    /// assert_eq!(fifo.stuff(3), 1);
    /// assert_eq!(fifo.stuff(0), 2);
    /// ```
    pub fn stuff(&mut self, dibit: u8) -> u8 {
        if self.buf.is_empty() {
            return dibit;
        }
        let popped = std::mem::replace(&mut self.buf[self.pos], dibit);
        self.pos += 1;
        if self.pos == self.buf.len() {
            self.pos = 0;
        }
        popped
    }

    /// Restores the initial state: every slot holds the initial dibit value `0`.
    pub fn reset(&mut self) {
        self.buf.fill(0);
        self.pos = 0;
    }

    /// Returns the fixed capacity of the fifo.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}
