//! Per-segment frame-position metadata ("pipeline info")

use serde::{Deserialize, Serialize};

use crate::{Error, SEGMENTS_PER_FIELD};

/// Frame-position tag attached to every data segment.
///
/// The upstream synchronizer attaches exactly one tag to every segment position it emits; the
/// decoding stage reattaches each tag to its output segment with the position counters advanced
/// by the stage's fixed twelve-segment pipeline latency.
#[derive(Clone, Eq, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct PlInfo {
    /// Segment index within the field, in `[0, 312)`
    segno: u16,
    /// Field index, `0` or `1`
    field: u8,
}

impl PlInfo {
    /// Returns a tag for the given segment index within the given field.
    ///
    /// # Errors
    ///
    /// Returns an error if `segno` is not in `[0, 312)` or `field` is not `0` or `1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsb_trellis::PlInfo;
    ///
    /// let info = PlInfo::new(17, 1)?;
    /// assert_eq!(info.segno(), 17);
    /// assert_eq!(info.field(), 1);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(segno: u16, field: u8) -> Result<Self, Error> {
        if segno >= SEGMENTS_PER_FIELD {
            return Err(Error::InvalidInput(format!(
                "Segment index must be in [0, {SEGMENTS_PER_FIELD}), found {segno}"
            )));
        }
        if field > 1 {
            return Err(Error::InvalidInput(format!(
                "Field index must be 0 or 1, found {field}"
            )));
        }
        Ok(Self { segno, field })
    }

    /// Returns the segment index within the field.
    #[must_use]
    pub fn segno(self) -> u16 {
        self.segno
    }

    /// Returns the field index (`0` or `1`).
    #[must_use]
    pub fn field(self) -> u8 {
        self.field
    }

    /// Returns `true` for the segment that immediately follows a field sync.
    #[must_use]
    pub fn first_in_field(self) -> bool {
        self.segno == 0
    }

    /// Returns the tag with its position counters advanced by `nsegs` segments, wrapping the
    /// segment index at the field boundary and toggling the field index on each wrap.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsb_trellis::PlInfo;
    ///
    /// let info = PlInfo::new(305, 0)?;
    /// let delayed = info.delayed(12);
    /// assert_eq!(delayed.segno(), 5);
    /// assert_eq!(delayed.field(), 1);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn delayed(self, nsegs: u16) -> Self {
        let total = self.segno + nsegs;
        let field = if (total / SEGMENTS_PER_FIELD) % 2 == 1 {
            1 - self.field
        } else {
            self.field
        };
        Self {
            segno: total % SEGMENTS_PER_FIELD,
            field,
        }
    }
}
