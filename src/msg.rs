//! Inbound message payload buffer.
//!
//! The subscription endpoint owns one [`AxisArray`] — a latest-value slot
//! for the variable-length float array carried by each `Joy` sample.
//! Capacity is fixed at compile time; an oversized sample is rejected
//! whole so the slot never holds a torn payload.

use core::fmt;

/// Maximum axes per sample (matches the wire-side receive buffer).
pub const AXES_CAPACITY: usize = 10;

/// A sample whose length exceeds [`AXES_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOverflow {
    pub len: usize,
}

impl fmt::Display for AxisOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sample with {} axes exceeds capacity {}", self.len, AXES_CAPACITY)
    }
}

/// Fixed-capacity axis buffer with whole-sample replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisArray {
    axes: heapless::Vec<f32, AXES_CAPACITY>,
}

impl AxisArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of axes in the current sample.
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Compile-time capacity (always [`AXES_CAPACITY`]).
    pub const fn capacity(&self) -> usize {
        AXES_CAPACITY
    }

    /// Drop the current sample.
    pub fn clear(&mut self) {
        self.axes.clear();
    }

    /// Replace the buffered sample with `sample`.
    ///
    /// Oversized samples are rejected without touching the buffer — the
    /// previous sample stays intact and no partial write occurs.
    pub fn fill_from(&mut self, sample: &[f32]) -> Result<(), AxisOverflow> {
        if sample.len() > AXES_CAPACITY {
            return Err(AxisOverflow { len: sample.len() });
        }
        self.axes.clear();
        // Length is checked above, extend cannot fail.
        let _ = self.axes.extend_from_slice(sample);
        Ok(())
    }

    /// Bounds-checked element access.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.axes.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        self.axes.as_slice()
    }
}
