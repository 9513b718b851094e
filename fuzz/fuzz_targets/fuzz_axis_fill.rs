//! Fuzz target: `AxisArray::fill_from`
//!
//! Drives the staging buffer with arbitrary float slices (including
//! NaN and infinity bit patterns) and verifies:
//! - No panics under any input
//! - Oversized fills are rejected and leave the previous contents
//! - Accepted fills report exactly the offered length
//! - Reads past the capacity always come back `None`
//!
//! cargo fuzz run fuzz_axis_fill

#![no_main]

use libfuzzer_sys::fuzz_target;
use uroslink::msg::{AxisArray, AXES_CAPACITY};

fuzz_target!(|data: &[u8]| {
    let mut buf = AxisArray::new();

    // Interpret the input as a sequence of fills: one length byte, then
    // that many little-endian f32 words.
    let mut rest = data;
    while let Some((&len_byte, tail)) = rest.split_first() {
        let want = usize::from(len_byte % 16);
        if tail.len() < want * 4 {
            break;
        }
        let (raw, tail) = tail.split_at(want * 4);
        let axes: Vec<f32> = raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let len_before = buf.len();
        match buf.fill_from(&axes) {
            Ok(()) => {
                assert!(axes.len() <= AXES_CAPACITY);
                assert_eq!(buf.len(), axes.len());
            }
            Err(_) => {
                assert!(axes.len() > AXES_CAPACITY);
                assert_eq!(buf.len(), len_before, "rejected fill must not clobber");
            }
        }
        assert!(buf.get(AXES_CAPACITY).is_none());
        rest = tail;
    }
});
