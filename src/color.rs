//! Coarser color quantization applied before palette generation
//!
//! Flooring every channel to a multiple of [`COLOR_STEP`] cuts the number of
//! distinct colors, so the per-frame palettes fit the frame better and the
//! LZW stream gets longer runs.

use imgref::ImgVec;
use rgb::{ComponentMap, RGB8};

/// Channel values are floored to a multiple of this
pub const COLOR_STEP: u8 = 8;

/// Values in `0..COLOR_STEP` become 0. Never rounds up.
#[inline]
pub fn reduce_channel(v: u8) -> u8 {
    v / COLOR_STEP * COLOR_STEP
}

#[inline]
pub fn reduce_pixel(px: RGB8) -> RGB8 {
    px.map(reduce_channel)
}

/// Returns the frame with every channel floored to [`COLOR_STEP`].
///
/// The input buffer is reused; the caller gives up the original frame.
pub fn reduce(mut image: ImgVec<RGB8>) -> ImgVec<RGB8> {
    for row in image.rows_mut() {
        for px in row.iter_mut() {
            *px = reduce_pixel(*px);
        }
    }
    image
}
