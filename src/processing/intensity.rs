//! Single-channel conversions: passthrough, normalized intensity, valid mask

use crate::config::ConversionParams;
use crate::types::{DepthFrame, Frame};

/// Copy the depth frame unchanged
pub fn passthrough(depth: &DepthFrame) -> Frame<u16> {
    depth.clone()
}

/// Rescale depth into 8 bits: `round(d * normalize_scale)`, saturated
///
/// The invalid depth is not special-cased; 2047 maps to 255 like any other
/// value near the top of the 11-bit range.
pub fn normalized(depth: &DepthFrame, params: &ConversionParams) -> Frame<u8> {
    let scale = params.normalize_scale;
    let data = depth
        .data
        .iter()
        .map(|&d| saturate_u8(d as f32 * scale))
        .collect();
    depth.derive(data)
}

/// True where the sensor reported a measurement
pub fn valid_mask(depth: &DepthFrame, params: &ConversionParams) -> Frame<bool> {
    let invalid = params.invalid_depth;
    depth.derive(depth.data.iter().map(|&d| d != invalid).collect())
}

/// Round half to even and clamp into 0..=255
#[inline]
pub(crate) fn saturate_u8(v: f32) -> u8 {
    // float -> int `as` casts saturate, NaN becomes 0
    v.round_ties_even() as u8
}
