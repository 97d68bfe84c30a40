//! Depth to disparity
//!
//! `disparity = baseline * focal_length / depth`, treating the depth sensor as
//! if it were a stereo pair. Invalid pixels get `params.invalid_marker`.

use super::intensity::saturate_u8;
use crate::config::ConversionParams;
use crate::types::{DepthFrame, Frame};

/// Disparity of one sample
///
/// Depth 0 is not the sentinel and divides to +inf.
#[inline]
pub fn disparity_value(depth: u16, params: &ConversionParams) -> f32 {
    if depth == params.invalid_depth {
        params.invalid_marker
    } else {
        (params.disparity_numerator() / depth as f64) as f32
    }
}

/// Disparity as 32-bit float
pub fn disparity32f(depth: &DepthFrame, params: &ConversionParams) -> Frame<f32> {
    let data = depth
        .data
        .iter()
        .map(|&d| disparity_value(d, params))
        .collect();
    depth.derive(data)
}

/// Disparity rounded (half to even) and saturated to 8 bits
///
/// The invalid marker is far above 255, so invalid pixels come out as 255.
pub fn disparity8(depth: &DepthFrame, params: &ConversionParams) -> Frame<u8> {
    let data = depth
        .data
        .iter()
        .map(|&d| saturate_u8(disparity_value(d, params)))
        .collect();
    depth.derive(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> DepthFrame {
        DepthFrame::from_rows(&[vec![2047, 100], vec![600, 2047]]).unwrap()
    }

    #[test]
    fn test_disparity32f_grid() {
        let out = disparity32f(&grid(), &ConversionParams::default());
        assert_eq!(
            out.to_rows(),
            vec![vec![100_000.0, 431.25], vec![71.875, 100_000.0]]
        );
    }

    #[test]
    fn test_disparity8_grid() {
        let out = disparity8(&grid(), &ConversionParams::default());
        assert_eq!(out.to_rows(), vec![vec![255, 255], vec![72, 255]]);
    }

    #[test]
    fn test_disparity_formula() {
        let params = ConversionParams::default();
        for d in [1u16, 169, 170, 500, 2046, 2048, 10_000, u16::MAX] {
            let expected = (43_125.0f64 / d as f64) as f32;
            assert_eq!(disparity_value(d, &params), expected, "depth {}", d);
        }
    }

    #[test]
    fn test_disparity8_rounding() {
        let depth = DepthFrame::from_rows(&[vec![170, 171, 1000, 40_000]]).unwrap();
        let out = disparity8(&depth, &ConversionParams::default());
        // 253.68, 252.19, 43.125, 1.078
        assert_eq!(out.data, vec![254, 252, 43, 1]);
    }

    #[test]
    fn test_disparity8_ties_round_to_even() {
        let depth = DepthFrame::from_rows(&[vec![690, 750, 1150, 3450, 17250]]).unwrap();
        let out = disparity8(&depth, &ConversionParams::default());
        // 62.5, 57.5, 37.5, 12.5, 2.5
        assert_eq!(out.data, vec![62, 58, 38, 12, 2]);
    }

    #[test]
    fn test_zero_depth_is_infinite() {
        let params = ConversionParams::default();
        assert_eq!(disparity_value(0, &params), f32::INFINITY);
    }

    #[test]
    fn test_custom_stereo_constants() {
        let params = ConversionParams::default().with_stereo(10.0, 100.0);
        assert_eq!(disparity_value(500, &params), 2.0);
    }
}
