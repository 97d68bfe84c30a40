//! Six-band false-color depth map
//!
//! The high bits of the depth (`depth >> 8`) pick a band, the low byte
//! (`depth & 0xff`) is the position inside it. Walking up through the bands
//! goes white -> blue -> cyan -> green -> yellow -> red -> black. Very near
//! depths, the invalid depth and anything past band 5 are black.

use crate::config::ConversionParams;
use crate::types::{DepthFrame, Frame};

/// How one channel behaves across a band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    /// Always 0
    Off,
    /// Always 255
    Full,
    /// Equal to the low byte
    Up,
    /// 255 minus the low byte
    Down,
}

impl Ramp {
    #[inline]
    pub fn level(self, lb: u8) -> u8 {
        match self {
            Ramp::Off => 0,
            Ramp::Full => 255,
            Ramp::Up => lb,
            Ramp::Down => 255 - lb,
        }
    }
}

/// Channel ramps per band, in R, G, B order
pub const RAINBOW_BANDS: [[Ramp; 3]; 6] = [
    [Ramp::Down, Ramp::Down, Ramp::Full], // white to blue
    [Ramp::Off, Ramp::Up, Ramp::Full],    // blue to cyan
    [Ramp::Off, Ramp::Full, Ramp::Down],  // cyan to green
    [Ramp::Up, Ramp::Full, Ramp::Off],    // green to yellow
    [Ramp::Full, Ramp::Down, Ramp::Off],  // yellow to red
    [Ramp::Down, Ramp::Off, Ramp::Off],   // red to black
];

pub const BLACK: [u8; 3] = [0, 0, 0];

/// Color of one depth sample, RGB
#[inline]
pub fn rainbow_color(depth: u16, params: &ConversionParams) -> [u8; 3] {
    if depth <= params.rainbow_min_depth || depth == params.invalid_depth {
        return BLACK;
    }
    let band = (depth >> 8) as usize;
    let lb = (depth & 0xff) as u8;
    match RAINBOW_BANDS.get(band) {
        Some([r, g, b]) => [r.level(lb), g.level(lb), b.level(lb)],
        None => BLACK,
    }
}

/// Rainbow map of a whole frame
pub fn rainbow(depth: &DepthFrame, params: &ConversionParams) -> Frame<[u8; 3]> {
    let data = depth
        .data
        .iter()
        .map(|&d| rainbow_color(d, params))
        .collect();
    depth.derive(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(d: u16) -> [u8; 3] {
        rainbow_color(d, &ConversionParams::default())
    }

    #[test]
    fn test_near_and_invalid_are_black() {
        for d in [0, 1, 25, 50, 2047] {
            assert_eq!(color(d), BLACK, "depth {}", d);
        }
        // first non-black sample, band 0 with lb = 51
        assert_eq!(color(51), [204, 204, 255]);
    }

    #[test]
    fn test_band_boundaries() {
        // band 0 at lb = 0 is hidden by the near cutoff
        assert_eq!(color(256), [0, 0, 255]);
        assert_eq!(color(512), [0, 255, 255]);
        assert_eq!(color(768), [0, 255, 0]);
        assert_eq!(color(1024), [255, 255, 0]);
        assert_eq!(color(1280), [255, 0, 0]);
    }

    #[test]
    fn test_band_zero_table_at_lb_zero() {
        // with the cutoff lowered band 0 starts at white
        let params = ConversionParams {
            rainbow_min_depth: 0,
            ..Default::default()
        };
        assert_eq!(rainbow_color(1, &params), [254, 254, 255]);
        let [r, g, b] = RAINBOW_BANDS[0];
        assert_eq!([r.level(0), g.level(0), b.level(0)], [255, 255, 255]);
    }

    #[test]
    fn test_band_ends() {
        assert_eq!(color(255), [0, 0, 255]);
        assert_eq!(color(511), [0, 255, 255]);
        assert_eq!(color(767), [0, 255, 0]);
        assert_eq!(color(1023), [255, 255, 0]);
        assert_eq!(color(1279), [255, 0, 0]);
        assert_eq!(color(1535), [0, 0, 0]);
    }

    #[test]
    fn test_far_is_black() {
        for d in [1536, 1800, 2046, 2048, 4000, u16::MAX] {
            assert_eq!(color(d), BLACK, "depth {}", d);
        }
    }

    #[test]
    fn test_mid_band_interpolation() {
        // band 3, lb = 128
        assert_eq!(color(768 + 128), [128, 255, 0]);
        // band 4, lb = 64
        assert_eq!(color(1024 + 64), [255, 191, 0]);
    }

    #[test]
    fn test_frame_shape() {
        let depth = DepthFrame::from_rows(&[vec![2047, 300, 10], vec![900, 1100, 5000]]).unwrap();
        let out = rainbow(&depth, &ConversionParams::default());
        assert_eq!(out.resolution(), depth.resolution());
        assert_eq!(out.data[0], BLACK);
        assert_eq!(out.data[1], [0, 44, 255]);
        assert_eq!(out.data[2], BLACK);
        assert_eq!(out.data[5], BLACK);
    }
}
