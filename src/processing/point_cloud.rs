//! Depth to XYZ point map
//!
//! Inverse pinhole projection, approximating the projective-to-real-world
//! transform of the sensor SDK:
//!
//! ```text
//! X = (x - cx) * d * unit / fx
//! Y = (y - cy) * d * unit / fy
//! Z = d * unit
//! ```
//!
//! Math runs in f64 and is stored as f32. Invalid pixels become
//! `(invalid_marker, invalid_marker, invalid_marker)`.

use crate::config::ConversionParams;
use crate::error::Result;
use crate::types::{CameraInfo, DepthFrame, Frame, Point3};

/// Reproject a depth frame into meters
///
/// Fails if the intrinsics are invalid or were made for a different
/// resolution than the frame.
pub fn point_cloud(
    depth: &DepthFrame,
    camera: &CameraInfo,
    params: &ConversionParams,
) -> Result<Frame<Point3>> {
    camera.validate()?;
    camera.check_matches(depth.resolution())?;

    let unit = params.depth_unit_m;
    let fx_d = unit / camera.fx;
    let fy_d = unit / camera.fy;
    let invalid = Point3::splat(params.invalid_marker);

    let mut data = Vec::with_capacity(depth.len());
    for (y, row) in depth.rows().enumerate() {
        let dy = y as f64 - camera.cy;
        for (x, &d) in row.iter().enumerate() {
            if d == params.invalid_depth {
                data.push(invalid);
                continue;
            }
            let d = d as f64;
            data.push(Point3::new(
                ((x as f64 - camera.cx) * d * fx_d) as f32,
                (dy * d * fy_d) as f32,
                (d * unit) as f32,
            ));
        }
    }

    Ok(depth.derive(data))
}
