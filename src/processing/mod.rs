//! Depth conversion engine
//!
//! Turns a raw depth frame into one of:
//! - Normalized 8-bit intensity
//! - 8-bit or 32-bit float disparity
//! - XYZ point map (needs camera intrinsics)
//! - Validity mask
//! - Rainbow false-color image
//!
//! Every algorithm is a single row-major pass over the frame and special-cases
//! the sensor's invalid depth value.

mod disparity;
mod intensity;
mod mode;
mod point_cloud;
mod rainbow;

pub use disparity::{disparity32f, disparity8, disparity_value};
pub use intensity::{normalized, passthrough, valid_mask};
pub use mode::{DepthMode, ModeSelector};
pub use point_cloud::point_cloud;
pub use rainbow::{rainbow, rainbow_color, Ramp, RAINBOW_BANDS};

use crate::config::ConversionParams;
use crate::error::{Error, Result};
use crate::types::{CameraInfo, DepthFrame, OutputFrame};

/// Convert a depth frame according to `mode`
///
/// `camera` is only read in [`DepthMode::PointCloud`], where it is required.
/// A frame whose sample count disagrees with its size is rejected with
/// [`Error::FrameSize`] in every mode.
pub fn convert(
    depth: &DepthFrame,
    mode: DepthMode,
    camera: Option<&CameraInfo>,
    params: &ConversionParams,
) -> Result<OutputFrame> {
    depth.check_size()?;
    let output = match mode {
        DepthMode::Passthrough => OutputFrame::Depth(passthrough(depth)),
        DepthMode::Normalized => OutputFrame::Intensity(normalized(depth, params)),
        DepthMode::Disparity8 => OutputFrame::Intensity(disparity8(depth, params)),
        DepthMode::Disparity32f => OutputFrame::Disparity(disparity32f(depth, params)),
        DepthMode::PointCloud => {
            let camera = camera.ok_or(Error::MissingIntrinsics)?;
            OutputFrame::Points(point_cloud(depth, camera, params)?)
        }
        DepthMode::ValidMask => OutputFrame::Mask(valid_mask(depth, params)),
        DepthMode::Rainbow => OutputFrame::Color(rainbow(depth, params)),
    };
    Ok(output)
}
