//! Depth frame sources
//!
//! Provides depth frames via:
//! - A generated test pattern (no hardware needed)
//! - Raw depth dumps (back-to-back little-endian u16 frames)
//!
//! Real sensor drivers live outside this crate and plug in through
//! [`DepthSource`] and [`IntrinsicsProvider`].

mod raw_file;
mod synthetic;

pub use raw_file::{encode_raw, RawFileSource};
pub use synthetic::{test_pattern, SyntheticSource};

use crate::config::{SourceBackend, SourceConfig};
use crate::error::Result;
use crate::types::{CameraInfo, Resolution, SensorFrame};

/// Tilt motor range in degrees, either direction
pub const MAX_TILT_DEGREES: i32 = 27;

/// Anything that can hand out camera intrinsics on request
pub trait IntrinsicsProvider {
    /// Current calibration, if one is available
    fn camera_info(&self) -> Option<CameraInfo>;
}

impl IntrinsicsProvider for CameraInfo {
    fn camera_info(&self) -> Option<CameraInfo> {
        Some(*self)
    }
}

impl IntrinsicsProvider for Option<CameraInfo> {
    fn camera_info(&self) -> Option<CameraInfo> {
        *self
    }
}

/// Provider that never has intrinsics
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIntrinsics;

impl IntrinsicsProvider for NoIntrinsics {
    fn camera_info(&self) -> Option<CameraInfo> {
        None
    }
}

/// Trait for depth sources
#[async_trait::async_trait]
pub trait DepthSource: Send {
    /// Start producing frames
    async fn start(&mut self) -> Result<()>;

    /// Stop producing frames
    async fn stop(&mut self) -> Result<()>;

    /// Get next frame
    async fn next_frame(&mut self) -> Result<SensorFrame>;

    /// Check if the source is active
    fn is_active(&self) -> bool;

    /// Depth frame resolution
    fn resolution(&self) -> Resolution;

    /// Calibration of the depth camera, if known
    fn camera_info(&self) -> Option<CameraInfo>;

    /// Current tilt angle in degrees
    fn tilt(&self) -> i32;

    /// Set the tilt angle, returning the angle actually applied
    fn set_tilt(&mut self, degrees: i32) -> Result<i32>;
}

/// Create a depth source based on configuration
pub fn create_source(config: SourceConfig) -> Result<Box<dyn DepthSource>> {
    match config.backend.clone() {
        SourceBackend::Synthetic => Ok(Box::new(SyntheticSource::new(config))),
        SourceBackend::RawFile { path } => Ok(Box::new(RawFileSource::new(path, config))),
    }
}

/// Clamp a tilt request into the motor range
pub(crate) fn clamp_tilt(degrees: i32) -> i32 {
    let clamped = degrees.clamp(-MAX_TILT_DEGREES, MAX_TILT_DEGREES);
    if clamped != degrees {
        tracing::warn!(
            "Tilt {} degrees out of range, clamped to {}",
            degrees,
            clamped
        );
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_tilt() {
        assert_eq!(clamp_tilt(10), 10);
        assert_eq!(clamp_tilt(45), 27);
        assert_eq!(clamp_tilt(27), 27);
        assert_eq!(clamp_tilt(28), 27);
        assert_eq!(clamp_tilt(-90), -27);
    }

    #[test]
    fn test_option_provider() {
        let some: Option<CameraInfo> = Some(CameraInfo::kinect_default());
        assert_eq!(some.camera_info(), Some(CameraInfo::kinect_default()));
        assert_eq!(NoIntrinsics.camera_info(), None);
    }

    #[test]
    fn test_create_source_backends() {
        let source = create_source(SourceConfig::synthetic().with_resolution(32, 24)).unwrap();
        assert_eq!(source.resolution(), Resolution::new(32, 24));
        assert!(!source.is_active());

        let source = create_source(SourceConfig::raw_file("/nonexistent.raw")).unwrap();
        assert_eq!(source.resolution(), Resolution::VGA);
    }
}
