//! Per-frame depth conversion handler
//!
//! Binds the shared mode selector, the sensor constants and an intrinsics
//! provider to the conversion engine. The scheduler calls [`DepthConverter::process`]
//! once for every new depth frame.

use crate::capture::IntrinsicsProvider;
use crate::config::{ConversionParams, DepthConfig};
use crate::error::{Error, Result};
use crate::processing::{self, DepthMode, ModeSelector};
use crate::types::{DepthFrame, OutputFrame};

/// Depth conversion handler
#[derive(Debug, Clone)]
pub struct DepthConverter {
    selector: ModeSelector,
    params: ConversionParams,
}

impl DepthConverter {
    /// Create a converter from configuration
    pub fn new(config: &DepthConfig) -> Self {
        Self {
            selector: ModeSelector::new(config.mode),
            params: config.params,
        }
    }

    /// Create a converter with default Kinect constants
    pub fn with_mode(mode: DepthMode) -> Self {
        Self {
            selector: ModeSelector::new(mode),
            params: ConversionParams::default(),
        }
    }

    /// Replace the sensor constants
    pub fn with_params(mut self, params: ConversionParams) -> Self {
        self.params = params;
        self
    }

    /// Share an existing selector
    pub fn with_selector(mut self, selector: ModeSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Handle for changing the mode from elsewhere
    pub fn selector(&self) -> ModeSelector {
        self.selector.clone()
    }

    pub fn mode(&self) -> DepthMode {
        self.selector.get()
    }

    pub fn set_mode(&self, mode: DepthMode) {
        self.selector.set(mode);
    }

    pub fn params(&self) -> &ConversionParams {
        &self.params
    }

    /// Convert one depth frame with the current mode
    ///
    /// Intrinsics are requested from `intrinsics` only when the mode needs
    /// them.
    pub fn process(
        &self,
        depth: &DepthFrame,
        intrinsics: &dyn IntrinsicsProvider,
    ) -> Result<OutputFrame> {
        let mode = self.selector.get();
        self.process_with_mode(depth, mode, intrinsics)
    }

    /// Convert one depth frame with an explicit mode
    pub fn process_with_mode(
        &self,
        depth: &DepthFrame,
        mode: DepthMode,
        intrinsics: &dyn IntrinsicsProvider,
    ) -> Result<OutputFrame> {
        let camera = if mode.requires_intrinsics() {
            intrinsics.camera_info()
        } else {
            None
        };

        match processing::convert(depth, mode, camera.as_ref(), &self.params) {
            Ok(output) => {
                tracing::debug!(
                    "Converted frame {} ({}) as {}",
                    depth.sequence,
                    depth.resolution(),
                    mode
                );
                Ok(output)
            }
            Err(Error::MissingIntrinsics) => {
                tracing::error!(
                    "Point cloud conversion of frame {} requires camera info",
                    depth.sequence
                );
                Err(Error::MissingIntrinsics)
            }
            Err(e) => {
                tracing::error!("Conversion of frame {} failed: {}", depth.sequence, e);
                Err(e)
            }
        }
    }
}

impl Default for DepthConverter {
    fn default() -> Self {
        Self::with_mode(DepthMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NoIntrinsics;
    use crate::types::CameraInfo;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<u32>,
        camera: Option<CameraInfo>,
    }

    impl IntrinsicsProvider for CountingProvider {
        fn camera_info(&self) -> Option<CameraInfo> {
            self.calls.set(self.calls.get() + 1);
            self.camera
        }
    }

    fn depth() -> DepthFrame {
        DepthFrame::from_rows(&[vec![2047, 100], vec![600, 2047]]).unwrap()
    }

    #[test]
    fn test_intrinsics_fetched_only_for_point_cloud() {
        let provider = CountingProvider {
            calls: Cell::new(0),
            camera: Some(CameraInfo::new(2, 2, 525.0, 525.0, 0.5, 0.5)),
        };
        let converter = DepthConverter::with_mode(DepthMode::Rainbow);
        converter.process(&depth(), &provider).unwrap();
        assert_eq!(provider.calls.get(), 0);

        converter.set_mode(DepthMode::PointCloud);
        converter.process(&depth(), &provider).unwrap();
        assert_eq!(provider.calls.get(), 1);
    }

    #[test]
    fn test_missing_intrinsics_reported() {
        let converter = DepthConverter::with_mode(DepthMode::PointCloud);
        let err = converter.process(&depth(), &NoIntrinsics).unwrap_err();
        assert!(matches!(err, Error::MissingIntrinsics));
    }

    #[test]
    fn test_mode_change_through_selector() {
        let converter = DepthConverter::default();
        let selector = converter.selector();
        selector.set(DepthMode::ValidMask);
        let out = converter.process(&depth(), &NoIntrinsics).unwrap();
        assert_eq!(
            out,
            OutputFrame::Mask(
                crate::types::Frame::from_rows(&[vec![false, true], vec![true, false]]).unwrap()
            )
        );
    }
}
