//! Configuration types for depthconv

use crate::error::{Error, Result};
use crate::output::Output;
use crate::processing::DepthMode;
use crate::types::{CameraInfo, Framerate, Resolution};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sensor constants used by the conversion algorithms
///
/// Defaults describe a Kinect v1: the sensor reports 2047 for pixels where it
/// saw no IR reflection, and baseline/focal length are the stereo-analogy
/// values used for disparity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParams {
    /// Depth value meaning "no measurement"
    pub invalid_depth: u16,
    /// Written for invalid pixels in disparity and point cloud output
    pub invalid_marker: f32,
    /// Baseline used in `baseline * focal_length / depth`
    pub baseline: f64,
    /// Focal length used in `baseline * focal_length / depth`
    pub focal_length: f64,
    /// Depth to 8-bit intensity factor
    pub normalize_scale: f32,
    /// Depths at or below this are drawn black in the rainbow map
    pub rainbow_min_depth: u16,
    /// Meters per depth unit
    pub depth_unit_m: f64,
}

impl ConversionParams {
    /// Kinect v1 constants
    pub const fn kinect_v1() -> Self {
        Self {
            invalid_depth: 2047,
            invalid_marker: 100_000.0,
            baseline: 75.0,
            focal_length: 575.0,
            normalize_scale: 255.0 / 2048.0,
            rainbow_min_depth: 50,
            depth_unit_m: 0.001,
        }
    }

    /// Numerator of the disparity ratio
    pub fn disparity_numerator(&self) -> f64 {
        self.baseline * self.focal_length
    }

    pub fn with_invalid_depth(mut self, value: u16) -> Self {
        self.invalid_depth = value;
        self
    }

    pub fn with_stereo(mut self, baseline: f64, focal_length: f64) -> Self {
        self.baseline = baseline;
        self.focal_length = focal_length;
        self
    }

    pub fn with_depth_unit(mut self, meters: f64) -> Self {
        self.depth_unit_m = meters;
        self
    }

    /// Reject values the algorithms cannot use
    pub fn validate(&self) -> Result<()> {
        if !(self.baseline.is_finite() && self.focal_length.is_finite()) {
            return Err(Error::Config(
                "baseline and focal_length must be finite".into(),
            ));
        }
        if !(self.depth_unit_m.is_finite() && self.depth_unit_m > 0.0) {
            return Err(Error::Config(format!(
                "depth_unit_m must be > 0, got {}",
                self.depth_unit_m
            )));
        }
        if !(self.normalize_scale.is_finite() && self.normalize_scale >= 0.0) {
            return Err(Error::Config(format!(
                "normalize_scale must be >= 0, got {}",
                self.normalize_scale
            )));
        }
        Ok(())
    }
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self::kinect_v1()
    }
}

/// Depth source backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceBackend {
    /// Generated test pattern
    #[default]
    Synthetic,
    /// Back-to-back little-endian u16 frames read from a dump file
    RawFile { path: PathBuf },
}

/// Depth source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Which source to open
    pub backend: SourceBackend,
    /// Depth frame resolution
    pub resolution: Resolution,
    /// Target framerate (0 = as fast as frames are requested)
    pub framerate: Framerate,
    /// Initial tilt angle in degrees
    pub tilt_degrees: i32,
    /// Also produce a color frame per depth frame
    pub emit_color: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::Synthetic,
            resolution: Resolution::VGA,
            framerate: Framerate::FPS_30,
            tilt_degrees: 0,
            emit_color: false,
        }
    }
}

impl SourceConfig {
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn raw_file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: SourceBackend::RawFile { path: path.into() },
            ..Default::default()
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Resolution::new(width, height);
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.framerate = Framerate::new(fps, 1);
        self
    }

    pub fn with_tilt(mut self, degrees: i32) -> Self {
        self.tilt_degrees = degrees;
        self
    }

    pub fn with_color(mut self, emit: bool) -> Self {
        self.emit_color = emit;
        self
    }
}

/// Top-level configuration, loadable from TOML
///
/// ```toml
/// mode = "rainbow"
///
/// [params]
/// invalid_depth = 2047
///
/// [source]
/// resolution = { width = 320, height = 240 }
/// framerate = { num = 15, den = 1 }
///
/// [source.backend]
/// type = "synthetic"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DepthConfig {
    /// Initial conversion mode
    pub mode: DepthMode,
    /// Sensor constants
    pub params: ConversionParams,
    /// Frame source
    pub source: SourceConfig,
    /// Where converted frames go
    pub output: Output,
    /// Calibration override; when unset the source's own intrinsics are used
    pub camera: Option<CameraInfo>,
}

impl DepthConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn with_mode(mut self, mode: DepthMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_params(mut self, params: ConversionParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    pub fn with_camera(mut self, camera: CameraInfo) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Check parameters and calibration
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        if let Some(camera) = &self.camera {
            camera.validate()?;
        }
        if self.source.resolution.pixels() == 0 {
            return Err(Error::Config(format!(
                "source resolution must be non-zero, got {}",
                self.source.resolution
            )));
        }
        Ok(())
    }
}
