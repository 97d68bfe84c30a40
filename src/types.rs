//! Common types used throughout depthconv

use crate::error::{Error, Result};
use crate::processing::DepthMode;
use serde::{Deserialize, Serialize};

/// Frame resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    // Depth sensor resolutions
    pub const QVGA: Self = Self::new(320, 240);
    pub const VGA: Self = Self::new(640, 480);
    pub const SXGA: Self = Self::new(1280, 1024);

    /// Calculate total pixels
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Framerate representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub den: u32,
}

impl Framerate {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub const FPS_30: Self = Self::new(30, 1);

    /// Get framerate as f64
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /// Frame interval, `None` for an unthrottled source
    pub fn interval(&self) -> Option<std::time::Duration> {
        if self.num == 0 || self.den == 0 {
            return None;
        }
        Some(std::time::Duration::from_micros(self.frame_duration_us() as u64))
    }

    /// Frame duration in microseconds
    pub fn frame_duration_us(&self) -> i64 {
        if self.num == 0 {
            return 0;
        }
        (1_000_000 * self.den as i64) / self.num as i64
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{} fps", self.num)
        } else {
            write!(f, "{:.2} fps", self.as_f64())
        }
    }
}

/// A row-major grid of samples
///
/// Every conversion keeps `width`, `height`, `pts` and `sequence` of its
/// input, so a `Frame<T>` can always be matched back to the depth frame it
/// was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Samples, `width * height` of them, row after row
    pub data: Vec<T>,
    /// Presentation timestamp in microseconds
    pub pts: i64,
    /// Monotonic frame counter assigned by the source
    pub sequence: u64,
}

/// Raw depth frame, millimeters
pub type DepthFrame = Frame<u16>;

/// 8-bit RGB frame
pub type ColorFrame = Frame<[u8; 3]>;

impl<T> Frame<T> {
    /// Create a frame from existing data
    pub fn from_data(width: u32, height: u32, data: Vec<T>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            data,
            pts: 0,
            sequence: 0,
        };
        frame.check_size()?;
        Ok(frame)
    }

    /// Fail unless there are exactly `width * height` samples
    ///
    /// The fields are public, so a frame built by hand can disagree with
    /// its own geometry.
    pub fn check_size(&self) -> Result<()> {
        let expected = self.resolution().pixels();
        if self.data.len() != expected {
            return Err(Error::FrameSize {
                width: self.width,
                height: self.height,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Attach timing information
    pub fn with_timing(mut self, pts: i64, sequence: u64) -> Self {
        self.pts = pts;
        self.sequence = sequence;
        self
    }

    /// Get resolution
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Number of pixels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at column `x`, row `y`
    pub fn get(&self, x: u32, y: u32) -> Option<&T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize)
    }

    /// One row of samples
    pub fn row(&self, y: u32) -> &[T] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }

    /// Iterate rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact panics on zero, and a zero-width frame has no rows anyway
        self.data.chunks_exact(self.width.max(1) as usize)
    }

    /// Wrap converted samples with this frame's geometry and timing
    pub(crate) fn derive<U>(&self, data: Vec<U>) -> Frame<U> {
        debug_assert_eq!(data.len(), self.data.len());
        Frame {
            width: self.width,
            height: self.height,
            data,
            pts: self.pts,
            sequence: self.sequence,
        }
    }
}

impl<T: Clone> Frame<T> {
    /// Create a frame with every sample set to `value`
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
            pts: 0,
            sequence: 0,
        }
    }

    /// Build a frame from nested rows; all rows must have the same length
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
        let data: Vec<T> = rows.iter().flat_map(|r| r.iter().cloned()).collect();
        Self::from_data(width, height, data)
    }

    /// Copy out as nested rows
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.rows().take(self.height as usize).map(|r| r.to_vec()).collect()
    }
}

impl Frame<bool> {
    /// 255 where true, 0 where false
    pub fn to_u8_mask(&self) -> Frame<u8> {
        self.derive(self.data.iter().map(|&v| if v { 255 } else { 0 }).collect())
    }
}

/// Pinhole camera calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Image width the calibration was made for
    pub width: u32,
    /// Image height the calibration was made for
    pub height: u32,
    /// Focal length X (pixels)
    pub fx: f64,
    /// Focal length Y (pixels)
    pub fy: f64,
    /// Principal point X (pixels)
    pub cx: f64,
    /// Principal point Y (pixels)
    pub cy: f64,
}

impl CameraInfo {
    pub const fn new(width: u32, height: u32, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        }
    }

    /// Nominal Kinect v1 depth camera at 640x480
    pub const fn kinect_default() -> Self {
        Self::new(640, 480, 525.0, 525.0, 319.5, 239.5)
    }

    /// Get resolution
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Rescale the calibration to another image size
    pub fn scaled_to(&self, resolution: Resolution) -> Self {
        if resolution == self.resolution() || self.width == 0 || self.height == 0 {
            return Self {
                width: resolution.width,
                height: resolution.height,
                ..*self
            };
        }
        let sx = resolution.width as f64 / self.width as f64;
        let sy = resolution.height as f64 / self.height as f64;
        Self {
            width: resolution.width,
            height: resolution.height,
            fx: self.fx * sx,
            fy: self.fy * sy,
            // pixel centers: (c + 0.5) scales, not c
            cx: (self.cx + 0.5) * sx - 0.5,
            cy: (self.cy + 0.5) * sy - 0.5,
        }
    }

    /// Focal lengths must be finite and positive
    pub fn validate(&self) -> Result<()> {
        if !(self.fx.is_finite() && self.fx > 0.0) {
            return Err(Error::InvalidIntrinsics(format!("fx must be > 0, got {}", self.fx)));
        }
        if !(self.fy.is_finite() && self.fy > 0.0) {
            return Err(Error::InvalidIntrinsics(format!("fy must be > 0, got {}", self.fy)));
        }
        if !(self.cx.is_finite() && self.cy.is_finite()) {
            return Err(Error::InvalidIntrinsics(
                "principal point must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Fail unless the calibration is for a frame of `resolution`
    pub fn check_matches(&self, resolution: Resolution) -> Result<()> {
        if self.resolution() != resolution {
            return Err(Error::IntrinsicsMismatch {
                intrinsics_width: self.width,
                intrinsics_height: self.height,
                frame_width: resolution.width,
                frame_height: resolution.height,
            });
        }
        Ok(())
    }
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self::kinect_default()
    }
}

/// 3D point, meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same value on all three axes
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }
}

/// Element type of an output frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    /// Unchanged 16-bit depth
    Depth16,
    /// 8-bit single channel
    Intensity8,
    /// 32-bit float single channel
    Disparity32f,
    /// Boolean mask
    Mask,
    /// 8-bit RGB
    Rgb8,
    /// 3 x 32-bit float XYZ
    Points32f,
}

impl OutputKind {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            OutputKind::Depth16 => 2,
            OutputKind::Intensity8 | OutputKind::Mask => 1,
            OutputKind::Disparity32f => 4,
            OutputKind::Rgb8 => 3,
            OutputKind::Points32f => 12,
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputKind::Depth16 => "16UC1",
            OutputKind::Intensity8 => "8UC1",
            OutputKind::Disparity32f => "32FC1",
            OutputKind::Mask => "mask",
            OutputKind::Rgb8 => "8UC3",
            OutputKind::Points32f => "32FC3",
        };
        f.write_str(s)
    }
}

/// Result of one conversion; the variant is dictated by the depth mode
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFrame {
    Depth(Frame<u16>),
    Intensity(Frame<u8>),
    Disparity(Frame<f32>),
    Mask(Frame<bool>),
    Color(Frame<[u8; 3]>),
    Points(Frame<Point3>),
}

impl OutputFrame {
    pub fn kind(&self) -> OutputKind {
        match self {
            OutputFrame::Depth(_) => OutputKind::Depth16,
            OutputFrame::Intensity(_) => OutputKind::Intensity8,
            OutputFrame::Disparity(_) => OutputKind::Disparity32f,
            OutputFrame::Mask(_) => OutputKind::Mask,
            OutputFrame::Color(_) => OutputKind::Rgb8,
            OutputFrame::Points(_) => OutputKind::Points32f,
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            OutputFrame::Depth(f) => f.resolution(),
            OutputFrame::Intensity(f) => f.resolution(),
            OutputFrame::Disparity(f) => f.resolution(),
            OutputFrame::Mask(f) => f.resolution(),
            OutputFrame::Color(f) => f.resolution(),
            OutputFrame::Points(f) => f.resolution(),
        }
    }

    pub fn width(&self) -> u32 {
        self.resolution().width
    }

    pub fn height(&self) -> u32 {
        self.resolution().height
    }

    pub fn pts(&self) -> i64 {
        match self {
            OutputFrame::Depth(f) => f.pts,
            OutputFrame::Intensity(f) => f.pts,
            OutputFrame::Disparity(f) => f.pts,
            OutputFrame::Mask(f) => f.pts,
            OutputFrame::Color(f) => f.pts,
            OutputFrame::Points(f) => f.pts,
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            OutputFrame::Depth(f) => f.sequence,
            OutputFrame::Intensity(f) => f.sequence,
            OutputFrame::Disparity(f) => f.sequence,
            OutputFrame::Mask(f) => f.sequence,
            OutputFrame::Color(f) => f.sequence,
            OutputFrame::Points(f) => f.sequence,
        }
    }

    /// Size of the sample buffer in bytes
    pub fn size_bytes(&self) -> usize {
        self.resolution().pixels() * self.kind().bytes_per_pixel()
    }

    /// Scalar statistics, mainly for logging
    ///
    /// Points are summarized by Z, colors by channel mean, masks as 0/1.
    /// Non-finite floats are left out of min/max/mean.
    pub fn summary(&self) -> FrameSummary {
        let mut acc = SummaryAccumulator::default();
        match self {
            OutputFrame::Depth(f) => f.data.iter().for_each(|&v| acc.push(v as f64)),
            OutputFrame::Intensity(f) => f.data.iter().for_each(|&v| acc.push(v as f64)),
            OutputFrame::Disparity(f) => f.data.iter().for_each(|&v| acc.push(v as f64)),
            OutputFrame::Mask(f) => f.data.iter().for_each(|&v| acc.push(v as u8 as f64)),
            OutputFrame::Color(f) => f.data.iter().for_each(|c| {
                acc.push((c[0] as f64 + c[1] as f64 + c[2] as f64) / 3.0)
            }),
            OutputFrame::Points(f) => f.data.iter().for_each(|p| acc.push(p.z as f64)),
        }
        acc.finish(self.kind(), self.resolution())
    }
}

/// Scalar statistics of an output frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSummary {
    pub kind: OutputKind,
    pub resolution: Resolution,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Pixels whose scalar value is non-zero
    pub nonzero: usize,
}

impl std::fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} min={:.3} max={:.3} mean={:.3} nonzero={}/{}",
            self.resolution,
            self.kind,
            self.min,
            self.max,
            self.mean,
            self.nonzero,
            self.resolution.pixels()
        )
    }
}

#[derive(Default)]
struct SummaryAccumulator {
    min: Option<f64>,
    max: Option<f64>,
    sum: f64,
    count: usize,
    nonzero: usize,
}

impl SummaryAccumulator {
    fn push(&mut self, v: f64) {
        if v != 0.0 {
            self.nonzero += 1;
        }
        if !v.is_finite() {
            return;
        }
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
        self.sum += v;
        self.count += 1;
    }

    fn finish(self, kind: OutputKind, resolution: Resolution) -> FrameSummary {
        FrameSummary {
            kind,
            resolution,
            min: self.min.unwrap_or(0.0),
            max: self.max.unwrap_or(0.0),
            mean: if self.count == 0 {
                0.0
            } else {
                self.sum / self.count as f64
            },
            nonzero: self.nonzero,
        }
    }
}

/// One acquisition cycle from a depth source
#[derive(Debug, Clone)]
pub struct SensorFrame {
    pub depth: DepthFrame,
    /// Color image, when the source produces one
    pub color: Option<ColorFrame>,
}

impl SensorFrame {
    pub fn depth_only(depth: DepthFrame) -> Self {
        Self { depth, color: None }
    }
}

/// A converted frame on its way downstream
#[derive(Debug, Clone)]
pub struct ConvertedFrame {
    /// Mode the frame was converted with
    pub mode: DepthMode,
    pub output: OutputFrame,
    /// Color image captured alongside the depth frame
    pub color: Option<ColorFrame>,
    /// Time spent in the conversion, microseconds
    pub convert_time_us: u64,
}

/// Statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Frames received from the source
    pub frames_captured: u64,
    /// Frames converted successfully
    pub frames_converted: u64,
    /// Frames dropped because conversion failed
    pub frames_skipped: u64,
    /// Frames delivered to the output sink
    pub frames_written: u64,
    /// Average conversion time in ms
    pub avg_convert_ms: f64,
}

impl Stats {
    /// Fold one conversion time into the running average
    pub fn record_conversion(&mut self, elapsed_us: u64) {
        self.frames_converted += 1;
        let ms = elapsed_us as f64 / 1000.0;
        let n = self.frames_converted as f64;
        self.avg_convert_ms += (ms - self.avg_convert_ms) / n;
    }
}
