//! Raw depth dump playback
//!
//! The file is a plain concatenation of frames, each `width * height`
//! little-endian u16 samples in row-major order.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::types::{CameraInfo, DepthFrame, Resolution, SensorFrame};

use super::{clamp_tilt, DepthSource};

use std::path::PathBuf;
use tokio::io::{AsyncReadExt, BufReader};

/// Depth source reading a raw dump
pub struct RawFileSource {
    path: PathBuf,
    config: SourceConfig,
    reader: Option<BufReader<tokio::fs::File>>,
    sequence: u64,
    tilt: i32,
    buffer: Vec<u8>,
}

impl RawFileSource {
    pub fn new(path: impl Into<PathBuf>, config: SourceConfig) -> Self {
        let tilt = clamp_tilt(config.tilt_degrees);
        Self {
            path: path.into(),
            config,
            reader: None,
            sequence: 0,
            tilt,
            buffer: Vec::new(),
        }
    }

    /// Frame size in bytes
    pub fn frame_bytes(&self) -> usize {
        self.config.resolution.pixels() * 2
    }

    /// Frames read so far
    pub fn frames_read(&self) -> u64 {
        self.sequence
    }
}

#[async_trait::async_trait]
impl DepthSource for RawFileSource {
    async fn start(&mut self) -> Result<()> {
        if self.reader.is_some() {
            return Ok(());
        }

        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            Error::Source(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        let len = file.metadata().await?.len();
        let frame_bytes = self.frame_bytes() as u64;
        if frame_bytes > 0 && len % frame_bytes != 0 {
            tracing::warn!(
                "{} is {} bytes, not a multiple of the {}-byte frame size; trailing data will be ignored",
                self.path.display(),
                len,
                frame_bytes
            );
        }

        self.reader = Some(BufReader::new(file));
        self.sequence = 0;
        tracing::info!(
            "Raw depth playback started: {} ({} frames of {})",
            self.path.display(),
            if frame_bytes == 0 { 0 } else { len / frame_bytes },
            self.config.resolution
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.reader = None;
        tracing::info!("Raw depth playback stopped after {} frames", self.sequence);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<SensorFrame> {
        let frame_bytes = self.frame_bytes();
        let reader = self.reader.as_mut().ok_or(Error::SourceNotStarted)?;

        self.buffer.resize(frame_bytes, 0);
        match reader.read_exact(&mut self.buffer).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(Error::SourceEnded);
            }
            Err(e) => return Err(e.into()),
        }

        let data = self
            .buffer
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        let resolution = self.config.resolution;
        let pts = self.sequence as i64 * self.config.framerate.frame_duration_us();
        let depth = DepthFrame::from_data(resolution.width, resolution.height, data)?
            .with_timing(pts, self.sequence);
        self.sequence += 1;

        Ok(SensorFrame::depth_only(depth))
    }

    fn is_active(&self) -> bool {
        self.reader.is_some()
    }

    fn resolution(&self) -> Resolution {
        self.config.resolution
    }

    fn camera_info(&self) -> Option<CameraInfo> {
        Some(CameraInfo::kinect_default().scaled_to(self.config.resolution))
    }

    fn tilt(&self) -> i32 {
        self.tilt
    }

    fn set_tilt(&mut self, degrees: i32) -> Result<i32> {
        // playback has no motor; remember the angle for callers that ask
        self.tilt = clamp_tilt(degrees);
        Ok(self.tilt)
    }
}

/// Serialize depth frames into the raw dump layout
pub fn encode_raw(frames: &[DepthFrame]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|f| f.data.iter().flat_map(|d| d.to_le_bytes()))
        .collect()
}
