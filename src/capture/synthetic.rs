//! Generated depth test pattern
//!
//! A background thread renders frames at the configured framerate and hands
//! them over through a bounded channel, waiting while the consumer falls
//! behind.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::types::{CameraInfo, ColorFrame, DepthFrame, Frame, Resolution, SensorFrame};

use super::{clamp_tilt, DepthSource};

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Nearest depth in the pattern, mm
const PATTERN_NEAR_MM: f64 = 500.0;
/// Depth added between the center and a corner, mm
const PATTERN_SPAN_MM: f64 = 1400.0;
/// Width of the invalid band on the left edge, like the IR shadow of a Kinect
const SHADOW_COLUMNS: u32 = 8;

/// Test-pattern depth source
pub struct SyntheticSource {
    config: SourceConfig,
    running: Arc<AtomicBool>,
    tilt: Arc<AtomicI32>,
    frames_generated: Arc<AtomicU64>,
    frame_rx: Option<crossbeam_channel::Receiver<SensorFrame>>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        let tilt = clamp_tilt(config.tilt_degrees);
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            tilt: Arc::new(AtomicI32::new(tilt)),
            frames_generated: Arc::new(AtomicU64::new(0)),
            frame_rx: None,
            thread_handle: None,
        }
    }

    /// Frames rendered so far
    pub fn frames_generated(&self) -> u64 {
        self.frames_generated.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl DepthSource for SyntheticSource {
    async fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<SensorFrame>(4);
        self.frame_rx = Some(frame_rx);

        let config = self.config.clone();
        let running = self.running.clone();
        let tilt = self.tilt.clone();
        let generated = self.frames_generated.clone();

        let handle = std::thread::spawn(move || {
            run_generator(config, running, tilt, generated, frame_tx);
        });

        self.thread_handle = Some(handle);
        tracing::info!(
            "Synthetic depth source started ({} @ {})",
            self.config.resolution,
            self.config.framerate
        );

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.frame_rx = None;
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Synthetic generator thread panicked");
            }
        }
        tracing::info!("Synthetic depth source stopped");
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<SensorFrame> {
        let rx = self.frame_rx.as_ref().ok_or(Error::SourceNotStarted)?;

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => Ok(frame),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                Err(Error::Timeout("synthetic frame timeout".into()))
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Error::SourceEnded),
        }
    }

    fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn resolution(&self) -> Resolution {
        self.config.resolution
    }

    fn camera_info(&self) -> Option<CameraInfo> {
        Some(CameraInfo::kinect_default().scaled_to(self.config.resolution))
    }

    fn tilt(&self) -> i32 {
        self.tilt.load(Ordering::SeqCst)
    }

    fn set_tilt(&mut self, degrees: i32) -> Result<i32> {
        let applied = clamp_tilt(degrees);
        self.tilt.store(applied, Ordering::SeqCst);
        tracing::debug!("Tilt set to {} degrees", applied);
        Ok(applied)
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Generator loop
fn run_generator(
    config: SourceConfig,
    running: Arc<AtomicBool>,
    tilt: Arc<AtomicI32>,
    generated: Arc<AtomicU64>,
    frame_tx: crossbeam_channel::Sender<SensorFrame>,
) {
    let interval = config.framerate.interval();
    let frame_us = config.framerate.frame_duration_us();
    let mut sequence = 0u64;

    while running.load(Ordering::SeqCst) {
        let started = std::time::Instant::now();

        let depth = test_pattern(config.resolution, sequence, tilt.load(Ordering::SeqCst))
            .with_timing(sequence as i64 * frame_us, sequence);
        let color = config
            .emit_color
            .then(|| color_pattern(config.resolution, sequence).with_timing(depth.pts, sequence));
        let mut frame = SensorFrame { depth, color };
        generated.fetch_add(1, Ordering::Relaxed);

        // Hand over, retrying while the consumer is busy and we are still running
        loop {
            match frame_tx.send_timeout(frame, Duration::from_millis(100)) {
                Ok(()) => break,
                Err(crossbeam_channel::SendTimeoutError::Timeout(f)) => {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    frame = f;
                }
                Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
                    tracing::debug!("Synthetic frame channel closed");
                    return;
                }
            }
        }

        sequence += 1;

        if let Some(interval) = interval {
            if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }
}

/// Render one depth frame of the test pattern
///
/// A radial ramp from 500 mm at the center to 1900 mm in the corners,
/// rippling with `sequence` and shifted vertically by `tilt`. The leftmost
/// columns and a moving checker of 16x16 blocks read as invalid (2047).
pub fn test_pattern(resolution: Resolution, sequence: u64, tilt: i32) -> DepthFrame {
    let (w, h) = (resolution.width, resolution.height);
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0 + tilt as f64 * h as f64 / 90.0;
    let max_r = (cx * cx + (h as f64 / 2.0).powi(2)).sqrt().max(1.0);
    let ripple = (sequence % 64) as f64 * 4.0;

    let mut data = Vec::with_capacity(resolution.pixels());
    for y in 0..h {
        for x in 0..w {
            let block = (x / 16 + y / 16) as u64 + sequence / 8;
            if x < SHADOW_COLUMNS.min(w / 4) || block % 11 == 0 {
                data.push(2047);
                continue;
            }
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            let r = (dx * dx + dy * dy).sqrt() / max_r;
            let d = PATTERN_NEAR_MM + PATTERN_SPAN_MM * r.min(1.0) + ripple;
            // never collide with the sentinel
            let d = d.round() as u16;
            data.push(if d == 2047 { 2046 } else { d });
        }
    }

    Frame {
        width: w,
        height: h,
        data,
        pts: 0,
        sequence: 0,
    }
}

/// Render the color frame that goes with a depth frame
fn color_pattern(resolution: Resolution, sequence: u64) -> ColorFrame {
    let (w, h) = (resolution.width.max(1), resolution.height.max(1));
    let blue = ((sequence * 4) % 256) as u8;
    let mut data = Vec::with_capacity(resolution.pixels());
    for y in 0..resolution.height {
        for x in 0..resolution.width {
            data.push([(x * 255 / w) as u8, (y * 255 / h) as u8, blue]);
        }
    }
    Frame {
        width: resolution.width,
        height: resolution.height,
        data,
        pts: 0,
        sequence: 0,
    }
}
