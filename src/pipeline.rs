//! Depth processing pipeline
//!
//! Connects source → convert → output.
//! Conversion runs on its own thread so pixel loops never stall the async
//! runtime; the source and the sink live in a tokio task.

use crate::capture::{self, DepthSource};
use crate::config::{ConversionParams, DepthConfig, SourceConfig};
use crate::converter::DepthConverter;
use crate::error::{Error, Result};
use crate::output::{self, Output, OutputSink};
use crate::processing::{DepthMode, ModeSelector};
use crate::types::{CameraInfo, ConvertedFrame, SensorFrame, Stats};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Depth processing pipeline
pub struct Pipeline {
    config: DepthConfig,
    selector: ModeSelector,
    max_frames: Option<u64>,
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<Stats>>,
    // Set by the builder to bypass config-based construction
    custom_source: Mutex<Option<Box<dyn DepthSource>>>,
    custom_sink: Mutex<Option<Box<dyn OutputSink>>>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(config: DepthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            selector: ModeSelector::new(config.mode),
            config,
            max_frames: None,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(Stats::default())),
            custom_source: Mutex::new(None),
            custom_sink: Mutex::new(None),
            task: Mutex::new(None),
        })
    }

    /// Start the pipeline
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::PipelineAlreadyRunning);
        }

        let mut source = match self.custom_source.lock().take() {
            Some(source) => source,
            None => match capture::create_source(self.config.source.clone()) {
                Ok(source) => source,
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            },
        };
        let mut sink = self
            .custom_sink
            .lock()
            .take()
            .unwrap_or_else(|| output::create_output(self.config.output.clone()));

        if let Err(e) = source.start().await {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }
        if let Err(e) = sink.init(source.resolution()).await {
            let _ = source.stop().await;
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let camera = self.config.camera.or_else(|| source.camera_info());
        match &camera {
            Some(c) => tracing::info!(
                "Intrinsics: fx={:.2} fy={:.2} cx={:.2} cy={:.2} ({}x{})",
                c.fx,
                c.fy,
                c.cx,
                c.cy,
                c.width,
                c.height
            ),
            None => tracing::warn!("No camera intrinsics, point cloud mode will skip frames"),
        }

        tracing::info!(
            "Pipeline starting (mode: {}, source: {})",
            self.selector.get(),
            source.resolution()
        );

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<SensorFrame>(4);
        // Unbounded so the converter thread never waits on the async side
        let (converted_tx, mut converted_rx) = mpsc::unbounded_channel::<ConvertedFrame>();

        let converter = DepthConverter::with_mode(self.selector.get())
            .with_params(self.config.params)
            .with_selector(self.selector.clone());
        let converter_stats = self.stats.clone();

        std::thread::spawn(move || {
            tracing::debug!("Converter thread started");
            loop {
                let frame = match frame_rx.recv_timeout(std::time::Duration::from_millis(100)) {
                    Ok(frame) => frame,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                };

                let mode = converter.mode();
                let started = std::time::Instant::now();
                match converter.process_with_mode(&frame.depth, mode, &camera) {
                    Ok(output) => {
                        let elapsed = started.elapsed().as_micros() as u64;
                        converter_stats.lock().record_conversion(elapsed);
                        let converted = ConvertedFrame {
                            mode,
                            output,
                            color: frame.color,
                            convert_time_us: elapsed,
                        };
                        if converted_tx.send(converted).is_err() {
                            tracing::debug!("Output channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        converter_stats.lock().frames_skipped += 1;
                        if !e.is_recoverable() {
                            tracing::warn!("Frame {} dropped: {}", frame.depth.sequence, e);
                        }
                    }
                }
            }
            tracing::debug!("Converter thread stopped");
        });

        let running = self.running.clone();
        let stats = self.stats.clone();
        let max_frames = self.max_frames;

        let task = tokio::spawn(async move {
            let mut captured = 0u64;

            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if max_frames.is_some_and(|max| captured >= max) {
                    tracing::info!("Reached {} frames", captured);
                    break;
                }

                match source.next_frame().await {
                    Ok(frame) => {
                        captured += 1;
                        stats.lock().frames_captured += 1;
                        if frame_tx.send(frame).is_err() {
                            tracing::debug!("Converter channel closed");
                            break;
                        }
                    }
                    Err(e) if e.is_end_of_stream() => {
                        tracing::info!("Depth source ended after {} frames", captured);
                        break;
                    }
                    Err(e) if e.is_recoverable() => continue,
                    Err(e) => {
                        tracing::error!("Source error: {}", e);
                        break;
                    }
                }

                while let Ok(converted) = converted_rx.try_recv() {
                    deliver(sink.as_mut(), converted, &stats).await;
                }
            }

            // Cleanup
            tracing::info!("Pipeline stopping");
            let _ = source.stop().await;

            // Closing the frame channel lets the converter finish the backlog and exit
            drop(frame_tx);
            while let Some(converted) = converted_rx.recv().await {
                deliver(sink.as_mut(), converted, &stats).await;
            }

            if let Err(e) = sink.finish().await {
                tracing::error!("Failed to finish output: {}", e);
            }
            running.store(false, Ordering::SeqCst);
            tracing::info!("Pipeline stopped");
        });

        *self.task.lock() = Some(task);
        Ok(())
    }

    /// Stop the pipeline and wait for the backlog to drain
    pub async fn stop(&self) -> Result<()> {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Pipeline stop requested");
        }
        self.wait().await
    }

    /// Wait until the pipeline stops on its own (source ended, frame limit)
    pub async fn wait(&self) -> Result<()> {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| Error::Pipeline(format!("Pipeline task failed: {}", e)))?;
        }
        Ok(())
    }

    /// Check if pipeline is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get current statistics
    pub fn stats(&self) -> Stats {
        self.stats.lock().clone()
    }

    /// Current conversion mode
    pub fn mode(&self) -> DepthMode {
        self.selector.get()
    }

    /// Change the conversion mode; takes effect from the next frame
    pub fn set_mode(&self, mode: DepthMode) {
        self.selector.set(mode);
    }

    /// Handle for changing the mode from elsewhere
    pub fn selector(&self) -> ModeSelector {
        self.selector.clone()
    }

    pub fn config(&self) -> &DepthConfig {
        &self.config
    }
}

async fn deliver(sink: &mut dyn OutputSink, frame: ConvertedFrame, stats: &Mutex<Stats>) {
    let sequence = frame.output.sequence();
    if let Err(e) = sink.write(frame).await {
        tracing::error!("Output error on frame {}: {}", sequence, e);
        return;
    }
    stats.lock().frames_written = sink.frames_written();
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: DepthConfig,
    max_frames: Option<u64>,
    source: Option<Box<dyn DepthSource>>,
    sink: Option<Box<dyn OutputSink>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: DepthConfig::default(),
            max_frames: None,
            source: None,
            sink: None,
        }
    }

    pub fn config(mut self, config: DepthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn mode(mut self, mode: DepthMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn params(mut self, params: ConversionParams) -> Self {
        self.config.params = params;
        self
    }

    pub fn source_config(mut self, source: SourceConfig) -> Self {
        self.config.source = source;
        self
    }

    /// Use an already constructed source instead of the configured one
    pub fn source(mut self, source: Box<dyn DepthSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.config.output = output;
        self
    }

    /// Use an already constructed sink instead of the configured one
    pub fn sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the source's intrinsics
    pub fn camera(mut self, camera: CameraInfo) -> Self {
        self.config.camera = Some(camera);
        self
    }

    /// Stop after this many captured frames
    pub fn max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(self.config)?;
        pipeline.max_frames = self.max_frames;
        *pipeline.custom_source.get_mut() = self.source;
        *pipeline.custom_sink.get_mut() = self.sink;
        Ok(pipeline)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
