//! depthconv: depth frame conversion engine
//!
//! Turns raw 16-bit depth frames from a structured-light sensor (Kinect v1
//! class) into the representations downstream consumers want.
//!
//! # Features
//!
//! - **Modes**: passthrough, normalized 8-bit, 8-bit and float disparity,
//!   point cloud, valid-pixel mask, rainbow colormap
//! - **Capture**: synthetic test pattern and raw depth dumps behind a
//!   pluggable [`capture::DepthSource`] trait
//! - **Pipeline**: conversion on a dedicated thread, runtime mode switching
//!
//! # Example
//!
//! ```rust,no_run
//! use depthconv::{DepthMode, PipelineBuilder, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> depthconv::Result<()> {
//!     let pipeline = PipelineBuilder::new()
//!         .source_config(SourceConfig::synthetic().with_resolution(640, 480))
//!         .mode(DepthMode::Disparity32f)
//!         .max_frames(300)
//!         .build()?;
//!
//!     pipeline.start().await?;
//!     pipeline.set_mode(DepthMode::Rainbow);
//!     pipeline.wait().await?;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
pub mod converter;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod types;

// Re-exports for convenience
pub use capture::{DepthSource, IntrinsicsProvider};
pub use config::{ConversionParams, DepthConfig, SourceBackend, SourceConfig};
pub use converter::DepthConverter;
pub use error::{Error, Result};
pub use output::{Output, OutputSink};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use processing::{convert, DepthMode, ModeSelector};
pub use types::{
    CameraInfo, DepthFrame, Frame, OutputFrame, OutputKind, Point3, Resolution, SensorFrame,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
