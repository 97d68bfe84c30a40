//! Frame summary logging

use crate::error::Result;
use crate::types::{ConvertedFrame, Resolution};

use super::OutputSink;

/// Logs a summary line for every n-th frame
pub struct LogOutput {
    every: u64,
    frames: u64,
}

impl LogOutput {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
        }
    }
}

#[async_trait::async_trait]
impl OutputSink for LogOutput {
    async fn init(&mut self, resolution: Resolution) -> Result<()> {
        tracing::info!(
            "Logging summary of every {} frame(s) at {}",
            self.every,
            resolution
        );
        Ok(())
    }

    async fn write(&mut self, frame: ConvertedFrame) -> Result<()> {
        if self.frames % self.every == 0 {
            tracing::info!(
                "frame {} [{}] {} ({} us)",
                frame.output.sequence(),
                frame.mode,
                frame.output.summary(),
                frame.convert_time_us
            );
        }
        self.frames += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        tracing::info!("Log output finished after {} frames", self.frames);
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}
