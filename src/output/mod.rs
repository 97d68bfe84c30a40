//! Output module
//!
//! Where converted frames go:
//! - Channel to a downstream consumer
//! - Log (periodic frame summaries)
//! - Null (discard, for benchmarking)

mod channel;
mod log;

pub use channel::ChannelOutput;
pub use log::LogOutput;

use crate::error::Result;
use crate::types::{ConvertedFrame, Resolution};
use serde::{Deserialize, Serialize};

/// Output destination configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// Log a summary of every `every`-th frame
    Log { every: u64 },

    /// Discard all frames
    Null,
}

impl Output {
    /// Create a log output
    pub fn log(every: u64) -> Self {
        Output::Log { every }
    }
}

impl Default for Output {
    fn default() -> Self {
        Output::Log { every: 30 }
    }
}

/// Trait for output sinks
#[async_trait::async_trait]
pub trait OutputSink: Send {
    /// Prepare for frames of the given resolution
    async fn init(&mut self, resolution: Resolution) -> Result<()>;

    /// Deliver one converted frame
    async fn write(&mut self, frame: ConvertedFrame) -> Result<()>;

    /// Flush and finalize
    async fn finish(&mut self) -> Result<()>;

    /// Frames delivered so far
    fn frames_written(&self) -> u64;
}

/// Create an output sink from configuration
pub fn create_output(output: Output) -> Box<dyn OutputSink> {
    match output {
        Output::Log { every } => Box::new(LogOutput::new(every)),
        Output::Null => Box::new(NullOutput::default()),
    }
}

/// Null output (discards all frames)
#[derive(Default)]
pub struct NullOutput {
    frames: u64,
}

#[async_trait::async_trait]
impl OutputSink for NullOutput {
    async fn init(&mut self, _resolution: Resolution) -> Result<()> {
        Ok(())
    }

    async fn write(&mut self, _frame: ConvertedFrame) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_toml_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            output: Output,
        }
        let w: Wrapper = toml::from_str("[output]\ntype = \"null\"\n").unwrap();
        assert_eq!(w.output, Output::Null);
        let w: Wrapper = toml::from_str("[output]\ntype = \"log\"\nevery = 5\n").unwrap();
        assert_eq!(w.output, Output::log(5));
    }

    #[tokio::test]
    async fn test_null_output_counts() {
        let mut sink = create_output(Output::Null);
        sink.init(Resolution::new(2, 1)).await.unwrap();
        let depth = crate::types::DepthFrame::filled(2, 1, 1000);
        let frame = ConvertedFrame {
            mode: crate::processing::DepthMode::Passthrough,
            output: crate::types::OutputFrame::Depth(depth),
            color: None,
            convert_time_us: 0,
        };
        sink.write(frame).await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.frames_written(), 1);
    }
}
