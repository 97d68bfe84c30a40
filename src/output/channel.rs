//! Delivery to a downstream consumer over a tokio channel

use crate::error::{Error, Result};
use crate::types::{ConvertedFrame, Resolution};

use super::OutputSink;
use tokio::sync::mpsc;

/// Sends every converted frame to a receiver held by the consumer
pub struct ChannelOutput {
    tx: mpsc::Sender<ConvertedFrame>,
    frames: u64,
}

impl ChannelOutput {
    /// Create the sink and the receiving end for the consumer
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ConvertedFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, frames: 0 }, rx)
    }
}

#[async_trait::async_trait]
impl OutputSink for ChannelOutput {
    async fn init(&mut self, _resolution: Resolution) -> Result<()> {
        Ok(())
    }

    async fn write(&mut self, frame: ConvertedFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| Error::Output("downstream receiver dropped".into()))?;
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
