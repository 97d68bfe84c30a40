//! Conversion mode selection

use crate::error::{Error, Result};
use crate::types::OutputKind;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// What a depth frame is converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    /// Copy the depth frame unchanged
    #[default]
    Passthrough,
    /// Linear rescale to 8-bit intensity
    Normalized,
    /// Disparity, saturated to 8 bits
    Disparity8,
    /// Disparity as 32-bit float
    Disparity32f,
    /// XYZ in meters, needs camera intrinsics
    PointCloud,
    /// True where the sensor measured something
    ValidMask,
    /// False-color visualization
    Rainbow,
}

impl DepthMode {
    /// Every mode, in display order
    pub const ALL: [DepthMode; 7] = [
        DepthMode::Passthrough,
        DepthMode::Normalized,
        DepthMode::Disparity8,
        DepthMode::Disparity32f,
        DepthMode::PointCloud,
        DepthMode::ValidMask,
        DepthMode::Rainbow,
    ];

    /// Canonical name, as accepted by `FromStr` and serde
    pub fn name(&self) -> &'static str {
        match self {
            DepthMode::Passthrough => "passthrough",
            DepthMode::Normalized => "normalized",
            DepthMode::Disparity8 => "disparity8",
            DepthMode::Disparity32f => "disparity32f",
            DepthMode::PointCloud => "point_cloud",
            DepthMode::ValidMask => "valid_mask",
            DepthMode::Rainbow => "rainbow",
        }
    }

    /// Alternative names accepted when parsing
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            DepthMode::Passthrough => &["raw"],
            DepthMode::Normalized => &[],
            DepthMode::Disparity8 => &["disparity"],
            DepthMode::Disparity32f => &["dm32f"],
            DepthMode::PointCloud => &["pointcloud"],
            DepthMode::ValidMask => &["valid"],
            DepthMode::Rainbow => &[],
        }
    }

    /// Element type of frames produced in this mode
    pub fn output_kind(&self) -> OutputKind {
        match self {
            DepthMode::Passthrough => OutputKind::Depth16,
            DepthMode::Normalized | DepthMode::Disparity8 => OutputKind::Intensity8,
            DepthMode::Disparity32f => OutputKind::Disparity32f,
            DepthMode::PointCloud => OutputKind::Points32f,
            DepthMode::ValidMask => OutputKind::Mask,
            DepthMode::Rainbow => OutputKind::Rgb8,
        }
    }

    /// Whether conversion needs camera intrinsics
    pub fn requires_intrinsics(&self) -> bool {
        matches!(self, DepthMode::PointCloud)
    }

    /// Short description for listings
    pub fn description(&self) -> &'static str {
        match self {
            DepthMode::Passthrough => "raw depth, unchanged",
            DepthMode::Normalized => "depth * 255/2048 as 8-bit intensity",
            DepthMode::Disparity8 => "baseline * focal / depth, 8-bit",
            DepthMode::Disparity32f => "baseline * focal / depth, float",
            DepthMode::PointCloud => "XYZ meters via camera intrinsics",
            DepthMode::ValidMask => "true where depth != invalid",
            DepthMode::Rainbow => "six-band false color",
        }
    }
}

impl std::fmt::Display for DepthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DepthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        DepthMode::ALL
            .into_iter()
            .find(|m| m.name() == wanted || m.aliases().contains(&wanted.as_str()))
            .ok_or_else(|| Error::UnknownMode(s.to_string()))
    }
}

/// Shared, runtime-settable depth mode
///
/// Clones share the same value. A conversion reads it once with [`get`]
/// and uses that value for the whole frame.
///
/// [`get`]: ModeSelector::get
#[derive(Debug, Clone, Default)]
pub struct ModeSelector {
    mode: Arc<RwLock<DepthMode>>,
}

impl ModeSelector {
    pub fn new(mode: DepthMode) -> Self {
        Self {
            mode: Arc::new(RwLock::new(mode)),
        }
    }

    /// Current mode
    pub fn get(&self) -> DepthMode {
        *self.mode.read()
    }

    /// Change the mode, returning the previous one
    pub fn set(&self, mode: DepthMode) -> DepthMode {
        let previous = std::mem::replace(&mut *self.mode.write(), mode);
        if previous != mode {
            tracing::info!("Depth mode changed: {} -> {}", previous, mode);
        }
        previous
    }

    /// Change the mode by name; unrecognized names select passthrough
    pub fn set_by_name(&self, name: &str) -> DepthMode {
        let mode = match name.parse::<DepthMode>() {
            Ok(mode) => mode,
            Err(_) => {
                tracing::warn!("Unrecognized depth mode '{}', using passthrough", name);
                DepthMode::Passthrough
            }
        };
        self.set(mode);
        mode
    }

    /// Switch modes by name for every non-empty line read, on a detached thread
    ///
    /// The thread ends at end of input or on a read error. It is never
    /// joined by the caller's runtime, so a blocked read does not hold up
    /// process exit.
    pub fn follow_lines<R>(&self, reader: R) -> std::thread::JoinHandle<()>
    where
        R: std::io::BufRead + Send + 'static,
    {
        let selector = self.clone();
        std::thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                let name = line.trim();
                if !name.is_empty() {
                    selector.set_by_name(name);
                }
            }
            tracing::debug!("Mode input closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for mode in DepthMode::ALL {
            assert_eq!(mode.name().parse::<DepthMode>().unwrap(), mode);
            assert_eq!(mode.to_string().parse::<DepthMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("raw".parse::<DepthMode>().unwrap(), DepthMode::Passthrough);
        assert_eq!("Disparity".parse::<DepthMode>().unwrap(), DepthMode::Disparity8);
        assert_eq!("dm32f".parse::<DepthMode>().unwrap(), DepthMode::Disparity32f);
        assert_eq!("point-cloud".parse::<DepthMode>().unwrap(), DepthMode::PointCloud);
        assert_eq!(" valid ".parse::<DepthMode>().unwrap(), DepthMode::ValidMask);
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            "sepia".parse::<DepthMode>(),
            Err(Error::UnknownMode(name)) if name == "sepia"
        ));
    }

    #[test]
    fn test_default_is_passthrough() {
        assert_eq!(DepthMode::default(), DepthMode::Passthrough);
        assert_eq!(ModeSelector::default().get(), DepthMode::Passthrough);
    }

    #[test]
    fn test_only_point_cloud_needs_intrinsics() {
        let needing: Vec<_> = DepthMode::ALL
            .into_iter()
            .filter(|m| m.requires_intrinsics())
            .collect();
        assert_eq!(needing, vec![DepthMode::PointCloud]);
    }

    #[test]
    fn test_selector_is_shared_between_clones() {
        let selector = ModeSelector::new(DepthMode::Rainbow);
        let other = selector.clone();
        assert_eq!(other.set(DepthMode::ValidMask), DepthMode::Rainbow);
        assert_eq!(selector.get(), DepthMode::ValidMask);
    }

    #[test]
    fn test_set_by_name_falls_back_to_passthrough() {
        let selector = ModeSelector::new(DepthMode::Rainbow);
        assert_eq!(selector.set_by_name("normalized"), DepthMode::Normalized);
        assert_eq!(selector.set_by_name("no-such-mode"), DepthMode::Passthrough);
        assert_eq!(selector.get(), DepthMode::Passthrough);
    }

    #[test]
    fn test_follow_lines_until_eof() {
        let selector = ModeSelector::new(DepthMode::Passthrough);
        let input = std::io::Cursor::new("rainbow\n\n  \ndisparity32f\n");
        selector.follow_lines(input).join().unwrap();
        assert_eq!(selector.get(), DepthMode::Disparity32f);
    }

    /// Reader that blocks until a chunk arrives, like an idle terminal
    struct ChunkReader(crossbeam_channel::Receiver<Vec<u8>>);

    impl std::io::Read for ChunkReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.recv() {
                Ok(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[test]
    fn test_follow_lines_does_not_block_caller() {
        let selector = ModeSelector::new(DepthMode::Passthrough);
        let (tx, rx) = crossbeam_channel::unbounded();

        // returns while the reader is still waiting for input
        let handle = selector.follow_lines(std::io::BufReader::new(ChunkReader(rx)));
        assert!(!handle.is_finished());

        tx.send(b"valid_mask\n".to_vec()).unwrap();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while selector.get() != DepthMode::ValidMask && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(selector.get(), DepthMode::ValidMask);

        drop(tx);
        handle.join().unwrap();
    }
}
