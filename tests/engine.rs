use depthconv::capture::{encode_raw, SyntheticSource};
use depthconv::output::ChannelOutput;
use depthconv::{
    convert, CameraInfo, ConversionParams, DepthConfig, DepthFrame, DepthMode, DepthSource, Error,
    Frame, OutputFrame, PipelineBuilder, Resolution, SensorFrame, SourceConfig,
};

fn scenario_frame() -> DepthFrame {
    DepthFrame::from_rows(&[vec![2047, 100], vec![600, 2047]]).unwrap()
}

#[test]
fn test_valid_mask_scenario() {
    let out = convert(
        &scenario_frame(),
        DepthMode::ValidMask,
        None,
        &ConversionParams::default(),
    )
    .unwrap();
    let expected = Frame::from_rows(&[vec![false, true], vec![true, false]]).unwrap();
    assert_eq!(out, OutputFrame::Mask(expected));
}

#[test]
fn test_disparity32f_scenario() {
    let out = convert(
        &scenario_frame(),
        DepthMode::Disparity32f,
        None,
        &ConversionParams::default(),
    )
    .unwrap();
    match out {
        OutputFrame::Disparity(frame) => {
            assert_eq!(
                frame.to_rows(),
                vec![vec![100_000.0, 431.25], vec![71.875, 100_000.0]]
            );
        }
        other => panic!("unexpected output {:?}", other.kind()),
    }
}

#[test]
fn test_every_mode_keeps_shape_and_input() {
    let depth = DepthFrame::from_rows(&[
        vec![0, 50, 400, 2047],
        vec![1000, 1500, 2046, 2047],
        vec![3, 700, 1200, 65535],
    ])
    .unwrap();
    let before = depth.clone();
    let camera = CameraInfo::new(4, 3, 525.0, 525.0, 1.5, 1.0);
    let params = ConversionParams::default();

    for mode in DepthMode::ALL {
        let out = convert(&depth, mode, Some(&camera), &params).unwrap();
        assert_eq!(out.resolution(), Resolution::new(4, 3), "mode {}", mode);
        assert_eq!(out.kind(), mode.output_kind());
        assert_eq!(depth, before);

        // same input, same output
        let again = convert(&depth, mode, Some(&camera), &params).unwrap();
        assert_eq!(out, again);
    }
}

#[test]
fn test_point_cloud_needs_camera() {
    let err = convert(
        &scenario_frame(),
        DepthMode::PointCloud,
        None,
        &ConversionParams::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingIntrinsics));
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depthconv.toml");

    let config = DepthConfig::default()
        .with_mode(DepthMode::Rainbow)
        .with_source(SourceConfig::synthetic().with_resolution(320, 240).with_tilt(12))
        .with_camera(CameraInfo::kinect_default().scaled_to(Resolution::QVGA));
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

    let loaded = DepthConfig::from_file(&path).unwrap();
    assert_eq!(loaded.mode, DepthMode::Rainbow);
    assert_eq!(loaded.source.resolution, Resolution::QVGA);
    assert_eq!(loaded.source.tilt_degrees, 12);
    assert_eq!(loaded.camera, config.camera);
    assert_eq!(loaded.params, ConversionParams::kinect_v1());
}

#[tokio::test]
async fn test_raw_file_pipeline_with_mode_switch() {
    let frames: Vec<DepthFrame> = (0..6)
        .map(|i| DepthFrame::filled(4, 2, 500 + i as u16 * 100).with_timing(0, i))
        .collect();
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), encode_raw(&frames)).unwrap();

    let (sink, mut rx) = ChannelOutput::new(16);
    let pipeline = PipelineBuilder::new()
        .source_config(SourceConfig::raw_file(file.path()).with_resolution(4, 2))
        .mode(DepthMode::Normalized)
        .sink(Box::new(sink))
        .build()
        .unwrap();

    pipeline.start().await.unwrap();
    let first = rx.recv().await.unwrap();
    assert_eq!(first.mode, DepthMode::Normalized);

    pipeline.set_mode(DepthMode::ValidMask);
    pipeline.wait().await.unwrap();

    let mut rest = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        rest.push(frame);
    }
    assert_eq!(rest.len(), 5);

    // frames already converted keep the old mode; once switched it sticks
    let first_switched = rest
        .iter()
        .position(|f| f.mode == DepthMode::ValidMask)
        .unwrap_or(rest.len());
    for (i, frame) in rest.iter().enumerate() {
        assert_eq!(frame.output.sequence(), i as u64 + 1);
        assert_eq!(frame.output.kind(), frame.mode.output_kind());
        if i >= first_switched {
            assert_eq!(frame.mode, DepthMode::ValidMask);
        }
    }

    let stats = pipeline.stats();
    assert_eq!(stats.frames_captured, 6);
    assert_eq!(stats.frames_written, 6);
    assert_eq!(stats.frames_skipped, 0);
}

#[tokio::test]
async fn test_point_cloud_pipeline_with_mismatched_calibration_skips() {
    // synthetic source reports intrinsics, but the override does not match the frame size
    let pipeline = PipelineBuilder::new()
        .source_config(SourceConfig::synthetic().with_resolution(8, 6).with_fps(0))
        .mode(DepthMode::PointCloud)
        .camera(CameraInfo::new(16, 12, 525.0, 525.0, 7.5, 5.5))
        .output(depthconv::Output::Null)
        .max_frames(4)
        .build()
        .unwrap();
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let stats = pipeline.stats();
    assert_eq!(stats.frames_skipped, 4);
    assert_eq!(stats.frames_converted, 0);
}

/// Test pattern source with no calibration, like a sensor before intrinsics load
struct UncalibratedSource(SyntheticSource);

#[async_trait::async_trait]
impl DepthSource for UncalibratedSource {
    async fn start(&mut self) -> depthconv::Result<()> {
        self.0.start().await
    }

    async fn stop(&mut self) -> depthconv::Result<()> {
        self.0.stop().await
    }

    async fn next_frame(&mut self) -> depthconv::Result<SensorFrame> {
        self.0.next_frame().await
    }

    fn is_active(&self) -> bool {
        self.0.is_active()
    }

    fn resolution(&self) -> Resolution {
        self.0.resolution()
    }

    fn camera_info(&self) -> Option<CameraInfo> {
        None
    }

    fn tilt(&self) -> i32 {
        self.0.tilt()
    }

    fn set_tilt(&mut self, degrees: i32) -> depthconv::Result<i32> {
        self.0.set_tilt(degrees)
    }
}

#[tokio::test]
async fn test_point_cloud_pipeline_without_calibration_skips() {
    let source = SyntheticSource::new(SourceConfig::synthetic().with_resolution(8, 6).with_fps(0));
    let (sink, mut rx) = ChannelOutput::new(16);
    let pipeline = PipelineBuilder::new()
        .source(Box::new(UncalibratedSource(source)))
        .mode(DepthMode::PointCloud)
        .sink(Box::new(sink))
        .max_frames(3)
        .build()
        .unwrap();
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    assert!(rx.try_recv().is_err());
    let stats = pipeline.stats();
    assert_eq!(stats.frames_captured, 3);
    assert_eq!(stats.frames_skipped, 3);
    assert_eq!(stats.frames_written, 0);
}

#[tokio::test]
async fn test_uncalibrated_source_still_serves_other_modes() {
    let source = SyntheticSource::new(SourceConfig::synthetic().with_resolution(8, 6).with_fps(0));
    let pipeline = PipelineBuilder::new()
        .source(Box::new(UncalibratedSource(source)))
        .mode(DepthMode::Disparity8)
        .output(depthconv::Output::Null)
        .max_frames(3)
        .build()
        .unwrap();
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let stats = pipeline.stats();
    assert_eq!(stats.frames_skipped, 0);
    assert_eq!(stats.frames_written, 3);
}
