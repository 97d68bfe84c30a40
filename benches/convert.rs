use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use depthconv::capture::test_pattern;
use depthconv::{convert, CameraInfo, ConversionParams, DepthMode, Resolution};

fn benchmark_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_vga");
    let resolution = Resolution::VGA;
    let depth = test_pattern(resolution, 0, 0);
    let camera = CameraInfo::kinect_default();
    let params = ConversionParams::default();

    for mode in DepthMode::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(mode.name()), &depth, |b, depth| {
            b.iter(|| {
                let _ = convert(black_box(depth), mode, Some(&camera), &params);
            });
        });
    }

    group.finish();
}

fn benchmark_resolutions(c: &mut Criterion) {
    let mut group = c.benchmark_group("disparity32f_by_size");
    let params = ConversionParams::default();

    let sizes = vec![
        (Resolution::QVGA, "320x240"),
        (Resolution::VGA, "640x480"),
        (Resolution::SXGA, "1280x1024"),
    ];

    for (resolution, label) in sizes {
        let depth = test_pattern(resolution, 0, 0);
        group.bench_with_input(BenchmarkId::from_parameter(label), &depth, |b, depth| {
            b.iter(|| {
                let _ = convert(black_box(depth), DepthMode::Disparity32f, None, &params);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_modes, benchmark_resolutions);
criterion_main!(benches);
