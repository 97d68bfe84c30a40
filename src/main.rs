//! depthconv CLI
//!
//! Command-line interface for inspecting and running depth conversions.

use clap::{Parser, Subcommand};
use depthconv::{
    capture::{test_pattern, DepthSource, RawFileSource},
    config::{ConversionParams, DepthConfig, SourceConfig},
    output::Output,
    CameraInfo, DepthConverter, DepthMode, PipelineBuilder, Resolution,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depthconv")]
#[command(about = "Depth Frame Conversion Engine - Normalize, Disparity, Point Cloud, Colormap")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversion modes
    Modes,

    /// Show sensor constants and default calibration
    Info {
        /// Config file to load instead of the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Convert frames from a raw depth dump and print summaries
    Convert {
        /// Raw file of little-endian u16 depth frames
        #[arg(short, long)]
        input: PathBuf,

        /// Frame width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Conversion mode
        #[arg(short, long, default_value = "normalized")]
        mode: String,

        /// Focal length x (pixels)
        #[arg(long)]
        fx: Option<f64>,

        /// Focal length y (pixels)
        #[arg(long)]
        fy: Option<f64>,

        /// Principal point x
        #[arg(long)]
        cx: Option<f64>,

        /// Principal point y
        #[arg(long)]
        cy: Option<f64>,
    },

    /// Run the conversion pipeline (type a mode name + Enter to switch)
    Run {
        /// Config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// "synthetic" or a raw depth file path
        #[arg(short, long)]
        source: Option<String>,

        /// Conversion mode
        #[arg(short, long)]
        mode: Option<String>,

        /// Stop after this many frames
        #[arg(short, long)]
        frames: Option<u64>,

        /// Log a summary every n frames
        #[arg(short, long)]
        every: Option<u64>,
    },

    /// Run conversion benchmark
    Bench {
        /// Mode to benchmark (all modes when omitted)
        #[arg(short, long)]
        mode: Option<String>,

        /// Number of frames per mode
        #[arg(short, long, default_value = "300")]
        frames: u32,

        /// Frame width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "480")]
        height: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("depthconv=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Modes => cmd_modes(),
        Commands::Info { config } => cmd_info(config),
        Commands::Convert {
            input,
            width,
            height,
            mode,
            fx,
            fy,
            cx,
            cy,
        } => cmd_convert(input, Resolution::new(width, height), mode, [fx, fy, cx, cy]).await,
        Commands::Run {
            config,
            source,
            mode,
            frames,
            every,
        } => cmd_run(config, source, mode, frames, every).await,
        Commands::Bench {
            mode,
            frames,
            width,
            height,
        } => cmd_bench(mode, frames, Resolution::new(width, height)),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<DepthConfig> {
    match path {
        Some(path) => Ok(DepthConfig::from_file(&path)?),
        None => Ok(DepthConfig::default()),
    }
}

fn cmd_modes() -> anyhow::Result<()> {
    println!("Conversion Modes");
    println!("================\n");

    for mode in DepthMode::ALL {
        println!(
            "  {:<14} {:<7} {}",
            mode.name(),
            mode.output_kind().to_string(),
            mode.description()
        );
        if !mode.aliases().is_empty() {
            println!("  {:<14} aliases: {}", "", mode.aliases().join(", "));
        }
    }

    println!("\nUsage: depthconv run --mode <name>");

    Ok(())
}

fn cmd_info(config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let params = &config.params;

    println!("depthconv {}", depthconv::VERSION);
    println!("==============\n");

    println!("=== Sensor Constants ===");
    println!("Invalid depth: {}", params.invalid_depth);
    println!("Invalid marker: {}", params.invalid_marker);
    println!("Baseline: {}", params.baseline);
    println!("Focal length: {}", params.focal_length);
    println!("Disparity numerator: {}", params.disparity_numerator());
    println!("Normalize scale: {:.6}", params.normalize_scale);
    println!("Rainbow min depth: {}", params.rainbow_min_depth);
    println!("Depth unit: {} m", params.depth_unit_m);

    let camera = config.camera.unwrap_or_default();
    println!("\n=== Calibration ===");
    println!(
        "Source: {}",
        if config.camera.is_some() {
            "config"
        } else {
            "Kinect default"
        }
    );
    println!("Resolution: {}", camera.resolution());
    println!("fx: {:.2}  fy: {:.2}", camera.fx, camera.fy);
    println!("cx: {:.2}  cy: {:.2}", camera.cx, camera.cy);

    println!("\n=== Pipeline ===");
    println!("Mode: {}", config.mode);
    println!(
        "Source: {:?} {} @ {}",
        config.source.backend, config.source.resolution, config.source.framerate
    );
    println!("Output: {:?}", config.output);

    Ok(())
}

async fn cmd_convert(
    input: PathBuf,
    resolution: Resolution,
    mode: String,
    intrinsics: [Option<f64>; 4],
) -> anyhow::Result<()> {
    let mode: DepthMode = mode.parse()?;

    let [fx, fy, cx, cy] = intrinsics;
    let camera = match fx.or(fy) {
        Some(f) => CameraInfo::new(
            resolution.width,
            resolution.height,
            fx.unwrap_or(f),
            fy.unwrap_or(f),
            cx.unwrap_or((resolution.width as f64 - 1.0) / 2.0),
            cy.unwrap_or((resolution.height as f64 - 1.0) / 2.0),
        ),
        None => CameraInfo::kinect_default().scaled_to(resolution),
    };

    let converter = DepthConverter::with_mode(mode);
    let mut source = RawFileSource::new(
        &input,
        SourceConfig::raw_file(&input).with_resolution(resolution.width, resolution.height),
    );
    source.start().await?;

    println!("Converting {} ({}) as {}\n", input.display(), resolution, mode);

    let start = std::time::Instant::now();
    let mut converted = 0u64;
    let mut skipped = 0u64;

    loop {
        let frame = match source.next_frame().await {
            Ok(frame) => frame,
            Err(e) if e.is_end_of_stream() => break,
            Err(e) => return Err(e.into()),
        };

        match converter.process(&frame.depth, &camera) {
            Ok(output) => {
                converted += 1;
                println!(
                    "  frame {:>5}: {} ({} bytes)",
                    frame.depth.sequence,
                    output.summary(),
                    output.size_bytes()
                );
            }
            Err(e) => {
                skipped += 1;
                eprintln!("  frame {:>5}: skipped ({})", frame.depth.sequence, e);
            }
        }
    }
    source.stop().await?;

    println!("\nResults:");
    println!("  Frames converted: {}", converted);
    println!("  Frames skipped: {}", skipped);
    println!("  Total time: {:.3}s", start.elapsed().as_secs_f64());

    Ok(())
}

async fn cmd_run(
    config: Option<PathBuf>,
    source: Option<String>,
    mode: Option<String>,
    frames: Option<u64>,
    every: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = load_config(config)?;

    if let Some(source) = source {
        let resolution = config.source.resolution;
        config.source = if source == "synthetic" {
            SourceConfig::synthetic()
        } else {
            SourceConfig::raw_file(source)
        }
        .with_resolution(resolution.width, resolution.height);
    }
    if let Some(mode) = mode {
        config.mode = mode.parse()?;
    }
    if let Some(every) = every {
        config.output = Output::log(every);
    }

    let mut builder = PipelineBuilder::new().config(config.clone());
    if let Some(frames) = frames {
        builder = builder.max_frames(frames);
    }
    let pipeline = builder.build()?;

    println!("Configuration:");
    println!("  Mode: {}", config.mode);
    println!("  Source: {:?}", config.source.backend);
    println!("  Resolution: {}", config.source.resolution);
    println!("  Framerate: {}", config.source.framerate);
    println!();

    pipeline.start().await?;

    println!("Pipeline started. Type a mode name to switch, Ctrl+C to stop.\n");

    pipeline
        .selector()
        .follow_lines(std::io::BufReader::new(std::io::stdin()));

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                println!("\nStopping...");
                pipeline.stop().await?;
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {
                if !pipeline.is_running() {
                    pipeline.wait().await?;
                    break;
                }
            }
        }
    }

    let stats = pipeline.stats();
    println!("\nStatistics:");
    println!("  Frames captured: {}", stats.frames_captured);
    println!("  Frames converted: {}", stats.frames_converted);
    println!("  Frames skipped: {}", stats.frames_skipped);
    println!("  Frames written: {}", stats.frames_written);
    println!("  Avg convert time: {:.3} ms", stats.avg_convert_ms);

    Ok(())
}

fn cmd_bench(mode: Option<String>, frames: u32, resolution: Resolution) -> anyhow::Result<()> {
    println!("depthconv Conversion Benchmark");
    println!("==============================\n");

    let modes = match mode {
        Some(mode) => vec![mode.parse::<DepthMode>()?],
        None => DepthMode::ALL.to_vec(),
    };
    let frames = frames.max(1);

    println!("Frames: {}", frames);
    println!("Resolution: {}", resolution);
    println!();

    let camera = CameraInfo::kinect_default().scaled_to(resolution);
    let params = ConversionParams::default();
    let depth = test_pattern(resolution, 0, 0);

    println!("Results:");
    for mode in modes {
        let converter = DepthConverter::with_mode(mode).with_params(params);

        let start = std::time::Instant::now();
        for _ in 0..frames {
            let _ = converter.process(&depth, &camera)?;
        }
        let elapsed = start.elapsed();

        let fps = frames as f64 / elapsed.as_secs_f64();
        let ms_per_frame = elapsed.as_secs_f64() * 1000.0 / frames as f64;
        println!(
            "  {:<14} {:>9.1} fps  {:>7.3} ms/frame  realtime (30fps): {}",
            mode.name(),
            fps,
            ms_per_frame,
            if fps >= 30.0 { "Yes" } else { "No" }
        );
    }

    Ok(())
}
