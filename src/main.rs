use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cutout::capture::WebcamCapture;
use cutout::output::V4L2Output;
use cutout::{
    create_default_model, Background, DisplayMode, Fit, LiveConfig, LiveExit, LivePipeline,
    Segmenter, StillConfig, StillPipeline, StopSignal,
};
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to segmentation model (U2Net ONNX file)
    #[arg(long, global = true, default_value = "u2net.onnx")]
    model: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove the background, keeping transparency (PNG output)
    Remove {
        /// Input image
        input: PathBuf,

        /// Output image; a .jpg name is written as .png
        output: PathBuf,
    },

    /// Replace the background with another image
    Replace {
        /// Input image
        input: PathBuf,

        /// Replacement background image
        background: PathBuf,

        /// Output image
        output: PathBuf,

        /// How the background is scaled to the input size
        #[arg(long, value_enum, default_value_t = FitArg::Stretch)]
        fit: FitArg,

        /// Output JPEG quality (1-100)
        #[arg(short, long, default_value_t = 95)]
        quality: u8,
    },

    /// Remove the background from a live webcam feed
    Live {
        /// Input webcam device index
        #[arg(short, long, default_value_t = 0)]
        input_device: u32,

        /// Output v4l2loopback device path
        #[arg(short, long, default_value = "/dev/video10")]
        output_device: PathBuf,

        /// Capture resolution width
        #[arg(long, default_value_t = 1280)]
        capture_width: u32,

        /// Capture resolution height
        #[arg(long, default_value_t = 720)]
        capture_height: u32,

        /// Output resolution width
        #[arg(long, default_value_t = 1280)]
        output_width: u32,

        /// Output resolution height
        #[arg(long, default_value_t = 720)]
        output_height: u32,

        /// Target frames per second
        #[arg(long, default_value_t = 30)]
        fps: u32,

        /// Display background: `checker`, `checker:<cell>`, `#rrggbb`, or an image path
        #[arg(long, default_value = "checker")]
        background: String,

        /// How an image background is scaled to the frame
        #[arg(long, value_enum, default_value_t = FitArg::Stretch)]
        fit: FitArg,

        /// Show matte visualization (grayscale silhouette) instead of the composite
        #[arg(long)]
        show_matte: bool,

        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FitArg {
    Stretch,
    Cover,
}

impl From<FitArg> for Fit {
    fn from(fit: FitArg) -> Self {
        match fit {
            FitArg::Stretch => Fit::Stretch,
            FitArg::Cover => Fit::Cover,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if let Err(err) = run(args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn load_segmenter(args: &Args) -> Result<Segmenter> {
    tracing::info!("Loading segmentation model from {}", args.model.display());
    let model = create_default_model(&args.model).context("Failed to load segmentation model")?;
    Ok(Segmenter::new(model))
}

fn run(args: Args) -> Result<()> {
    let segmenter = load_segmenter(&args)?;

    match args.command {
        Command::Remove { input, output } => {
            let mut pipeline = StillPipeline::new(segmenter, StillConfig::default())?;
            let written = pipeline
                .remove_background(&input, &output)
                .context("Failed to remove background")?;
            println!("Background removed successfully! Output saved at: {}", written.display());
        }

        Command::Replace {
            input,
            background,
            output,
            fit,
            quality,
        } => {
            let config = StillConfig {
                fit: fit.into(),
                jpeg_quality: quality,
            };
            let mut pipeline = StillPipeline::new(segmenter, config)?;
            let written = pipeline
                .replace_background(&input, &background, &output)
                .context("Failed to replace background")?;
            println!("Background replaced successfully! Output saved at: {}", written.display());
        }

        Command::Live {
            input_device,
            output_device,
            capture_width,
            capture_height,
            output_width,
            output_height,
            fps,
            background,
            fit,
            show_matte,
            max_frames,
        } => {
            let config = LiveConfig {
                background: Background::parse(&background).context("Invalid background")?,
                fit: fit.into(),
                display: if show_matte {
                    DisplayMode::Matte
                } else {
                    DisplayMode::Composite
                },
                target_fps: Some(fps),
                max_frames,
                ..LiveConfig::default()
            };
            let mut pipeline = LivePipeline::new(segmenter, config)?;

            let mut output = V4L2Output::new(&output_device, output_width, output_height)
                .context("Failed to initialize v4l2loopback output")?;

            let stop = StopSignal::new();
            stop.stop_on_quit_line(BufReader::new(std::io::stdin()));
            tracing::info!(
                "Type q and press Enter to stop (Ctrl+C exits without releasing the camera cleanly)"
            );

            let summary = pipeline
                .run(
                    || WebcamCapture::new(input_device, capture_width, capture_height),
                    &mut output,
                    &stop,
                )
                .context("Live session failed")?;

            if let LiveExit::DeviceLost(reason) = &summary.exit {
                anyhow::bail!("Camera stopped delivering frames: {reason}");
            }
        }
    }

    Ok(())
}
