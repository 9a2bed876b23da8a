use std::path::PathBuf;

use anyhow::Context;
use bump_capture::image_pipeline::{
    CaptureDecoder, CaptureExporter, DecoderConfig, ExportConfig, FrameCache, TiffCompression,
    export_all, wrap_frame_index,
};
use bump_capture::logger::{self, LogConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "bump-capture",
    about = "View and export BUMP camera bin files",
    version
)]
struct Cli {
    /// Enable debug logging on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log file (default: logs/<unix time>.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every .bin file under a directory to TIFF + JSON
    Export {
        /// Directory searched recursively for .bin files
        root: PathBuf,

        /// Output directory to use instead of the location of the bin files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "none")]
        compression: CompressionArg,

        /// Accept file headers longer than the known layout
        #[arg(long)]
        lenient_header: bool,
    },

    /// Print the file header and frame geometry of a capture
    Info {
        file: PathBuf,
    },

    /// Load a capture in the background and step through its frames
    View {
        file: PathBuf,

        /// First frame to show
        #[arg(long, default_value = "0")]
        start: usize,

        /// Frames to advance per step; negative steps go backwards and wrap
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        step: isize,

        /// Number of frames to show (default: all)
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    Deflate,
}

impl From<CompressionArg> for TiffCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::Deflate => TiffCompression::Deflate,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let console_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Export { .. }, false) => "info",
        _ => "warn",
    };
    let file = if cli.no_log_file {
        None
    } else {
        Some(cli.log_file.clone().unwrap_or_else(|| {
            PathBuf::from("logs").join(format!("{}.log", chrono::Utc::now().timestamp()))
        }))
    };
    let _log_guard = logger::init(&LogConfig {
        console_level: console_level.to_string(),
        file,
        ..LogConfig::default()
    })?;

    match cli.command {
        Commands::Export {
            root,
            output_dir,
            compression,
            lenient_header,
        } => {
            info!("Exporting images from {}", root.display());
            let config = ExportConfig::builder()
                .output_dir(output_dir)
                .compression(compression.into())
                .decoder(
                    DecoderConfig::builder()
                        .strict_header_length(!lenient_header)
                        .build(),
                )
                .build();

            let report = export_all(&root, &CaptureExporter::new(config))?;
            for summary in &report.succeeded {
                println!(
                    "{} -> {} ({} pages)",
                    summary.source.display(),
                    summary.tiff_path.display(),
                    summary.pages
                );
            }
            for (path, e) in &report.failed {
                println!("{} FAILED: {}", path.display(), e);
            }
            if !report.all_succeeded() {
                anyhow::bail!(
                    "{} of {} exports failed",
                    report.failed.len(),
                    report.failed.len() + report.succeeded.len()
                );
            }
        }

        Commands::Info { file } => {
            let decoder = CaptureDecoder::open(&file)?;
            let info = decoder.info();
            let header = serde_json::to_value(decoder.file_header())?;
            println!("{}", serde_json::to_string_pretty(&header)?);
            println!(
                "{} frames of {}x{} at {} bits, {} bytes per frame",
                info.frames_in_file(),
                info.image_width(),
                info.image_height(),
                info.pixel_format().bits_per_sample(),
                info.frame_size_bytes()
            );
        }

        Commands::View {
            file,
            start,
            step,
            count,
        } => {
            let cache = FrameCache::open(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let frames = cache.frames_in_file();
            if frames == 0 {
                println!("{} holds no complete frames", file.display());
                return Ok(());
            }

            let mut index = wrap_frame_index(start, 0, frames);
            for _ in 0..count.unwrap_or(frames) {
                match cache.get_frame(index) {
                    Ok((header, frame)) => {
                        let header = serde_json::to_value(header)?;
                        println!("frame {} ({}x{}): {}", index, frame.width, frame.height, header);
                    }
                    Err(e) => {
                        error!("Cannot show frame {}: {}", index, e);
                        break;
                    }
                }
                index = wrap_frame_index(index, step, frames);
            }
        }
    }

    Ok(())
}
