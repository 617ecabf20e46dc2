//! fieldmatch CLI - inverse telecine for YUV4MPEG2 streams

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fieldmatch::cadence::{catalog, CycleAnalyzer, FieldAnalysis};
use fieldmatch::filter::{Decomb, FrameKind, FrameSwitch, StaticMerge, Telecine};
use fieldmatch::format::{detect_format_from_extension, read_y4m, Y4mClip, Y4mMuxer};
use fieldmatch::util::{FieldOrder, Pixel};
use fieldmatch::{init, Config, FrameSource, MemoryClip, PipelineConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fieldmatch")]
#[command(about = "Pulldown cadence detection and adaptive inverse telecine", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Number of threads to use
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// JSON file overriding the default parameters
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Input is bottom field first
    #[arg(long, global = true)]
    bff: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the pulldown pattern of every cycle
    Analyze {
        /// Interlaced input (.y4m)
        input: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Also write the field flag overlay to this file
        #[arg(long, value_name = "FILE")]
        flags: Option<PathBuf>,
    },

    /// Reconstruct 24p frames
    Telecine {
        /// Interlaced input (.y4m)
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Smooth residual combing
        #[arg(long)]
        decomb: bool,

        /// Paint the blocks still combed after decombing
        #[arg(long, requires = "decomb")]
        show_blocks: bool,
    },

    /// Mix 24p reconstruction with a native-rate clip
    Switch {
        /// Interlaced input (.y4m)
        input: PathBuf,

        /// Native-rate clip made from the same input (.y4m, two frames per input frame)
        #[arg(short, long)]
        native: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Keep still blocks of the interlaced source in a native-rate clip
    Merge {
        /// Interlaced input (.y4m)
        input: PathBuf,

        /// Native-rate clip made from the same input (.y4m, two frames per input frame)
        #[arg(short, long)]
        native: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the effective parameters as JSON
    #[command(name = "config")]
    Params,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config {
        max_threads: cli.threads,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    init(config)?;

    info!("fieldmatch v{}", fieldmatch::VERSION);

    let params = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let order = if cli.bff {
        FieldOrder::BottomFieldFirst
    } else {
        FieldOrder::TopFieldFirst
    };

    match cli.command {
        Commands::Analyze { input, json, flags } => {
            match open(&input, order)? {
                Y4mClip::Eight(clip) => cmd_analyze(clip, &params, json, flags.as_deref())?,
                Y4mClip::Deep(clip) => cmd_analyze(clip, &params, json, flags.as_deref())?,
            }
        }
        Commands::Telecine {
            input,
            output,
            decomb,
            show_blocks,
        } => match open(&input, order)? {
            Y4mClip::Eight(clip) => cmd_telecine(clip, &params, &output, decomb, show_blocks)?,
            Y4mClip::Deep(clip) => cmd_telecine(clip, &params, &output, decomb, show_blocks)?,
        },
        Commands::Switch {
            input,
            native,
            output,
        } => match (open(&input, order)?, open(&native, order)?) {
            (Y4mClip::Eight(clip), Y4mClip::Eight(native)) => {
                cmd_switch(clip, native, &params, &output)?
            }
            (Y4mClip::Deep(clip), Y4mClip::Deep(native)) => {
                cmd_switch(clip, native, &params, &output)?
            }
            _ => bail!("input and native clips must have the same bit depth"),
        },
        Commands::Merge {
            input,
            native,
            output,
        } => match (open(&input, order)?, open(&native, order)?) {
            (Y4mClip::Eight(clip), Y4mClip::Eight(native)) => {
                cmd_merge(clip, native, &params, &output)?
            }
            (Y4mClip::Deep(clip), Y4mClip::Deep(native)) => {
                cmd_merge(clip, native, &params, &output)?
            }
            _ => bail!("input and native clips must have the same bit depth"),
        },
        Commands::Params => {
            println!("{}", params.to_json()?);
        }
    }

    Ok(())
}

fn open(path: &Path, order: FieldOrder) -> anyhow::Result<Y4mClip> {
    if detect_format_from_extension(&path.to_string_lossy()).is_none() {
        warn!("{} does not look like a Y4M file", path.display());
    }
    let clip = read_y4m(path, order).with_context(|| format!("reading {}", path.display()))?;
    let info = clip.info();
    info!(
        "{}: {}x{}, {} frames, {}-bit, {:?}",
        path.display(),
        info.width,
        info.height,
        info.num_frames,
        info.bit_depth,
        info.field_order
    );
    Ok(clip)
}

fn cmd_analyze<T: Pixel>(
    clip: MemoryClip<T>,
    params: &PipelineConfig,
    json: bool,
    flags: Option<&Path>,
) -> anyhow::Result<()> {
    let clip = Arc::new(clip);
    let track = CycleAnalyzer::new(Arc::clone(&clip), catalog(), &params.analysis).analyze_all()?;
    let report = track.report(catalog());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Cycles: {}", report.len());
        println!();
        for line in &report {
            let kind = if line.progressive { "progressive" } else { "film" };
            println!(
                "{:6}  {:>2}  {:<20} {:<11} cost {:.3}",
                line.cycle, line.pattern, line.name, kind, line.cost
            );
        }
    }

    if let Some(path) = flags {
        let fields = FieldAnalysis::new(Arc::clone(&clip), &params.analysis);
        let mut muxer = Y4mMuxer::create(path, &clip.info())?;
        for n in 0..clip.num_frames() as i64 {
            muxer.write_frame(&fields.visualize(n)?)?;
        }
        info!("wrote {} flag frames to {}", muxer.frames_written(), path.display());
    }
    Ok(())
}

fn cmd_telecine<T: Pixel>(
    clip: MemoryClip<T>,
    params: &PipelineConfig,
    output: &Path,
    decomb: bool,
    show_blocks: bool,
) -> anyhow::Result<()> {
    let clip = Arc::new(clip);
    let track = CycleAnalyzer::new(Arc::clone(&clip), catalog(), &params.analysis).analyze_all()?;
    let telecine = Telecine::new(clip, track, catalog(), params.telecine);

    if !decomb {
        fieldmatch::format::write_y4m(output, &telecine)?;
        return Ok(());
    }

    let decomb = Decomb::new(telecine, params.decomb)?;
    let info = decomb.info();
    let mut muxer = Y4mMuxer::create(output, &info)?;
    let mut dirty = 0;
    for n in 0..info.num_frames as i64 {
        let out = decomb.process(n)?;
        if !out.blocks.is_clean() {
            dirty += 1;
        }
        if show_blocks {
            muxer.write_frame(&decomb.paint_blocks(&out))?;
        } else {
            muxer.write_frame(&out.frame)?;
        }
    }
    info!(
        "wrote {} frames to {}, {} with residual combing",
        muxer.frames_written(),
        output.display(),
        dirty
    );
    Ok(())
}

fn cmd_switch<T: Pixel>(
    clip: MemoryClip<T>,
    native: MemoryClip<T>,
    params: &PipelineConfig,
    output: &Path,
) -> anyhow::Result<()> {
    let clip = Arc::new(clip);
    let track = Arc::new(
        CycleAnalyzer::new(Arc::clone(&clip), catalog(), &params.analysis).analyze_all()?,
    );
    let telecine = Telecine::new(clip, Arc::clone(&track), catalog(), params.telecine);
    let film = Decomb::new(telecine, params.decomb)?;
    let switch = FrameSwitch::new(native, film, track, catalog(), params.switch)?;

    let info = switch.info();
    let mut muxer = Y4mMuxer::create(output, &info)?;
    let mut counts = [0usize; 3];
    for n in 0..info.num_frames as i64 {
        let out = switch.select(n)?;
        counts[match out.kind {
            FrameKind::Native => 0,
            FrameKind::Film => 1,
            FrameKind::Blended => 2,
        }] += 1;
        muxer.write_frame(&out.frame)?;
    }
    info!(
        "wrote {} frames to {}: {} native, {} film, {} blended",
        muxer.frames_written(),
        output.display(),
        counts[0],
        counts[1],
        counts[2]
    );
    Ok(())
}

fn cmd_merge<T: Pixel>(
    clip: MemoryClip<T>,
    native: MemoryClip<T>,
    params: &PipelineConfig,
    output: &Path,
) -> anyhow::Result<()> {
    let merge = StaticMerge::new(native, clip, params.static_merge)?;
    let info = merge.info();
    let mut muxer = Y4mMuxer::create(output, &info)?;
    let (mut still, mut total) = (0, 0);
    for n in 0..info.num_frames as i64 {
        let out = merge.process(n)?;
        if n % 2 == 0 {
            still += out.deviation.static_blocks(merge.threshold());
            total += out.deviation.blocks_x() * out.deviation.blocks_y();
        }
        muxer.write_frame(&out.frame)?;
    }
    info!(
        "wrote {} frames to {}, {} of {} source blocks static",
        muxer.frames_written(),
        output.display(),
        still,
        total
    );
    Ok(())
}
