use std::{path::PathBuf, sync::Arc};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use isplit::{
    Bounds, ClipNaming, ClipTable, ContainerWriter, FailurePolicy, FfmpegLogLevel, FrameSource,
    OperationType, ProgressCallback, ProgressInfo, SegmentOptions, SplitOptions, Splitter,
    TrailingFlush, VideoPackets, segment_with_options,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  isplit split file.avi -o clips/file_out\n  isplit split file.avi -o clips/file_out -b 3 -e 8 --progress\n  isplit plan file.avi --json\n  isplit completions zsh > _isplit";

const SPLIT_AFTER_HELP: &str = "Extracts individual clips from a video, one per run of frames between two
I-frames (keyframes). Useful for pulling specific clips out of a longer
video, for example before I-frame moshing.

Each clip is written to <PREFIX>-<N>.<EXT>, where N is the ordinal of the
I-frame that closes the clip and EXT is the input's extension unless
--extension is given. Do not put an extension in the prefix.

-b/--begin and -e/--end select a range of I-frame ordinals (both inclusive,
counting from 1). Cuts only ever happen at I-frames: a range never produces
a partial clip. The clip left open when the video ends without a closing
I-frame is written even when it lies outside the range, unless
--flush within-bounds is given.

Examples:
  isplit split file.avi -o file_out
  isplit split file.avi -o file_out -b 3 -e 8
  isplit split file.mkv -o out/scene --keep-going --overwrite";

#[derive(Debug, Parser)]
#[command(
    name = "isplit",
    version,
    about = "Split videos into clips at keyframe (I-frame) boundaries",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while writing clips.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum FlushArg {
    /// Always write the clip left open at the end of the video.
    #[default]
    Unconditional,
    /// Only write it when its ordinal lies inside --begin/--end.
    WithinBounds,
}

impl From<FlushArg> for TrailingFlush {
    fn from(value: FlushArg) -> Self {
        match value {
            FlushArg::Unconditional => TrailingFlush::Unconditional,
            FlushArg::WithinBounds => TrailingFlush::WithinBounds,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct SegmentArgs {
    /// Input video path.
    input: PathBuf,

    /// Ordinal of the I-frame at which to begin clipping (inclusive).
    #[arg(short, long)]
    begin: Option<u64>,

    /// Ordinal of the I-frame at which to stop clipping (inclusive).
    #[arg(short, long)]
    end: Option<u64>,

    /// How the clip left open at the end of the video is treated.
    #[arg(long, value_enum, default_value_t = FlushArg::Unconditional)]
    flush: FlushArg,
}

impl SegmentArgs {
    fn segment_options(&self) -> SegmentOptions {
        SegmentOptions::new()
            .with_bounds(Bounds::new(self.begin, self.end))
            .with_trailing_flush(self.flush.into())
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write one clip per keyframe interval.
    #[command(about = "Split a video into clips", after_help = SPLIT_AFTER_HELP)]
    Split {
        #[command(flatten)]
        segment: SegmentArgs,

        /// Output path prefix; clips are written to <PREFIX>-<N>.<EXT>.
        #[arg(short, long)]
        output: String,

        /// Container extension for the clips (defaults to the input's).
        #[arg(long)]
        extension: Option<String>,

        /// Keep writing the remaining clips after one fails.
        #[arg(long)]
        keep_going: bool,

        /// Print the clips that would be written without writing them.
        #[arg(long)]
        dry_run: bool,

        /// Print results as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the clip table without writing anything.
    #[command(
        about = "Show the clips a split would produce",
        after_help = "Examples:\n  isplit plan file.avi\n  isplit plan file.avi -b 2 -e 4 --json"
    )]
    Plan {
        #[command(flatten)]
        segment: SegmentArgs,

        /// Print the table as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn default_log_filter(verbose: bool) -> &'static str {
    if verbose { "isplit=debug" } else { "info" }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        isplit::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn open_and_segment(
    args: &SegmentArgs,
) -> Result<(VideoPackets, ClipTable), Box<dyn std::error::Error>> {
    let packets = VideoPackets::open(&args.input)?;
    let table = segment_with_options(packets.frames(), &args.segment_options());
    log::debug!("Clip table:\n{table}");
    Ok((packets, table))
}

fn table_json(table: &ClipTable, naming: Option<&ClipNaming>) -> serde_json::Value {
    let clips: Vec<_> = table
        .iter()
        .map(|(ordinal, descriptor)| {
            json!({
                "ordinal": ordinal,
                "start_index": descriptor.start_index,
                "frame_count": descriptor.frame_count,
                "path": naming.map(|naming| naming.path_for(ordinal).display().to_string()),
            })
        })
        .collect();
    json!({ "clips": clips })
}

fn print_plan(packets: &VideoPackets, table: &ClipTable, naming: Option<&ClipNaming>) {
    println!(
        "{} {} ({} frames, {} keyframes, {})",
        "input".cyan().bold(),
        packets.path().display(),
        packets.frame_count(),
        packets.keyframe_count(),
        packets.codec_name(),
    );
    if table.is_empty() {
        println!("{}", "no clips in range".yellow());
        return;
    }
    for (ordinal, descriptor) in table.iter() {
        let target = naming
            .map(|naming| format!(" -> {}", naming.path_for(ordinal).display()))
            .unwrap_or_default();
        println!("  [{ordinal}] {descriptor}{target}");
    }
}

fn check_destinations(
    table: &ClipTable,
    naming: &ClipNaming,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    for (ordinal, descriptor) in table.iter() {
        let path = naming.path_for(ordinal);
        if descriptor.is_empty() || !path.exists() {
            continue;
        }
        if !overwrite {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("overwriting {}", path.display()).yellow()
        );
    }
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(clip_count: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(clip_count);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }

    /// Leave the bar in a final state before anything else is printed.
    fn settle(&self, succeeded: bool) {
        if succeeded {
            self.bar.finish_with_message("done");
        } else {
            self.bar.abandon_with_message("failed");
        }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.operation != OperationType::ClipExtraction {
            return;
        }
        self.bar.set_position(info.current);
        if let Some(ordinal) = info.current_clip {
            self.bar.set_message(format!("clip {ordinal}"));
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Plan { segment, json } => {
            let (packets, table) = open_and_segment(&segment)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table_json(&table, None))?);
            } else {
                print_plan(&packets, &table, None);
            }
        }
        Commands::Split {
            segment,
            output,
            extension,
            keep_going,
            dry_run,
            json,
        } => {
            let naming = match extension {
                Some(extension) => ClipNaming::new(output, extension)?,
                None => ClipNaming::for_input(output, &segment.input)?,
            };

            let (packets, table) = open_and_segment(&segment)?;

            if dry_run {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&table_json(&table, Some(&naming)))?
                    );
                } else {
                    print_plan(&packets, &table, Some(&naming));
                }
                return Ok(());
            }

            check_destinations(&table, &naming, cli.global.overwrite)?;

            let failure_policy = if keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Halt
            };
            let mut options = SplitOptions::new()
                .with_segment_options(segment.segment_options())
                .with_failure_policy(failure_policy)
                .with_overwrite(cli.global.overwrite);

            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new(table.len() as u64)?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let mut writer = ContainerWriter::new(&packets).with_overwrite(cli.global.overwrite);
            let result = Splitter::new(naming)
                .with_options(options)
                .run(&packets, &mut writer, &table);

            if let Some(progress) = &progress {
                progress.settle(result.is_ok());
            }
            let report = result?;

            if json {
                let payload = json!({
                    "written": report.written.iter().map(|clip| json!({
                        "ordinal": clip.ordinal,
                        "path": clip.path.display().to_string(),
                        "start_index": clip.descriptor.start_index,
                        "frame_count": clip.descriptor.frame_count,
                    })).collect::<Vec<_>>(),
                    "skipped": report.skipped,
                    "failed": report.failed.iter().map(|clip| json!({
                        "ordinal": clip.ordinal,
                        "path": clip.path.display().to_string(),
                        "error": clip.error.to_string(),
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for clip in &report.written {
                    println!("{} {}", "saved".green().bold(), clip.path.display());
                }
                for clip in &report.failed {
                    eprintln!(
                        "{} clip {} ({}): {}",
                        "failed".red().bold(),
                        clip.ordinal,
                        clip.path.display(),
                        clip.error
                    );
                }
            }

            if !report.is_success() {
                return Err(format!("{} clip(s) failed", report.failed.len()).into());
            }

            if !json {
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Wrote {} clip(s), {} frame(s)",
                        report.written.len(),
                        report.frames_written()
                    )
                    .green()
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "isplit", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
