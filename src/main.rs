use anyhow::{Context, Result};
use clap::Parser;
use condense::batch::BatchRunner;
use condense::config::Config;
use condense::interactive::{confirm_jobs, print_summary};
use condense::jobs::plan_jobs;
use condense::{Ffmpeg, Metadata};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const PROGRESS_STEPS: u64 = 10_000;

#[derive(Parser)]
#[command(name = "condense")]
#[command(version, about = "Condense media into dialogue-only audio")]
#[command(
    long_about = "Cut the spoken parts out of video/audio files using subtitle timing and join them into one audio track. Paths may contain a single '*' in the file name to convert a whole series."
)]
struct Cli {
    /// Media file or pattern (e.g. "shows/Ep *.mkv")
    media: String,

    /// Subtitle file or pattern (defaults to a .srt/.ass next to each media file)
    #[arg(short, long)]
    subtitles: Option<String>,

    /// Output file or pattern; '*' is replaced by the media pattern's match
    #[arg(short, long)]
    output: String,

    /// Join subtitles separated by at most this many seconds
    #[arg(short, long)]
    join: Option<f64>,

    /// Seconds of audio kept before each line
    #[arg(long, allow_hyphen_values = true)]
    pre_pad: Option<f64>,

    /// Seconds of audio kept after each line
    #[arg(long, allow_hyphen_values = true)]
    post_pad: Option<f64>,

    /// Album name written to every output
    #[arg(long, default_value = "")]
    album: String,

    /// Cover image (png/jpg) written to every output
    #[arg(long)]
    album_art: Option<PathBuf>,

    /// Path to the FFmpeg executable
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Stop at the first failed job
    #[arg(long)]
    fail_fast: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Remember the FFmpeg path and options in the config file
    #[arg(long)]
    save_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(path) = &cli.ffmpeg {
        config.ffmpeg_path = path.clone();
    }
    if let Some(join) = cli.join {
        config.join_secs = join;
    }
    if let Some(pad) = cli.pre_pad {
        config.pre_pad = pad;
    }
    if let Some(pad) = cli.post_pad {
        config.post_pad = pad;
    }
    if cli.fail_fast {
        config.fail_fast = true;
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(PROGRESS_STEPS);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("Configuration validation failed")?;

    let ffmpeg = Ffmpeg::locate(&config.ffmpeg_path).context("FFmpeg check failed")?;
    debug!("Using FFmpeg at {}", ffmpeg.path().display());

    if cli.save_config {
        let path = config.save().context("Failed to save configuration")?;
        info!("Saved configuration to {}", path.display());
    }

    let jobs = plan_jobs(&cli.media, cli.subtitles.as_deref(), &cli.output)
        .context("Failed to match input files")?;

    if !cli.yes && !confirm_jobs(&jobs)? {
        anyhow::bail!("Cancelled by user");
    }

    let metadata = Metadata {
        album: cli.album.trim_end().to_string(),
        album_art: cli.album_art.clone(),
    };

    let runner = BatchRunner::new(Arc::new(ffmpeg), config.options(), &metadata)?
        .with_fail_fast(config.fail_fast);

    let cancel = runner.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let pb = progress_bar();
    let (worker, mut progress) = Arc::new(runner).spawn(jobs);

    while let Some(update) = progress.recv().await {
        pb.set_position((update.fraction() * PROGRESS_STEPS as f64) as u64);
    }

    let report = worker.await.context("Conversion worker panicked")?;

    if report.cancelled {
        pb.abandon();
    } else {
        pb.set_position(PROGRESS_STEPS);
        pb.finish();
    }

    print_summary(&report);

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
