use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, CommandFactory, ErrorKind, Parser};

use skipintro::util;
use skipintro::video::{self, Analyzer, CancelToken, Comparator, HashVariant, Metadata};

#[derive(clap::ValueEnum, Clone, Debug)]
enum HashType {
    Difference,
    Average,
    Perceptual,
}

impl From<HashType> for HashVariant {
    fn from(hash_type: HashType) -> Self {
        match hash_type {
            HashType::Difference => HashVariant::Difference,
            HashType::Average => HashVariant::Average,
            HashType::Perceptual => HashVariant::Perceptual,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(
        long,
        value_parser = clap::value_parser!(PathBuf),
        help = "Video file that contains the segment to look for."
    )]
    source: PathBuf,

    #[clap(
        long,
        value_parser = clap::value_parser!(PathBuf),
        help = "Video file to locate the segment in."
    )]
    target: PathBuf,

    #[clap(
        long,
        default_value_t = video::DEFAULT_WINDOW_SECS,
        value_parser = clap::value_parser!(f32),
        help = "How many seconds from the start of each file to search."
    )]
    duration: f32,

    #[clap(
        long,
        value_enum,
        default_value = "difference",
        help = "Perceptual hash variant used to compare frames."
    )]
    hash_type: HashType,

    #[clap(
        long,
        default_value_t = video::DEFAULT_TOLERANCE,
        value_parser = clap::value_parser!(u32),
        help = "How similar two frames must be to count as a match. Lower values demand more similar frames."
    )]
    tolerance: u32,

    #[clap(
        long,
        default_value_t = video::DEFAULT_SKIP_TOLERANCE,
        value_parser = clap::value_parser!(usize),
        help = "How many consecutive dissimilar frames a matching run absorbs before it is considered broken."
    )]
    skip_tolerance: usize,

    #[clap(
        long,
        default_value_t = video::DEFAULT_FPS,
        value_parser = clap::value_parser!(u32),
        help = "How many frame samples are taken per second of video."
    )]
    fps: u32,

    #[clap(
        long,
        value_parser = clap::value_parser!(usize),
        help = "Worker threads used to hash each file. Defaults to the available parallelism."
    )]
    workers: Option<usize>,

    #[clap(
        long,
        action(ArgAction::SetTrue),
        help = "Write an EDL skip marker next to the target."
    )]
    edl: bool,

    #[clap(
        long,
        action(ArgAction::SetTrue),
        help = "Write an M3U playlist next to the target that plays around the detected segment."
    )]
    m3u: bool,

    #[clap(
        long,
        value_parser = clap::value_parser!(PathBuf),
        help = "Render the similarity matrix to this path as a PNG."
    )]
    debug_image: Option<PathBuf>,

    #[clap(long, action(ArgAction::SetTrue), help = "Enable debug logging.")]
    debug: bool,
}

impl Cli {
    fn validate(&self) {
        let mut cmd = Cli::command();
        if !self.duration.is_finite() || self.duration <= 0.0 {
            cmd.error(ErrorKind::InvalidValue, "duration must be a positive number")
                .exit();
        }
        if self.tolerance == 0 {
            cmd.error(ErrorKind::InvalidValue, "tolerance must be greater than 0")
                .exit();
        }
        if self.fps == 0 {
            cmd.error(ErrorKind::InvalidValue, "fps must be greater than 0")
                .exit();
        }
        if self.workers == Some(0) {
            cmd.error(ErrorKind::InvalidValue, "workers must be greater than 0")
                .exit();
        }
        for path in [&self.source, &self.target] {
            if !path.exists() {
                cmd.error(
                    ErrorKind::InvalidValue,
                    format!("file not found: {}", path.display()),
                )
                .exit();
            }
            if !util::is_valid_video_file(path) {
                cmd.error(
                    ErrorKind::InvalidValue,
                    format!("not a valid video file: {}", path.display()),
                )
                .exit();
            }
        }
    }

    // Probe both files and refuse windows that extend past the end of a file.
    fn check_durations(&self, window: Duration) {
        for path in [&self.source, &self.target] {
            match Metadata::probe(path) {
                Ok(meta) => {
                    tracing::debug!(
                        width = meta.width,
                        height = meta.height,
                        frame_rate = meta.frame_rate,
                        "probed {}",
                        path.display(),
                    );
                    if meta.duration < window {
                        let mut cmd = Cli::command();
                        cmd.error(
                            ErrorKind::InvalidValue,
                            format!(
                                "{} is shorter ({}) than the search window",
                                path.display(),
                                util::format_time(meta.duration)
                            ),
                        )
                        .exit();
                    }
                }
                Err(err) => {
                    tracing::warn!("could not probe {}: {}", path.display(), err);
                }
            }
        }
    }
}

fn main() -> skipintro::Result<()> {
    let args = Cli::parse();

    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    args.validate();

    let window = Duration::from_secs_f32(args.duration);
    args.check_durations(window);

    let analyzer = Analyzer::default()
        .with_variant(args.hash_type.clone().into())
        .with_fps(args.fps);
    let analyzer = match args.workers {
        Some(workers) => analyzer.with_workers(workers),
        None => analyzer,
    };

    // Both files are analyzed concurrently; the first failure cancels the
    // sibling run.
    let token = CancelToken::new();
    let analyze = |path: &Path| {
        let result = analyzer.run(path, Duration::ZERO, window, &token);
        if result.is_err() {
            token.cancel();
        }
        result
    };

    let (source_hashes, target_hashes) = std::thread::scope(|scope| {
        let source = scope.spawn(|| analyze(&args.source));
        let target = scope.spawn(|| analyze(&args.target));
        (
            source.join().expect("source analysis panicked"),
            target.join().expect("target analysis panicked"),
        )
    });
    let source_hashes = source_hashes?;
    let target_hashes = target_hashes?;

    tracing::debug!(
        source_hashes = source_hashes.len(),
        target_hashes = target_hashes.len(),
        "finished analysis"
    );

    let comparator = Comparator::default()
        .with_tolerance(args.tolerance)
        .with_skip_tolerance(args.skip_tolerance);
    let scene = comparator.compare(&source_hashes, &target_hashes)?;

    println!(
        "Intro: {} - {} (target frames {}..{})",
        util::format_time(scene.start),
        util::format_time(scene.end),
        scene.similarity.start_index,
        scene.similarity.end_index,
    );

    if let Some(path) = &args.debug_image {
        video::debug::write_matrix_image(path, &scene.similarity.matrix, args.fps)?;
        println!("Similarity matrix written to {}", path.display());
    }
    if args.edl {
        let path = video::marker::write_edl(&args.target, &scene)?;
        println!("EDL marker written to {}", path.display());
    }
    if args.m3u {
        let path = video::marker::write_m3u(&args.target, &scene)?;
        println!("M3U playlist written to {}", path.display());
    }

    Ok(())
}
