use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as channel;

use crate::{Error, Result};

use super::data::{FrameHash, FrameHashes};
use super::demux;
use super::extract::Extractor;
use super::hash::{FrameHasher, HashVariant};

/// Shared cancellation signal.
///
/// Cloning yields a handle to the same signal. Raised once, observed by every
/// interruptible operation in the pipeline; it is never reset.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// Cancellation scope of a single pipeline run: the caller's token plus a local
// one raised on the first worker failure, so an internal abort does not leak
// into other runs sharing the caller token.
#[derive(Clone)]
struct RunToken {
    caller: CancelToken,
    local: CancelToken,
}

impl RunToken {
    fn is_cancelled(&self) -> bool {
        self.caller.is_cancelled() || self.local.is_cancelled()
    }
}

// Read adapter that observes the run's cancellation signal on every read call,
// so an in-flight decode stops consuming bytes shortly after cancellation.
struct CancelReader<R> {
    inner: R,
    token: RunToken,
}

impl<R> CancelReader<R> {
    fn new(inner: R, token: RunToken) -> Self {
        Self { inner, token }
    }
}

impl<R: Read> Read for CancelReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.token.is_cancelled() {
            // Not ErrorKind::Interrupted: that would make callers retry the read.
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "decode cancelled",
            ));
        }
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for CancelReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Turns one video's sampled frame stream into an ordered [FrameHashes] sequence.
///
/// Frames are decoded and hashed by a fixed pool of worker threads pulling from a
/// shared queue; results are reassembled by frame index, so completion order never
/// affects the output. The first failing frame cancels the remaining work and the
/// run returns that single error - a partial sequence is never produced.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use skipintro::video::{Analyzer, CancelToken, HashVariant};
///
/// let analyzer = Analyzer::default().with_variant(HashVariant::Difference);
/// let window = Duration::from_secs(20);
/// let hashes = analyzer
///     .run("episode-1.mkv", Duration::ZERO, window, &CancelToken::new())
///     .unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct Analyzer {
    variant: HashVariant,
    fps: u32,
    workers: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            variant: HashVariant::Difference,
            fps: super::DEFAULT_FPS,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl Analyzer {
    /// Returns a new [Analyzer] with the provided hash `variant`.
    pub fn with_variant(mut self, variant: HashVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Returns a new [Analyzer] sampling at the provided `fps`.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Returns a new [Analyzer] with the provided worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn variant(&self) -> HashVariant {
        self.variant
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Extracts frames from `path` and hashes them.
    ///
    /// Samples `window` of video starting at `start`, using the external frame
    /// producer, then runs the hash pipeline over the resulting stream.
    pub fn run(
        &self,
        path: impl AsRef<Path>,
        start: Duration,
        window: Duration,
        token: &CancelToken,
    ) -> Result<FrameHashes> {
        let path = path.as_ref();
        let extractor = Extractor::new(self.variant, self.fps);

        tracing::debug!("extracting frames from {}", path.display());
        let stream = extractor.extract(path, start, window)?;

        let hashes = self.analyze_stream(&stream, window, token)?;
        tracing::debug!(
            num_hashes = hashes.len(),
            "finished hashing frames for {}",
            path.display(),
        );

        Ok(hashes)
    }

    /// Demuxes a raw frame stream and hashes every frame, in order.
    pub fn analyze_stream(
        &self,
        stream: &[u8],
        window: Duration,
        token: &CancelToken,
    ) -> Result<FrameHashes> {
        let span = tracing::span!(tracing::Level::TRACE, "analyze_stream");
        let _enter = span.enter();

        let frames = demux::split_frames(stream);
        tracing::debug!(num_frames = frames.len(), "demuxed frame stream");

        let hashes = self.hash_frames(&frames, token)?;
        Ok(FrameHashes::new(hashes, window))
    }

    fn hash_frames(&self, frames: &[&[u8]], token: &CancelToken) -> Result<Vec<FrameHash>> {
        let workers = self.workers.max(1).min(frames.len().max(1));
        let hasher = FrameHasher::new(self.variant);
        let run = RunToken {
            caller: token.clone(),
            local: CancelToken::new(),
        };

        // The queue is sized to hold every frame up front, so filling it never
        // blocks and workers drain it until it disconnects.
        let (work_tx, work_rx) = channel::bounded(frames.len());
        for work in frames.iter().copied().enumerate() {
            let _ = work_tx.send(work);
        }
        drop(work_tx);

        let (result_tx, result_rx) = channel::bounded(frames.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let run = run.clone();
                let hasher = &hasher;
                scope.spawn(move || {
                    for (index, data) in work_rx.iter() {
                        if run.is_cancelled() {
                            break;
                        }
                        let result = Self::decode_and_hash(index, data, hasher, &run);
                        let failed = result.is_err();
                        if failed {
                            run.local.cancel();
                        }
                        if result_tx.send((index, result)).is_err() || failed {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            // Sole writer of the output sequence: reassemble by frame index.
            let mut slots: Vec<Option<FrameHash>> = vec![None; frames.len()];
            for (index, result) in result_rx.iter() {
                slots[index] = Some(result?);
            }

            let mut hashes = Vec::with_capacity(frames.len());
            for slot in slots {
                match slot {
                    Some(hash) => hashes.push(hash),
                    // Workers only leave holes once the caller's token is raised.
                    None => return Err(Error::Cancelled),
                }
            }
            Ok(hashes)
        })
    }

    fn decode_and_hash(
        index: usize,
        data: &[u8],
        hasher: &FrameHasher,
        run: &RunToken,
    ) -> Result<FrameHash> {
        let reader = CancelReader::new(Cursor::new(data), run.clone());
        let image = image::io::Reader::with_format(BufReader::new(reader), image::ImageFormat::Jpeg)
            .decode()
            .map_err(|source| {
                if run.caller.is_cancelled() {
                    Error::Cancelled
                } else {
                    Error::FrameDecode {
                        frame: index,
                        source,
                    }
                }
            })?;

        hasher
            .hash(&image)
            .map_err(|source| Error::FrameHash {
                frame: index,
                source,
            })
    }
}
