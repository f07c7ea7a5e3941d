mod analyzer;
mod comparator;
mod data;
mod demux;
mod extract;
mod hash;

pub mod debug;
pub mod marker;

pub use analyzer::{Analyzer, CancelToken};
pub use comparator::{Comparator, DiagonalRun};
pub use data::{FrameHash, FrameHashes, Scene, Similarity, SimilarityMatrix};
pub use extract::{Extractor, Metadata};
pub use hash::{FrameHasher, FrameRejected, HashVariant};

/// Default hash match tolerance.
///
/// Two frame hashes are considered similar if their Hamming distance is strictly
/// below this value. Lower values demand more similar frames.
pub const DEFAULT_TOLERANCE: u32 = 13;

/// Default skip tolerance.
///
/// Number of consecutive dissimilar frames a matching run absorbs before the run
/// is considered broken. This keeps intros with short one-off cuts (station
/// idents, episode titles) in a single run.
pub const DEFAULT_SKIP_TOLERANCE: usize = 3;

/// Default sampling rate (frames per second).
///
/// How many frames are sampled out of each second of video. Raising this improves
/// the precision of the reported boundaries at the cost of decode time.
pub const DEFAULT_FPS: u32 = 3;

/// Default search window (seconds).
///
/// How much of the start of each video is scanned for a shared intro.
pub const DEFAULT_WINDOW_SECS: f32 = 20.0;
