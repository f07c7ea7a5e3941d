use std::path::PathBuf;

pub mod util;
pub mod video;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("frame extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("no video stream found in: {0:?}")]
    MissingVideoStream(PathBuf),
    #[error("failed to decode frame {frame}: {source}")]
    FrameDecode {
        frame: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to hash frame {frame}: {source}")]
    FrameHash {
        frame: usize,
        #[source]
        source: video::FrameRejected,
    },
    #[error("hash lengths differ: {left} != {right} bits")]
    HashLengthMismatch { left: usize, right: usize },
    #[error("source and target hash sequences must be non-empty")]
    EmptyHashSequence,
    #[error("analysis cancelled")]
    Cancelled,
    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("serde_json error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
