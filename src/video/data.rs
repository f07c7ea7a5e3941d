use std::time::Duration;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{Error, Result};

/// A fixed-length perceptual hash of a single sampled frame.
///
/// Hashes are compared with [FrameHash::distance], the Hamming distance over the
/// raw hash bits. Visually similar frames produce hashes with a small distance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameHash {
    bits: Box<[u8]>,
}

impl FrameHash {
    pub fn new(bits: impl Into<Box<[u8]>>) -> Self {
        Self { bits: bits.into() }
    }

    /// Returns the hash length in bits.
    pub fn num_bits(&self) -> usize {
        self.bits.len() * 8
    }

    /// Returns the Hamming distance to `other`.
    ///
    /// The distance is symmetric and ranges from 0 (identical) to [Self::num_bits]
    /// (no bit in common). Hashes of different lengths cannot be compared.
    pub fn distance(&self, other: &Self) -> Result<u32> {
        if self.bits.len() != other.bits.len() {
            return Err(Error::HashLengthMismatch {
                left: self.num_bits(),
                right: other.num_bits(),
            });
        }
        Ok(self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }
}

/// The ordered hash sequence for one sampled video window.
///
/// Hashes appear in temporal order, one per sampled frame. The sampling window
/// duration is kept alongside the data so that frame offsets can be mapped back
/// to wall-clock time.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameHashes {
    hashes: Vec<FrameHash>,
    window: Duration,
}

impl FrameHashes {
    pub fn new(hashes: Vec<FrameHash>, window: Duration) -> Self {
        Self { hashes, window }
    }

    pub fn hashes(&self) -> &[FrameHash] {
        &self.hashes
    }

    /// Duration of the sampling window the hashes were taken from.
    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Boolean similarity grid between two hash sequences.
///
/// `cell[i][j]` is true iff the distance between source hash `i` and target hash
/// `j` is strictly below the tolerance the matrix was built with. Rows span the
/// source sequence, columns the target sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimilarityMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl SimilarityMatrix {
    /// Builds the full similarity grid from two hash sequences.
    pub fn from_hashes(
        source: &[FrameHash],
        target: &[FrameHash],
        tolerance: u32,
    ) -> Result<Self> {
        let (rows, cols) = (source.len(), target.len());

        let build_row = |hash: &FrameHash| -> Result<Vec<bool>> {
            target
                .iter()
                .map(|other| Ok(hash.distance(other)? < tolerance))
                .collect()
        };

        #[cfg(feature = "rayon")]
        let row_data = source.par_iter().map(build_row).collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "rayon"))]
        let row_data = source.iter().map(build_row).collect::<Result<Vec<_>>>()?;

        let mut cells = Vec::with_capacity(rows * cols);
        for row in row_data {
            cells.extend(row);
        }

        Ok(Self { rows, cols, cells })
    }

    pub(crate) fn from_cells(rows: usize, cols: usize, cells: Vec<bool>) -> Self {
        assert_eq!(cells.len(), rows * cols);
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col]
    }

    /// Bounds-tolerant lookup: any out-of-range coordinate reads as false.
    pub(crate) fn get_signed(&self, row: isize, col: isize) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        let (row, col) = (row as usize, col as usize);
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }
}

/// Where the best matching run sits in the similarity grid.
///
/// `start_index..end_index` is the matched column (target frame) range.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Similarity {
    pub matrix: SimilarityMatrix,
    pub start_index: usize,
    pub end_index: usize,
}

/// The detected shared segment, mapped to wall-clock offsets in the target.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub start: Duration,
    pub end: Duration,
    pub similarity: Similarity,
}
