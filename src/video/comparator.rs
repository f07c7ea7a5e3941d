use std::time::Duration;

use crate::{Error, Result};

use super::data::{FrameHashes, Scene, Similarity, SimilarityMatrix};

/// The best matching run found along one similarity-matrix diagonal.
///
/// `end_row`/`end_col` are the coordinates of the last matching step; `matched`
/// is the run length including any tolerated misses between matches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DiagonalRun {
    pub matched: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl DiagonalRun {
    /// First target frame offset covered by the run.
    pub fn target_begin(&self) -> usize {
        if self.matched == 0 {
            0
        } else {
            self.end_col + 1 - self.matched
        }
    }
}

/// Compares two [FrameHashes] sequences and locates the longest shared segment.
///
/// The search walks every diagonal of the similarity grid: two sequences that
/// advance in lockstep trace a diagonal, so the longest near-diagonal run of
/// similar frames is the shared segment. A one-cell neighborhood absorbs
/// sampling-phase offsets between the two files, and a bounded number of
/// consecutive misses is tolerated so brief hashing noise does not split a run.
#[derive(Clone, Debug)]
pub struct Comparator {
    tolerance: u32,
    skip_tolerance: usize,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            tolerance: super::DEFAULT_TOLERANCE,
            skip_tolerance: super::DEFAULT_SKIP_TOLERANCE,
        }
    }
}

impl Comparator {
    /// Returns a new [Comparator] with the provided hash match `tolerance`.
    pub fn with_tolerance(mut self, tolerance: u32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Returns a new [Comparator] absorbing up to `skip_tolerance` consecutive
    /// dissimilar frames inside a run.
    pub fn with_skip_tolerance(mut self, skip_tolerance: usize) -> Self {
        self.skip_tolerance = skip_tolerance;
        self
    }

    /// Finds the longest shared segment between `source` and `target`.
    ///
    /// Returns the segment mapped to wall-clock offsets within the target's
    /// sampling window, along with the similarity grid and the matched frame
    /// range. Either sequence being empty is an error; a valid grid with no
    /// similar cells yields a zero-length [Scene].
    pub fn compare(&self, source: &FrameHashes, target: &FrameHashes) -> Result<Scene> {
        let span = tracing::span!(tracing::Level::TRACE, "compare");
        let _enter = span.enter();

        if source.is_empty() || target.is_empty() {
            return Err(Error::EmptyHashSequence);
        }

        let matrix =
            SimilarityMatrix::from_hashes(source.hashes(), target.hashes(), self.tolerance)?;

        let run = self.find_longest_run(&matrix);
        tracing::debug!(
            max_run = run.matched,
            end_row = run.end_row,
            end_col = run.end_col,
            "finished diagonal search"
        );

        let begin = run.target_begin();
        let (start, end) = scene_bounds(begin, run.matched, target.window(), target.len());

        Ok(Scene {
            start,
            end,
            similarity: Similarity {
                matrix,
                start_index: begin,
                end_index: begin + run.matched,
            },
        })
    }

    /// Finds the longest tolerant run over all diagonals of the grid.
    ///
    /// Diagonals are seeded from the entire first column and the entire first
    /// row (skipping the shared origin), since either sequence may lead the
    /// other in time. Each cell is visited once per family, so the whole search
    /// is O(rows * cols).
    pub fn find_longest_run(&self, matrix: &SimilarityMatrix) -> DiagonalRun {
        let mut best = DiagonalRun::default();

        for row in 0..matrix.rows() {
            self.walk_diagonal(matrix, row, 0, &mut best);
        }
        for col in 1..matrix.cols() {
            self.walk_diagonal(matrix, 0, col, &mut best);
        }

        best
    }

    fn walk_diagonal(
        &self,
        matrix: &SimilarityMatrix,
        start_row: usize,
        start_col: usize,
        best: &mut DiagonalRun,
    ) {
        let (mut row, mut col) = (start_row, start_col);
        // Length of the current flow, including tolerated misses.
        let mut run = 0usize;
        let mut misses = 0usize;
        let mut in_flow = false;

        while row < matrix.rows() && col < matrix.cols() {
            let (r, c) = (row as isize, col as isize);
            // A step matches if its own cell is similar or any diagonal-adjacent
            // neighbor is, absorbing a one-frame sampling-phase offset.
            let matched = matrix.get(row, col)
                || matrix.get_signed(r - 1, c + 1)
                || matrix.get_signed(r + 1, c - 1)
                || matrix.get_signed(r, c - 1)
                || matrix.get_signed(r - 1, c);

            if matched {
                run += 1;
                misses = 0;
                in_flow = true;
                // The best is only re-sampled on a match, so trailing tolerated
                // misses never inflate the reported run.
                if run > best.matched {
                    *best = DiagonalRun {
                        matched: run,
                        end_row: row,
                        end_col: col,
                    };
                }
            } else if in_flow {
                misses += 1;
                if misses > self.skip_tolerance {
                    // Flow is broken; later matches on this diagonal start over.
                    run = 0;
                    misses = 0;
                    in_flow = false;
                } else {
                    run += 1;
                }
            }

            row += 1;
            col += 1;
        }
    }
}

// Maps a matched frame range onto wall-clock offsets. Sub-second precision is
// kept here; truncation to whole seconds is left to output formatting.
fn scene_bounds(
    begin: usize,
    matched: usize,
    window: Duration,
    frame_count: usize,
) -> (Duration, Duration) {
    let per_frame = window.as_secs_f64() / frame_count as f64;
    let start = Duration::from_secs_f64(per_frame * begin as f64);
    let end = start + Duration::from_secs_f64(per_frame * matched as f64);
    (start, end)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::video::data::FrameHash;

    fn matrix(rows: usize, cols: usize, similar: &[(usize, usize)]) -> SimilarityMatrix {
        let mut cells = vec![false; rows * cols];
        for &(row, col) in similar {
            cells[row * cols + col] = true;
        }
        SimilarityMatrix::from_cells(rows, cols, cells)
    }

    fn hashes(values: &[u8], window: Duration) -> FrameHashes {
        FrameHashes::new(
            values.iter().map(|v| FrameHash::new(vec![*v])).collect(),
            window,
        )
    }

    #[test]
    fn test_plain_diagonal_run() {
        let comparator = Comparator::default();
        let m = matrix(5, 5, &[(0, 0), (1, 1), (2, 2)]);

        let run = comparator.find_longest_run(&m);
        assert_eq!(run.matched, 3);
        assert_eq!(run.end_col, 2);
        assert_eq!(run.target_begin(), 0);
    }

    #[test]
    fn test_gap_within_skip_tolerance_keeps_flow() {
        let comparator = Comparator::default().with_skip_tolerance(3);
        let m = matrix(5, 5, &[(0, 0), (4, 4)]);

        let run = comparator.find_longest_run(&m);
        assert_eq!(run.matched, 5);
        assert_eq!(run.end_row, 4);
        assert_eq!(run.end_col, 4);
        assert_eq!(run.target_begin(), 0);
    }

    #[test]
    fn test_gap_beyond_skip_tolerance_breaks_flow() {
        let comparator = Comparator::default().with_skip_tolerance(2);
        let m = matrix(5, 5, &[(0, 0), (4, 4)]);

        let run = comparator.find_longest_run(&m);
        assert!(run.matched < 5, "flow should break, got {}", run.matched);
    }

    #[test]
    fn test_left_started_diagonals_are_searched() {
        let comparator = Comparator::default();
        let m = matrix(3, 5, &[(0, 2), (1, 3), (2, 4)]);

        let run = comparator.find_longest_run(&m);
        assert_eq!(run.matched, 3);
        assert_eq!(run.end_col, 4);
        assert_eq!(run.target_begin(), 2);
    }

    #[test]
    fn test_top_started_diagonals_are_searched() {
        let comparator = Comparator::default();
        let m = matrix(5, 3, &[(2, 0), (3, 1), (4, 2)]);

        let run = comparator.find_longest_run(&m);
        assert_eq!(run.matched, 3);
        assert_eq!(run.end_row, 4);
        assert_eq!(run.end_col, 2);
        assert_eq!(run.target_begin(), 0);
    }

    #[test]
    fn test_neighbor_cells_count_as_matches() {
        let comparator = Comparator::default();
        let m = matrix(2, 2, &[(0, 0)]);

        // (1, 0) and (0, 1) both see (0, 0) as a diagonal-adjacent neighbor, but
        // no longer run exists anywhere.
        let run = comparator.find_longest_run(&m);
        assert_eq!(run.matched, 1);
        assert_eq!((run.end_row, run.end_col), (0, 0));
    }

    #[test]
    fn test_all_dissimilar_yields_zero_run() {
        let comparator = Comparator::default();
        let m = matrix(4, 4, &[]);

        let run = comparator.find_longest_run(&m);
        assert_eq!(run, DiagonalRun::default());
        assert_eq!(run.target_begin(), 0);
    }

    #[test]
    fn test_scene_bounds_maps_frames_to_time() {
        let (start, end) = scene_bounds(10, 6, Duration::from_secs(20), 40);
        assert_eq!(start, Duration::from_secs(5));
        assert_eq!(end, Duration::from_secs(8));
    }

    #[test]
    fn test_scene_bounds_keeps_subsecond_precision() {
        let (start, end) = scene_bounds(1, 1, Duration::from_secs(1), 3);
        assert!(start > Duration::from_millis(333) && start < Duration::from_millis(334));
        assert!(end > Duration::from_millis(666) && end < Duration::from_millis(667));
    }

    #[test]
    fn test_compare_rejects_empty_sequences() {
        let comparator = Comparator::default();
        let window = Duration::from_secs(1);
        let filled = hashes(&[0x00], window);
        let empty = hashes(&[], window);

        assert!(matches!(
            comparator.compare(&empty, &filled),
            Err(Error::EmptyHashSequence)
        ));
        assert!(matches!(
            comparator.compare(&filled, &empty),
            Err(Error::EmptyHashSequence)
        ));
    }

    #[test]
    fn test_compare_identical_sequences() {
        let comparator = Comparator::default().with_tolerance(1);
        let window = Duration::from_secs(2);
        let source = hashes(&[0x11, 0x22, 0x33, 0x44], window);

        let scene = comparator.compare(&source, &source.clone()).unwrap();
        assert_eq!(scene.start, Duration::ZERO);
        assert_eq!(scene.end, window);
        assert_eq!(scene.similarity.start_index, 0);
        assert_eq!(scene.similarity.end_index, 4);
    }

    #[test]
    fn test_compare_is_deterministic() {
        let comparator = Comparator::default().with_tolerance(4);
        let window = Duration::from_secs(3);
        let source = hashes(&[0x00, 0x0f, 0xf0, 0xff, 0x3c, 0xc3], window);
        let target = hashes(&[0xff, 0x00, 0x0f, 0xf0, 0xff, 0x55], window);

        let first = comparator.compare(&source, &target).unwrap();
        let second = comparator.compare(&source, &target).unwrap();
        assert_eq!(first, second);
    }
}
