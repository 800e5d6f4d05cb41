// THEORY:
// The `Grid` is the execution layer every stage runs on. It owns no pixels; it
// owns the *shape* of the frame and the decision of how to walk it. Each stage
// hands it a pure per-pixel function and receives a flattened row-major buffer
// of results.
//
// Key architectural principles:
// 1.  **Orchestration, not analysis**: the grid never inspects values. Stages
//     (edge estimator, classifier, smoother, tone, sharpener) express their
//     math per pixel; the grid decides sequential vs. data-parallel execution.
// 2.  **Embarrassingly parallel**: a stage function may read anything from the
//     shared immutable input frame but never another pixel's output, so rows can
//     be computed on any thread in any order and the result is identical.
// 3.  **Threshold dispatch**: small grids (tests, thumbnails) are walked on the
//     calling thread; above `parallel_threshold` pixels the work is split across
//     the rayon pool.

use rayon::prelude::*;

/// Pixel count above which grids are processed on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64 * 64;

/// Walks a `width x height` grid and evaluates a per-pixel function over it.
#[derive(Debug, Clone, Copy)]
pub struct Grid {
    /// The width of the grid in pixels.
    width: u32,
    /// The height of the grid in pixels.
    height: u32,
    /// Grids with at least this many pixels are evaluated in parallel.
    parallel_threshold: usize,
}

impl Grid {
    pub fn new(width: u32, height: u32, parallel_threshold: usize) -> Self {
        Self {
            width,
            height,
            parallel_threshold,
        }
    }

    fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_parallel(&self) -> bool {
        self.len() >= self.parallel_threshold
    }

    /// Evaluates `f(x, y)` for every cell and returns the results in row-major order.
    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(u32, u32) -> T + Sync + Send,
    {
        let width = self.width as usize;
        let len = self.len();
        let cell = |index: usize| f((index % width) as u32, (index / width) as u32);

        let mut out = Vec::with_capacity(len);
        if self.is_parallel() {
            (0..len).into_par_iter().map(cell).collect_into_vec(&mut out);
        } else {
            out.extend((0..len).map(cell));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_and_parallel_agree() {
        let f = |x: u32, y: u32| x * 1000 + y;
        let sequential = Grid::new(37, 23, usize::MAX).map(f);
        let parallel = Grid::new(37, 23, 0).map(f);
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.len(), 37 * 23);
    }

    #[test]
    fn map_is_row_major() {
        let cells = Grid::new(3, 2, usize::MAX).map(|x, y| (x, y));
        assert_eq!(cells, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }
}
