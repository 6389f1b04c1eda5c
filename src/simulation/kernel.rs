//! Transition kernel interface and the reference CPU implementation
//!
//! A kernel maps the current generation to the next one. It is applied to every
//! cell independently and reads only the previous generation, so it can run as a
//! compute shader ([`crate::simulation::gpu::GpuKernel`]) or as a plain loop
//! ([`CpuKernel`]) with identical results.

use crate::{
    error::{LifeError, LifeResult},
    grid::{intensity, GridBuffer},
};

/// Per-generation step function
///
/// Implementations must write every cell of `next`, must not read `next`, and
/// must emit only 0.0 or 1.0.
pub trait TransitionKernel {
    /// Kernel name for UI display and logs
    fn name(&self) -> &str;

    /// Compute the generation following `current` into `next`
    ///
    /// # Arguments
    /// * `current` - The previous generation (read only)
    /// * `reciprocal` - (1/W, 1/H) address step for the current resolution
    /// * `next` - Output buffer with the same dimensions as `current`
    fn step(
        &mut self,
        current: &GridBuffer,
        reciprocal: [f32; 2],
        next: &mut GridBuffer,
    ) -> LifeResult<()>;
}

/// Conway's rule: survive on 2 or 3, birth on exactly 3
#[inline]
pub fn next_state(alive: bool, neighbors: u8) -> bool {
    matches!((alive, neighbors), (true, 2) | (true, 3) | (false, 3))
}

/// Count alive cells among the 8 toroidally wrapped neighbours of (x, y)
pub fn count_neighbors(grid: &GridBuffer, x: u32, y: u32) -> u8 {
    let x = x as i64;
    let y = y as i64;
    let mut count = 0;

    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }

            if grid.is_alive(x + dx, y + dy) {
                count += 1;
            }
        }
    }

    count
}

/// Fail unless `next` matches `current` and the reciprocal matches the resolution.
pub(crate) fn check_step_inputs(
    current: &GridBuffer,
    reciprocal: [f32; 2],
    next: &GridBuffer,
) -> LifeResult<()> {
    if current.width() != next.width() || current.height() != next.height() {
        return Err(LifeError::Step(format!(
            "output buffer is {}x{}, input is {}x{}",
            next.width(),
            next.height(),
            current.width(),
            current.height()
        )));
    }

    let expected = current.reciprocal();
    if (reciprocal[0] - expected[0]).abs() > f32::EPSILON
        || (reciprocal[1] - expected[1]).abs() > f32::EPSILON
    {
        return Err(LifeError::Step(format!(
            "reciprocal resolution {:?} does not match a {}x{} grid",
            reciprocal,
            current.width(),
            current.height()
        )));
    }

    Ok(())
}

/// Sequential reference kernel
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuKernel;

impl CpuKernel {
    pub fn new() -> Self {
        Self
    }
}

impl TransitionKernel for CpuKernel {
    fn name(&self) -> &str {
        "CPU"
    }

    fn step(
        &mut self,
        current: &GridBuffer,
        reciprocal: [f32; 2],
        next: &mut GridBuffer,
    ) -> LifeResult<()> {
        check_step_inputs(current, reciprocal, next)?;

        let width = current.width();
        for y in 0..current.height() {
            for x in 0..width {
                let alive = current.is_alive(x as i64, y as i64);
                let neighbors = count_neighbors(current, x, y);
                let index = current.index(x, y);
                next.cells_mut()[index] = intensity(next_state(alive, neighbors));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridState;

    fn step_once(grid: &GridBuffer) -> GridBuffer {
        let mut next = GridBuffer::new(grid.width(), grid.height()).unwrap();
        CpuKernel::new()
            .step(grid, grid.reciprocal(), &mut next)
            .unwrap();
        next
    }

    #[test]
    fn test_rule_table() {
        for n in 0..=8u8 {
            assert_eq!(next_state(true, n), n == 2 || n == 3, "alive with {n}");
            assert_eq!(next_state(false, n), n == 3, "dead with {n}");
        }
    }

    #[test]
    fn test_neighbor_count_wraps_columns_and_rows() {
        let mut grid = GridState::new(3, 3).unwrap();
        grid.write_cell(0, 1, true);
        grid.write_cell(2, 1, true);
        // Column 0 and column 2 are adjacent on a 3-wide torus
        assert_eq!(count_neighbors(grid.read(), 2, 1), 1);
        assert_eq!(count_neighbors(grid.read(), 0, 1), 1);

        let mut grid = GridState::new(3, 3).unwrap();
        grid.write_cell(1, 0, true);
        grid.write_cell(1, 2, true);
        assert_eq!(count_neighbors(grid.read(), 1, 2), 1);
        assert_eq!(count_neighbors(grid.read(), 1, 0), 1);
    }

    #[test]
    fn test_wrap_crossing_birth() {
        // Three cells straddling the left/right edge give birth on the far side
        let mut grid = GridState::new(6, 6).unwrap();
        grid.write_cell(5, 2, true);
        grid.write_cell(0, 2, true);
        grid.write_cell(1, 2, true);

        let next = step_once(grid.read());
        assert_eq!(next.alive_cells(), vec![(0, 1), (0, 2), (0, 3)]);
    }

    #[test]
    fn test_thresholding_is_idempotent() {
        // A horizontal blinker, once with clean values and once with noisy ones
        let clean = {
            let mut cells = vec![0.0; 25];
            for x in 1..4 {
                cells[2 * 5 + x] = 1.0;
            }
            GridBuffer::from_cells(5, 5, cells).unwrap()
        };
        let noisy = {
            let mut cells = vec![0.49; 25];
            for x in 1..4 {
                cells[2 * 5 + x] = 0.51;
            }
            GridBuffer::from_cells(5, 5, cells).unwrap()
        };

        let a = step_once(&clean);
        let b = step_once(&noisy);
        assert_eq!(a, b);
        assert!(b.cells().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_mismatched_inputs_fail() {
        let current = GridBuffer::new(4, 4).unwrap();
        let mut next = GridBuffer::new(4, 5).unwrap();
        assert!(matches!(
            CpuKernel::new().step(&current, current.reciprocal(), &mut next),
            Err(LifeError::Step(_))
        ));

        let mut next = GridBuffer::new(4, 4).unwrap();
        assert!(CpuKernel::new()
            .step(&current, [0.5, 0.5], &mut next)
            .is_err());
    }
}
