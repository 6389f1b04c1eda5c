//! Double-buffered toroidal grid
//!
//! Each cell is a single-channel intensity. Values at or above [`THRESHOLD`] are
//! alive, everything below is dead. Writes through [`GridState::write_cell`] only
//! ever store [`ALIVE`] or [`DEAD`]; intermediate values can still appear in
//! buffers built with [`GridBuffer::from_cells`] and are thresholded on read.

use crate::error::{LifeError, LifeResult};

pub const ALIVE: f32 = 1.0;
pub const DEAD: f32 = 0.0;
pub const THRESHOLD: f32 = 0.5;

/// Canonical alive/dead boundary for a sampled intensity
#[inline]
pub fn is_alive(intensity: f32) -> bool {
    intensity >= THRESHOLD
}

#[inline]
pub fn intensity(alive: bool) -> f32 {
    if alive {
        ALIVE
    } else {
        DEAD
    }
}

/// One full grid of cell intensities in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct GridBuffer {
    width: u32,
    height: u32,
    cells: Vec<f32>,
}

impl GridBuffer {
    /// Create an all-dead buffer
    pub fn new(width: u32, height: u32) -> LifeResult<Self> {
        if width == 0 || height == 0 {
            return Err(LifeError::InvalidDimensions { width, height });
        }

        Ok(Self {
            width,
            height,
            cells: vec![DEAD; width as usize * height as usize],
        })
    }

    /// Wrap existing intensities (row-major, `width * height` entries)
    pub fn from_cells(width: u32, height: u32, cells: Vec<f32>) -> LifeResult<Self> {
        if width == 0 || height == 0 || cells.len() != width as usize * height as usize {
            return Err(LifeError::InvalidDimensions { width, height });
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// (1/W, 1/H), the address step between neighbouring cells in normalized space
    pub fn reciprocal(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    /// Map any integer coordinate onto the torus
    #[inline]
    pub fn wrap(&self, x: i64, y: i64) -> (u32, u32) {
        (
            x.rem_euclid(self.width as i64) as u32,
            y.rem_euclid(self.height as i64) as u32,
        )
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Raw intensity at a toroidally wrapped coordinate
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> f32 {
        let (x, y) = self.wrap(x, y);
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn is_alive(&self, x: i64, y: i64) -> bool {
        is_alive(self.get(x, y))
    }

    #[inline]
    pub fn set(&mut self, x: i64, y: i64, value: f32) {
        let (x, y) = self.wrap(x, y);
        let index = self.index(x, y);
        self.cells[index] = value;
    }

    pub fn clear(&mut self) {
        self.cells.fill(DEAD);
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&v| is_alive(v)).count()
    }

    /// Coordinates of every alive cell, row by row
    pub fn alive_cells(&self) -> Vec<(u32, u32)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| is_alive(v))
            .map(|(i, _)| ((i % self.width as usize) as u32, (i / self.width as usize) as u32))
            .collect()
    }

    /// Thresholded 8-bit copy for display (0 or 255)
    pub fn to_luma8(&self) -> Vec<u8> {
        self.cells
            .iter()
            .map(|&v| if is_alive(v) { 255 } else { 0 })
            .collect()
    }
}

/// The `current`/`scratch` buffer pair
///
/// Only `current` is observable. `scratch` is the write target of the transition
/// kernel and is promoted by [`GridState::commit`] or [`GridState::advance`].
#[derive(Debug, Clone)]
pub struct GridState {
    current: GridBuffer,
    scratch: GridBuffer,
}

impl GridState {
    pub fn new(width: u32, height: u32) -> LifeResult<Self> {
        Ok(Self {
            current: GridBuffer::new(width, height)?,
            scratch: GridBuffer::new(width, height)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.current.width
    }

    pub fn height(&self) -> u32 {
        self.current.height
    }

    /// Immutable view of the current generation
    pub fn read(&self) -> &GridBuffer {
        &self.current
    }

    /// Write a cell in `current` directly, bypassing the transition rule.
    /// Coordinates wrap around the torus.
    pub fn write_cell(&mut self, x: i64, y: i64, alive: bool) {
        self.current.set(x, y, intensity(alive));
    }

    /// Replace `current` with a finished next generation; the old `current`
    /// becomes the new `scratch`.
    pub fn commit(&mut self, next: GridBuffer) -> LifeResult<()> {
        if next.width != self.current.width || next.height != self.current.height {
            return Err(LifeError::Step(format!(
                "committed buffer is {}x{}, grid is {}x{}",
                next.width, next.height, self.current.width, self.current.height
            )));
        }

        self.scratch = std::mem::replace(&mut self.current, next);
        Ok(())
    }

    /// Compute the next generation into `scratch` and promote it.
    ///
    /// The closure reads `current` and writes `scratch`; the two never alias.
    /// On error nothing is promoted and `current` is left as it was.
    pub fn advance<F>(&mut self, compute: F) -> LifeResult<()>
    where
        F: FnOnce(&GridBuffer, &mut GridBuffer) -> LifeResult<()>,
    {
        compute(&self.current, &mut self.scratch)?;
        std::mem::swap(&mut self.current, &mut self.scratch);
        Ok(())
    }

    /// Reallocate both buffers at a new size. All cells are cleared to dead.
    pub fn resize(&mut self, width: u32, height: u32) -> LifeResult<()> {
        self.current = GridBuffer::new(width, height)?;
        self.scratch = GridBuffer::new(width, height)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.scratch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_dimensions_rejected() {
        assert_eq!(
            GridState::new(0, 4).unwrap_err(),
            LifeError::InvalidDimensions {
                width: 0,
                height: 4
            }
        );
        assert!(GridBuffer::from_cells(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_write_cell_wraps() {
        let mut grid = GridState::new(5, 4).unwrap();
        grid.write_cell(-1, -1, true);
        grid.write_cell(5, 4, true);

        assert!(grid.read().is_alive(4, 3));
        assert!(grid.read().is_alive(0, 0));
        assert_eq!(grid.read().alive_count(), 2);
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(!is_alive(0.49));
        assert!(is_alive(0.5));
        assert!(is_alive(0.51));
        assert!(!is_alive(0.0));
    }

    #[test]
    fn test_commit_recycles_current_as_scratch() {
        let mut grid = GridState::new(3, 3).unwrap();
        grid.write_cell(1, 1, true);

        let next = GridBuffer::new(3, 3).unwrap();
        grid.commit(next).unwrap();
        assert_eq!(grid.read().alive_count(), 0);
        assert_eq!(grid.scratch.alive_count(), 1);

        let wrong = GridBuffer::new(4, 3).unwrap();
        assert!(matches!(grid.commit(wrong), Err(LifeError::Step(_))));
    }

    #[test]
    fn test_failed_advance_keeps_current() {
        let mut grid = GridState::new(3, 3).unwrap();
        grid.write_cell(0, 0, true);

        let result = grid.advance(|_, next| {
            next.set(2, 2, ALIVE);
            Err(LifeError::Step("lost device".into()))
        });

        assert!(result.is_err());
        assert_eq!(grid.read().alive_cells(), vec![(0, 0)]);
    }

    #[test]
    fn test_resize_clears_to_dead() {
        let mut grid = GridState::new(4, 4).unwrap();
        grid.write_cell(1, 2, true);
        grid.resize(6, 3).unwrap();

        assert_eq!(grid.width(), 6);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.read().alive_count(), 0);
        assert_eq!(grid.read().cells().len(), 18);
    }

    #[test]
    fn test_alive_cells_row_major() {
        let mut grid = GridState::new(4, 3).unwrap();
        grid.write_cell(3, 0, true);
        grid.write_cell(1, 2, true);
        assert_eq!(grid.read().alive_cells(), vec![(3, 0), (1, 2)]);
        assert_eq!(grid.read().to_luma8()[3], 255);
    }
}
