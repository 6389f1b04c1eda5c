//! Pointer input to cell writes
//!
//! A press stamps a dot under the cursor; dragging rasterizes the segment from
//! the previous cell to the current one with the brush. The writes collect in
//! a [`Pattern`] that the host hands to the stepper, which applies it before
//! the next generation.

use crate::{
    config::LifeConfig,
    patterns::{raster, Pattern},
};

#[derive(Debug, Clone)]
pub struct InputInjector {
    cell_size: u32,
    brush_half_width: u32,
    click_half_width: u32,
    // Last known cursor position in surface pixels
    cursor: Option<(f64, f64)>,
    // Cell under the pointer while the button is held
    last_cell: Option<(i64, i64)>,
    pending: Pattern,
}

impl InputInjector {
    pub fn new(cell_size: u32, brush_half_width: u32, click_half_width: u32) -> Self {
        Self {
            cell_size: cell_size.max(1),
            brush_half_width,
            click_half_width,
            cursor: None,
            last_cell: None,
            pending: Pattern::new(),
        }
    }

    pub fn from_config(config: &LifeConfig) -> Self {
        Self::new(
            config.cell_size,
            config.brush_half_width,
            config.click_half_width,
        )
    }

    fn to_cell(&self, x: f64, y: f64) -> (i64, i64) {
        let size = self.cell_size as f64;
        ((x / size).floor() as i64, (y / size).floor() as i64)
    }

    /// Track the cursor; while the button is held, draw a stroke
    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.cursor = Some((x, y));

        let Some(previous) = self.last_cell else {
            return;
        };
        let cell = self.to_cell(x, y);
        if cell != previous {
            raster::stroke(&mut self.pending, previous, cell, self.brush_half_width);
            self.last_cell = Some(cell);
        }
    }

    /// Button pressed: stamp a dot at the cursor and start a stroke
    pub fn pointer_down(&mut self) {
        let Some((x, y)) = self.cursor else {
            return;
        };
        let (cx, cy) = self.to_cell(x, y);
        raster::stamp(&mut self.pending, cx, cy, self.click_half_width);
        self.last_cell = Some((cx, cy));
    }

    pub fn pointer_up(&mut self) {
        self.last_cell = None;
    }

    /// Cursor left the surface
    pub fn cursor_left(&mut self) {
        self.cursor = None;
        self.last_cell = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.last_cell.is_some()
    }

    pub fn set_cell_size(&mut self, cell_size: u32) {
        self.cell_size = cell_size.max(1);
    }

    /// Writes collected since the last call
    pub fn take_pending(&mut self) -> Pattern {
        std::mem::take(&mut self.pending)
    }

    /// Forget collected writes, e.g. after a resize
    pub fn discard_pending(&mut self) {
        self.pending = Pattern::new();
        self.last_cell = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_stamps_dot() {
        let mut input = InputInjector::new(1, 2, 1);
        input.cursor_moved(10.4, 20.9);
        assert!(input.take_pending().is_empty());

        input.pointer_down();
        let mut dot = input.take_pending();
        dot.dedup();
        assert_eq!(dot.len(), 9);
        assert!(dot.cells().contains(&(10, 20)));
        assert!(dot.cells().contains(&(9, 19)));
        assert!(dot.cells().contains(&(11, 21)));
    }

    #[test]
    fn test_drag_draws_connected_stroke() {
        let mut input = InputInjector::new(1, 0, 0);
        input.cursor_moved(0.0, 0.0);
        input.pointer_down();
        input.cursor_moved(6.0, 3.0);
        input.pointer_up();
        input.cursor_moved(20.0, 20.0);

        let mut stroke = input.take_pending();
        stroke.dedup();
        assert!(stroke.cells().contains(&(0, 0)));
        assert!(stroke.cells().contains(&(6, 3)));
        assert_eq!(stroke.len(), 7);
        assert!(!stroke.cells().contains(&(20, 20)));
        assert!(!input.is_drawing());
    }

    #[test]
    fn test_cell_size_scales_coordinates() {
        let mut input = InputInjector::new(4, 0, 0);
        input.cursor_moved(17.0, 3.0);
        input.pointer_down();
        assert_eq!(input.take_pending().cells(), &[(4, 0)]);
    }

    #[test]
    fn test_press_without_cursor_is_ignored() {
        let mut input = InputInjector::new(1, 1, 1);
        input.pointer_down();
        assert!(!input.is_drawing());
        assert!(input.take_pending().is_empty());
    }
}
