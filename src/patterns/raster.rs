//! Rasterization helpers shared by drawing and curve generators

use cgmath::Vector2;

use super::Pattern;

/// Integer cells on the straight line from `from` to `to` (Bresenham), both
/// endpoints included.
pub fn line(from: (i64, i64), to: (i64, i64)) -> Vec<(i64, i64)> {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        cells.push((x0, y0));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
    cells
}

/// Square brush of side `2 * half_width + 1` centred on (x, y)
pub fn stamp(pattern: &mut Pattern, x: i64, y: i64, half_width: u32) {
    let h = half_width as i64;
    for dy in -h..=h {
        for dx in -h..=h {
            pattern.push(x + dx, y + dy);
        }
    }
}

/// `size` x `size` block with its top-left corner at (x, y)
pub fn block(pattern: &mut Pattern, x: i64, y: i64, size: u32) {
    for dy in 0..size as i64 {
        for dx in 0..size as i64 {
            pattern.push(x + dx, y + dy);
        }
    }
}

/// Line of brush stamps from `from` to `to`
pub fn stroke(pattern: &mut Pattern, from: (i64, i64), to: (i64, i64), half_width: u32) {
    for (x, y) in line(from, to) {
        stamp(pattern, x, y, half_width);
    }
}

/// Maps a rectangular region of model space onto the grid, preserving aspect
/// ratio and centring the result.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    min: Vector2<f32>,
    scale: f32,
    offset: Vector2<f32>,
}

impl Viewport {
    /// Fit the model-space box `[min, max]` into `fill` (0..=1) of the grid
    pub fn fit(width: u32, height: u32, min: Vector2<f32>, max: Vector2<f32>, fill: f32) -> Self {
        let extent = Vector2::new((max.x - min.x).max(f32::EPSILON), (max.y - min.y).max(f32::EPSILON));
        let scale = fill * (width as f32 / extent.x).min(height as f32 / extent.y);
        let offset = Vector2::new(
            (width as f32 - extent.x * scale) * 0.5,
            (height as f32 - extent.y * scale) * 0.5,
        );

        Self { min, scale, offset }
    }

    /// Fit the unit square
    pub fn unit(width: u32, height: u32, fill: f32) -> Self {
        Self::fit(width, height, Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0), fill)
    }

    pub fn to_cell(&self, point: Vector2<f32>) -> (i64, i64) {
        let mapped = (point - self.min) * self.scale + self.offset;
        (mapped.x.floor() as i64, mapped.y.floor() as i64)
    }
}

/// Bounding box of a set of polylines, `None` when there are no points
pub fn bounds(polylines: &[Vec<Vector2<f32>>]) -> Option<(Vector2<f32>, Vector2<f32>)> {
    let mut points = polylines.iter().flatten();
    let first = *points.next()?;
    Some(points.fold((first, first), |(min, max), p| {
        (
            Vector2::new(min.x.min(p.x), min.y.min(p.y)),
            Vector2::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

/// Rasterize polylines through a viewport with the given brush
pub fn draw_polylines(
    pattern: &mut Pattern,
    polylines: &[Vec<Vector2<f32>>],
    viewport: &Viewport,
    half_width: u32,
) {
    for polyline in polylines {
        match polyline.as_slice() {
            [] => {}
            [single] => {
                let (x, y) = viewport.to_cell(*single);
                stamp(pattern, x, y, half_width);
            }
            points => {
                for pair in points.windows(2) {
                    stroke(
                        pattern,
                        viewport.to_cell(pair[0]),
                        viewport.to_cell(pair[1]),
                        half_width,
                    );
                }
            }
        }
    }
}
