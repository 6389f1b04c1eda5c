//! Recursive subdivision curves (Koch type)

use cgmath::{Basis2, Deg, Rotation, Rotation2, Vector2};
use rand::RngCore;

use super::{raster, Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

const MAX_DEPTH: u32 = 8;

/// Each segment is replaced by four: the middle third is lifted into a 60
/// degree bump. At depth 0 a segment is drawn straight.
#[derive(Debug, Clone)]
pub struct KochCurve {
    /// Base segments, subdivided independently
    pub edges: Vec<(Vector2<f32>, Vector2<f32>)>,
    pub depth: u32,
    pub fill: f32,
    pub brush_half_width: u32,
}

impl KochCurve {
    pub fn new(edges: Vec<(Vector2<f32>, Vector2<f32>)>, depth: u32) -> Self {
        Self {
            edges,
            depth,
            fill: 0.8,
            brush_half_width: 0,
        }
    }

    /// Three curves on the sides of an equilateral triangle, bumps facing out
    pub fn snowflake() -> Self {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(1.0, 0.0);
        let c = Vector2::new(0.5, 3f32.sqrt() * 0.5);
        Self::new(vec![(a, b), (b, c), (c, a)], 5)
    }

    fn validate(&self) -> LifeResult<()> {
        if self.edges.is_empty() {
            return Err(LifeError::generator("subdivision curve has no base segments"));
        }
        if self.depth > MAX_DEPTH {
            return Err(LifeError::generator(format!(
                "subdivision depth {} exceeds the limit of {MAX_DEPTH}",
                self.depth
            )));
        }
        if !(self.fill > 0.0 && self.fill <= 1.0) {
            return Err(LifeError::generator(format!(
                "subdivision fill {} must lie in (0, 1]",
                self.fill
            )));
        }
        Ok(())
    }

    /// Polyline for one base segment, `4^depth` segments long
    pub fn subdivide(&self, from: Vector2<f32>, to: Vector2<f32>) -> Vec<Vector2<f32>> {
        let rotation: Basis2<f32> = Rotation2::from_angle(Deg(-60.0));
        let mut points = vec![from];
        push_segment(&rotation, from, to, self.depth, &mut points);
        points
    }
}

/// Append the subdivided `a -> b` to `points`, excluding `a`
fn push_segment(
    rotation: &Basis2<f32>,
    a: Vector2<f32>,
    b: Vector2<f32>,
    depth: u32,
    points: &mut Vec<Vector2<f32>>,
) {
    if depth == 0 {
        points.push(b);
        return;
    }

    let third = (b - a) / 3.0;
    let p1 = a + third;
    let p3 = a + third * 2.0;
    let peak = p1 + rotation.rotate_vector(third);

    push_segment(rotation, a, p1, depth - 1, points);
    push_segment(rotation, p1, peak, depth - 1, points);
    push_segment(rotation, peak, p3, depth - 1, points);
    push_segment(rotation, p3, b, depth - 1, points);
}

impl PatternGenerator for KochCurve {
    fn name(&self) -> &str {
        "Koch Curve"
    }

    fn generate(&self, width: u32, height: u32, _rng: &mut dyn RngCore) -> LifeResult<Pattern> {
        self.validate()?;

        let polylines: Vec<_> = self
            .edges
            .iter()
            .map(|&(from, to)| self.subdivide(from, to))
            .collect();
        let (min, max) = raster::bounds(&polylines)
            .ok_or_else(|| LifeError::generator("subdivision curve has no points"))?;

        let viewport = raster::Viewport::fit(width, height, min, max, self.fill);
        let mut pattern = Pattern::new();
        raster::draw_polylines(&mut pattern, &polylines, &viewport, self.brush_half_width);
        pattern.dedup();

        Ok(pattern)
    }
}
