//! Escape-time fractals (Mandelbrot and Julia sets)

use std::ops::RangeInclusive;

use cgmath::Vector2;
use rand::RngCore;

use super::{Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

/// Complex recurrence z <- z^2 + c
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recurrence {
    /// c is the sample point, z starts at 0
    Mandelbrot,
    /// c is fixed, z starts at the sample point
    Julia { c: Vector2<f64> },
}

/// Samples the complex plane on a strided lattice and plots the points whose
/// escape count falls inside `band`. The band skips both fast escapes and the
/// filled interior so only the boundary region is seeded.
#[derive(Debug, Clone)]
pub struct EscapeTime {
    pub recurrence: Recurrence,
    /// Complex-plane point mapped to the grid centre
    pub center: Vector2<f64>,
    /// Complex-plane extent covered by the shorter grid side
    pub span: f64,
    pub max_iterations: u32,
    pub escape_radius: f64,
    pub band: RangeInclusive<u32>,
    /// Sample every `stride`-th cell in each direction
    pub stride: u32,
}

impl EscapeTime {
    pub fn mandelbrot() -> Self {
        Self {
            recurrence: Recurrence::Mandelbrot,
            center: Vector2::new(-0.5, 0.0),
            span: 3.0,
            max_iterations: 80,
            escape_radius: 2.0,
            band: 12..=79,
            stride: 2,
        }
    }

    pub fn julia() -> Self {
        Self {
            recurrence: Recurrence::Julia {
                c: Vector2::new(-0.8, 0.156),
            },
            center: Vector2::new(0.0, 0.0),
            span: 3.2,
            max_iterations: 80,
            escape_radius: 2.0,
            band: 10..=79,
            stride: 2,
        }
    }

    fn validate(&self) -> LifeResult<()> {
        if self.max_iterations == 0 {
            return Err(LifeError::generator("escape-time iteration count must be positive"));
        }
        if !(self.escape_radius > 0.0 && self.escape_radius.is_finite()) {
            return Err(LifeError::generator(format!(
                "escape radius {} must be positive",
                self.escape_radius
            )));
        }
        if !(self.span > 0.0 && self.span.is_finite()) {
            return Err(LifeError::generator(format!(
                "complex-plane span {} must be positive",
                self.span
            )));
        }
        if self.band.is_empty() || *self.band.start() > self.max_iterations {
            return Err(LifeError::generator(format!(
                "iteration band {:?} selects nothing below {} iterations",
                self.band, self.max_iterations
            )));
        }
        if self.stride == 0 {
            return Err(LifeError::generator("sampling stride must be positive"));
        }
        Ok(())
    }

    /// Iterations before |z|^2 exceeds the escape radius squared, capped at
    /// `max_iterations`
    pub fn escape_count(&self, point: Vector2<f64>) -> u32 {
        let (mut z, c) = match self.recurrence {
            Recurrence::Mandelbrot => (Vector2::new(0.0, 0.0), point),
            Recurrence::Julia { c } => (point, c),
        };
        let limit = self.escape_radius * self.escape_radius;

        let mut n = 0;
        while n < self.max_iterations {
            if z.x * z.x + z.y * z.y > limit {
                break;
            }
            z = Vector2::new(z.x * z.x - z.y * z.y + c.x, 2.0 * z.x * z.y + c.y);
            n += 1;
        }
        n
    }

    fn to_plane(&self, x: u32, y: u32, width: u32, height: u32) -> Vector2<f64> {
        let scale = self.span / width.min(height) as f64;
        Vector2::new(
            self.center.x + (x as f64 + 0.5 - width as f64 * 0.5) * scale,
            self.center.y + (y as f64 + 0.5 - height as f64 * 0.5) * scale,
        )
    }
}

impl PatternGenerator for EscapeTime {
    fn name(&self) -> &str {
        match self.recurrence {
            Recurrence::Mandelbrot => "Mandelbrot",
            Recurrence::Julia { .. } => "Julia",
        }
    }

    fn generate(&self, width: u32, height: u32, _rng: &mut dyn RngCore) -> LifeResult<Pattern> {
        self.validate()?;

        let mut pattern = Pattern::new();
        for y in (0..height).step_by(self.stride as usize) {
            for x in (0..width).step_by(self.stride as usize) {
                let n = self.escape_count(self.to_plane(x, y, width, height));
                if self.band.contains(&n) {
                    pattern.push(x as i64, y as i64);
                }
            }
        }

        Ok(pattern)
    }
}
