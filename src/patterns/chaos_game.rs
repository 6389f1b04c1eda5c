//! Chaos game fractals

use cgmath::{Vector2, VectorSpace};
use rand::{Rng, RngCore};

use super::{raster::Viewport, Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

/// Moves a running point `ratio` of the way toward a uniformly chosen polygon
/// vertex each iteration, plotting once the burn-in has passed.
///
/// Vertices are given in unit-square coordinates and fitted onto the grid.
#[derive(Debug, Clone)]
pub struct ChaosGame {
    pub vertices: Vec<Vector2<f32>>,
    pub iterations: u32,
    pub burn_in: u32,
    pub ratio: f32,
    pub fill: f32,
}

impl ChaosGame {
    pub fn new(vertices: Vec<Vector2<f32>>, iterations: u32, burn_in: u32) -> Self {
        Self {
            vertices,
            iterations,
            burn_in,
            ratio: 0.5,
            fill: 0.9,
        }
    }

    /// Sierpinski triangle: three vertices, halfway moves
    pub fn sierpinski() -> Self {
        Self::new(
            vec![
                Vector2::new(0.5, 0.0),
                Vector2::new(0.0, 1.0),
                Vector2::new(1.0, 1.0),
            ],
            50_000,
            20,
        )
    }

    fn validate(&self) -> LifeResult<()> {
        if self.vertices.len() < 3 {
            return Err(LifeError::generator(format!(
                "chaos game needs at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }
        if self.iterations == 0 {
            return Err(LifeError::generator("chaos game iteration count must be positive"));
        }
        if self.burn_in >= self.iterations {
            return Err(LifeError::generator(format!(
                "chaos game burn-in {} leaves nothing of {} iterations to plot",
                self.burn_in, self.iterations
            )));
        }
        if !(self.ratio > 0.0 && self.ratio < 1.0) {
            return Err(LifeError::generator(format!(
                "chaos game ratio {} must lie in (0, 1)",
                self.ratio
            )));
        }
        if !(self.fill > 0.0 && self.fill <= 1.0) {
            return Err(LifeError::generator(format!(
                "chaos game fill {} must lie in (0, 1]",
                self.fill
            )));
        }
        Ok(())
    }
}

impl PatternGenerator for ChaosGame {
    fn name(&self) -> &str {
        "Chaos Game"
    }

    fn generate(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> LifeResult<Pattern> {
        self.validate()?;

        let viewport = Viewport::unit(width, height, self.fill);
        let mut pattern = Pattern::with_capacity((self.iterations - self.burn_in) as usize);
        let mut point = Vector2::new(rng.random::<f32>(), rng.random::<f32>());

        for i in 0..self.iterations {
            let vertex = self.vertices[rng.random_range(0..self.vertices.len())];
            point = point.lerp(vertex, self.ratio);

            if i >= self.burn_in {
                let (x, y) = viewport.to_cell(point);
                pattern.push(x, y);
            }
        }

        pattern.dedup();
        Ok(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sierpinski_leaves_centre_hole_empty() {
        let pattern = ChaosGame::sierpinski()
            .generate(128, 128, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert!(pattern.len() > 500);

        // The middle inverted triangle of the first subdivision is never
        // visited after burn-in; sample a point well inside it.
        let viewport = Viewport::unit(128, 128, 0.9);
        let hole = viewport.to_cell(Vector2::new(0.5, 0.8));
        assert!(!pattern.cells().contains(&hole));
    }

    #[test]
    fn test_points_stay_within_fitted_square() {
        let pattern = ChaosGame::sierpinski()
            .generate(100, 60, &mut StdRng::seed_from_u64(9))
            .unwrap();
        for &(x, y) in pattern.cells() {
            assert!((0..100).contains(&x) && (0..60).contains(&y), "({x}, {y})");
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        let degenerate = ChaosGame::new(vec![Vector2::new(0.0, 0.0); 2], 100, 10);
        assert!(matches!(
            degenerate.generate(10, 10, &mut rng),
            Err(LifeError::GeneratorInput(_))
        ));

        let no_iterations = ChaosGame {
            iterations: 0,
            burn_in: 0,
            ..ChaosGame::sierpinski()
        };
        assert!(no_iterations.generate(10, 10, &mut rng).is_err());

        let all_burn_in = ChaosGame {
            iterations: 20,
            burn_in: 20,
            ..ChaosGame::sierpinski()
        };
        assert!(all_burn_in.generate(10, 10, &mut rng).is_err());
    }
}
