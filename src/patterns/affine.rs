//! Iterated affine function systems

use cgmath::{Matrix2, Vector2};
use rand::{Rng, RngCore};

use super::{raster::Viewport, Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

/// One weighted map `p -> matrix * p + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    pub matrix: Matrix2<f32>,
    pub offset: Vector2<f32>,
    pub weight: f32,
}

impl AffineMap {
    /// Row-major coefficients: x' = a x + b y + e, y' = c x + d y + f
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32, weight: f32) -> Self {
        Self {
            matrix: Matrix2::from_cols(Vector2::new(a, c), Vector2::new(b, d)),
            offset: Vector2::new(e, f),
            weight,
        }
    }

    #[inline]
    pub fn apply(&self, point: Vector2<f32>) -> Vector2<f32> {
        self.matrix * point + self.offset
    }
}

/// Chaos game over weighted affine maps. Each iteration picks a map by
/// weight and applies it to the running point; after the burn-in every
/// `downsample`-th point of the orbit is plotted.
#[derive(Debug, Clone)]
pub struct IteratedAffineSystem {
    pub name: String,
    pub maps: Vec<AffineMap>,
    pub iterations: u32,
    pub burn_in: u32,
    pub downsample: u32,
    /// Model-space box fitted onto the grid; `None` fits the orbit itself
    pub bounds: Option<(Vector2<f32>, Vector2<f32>)>,
    /// Model space is y-up, the grid is y-down
    pub flip_y: bool,
    pub fill: f32,
}

impl IteratedAffineSystem {
    pub fn barnsley_fern() -> Self {
        Self {
            name: "Barnsley Fern".into(),
            maps: vec![
                AffineMap::new(0.0, 0.0, 0.0, 0.16, 0.0, 0.0, 0.01),
                AffineMap::new(0.85, 0.04, -0.04, 0.85, 0.0, 1.6, 0.85),
                AffineMap::new(0.2, -0.26, 0.23, 0.22, 0.0, 1.6, 0.07),
                AffineMap::new(-0.15, 0.28, 0.26, 0.24, 0.0, 0.44, 0.07),
            ],
            iterations: 60_000,
            burn_in: 20,
            downsample: 1,
            bounds: Some((Vector2::new(-2.2, 0.0), Vector2::new(2.7, 10.0))),
            flip_y: true,
            fill: 0.95,
        }
    }

    fn validate(&self) -> LifeResult<()> {
        if self.maps.is_empty() {
            return Err(LifeError::generator("affine system has no maps"));
        }
        if self
            .maps
            .iter()
            .any(|m| !(m.weight >= 0.0 && m.weight.is_finite()))
        {
            return Err(LifeError::generator(
                "affine map weights must be finite and non-negative",
            ));
        }
        if self.maps.iter().map(|m| m.weight).sum::<f32>() <= 0.0 {
            return Err(LifeError::generator("affine map weights sum to zero"));
        }
        if self.iterations == 0 {
            return Err(LifeError::generator("affine system iteration count must be positive"));
        }
        if self.burn_in >= self.iterations {
            return Err(LifeError::generator(format!(
                "affine system burn-in {} leaves nothing of {} iterations to plot",
                self.burn_in, self.iterations
            )));
        }
        if self.downsample == 0 {
            return Err(LifeError::generator("affine system downsample must be positive"));
        }
        if !(self.fill > 0.0 && self.fill <= 1.0) {
            return Err(LifeError::generator(format!(
                "affine system fill {} must lie in (0, 1]",
                self.fill
            )));
        }
        Ok(())
    }

    fn choose<'a>(&'a self, rng: &mut dyn RngCore, total: f32) -> &'a AffineMap {
        let mut target = rng.random::<f32>() * total;
        for map in &self.maps {
            if target < map.weight {
                return map;
            }
            target -= map.weight;
        }
        // Rounding can leave a sliver past the last cumulative weight
        &self.maps[self.maps.len() - 1]
    }

    /// Plotted points of the orbit in model space
    pub fn orbit(&self, rng: &mut dyn RngCore) -> LifeResult<Vec<Vector2<f32>>> {
        self.validate()?;

        let total: f32 = self.maps.iter().map(|m| m.weight).sum();
        let mut point = Vector2::new(0.0, 0.0);
        let capacity = ((self.iterations - self.burn_in) / self.downsample) as usize + 1;
        let mut plotted = Vec::with_capacity(capacity);

        for i in 0..self.iterations {
            point = self.choose(rng, total).apply(point);
            if i >= self.burn_in && (i - self.burn_in) % self.downsample == 0 {
                plotted.push(point);
            }
        }
        Ok(plotted)
    }
}

impl PatternGenerator for IteratedAffineSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> LifeResult<Pattern> {
        let mut points = self.orbit(rng)?;
        if self.flip_y {
            for p in &mut points {
                p.y = -p.y;
            }
        }

        let (min, max) = match self.bounds {
            Some((min, max)) if self.flip_y => {
                (Vector2::new(min.x, -max.y), Vector2::new(max.x, -min.y))
            }
            Some(bounds) => bounds,
            None => super::raster::bounds(std::slice::from_ref(&points))
                .ok_or_else(|| LifeError::generator("affine system plotted no points"))?,
        };

        let viewport = Viewport::fit(width, height, min, max, self.fill);
        let mut pattern = Pattern::with_capacity(points.len());
        for p in points {
            let (x, y) = viewport.to_cell(p);
            if (0..width as i64).contains(&x) && (0..height as i64).contains(&y) {
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
    fn test_map_application() {
        let map = AffineMap::new(0.85, 0.04, -0.04, 0.85, 0.0, 1.6, 1.0);
        let p = map.apply(Vector2::new(1.0, 2.0));
        assert!((p.x - (0.85 + 0.08)).abs() < 1e-6);
        assert!((p.y - (-0.04 + 1.7 + 1.6)).abs() < 1e-6);
    }

    #[test]
    fn test_fern_orbit_stays_in_known_bounds() {
        let fern = IteratedAffineSystem::barnsley_fern();
        let orbit = fern.orbit(&mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(orbit.len(), 60_000 - 20);
        for p in orbit {
            assert!((-2.2..=2.7).contains(&p.x) && (-0.01..=10.0).contains(&p.y), "{p:?}");
        }
    }

    #[test]
    fn test_downsample_thins_orbit() {
        let fern = IteratedAffineSystem {
            iterations: 1_020,
            downsample: 10,
            ..IteratedAffineSystem::barnsley_fern()
        };
        let orbit = fern.orbit(&mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(orbit.len(), 100);
    }

    #[test]
    fn test_zero_weight_map_is_never_chosen() {
        let system = IteratedAffineSystem {
            name: "fixed".into(),
            maps: vec![
                AffineMap::new(0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0),
                AffineMap::new(0.0, 0.0, 0.0, 0.0, 2.0, 3.0, 1.0),
            ],
            iterations: 50,
            burn_in: 0,
            downsample: 1,
            bounds: None,
            flip_y: false,
            fill: 1.0,
        };
        let orbit = system.orbit(&mut StdRng::seed_from_u64(1)).unwrap();
        assert!(orbit.iter().all(|p| *p == Vector2::new(2.0, 3.0)));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        let fern = IteratedAffineSystem::barnsley_fern;
        let mut no_weight = fern();
        for map in &mut no_weight.maps {
            map.weight = 0.0;
        }
        for bad in [
            IteratedAffineSystem {
                maps: Vec::new(),
                ..fern()
            },
            no_weight,
            IteratedAffineSystem {
                iterations: 0,
                burn_in: 0,
                ..fern()
            },
            IteratedAffineSystem {
                downsample: 0,
                ..fern()
            },
        ] {
            assert!(matches!(
                bad.generate(40, 40, &mut rng),
                Err(LifeError::GeneratorInput(_))
            ));
        }
    }
}
