//! Random scatter fill

use std::f32::consts::TAU;

use rand::{Rng, RngCore};

use super::{raster, Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

/// Region the samples are drawn from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillBounds {
    /// The whole grid
    Full,
    /// Disc centred on the grid with radius `radius_fraction * height`
    Disc { radius_fraction: f32 },
}

/// Draws `samples` uniform positions inside `bounds`; each one becomes a
/// `dot_size` square dot with probability `probability`.
#[derive(Debug, Clone)]
pub struct RandomFill {
    pub samples: u32,
    pub probability: f64,
    pub bounds: FillBounds,
    pub dot_size: u32,
}

impl Default for RandomFill {
    fn default() -> Self {
        Self {
            samples: 800,
            probability: 0.5,
            bounds: FillBounds::Disc {
                radius_fraction: 0.3,
            },
            dot_size: 2,
        }
    }
}

impl RandomFill {
    fn validate(&self) -> LifeResult<()> {
        if self.samples == 0 {
            return Err(LifeError::generator("random fill needs at least one sample"));
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(LifeError::generator(format!(
                "random fill probability {} is outside [0, 1]",
                self.probability
            )));
        }
        if self.dot_size == 0 {
            return Err(LifeError::generator("random fill dot size must be positive"));
        }
        if let FillBounds::Disc { radius_fraction } = self.bounds {
            if !(radius_fraction > 0.0 && radius_fraction.is_finite()) {
                return Err(LifeError::generator(format!(
                    "random fill disc radius fraction {radius_fraction} must be positive"
                )));
            }
        }
        Ok(())
    }
}

impl PatternGenerator for RandomFill {
    fn name(&self) -> &str {
        "Random Fill"
    }

    fn generate(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> LifeResult<Pattern> {
        self.validate()?;

        let mut pattern = Pattern::with_capacity(self.samples as usize * 4);
        let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);

        for _ in 0..self.samples {
            // Position is drawn before the inclusion test so the random stream
            // consumed per sample is fixed.
            let (x, y) = match self.bounds {
                FillBounds::Full => (
                    rng.random_range(0..width) as i64,
                    rng.random_range(0..height) as i64,
                ),
                FillBounds::Disc { radius_fraction } => {
                    let radius = radius_fraction * height as f32;
                    let r = radius * rng.random::<f32>().sqrt();
                    let theta = TAU * rng.random::<f32>();
                    (
                        (cx + r * theta.cos()).floor() as i64,
                        (cy + r * theta.sin()).floor() as i64,
                    )
                }
            };

            if rng.random_bool(self.probability) {
                raster::block(&mut pattern, x, y, self.dot_size);
            }
        }

        Ok(pattern)
    }
}
