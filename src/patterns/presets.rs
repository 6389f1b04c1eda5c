//! Known finite Life configurations

use rand::RngCore;

use super::{Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

const MAX_SCALE: u32 = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Preset {
    Block,
    Beehive,
    Loaf,
    Blinker,
    Toad,
    Beacon,
    Glider,
    GosperGun,
    Pulsar,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Block => "Block",
            Preset::Beehive => "Beehive",
            Preset::Loaf => "Loaf",
            Preset::Blinker => "Blinker",
            Preset::Toad => "Toad",
            Preset::Beacon => "Beacon",
            Preset::Glider => "Glider",
            Preset::GosperGun => "Gosper Gun",
            Preset::Pulsar => "Pulsar",
        }
    }

    /// Live cells relative to the pattern's top-left corner
    pub fn cells(&self) -> Vec<(i64, i64)> {
        match self {
            Preset::Block => vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            Preset::Beehive => vec![(1, 0), (2, 0), (0, 1), (3, 1), (1, 2), (2, 2)],
            Preset::Loaf => vec![(1, 0), (2, 0), (0, 1), (3, 1), (1, 2), (3, 2), (2, 3)],
            // Vertical phase
            Preset::Blinker => vec![(1, 0), (1, 1), (1, 2)],
            Preset::Toad => vec![(1, 0), (2, 0), (3, 0), (0, 1), (1, 1), (2, 1)],
            Preset::Beacon => vec![
                (0, 0),
                (1, 0),
                (0, 1),
                (1, 1),
                (2, 2),
                (3, 2),
                (2, 3),
                (3, 3),
            ],
            // Travels toward +x, +y
            Preset::Glider => vec![(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)],
            Preset::GosperGun => vec![
                (24, 0),
                (22, 1),
                (24, 1),
                (12, 2),
                (13, 2),
                (20, 2),
                (21, 2),
                (34, 2),
                (35, 2),
                (11, 3),
                (15, 3),
                (20, 3),
                (21, 3),
                (34, 3),
                (35, 3),
                (0, 4),
                (1, 4),
                (10, 4),
                (16, 4),
                (20, 4),
                (21, 4),
                (0, 5),
                (1, 5),
                (10, 5),
                (14, 5),
                (16, 5),
                (17, 5),
                (22, 5),
                (24, 5),
                (10, 6),
                (16, 6),
                (24, 6),
                (11, 7),
                (15, 7),
                (12, 8),
                (13, 8),
            ],
            Preset::Pulsar => {
                // Four-fold symmetric: bars of three along rows/columns 0, 5, 7, 12
                const LINES: [i64; 4] = [0, 5, 7, 12];
                const BARS: [i64; 6] = [2, 3, 4, 8, 9, 10];
                let mut cells = Vec::with_capacity(48);
                for line in LINES {
                    for bar in BARS {
                        cells.push((bar, line));
                        cells.push((line, bar));
                    }
                }
                cells
            }
        }
    }

    /// Bounding box size (width, height)
    pub fn size(&self) -> (i64, i64) {
        self.cells()
            .iter()
            .fold((0, 0), |(w, h), &(x, y)| (w.max(x + 1), h.max(y + 1)))
    }
}

/// Where placement offsets are measured from
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Origin {
    TopLeft,
    Center,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Placement {
    pub preset: Preset,
    /// Position of the preset's top-left corner relative to the origin
    pub offset: (i64, i64),
}

impl Placement {
    pub fn new(preset: Preset, x: i64, y: i64) -> Self {
        Self {
            preset,
            offset: (x, y),
        }
    }
}

/// Places presets at fixed offsets. Each preset cell becomes a
/// `scale` x `scale` block; only scale 1 keeps the textbook dynamics.
#[derive(Debug, Clone)]
pub struct StaticPresetPlacer {
    pub placements: Vec<Placement>,
    pub scale: u32,
    pub origin: Origin,
}

impl StaticPresetPlacer {
    pub fn new(placements: Vec<Placement>) -> Self {
        Self {
            placements,
            scale: 1,
            origin: Origin::TopLeft,
        }
    }

    pub fn single(preset: Preset, x: i64, y: i64) -> Self {
        Self::new(vec![Placement::new(preset, x, y)])
    }

    /// One of each preset laid out around the grid centre
    pub fn showcase() -> Self {
        Self {
            placements: vec![
                Placement::new(Preset::GosperGun, -40, -30),
                Placement::new(Preset::Glider, -50, 20),
                Placement::new(Preset::Pulsar, 20, -24),
                Placement::new(Preset::Block, -30, 10),
                Placement::new(Preset::Beehive, -20, 10),
                Placement::new(Preset::Loaf, -10, 10),
                Placement::new(Preset::Blinker, 0, 10),
                Placement::new(Preset::Toad, 10, 10),
                Placement::new(Preset::Beacon, 20, 10),
            ],
            scale: 1,
            origin: Origin::Center,
        }
    }

    fn validate(&self) -> LifeResult<()> {
        if self.placements.is_empty() {
            return Err(LifeError::generator("preset placer has nothing to place"));
        }
        if self.scale == 0 || self.scale > MAX_SCALE {
            return Err(LifeError::generator(format!(
                "preset scale {} must lie in 1..={MAX_SCALE}",
                self.scale
            )));
        }
        Ok(())
    }
}

impl PatternGenerator for StaticPresetPlacer {
    fn name(&self) -> &str {
        "Preset Placer"
    }

    fn generate(&self, width: u32, height: u32, _rng: &mut dyn RngCore) -> LifeResult<Pattern> {
        self.validate()?;

        let (origin_x, origin_y) = match self.origin {
            Origin::TopLeft => (0, 0),
            Origin::Center => (width as i64 / 2, height as i64 / 2),
        };
        let scale = self.scale as i64;

        let mut pattern = Pattern::new();
        for placement in &self.placements {
            let (ox, oy) = placement.offset;
            for (x, y) in placement.preset.cells() {
                super::raster::block(
                    &mut pattern,
                    origin_x + ox + x * scale,
                    origin_y + oy + y * scale,
                    self.scale,
                );
            }
        }

        Ok(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::GridState,
        simulation::kernel::{CpuKernel, TransitionKernel},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn place(preset: Preset, width: u32, height: u32, x: i64, y: i64) -> GridState {
        let mut grid = GridState::new(width, height).unwrap();
        StaticPresetPlacer::single(preset, x, y)
            .generate(width, height, &mut StdRng::seed_from_u64(0))
            .unwrap()
            .write_to(&mut grid);
        grid
    }

    fn step(grid: &mut GridState, times: usize) {
        let mut kernel = CpuKernel::new();
        for _ in 0..times {
            let reciprocal = grid.read().reciprocal();
            grid.advance(|current, next| kernel.step(current, reciprocal, next))
                .unwrap();
        }
    }

    #[test]
    fn test_still_lifes_are_invariant() {
        for preset in [Preset::Block, Preset::Beehive, Preset::Loaf] {
            let mut grid = place(preset, 10, 10, 3, 3);
            let before = grid.read().clone();
            step(&mut grid, 1);
            assert_eq!(grid.read(), &before, "{} changed", preset.as_str());
        }
    }

    #[test]
    fn test_oscillators_have_period_two() {
        for preset in [Preset::Blinker, Preset::Toad, Preset::Beacon] {
            let mut grid = place(preset, 12, 12, 4, 4);
            let initial = grid.read().clone();

            step(&mut grid, 1);
            assert_ne!(grid.read(), &initial, "{} did not oscillate", preset.as_str());
            step(&mut grid, 1);
            assert_eq!(grid.read(), &initial, "{} period is not 2", preset.as_str());
        }
    }

    #[test]
    fn test_pulsar_has_period_three() {
        let mut grid = place(Preset::Pulsar, 21, 21, 4, 4);
        assert_eq!(grid.read().alive_count(), 48);
        let initial = grid.read().clone();

        step(&mut grid, 1);
        assert_ne!(grid.read(), &initial);
        step(&mut grid, 2);
        assert_eq!(grid.read(), &initial);
    }

    #[test]
    fn test_glider_translates_diagonally() {
        let mut grid = place(Preset::Glider, 20, 20, 5, 5);
        let expected = place(Preset::Glider, 20, 20, 6, 6);

        step(&mut grid, 4);
        assert_eq!(grid.read(), expected.read());
    }

    #[test]
    fn test_gosper_gun_restores_itself_and_emits() {
        let mut grid = place(Preset::GosperGun, 64, 48, 2, 2);
        let initial = grid.read().alive_cells();
        assert_eq!(initial.len(), 36);

        step(&mut grid, 30);
        let current = grid.read();
        for &(x, y) in &initial {
            assert!(current.is_alive(x as i64, y as i64), "gun cell ({x}, {y}) died");
        }
        assert!(current.alive_count() > initial.len());
    }

    #[test]
    fn test_placement_is_deterministic() {
        let placer = StaticPresetPlacer::showcase();
        let mut a = GridState::new(128, 96).unwrap();
        let mut b = GridState::new(128, 96).unwrap();

        placer
            .generate(128, 96, &mut StdRng::seed_from_u64(1))
            .unwrap()
            .write_to(&mut a);
        placer
            .generate(128, 96, &mut StdRng::seed_from_u64(2))
            .unwrap()
            .write_to(&mut b);

        assert_eq!(a.read(), b.read());
        assert!(a.read().alive_count() > 0);
    }

    #[test]
    fn test_scale_and_origin() {
        let placer = StaticPresetPlacer {
            placements: vec![Placement::new(Preset::Block, 0, 0)],
            scale: 2,
            origin: Origin::Center,
        };
        let mut pattern = placer
            .generate(10, 8, &mut StdRng::seed_from_u64(0))
            .unwrap();
        pattern.dedup();
        assert_eq!(pattern.len(), 16);
        assert_eq!(pattern.cells()[0], (5, 4));

        assert_eq!(Preset::GosperGun.size(), (36, 9));
        assert_eq!(Preset::Pulsar.size(), (13, 13));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        let zero_scale = StaticPresetPlacer {
            scale: 0,
            ..StaticPresetPlacer::showcase()
        };
        assert!(matches!(
            zero_scale.generate(10, 10, &mut rng),
            Err(LifeError::GeneratorInput(_))
        ));
        assert!(StaticPresetPlacer::new(Vec::new())
            .generate(10, 10, &mut rng)
            .is_err());
    }
}
