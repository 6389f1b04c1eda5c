//! Simulation stepper
//!
//! Owns the [`GridState`] and the active [`TransitionKernel`] and drives one
//! generation per due tick. External writes (drawing, generated patterns) are
//! queued and applied at the start of a tick, strictly before the step, so the
//! kernel never races with another writer.
//!
//! ```text
//! Idle --initialize ok--> Running --kernel/step error--> Failed
//!   ^                                                      |
//!   +----------------------- restart ----------------------+
//! ```

use std::time::Instant;

use log::{debug, error, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{
    kernel::{CpuKernel, TransitionKernel},
    stats::StepStats,
};
use crate::{
    config::LifeConfig,
    error::{LifeError, LifeResult},
    grid::{GridBuffer, GridState},
    patterns::{GeneratorKind, Pattern, PatternGenerator, PatternTask},
};

const LOG_EVERY_GENERATIONS: u64 = 50;

/// Builds the transition kernel on initialize and on every restart
pub type KernelFactory = Box<dyn FnMut() -> LifeResult<Box<dyn TransitionKernel>>>;

/// Factory for the sequential reference kernel
pub fn cpu_factory() -> KernelFactory {
    Box::new(|| Ok(Box::new(CpuKernel::new()) as Box<dyn TransitionKernel>))
}

/// Coarse status signal for the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// No kernel yet
    Idle,
    /// Stepping on every due tick
    Running,
    /// Halted until restart
    Failed(String),
}

impl Status {
    pub fn label(&self) -> &str {
        match self {
            Status::Idle => "Idle",
            Status::Running => "Running",
            Status::Failed(_) => "Failed",
        }
    }
}

/// Fixed-timestep accumulator. Without a target rate every tick runs one step.
#[derive(Debug, Clone)]
struct Pacing {
    steps_per_second: Option<f32>,
    max_steps_per_frame: u32,
    accumulator: f32,
}

impl Pacing {
    fn steps_due(&mut self, delta_seconds: f32) -> u32 {
        let Some(rate) = self.steps_per_second else {
            return 1;
        };

        let dt = 1.0 / rate;
        self.accumulator += delta_seconds.max(0.0);

        let mut steps = 0;
        while self.accumulator >= dt && steps < self.max_steps_per_frame {
            self.accumulator -= dt;
            steps += 1;
        }
        // Drop backlog the cap could not absorb
        if self.accumulator >= dt {
            self.accumulator %= dt;
        }
        steps
    }

    fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

pub struct SimulationStepper {
    grid: GridState,
    kernel: Option<Box<dyn TransitionKernel>>,
    factory: KernelFactory,
    status: Status,
    paused: bool,
    step_requested: bool,
    generation: u64,
    pending: Pattern,
    pending_task: Option<PatternTask>,
    background_generation: bool,
    rng: StdRng,
    seed: u64,
    pacing: Pacing,
    stats: StepStats,
}

impl SimulationStepper {
    /// Create an Idle stepper over an all-dead `width` x `height` grid
    pub fn new(width: u32, height: u32, factory: KernelFactory) -> LifeResult<Self> {
        let seed = rand::rng().random::<u64>();

        Ok(Self {
            grid: GridState::new(width, height)?,
            kernel: None,
            factory,
            status: Status::Idle,
            paused: false,
            step_requested: false,
            generation: 0,
            pending: Pattern::new(),
            pending_task: None,
            background_generation: false,
            rng: StdRng::seed_from_u64(seed),
            seed,
            pacing: Pacing {
                steps_per_second: None,
                max_steps_per_frame: 1,
                accumulator: 0.0,
            },
            stats: StepStats::new(),
        })
    }

    pub fn from_config(
        config: &LifeConfig,
        width: u32,
        height: u32,
        factory: KernelFactory,
    ) -> LifeResult<Self> {
        let mut stepper = Self::new(width, height, factory)?;
        if let Some(seed) = config.seed {
            stepper = stepper.with_seed(seed);
        }
        stepper.background_generation = config.background_generation;
        Ok(stepper.with_pacing(config.steps_per_second, config.max_steps_per_frame))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_pacing(mut self, steps_per_second: Option<f32>, max_steps_per_frame: u32) -> Self {
        self.pacing = Pacing {
            steps_per_second: steps_per_second.filter(|r| *r > 0.0),
            max_steps_per_frame: max_steps_per_frame.max(1),
            accumulator: 0.0,
        };
        self
    }

    pub fn with_background_generation(mut self, enabled: bool) -> Self {
        self.background_generation = enabled;
        self
    }

    /// Build the kernel and enter Running. Failure leaves the stepper Failed.
    pub fn initialize(&mut self) -> LifeResult<()> {
        if self.status == Status::Running {
            return Ok(());
        }

        match (self.factory)() {
            Ok(kernel) => {
                info!(
                    "{} kernel ready, simulating {}x{} with seed {}",
                    kernel.name(),
                    self.grid.width(),
                    self.grid.height(),
                    self.seed
                );
                self.kernel = Some(kernel);
                self.status = Status::Running;
                Ok(())
            }
            Err(e) => {
                self.halt(&e);
                Err(e)
            }
        }
    }

    /// Enter Failed. Used for kernel errors and by the host for render errors.
    pub fn halt(&mut self, e: &LifeError) {
        error!("Simulation halted: {}", e);
        self.status = Status::Failed(e.to_string());
        self.pending = Pattern::new();
        self.pending_task = None;
    }

    fn ensure_not_failed(&self) -> LifeResult<()> {
        match &self.status {
            Status::Failed(message) => {
                Err(LifeError::Step(format!("simulation is halted: {message}")))
            }
            _ => Ok(()),
        }
    }

    /// Advance the frame clock by `delta_seconds`.
    ///
    /// Applies finished background patterns and queued writes, then runs the
    /// steps that are due. Returns how many generations ran. Idle and Failed
    /// steppers do nothing.
    pub fn tick(&mut self, delta_seconds: f32) -> LifeResult<u32> {
        if self.status != Status::Running {
            return Ok(0);
        }

        self.poll_background()?;
        self.apply_pending();

        let due = if self.paused {
            u32::from(std::mem::take(&mut self.step_requested))
        } else {
            self.pacing.steps_due(delta_seconds)
        };

        for _ in 0..due {
            self.advance_generation()?;
        }
        Ok(due)
    }

    /// Apply queued writes and run exactly one generation
    pub fn step(&mut self) -> LifeResult<()> {
        self.ensure_not_failed()?;
        if self.status != Status::Running {
            return Err(LifeError::Step("simulation has not been initialized".into()));
        }

        self.apply_pending();
        self.advance_generation()
    }

    fn advance_generation(&mut self) -> LifeResult<()> {
        let Some(kernel) = self.kernel.as_mut() else {
            let e = LifeError::Step("no transition kernel".into());
            self.halt(&e);
            return Err(e);
        };

        let reciprocal = self.grid.read().reciprocal();
        let started = Instant::now();
        let result = self
            .grid
            .advance(|current, next| kernel.step(current, reciprocal, next));

        match result {
            Ok(()) => {
                self.generation += 1;
                self.stats.record_step(started.elapsed());
                if self.generation % LOG_EVERY_GENERATIONS == 0 {
                    debug!(
                        "Generation {}: {} live cells, {:.2?} per step",
                        self.generation,
                        self.grid.read().alive_count(),
                        self.stats.average_step_time()
                    );
                }
                Ok(())
            }
            Err(e) => {
                self.halt(&e);
                Err(e)
            }
        }
    }

    fn poll_background(&mut self) -> LifeResult<()> {
        let Some(task) = self.pending_task.as_mut() else {
            return Ok(());
        };
        let Some(result) = task.poll() else {
            return Ok(());
        };

        let dimensions = task.dimensions();
        let name = task.name().to_string();
        self.pending_task = None;

        match result {
            Ok(pattern) if dimensions == (self.grid.width(), self.grid.height()) => {
                info!("{} ready with {} cells", name, pattern.len());
                self.seed_with(&pattern);
                Ok(())
            }
            Ok(_) => {
                debug!("Discarding {} pattern generated for {:?}", name, dimensions);
                Ok(())
            }
            Err(e) => {
                self.halt(&e);
                Err(e)
            }
        }
    }

    fn apply_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        std::mem::take(&mut self.pending).write_to(&mut self.grid);
    }

    /// Replace the grid contents with a generated pattern
    fn seed_with(&mut self, pattern: &Pattern) {
        self.grid.clear();
        self.pending = Pattern::new();
        pattern.write_to(&mut self.grid);
        self.generation = 0;
        self.pacing.reset();
    }

    /// Queue cell writes for the start of the next tick.
    ///
    /// While Idle no kernel can be in flight, so writes land on the grid
    /// immediately. A Failed stepper never applies writes and drops them.
    pub fn queue_writes(&mut self, pattern: Pattern) {
        match self.status {
            Status::Running => self.pending.extend(pattern),
            Status::Idle => pattern.write_to(&mut self.grid),
            Status::Failed(_) => {
                debug!("Dropping {} writes while halted", pattern.len());
            }
        }
    }

    /// Writes waiting for the next tick
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Run `generator` now and seed the grid with its pattern.
    ///
    /// Parameters are validated before any write, so on error the grid is
    /// untouched; the error is still terminal and the stepper enters Failed.
    pub fn generate(&mut self, generator: &dyn PatternGenerator) -> LifeResult<usize> {
        self.ensure_not_failed()?;

        let started = Instant::now();
        let result = generator.generate(self.grid.width(), self.grid.height(), &mut self.rng);
        match result {
            Ok(pattern) => {
                info!(
                    "{} generated {} cells in {:.2?}",
                    generator.name(),
                    pattern.len(),
                    started.elapsed()
                );
                // A synchronous seed supersedes any background request
                self.pending_task = None;
                self.seed_with(&pattern);
                Ok(pattern.len())
            }
            Err(e) => {
                self.halt(&e);
                Err(e)
            }
        }
    }

    /// Start `kind` on a worker thread; the result is applied by a later tick.
    /// A new request supersedes one still in flight.
    pub fn spawn_generation(&mut self, kind: GeneratorKind) -> LifeResult<()> {
        self.ensure_not_failed()?;

        if let Some(previous) = &self.pending_task {
            debug!("{} superseded by {}", previous.name(), kind.as_str());
        }
        let seed = self.rng.random::<u64>();
        let task = PatternTask::spawn(kind.build(), self.grid.width(), self.grid.height(), seed);
        match task {
            Ok(task) => {
                self.pending_task = Some(task);
                Ok(())
            }
            Err(e) => {
                self.halt(&e);
                Err(e)
            }
        }
    }

    /// Seed with a catalogue generator, off-thread when it is heavy and
    /// background generation is enabled
    pub fn request_pattern(&mut self, kind: GeneratorKind) -> LifeResult<()> {
        if self.background_generation && kind.is_heavy() {
            self.spawn_generation(kind)
        } else {
            self.generate(kind.build().as_ref()).map(|_| ())
        }
    }

    /// Reset every cell to dead and drop queued work
    pub fn clear(&mut self) {
        self.grid.clear();
        self.pending = Pattern::new();
        self.pending_task = None;
        self.generation = 0;
        info!("Grid cleared");
    }

    /// Reallocate the grid at a new resolution. All cells become dead and
    /// writes queued for the old resolution are discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> LifeResult<()> {
        if (width, height) == (self.grid.width(), self.grid.height()) {
            return Ok(());
        }

        self.grid.resize(width, height)?;
        self.pending = Pattern::new();
        if self.pending_task.take().is_some() {
            warn!("Background generation dropped by resize");
        }
        self.generation = 0;
        self.pacing.reset();
        info!("Grid resized to {}x{}", width, height);
        Ok(())
    }

    /// Drop the kernel, re-enter Idle with dead buffers and initialize again
    pub fn restart(&mut self) -> LifeResult<()> {
        info!("Restarting simulation");
        self.kernel = None;
        self.status = Status::Idle;
        self.grid.clear();
        self.pending = Pattern::new();
        self.pending_task = None;
        self.generation = 0;
        self.step_requested = false;
        self.pacing.reset();
        self.stats.reset();

        self.initialize()
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        info!("Simulation {}", if self.paused { "paused" } else { "resumed" });
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Run one generation on the next tick while paused
    pub fn request_step(&mut self) {
        if self.paused {
            self.step_requested = true;
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn kernel_name(&self) -> Option<&str> {
        self.kernel.as_ref().map(|k| k.name())
    }

    /// Name of the generator still running in the background
    pub fn pending_generation(&self) -> Option<&str> {
        self.pending_task.as_ref().map(|t| t.name())
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    /// The current generation, as shown on screen
    pub fn current(&self) -> &GridBuffer {
        self.grid.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{presets::StaticPresetPlacer, random_fill::RandomFill, raster};
    use std::{cell::Cell, rc::Rc};

    struct FailingKernel;

    impl TransitionKernel for FailingKernel {
        fn name(&self) -> &str {
            "Failing"
        }

        fn step(&mut self, _: &GridBuffer, _: [f32; 2], _: &mut GridBuffer) -> LifeResult<()> {
            Err(LifeError::Step("device lost".into()))
        }
    }

    fn running(width: u32, height: u32) -> SimulationStepper {
        let mut stepper = SimulationStepper::new(width, height, cpu_factory())
            .unwrap()
            .with_seed(42);
        stepper.initialize().unwrap();
        stepper
    }

    fn blinker() -> Pattern {
        Pattern::from_cells(vec![(3, 4), (3, 5), (3, 6)])
    }

    #[test]
    fn test_blinker_end_to_end() {
        let mut stepper = running(8, 8);
        assert_eq!(stepper.current().alive_count(), 0);

        stepper.queue_writes(blinker());
        assert_eq!(stepper.tick(0.016).unwrap(), 1);
        assert_eq!(stepper.current().alive_cells(), vec![(2, 5), (3, 5), (4, 5)]);

        stepper.tick(0.016).unwrap();
        assert_eq!(stepper.current().alive_cells(), vec![(3, 4), (3, 5), (3, 6)]);
        assert_eq!(stepper.generation(), 2);
        assert_eq!(stepper.stats().step_count, 2);
    }

    #[test]
    fn test_idle_does_not_step() {
        let mut stepper = SimulationStepper::new(8, 8, cpu_factory()).unwrap();
        stepper.queue_writes(blinker());

        assert_eq!(stepper.status(), &Status::Idle);
        assert_eq!(stepper.tick(1.0).unwrap(), 0);
        assert_eq!(stepper.generation(), 0);
        assert!(stepper.step().is_err());

        stepper.initialize().unwrap();
        assert!(stepper.is_running());
        stepper.tick(0.0).unwrap();
        assert_eq!(stepper.current().alive_cells(), vec![(2, 5), (3, 5), (4, 5)]);
    }

    #[test]
    fn test_kernel_failure_is_terminal() {
        let factory: KernelFactory =
            Box::new(|| Ok(Box::new(FailingKernel) as Box<dyn TransitionKernel>));
        let mut stepper = SimulationStepper::new(8, 8, factory).unwrap();
        stepper.initialize().unwrap();
        stepper.queue_writes(blinker());

        assert!(matches!(stepper.tick(0.016), Err(LifeError::Step(_))));
        assert!(matches!(stepper.status(), Status::Failed(m) if m.contains("device lost")));

        // Writes were applied before the failed step; the failed step promoted nothing
        let snapshot = stepper.current().clone();
        assert_eq!(snapshot.alive_count(), 3);
        assert_eq!(stepper.tick(0.016).unwrap(), 0);
        assert_eq!(stepper.current(), &snapshot);
        assert!(stepper.step().is_err());
    }

    #[test]
    fn test_halted_stepper_does_not_keep_writes() {
        let factory: KernelFactory =
            Box::new(|| Ok(Box::new(FailingKernel) as Box<dyn TransitionKernel>));
        let mut stepper = SimulationStepper::new(64, 64, factory).unwrap();
        stepper.initialize().unwrap();
        assert!(stepper.tick(0.016).is_err());
        let snapshot = stepper.current().clone();

        for i in 0..2000 {
            let mut stroke = Pattern::new();
            raster::stroke(&mut stroke, (0, i % 64), (63, (i * 7) % 64), 2);
            stepper.queue_writes(stroke);
            assert_eq!(stepper.tick(0.016).unwrap(), 0);
        }

        assert_eq!(stepper.pending_writes(), 0);
        assert_eq!(stepper.current(), &snapshot);
    }

    #[test]
    fn test_idle_writes_land_on_grid() {
        let mut stepper = SimulationStepper::new(8, 8, cpu_factory()).unwrap();
        stepper.queue_writes(blinker());
        stepper.queue_writes(blinker());

        assert_eq!(stepper.pending_writes(), 0);
        assert_eq!(stepper.current().alive_cells(), vec![(3, 4), (3, 5), (3, 6)]);
    }

    #[test]
    fn test_initialization_failure_and_restart() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        let factory: KernelFactory = Box::new(move || {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                Err(LifeError::Initialization("shader rejected".into()))
            } else {
                Ok(Box::new(CpuKernel::new()) as Box<dyn TransitionKernel>)
            }
        });

        let mut stepper = SimulationStepper::new(8, 8, factory).unwrap();
        assert!(matches!(
            stepper.initialize(),
            Err(LifeError::Initialization(_))
        ));
        assert!(matches!(stepper.status(), Status::Failed(_)));

        stepper.restart().unwrap();
        assert!(stepper.is_running());
        assert_eq!(attempts.get(), 2);
        assert_eq!(stepper.current().alive_count(), 0);
    }

    #[test]
    fn test_pacing_accumulates_and_caps() {
        let mut stepper = running(8, 8).with_pacing(Some(10.0), 4);
        assert_eq!(stepper.tick(0.05).unwrap(), 0);
        assert_eq!(stepper.tick(0.06).unwrap(), 1);
        assert_eq!(stepper.tick(1.0).unwrap(), 4);
        // Backlog beyond the cap was dropped
        assert_eq!(stepper.tick(0.0).unwrap(), 0);
        assert_eq!(stepper.generation(), 5);
    }

    #[test]
    fn test_pause_applies_writes_and_single_steps() {
        let mut stepper = running(8, 8);
        stepper.toggle_pause();
        stepper.queue_writes(blinker());

        assert_eq!(stepper.tick(0.016).unwrap(), 0);
        assert_eq!(stepper.current().alive_cells(), vec![(3, 4), (3, 5), (3, 6)]);

        stepper.request_step();
        assert_eq!(stepper.tick(0.016).unwrap(), 1);
        assert_eq!(stepper.tick(0.016).unwrap(), 0);
        assert_eq!(stepper.current().alive_cells(), vec![(2, 5), (3, 5), (4, 5)]);
    }

    #[test]
    fn test_generator_error_leaves_grid_untouched() {
        let mut stepper = running(16, 16);
        stepper.queue_writes(blinker());
        stepper.tick(0.0).unwrap();
        let before = stepper.current().clone();

        let bad = RandomFill {
            samples: 0,
            ..RandomFill::default()
        };
        assert!(matches!(
            stepper.generate(&bad),
            Err(LifeError::GeneratorInput(_))
        ));
        assert_eq!(stepper.current(), &before);
        assert!(matches!(stepper.status(), Status::Failed(_)));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let mut a = running(64, 48);
        let mut b = running(64, 48);
        a.generate(&RandomFill::default()).unwrap();
        b.generate(&RandomFill::default()).unwrap();

        assert_eq!(a.current(), b.current());
        assert!(a.current().alive_count() > 0);
        assert_eq!(a.generation(), 0);
    }

    #[test]
    fn test_resize_clears_and_drops_pending() {
        let mut stepper = running(8, 8);
        stepper
            .generate(&StaticPresetPlacer::showcase())
            .unwrap();
        stepper.tick(0.0).unwrap();
        stepper.queue_writes(blinker());

        stepper.resize(12, 10).unwrap();
        assert_eq!(stepper.generation(), 0);
        assert_eq!(stepper.current().width(), 12);
        assert_eq!(stepper.current().height(), 10);
        assert_eq!(stepper.current().alive_count(), 0);

        stepper.set_paused(true);
        stepper.tick(0.0).unwrap();
        assert_eq!(stepper.current().alive_count(), 0);

        assert!(matches!(
            stepper.resize(0, 10),
            Err(LifeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_background_generation_is_applied_before_step() {
        let mut stepper = running(96, 64).with_background_generation(true);
        stepper.set_paused(true);
        stepper.request_pattern(GeneratorKind::Sierpinski).unwrap();
        assert_eq!(stepper.pending_generation(), Some("Chaos Game"));

        while stepper.pending_generation().is_some() {
            stepper.tick(0.0).unwrap();
            std::thread::yield_now();
        }
        assert!(stepper.is_running());
        assert!(stepper.current().alive_count() > 0);
        assert_eq!(stepper.generation(), 0);
    }

    #[test]
    fn test_clear() {
        let mut stepper = running(8, 8);
        stepper.queue_writes(blinker());
        stepper.tick(0.0).unwrap();
        stepper.clear();
        assert_eq!(stepper.current().alive_count(), 0);
        assert_eq!(stepper.generation(), 0);
    }
}
