//! Background pattern generation
//!
//! Heavy generators (tens of thousands of plotted points) run on a worker
//! thread. The finished [`Pattern`] comes back over a channel and is applied
//! by the stepper in one go, so the grid only ever has a single writer.
//! Dropping a task before it finishes cancels it: a worker that has not
//! started skips the generator, and a finished one discards its result.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};

use super::{Pattern, PatternGenerator};
use crate::error::{LifeError, LifeResult};

/// Handle to a generator running on a worker thread
pub struct PatternTask {
    name: String,
    width: u32,
    height: u32,
    receiver: Receiver<LifeResult<Pattern>>,
    cancelled: Arc<AtomicBool>,
    // Yields whether the result was delivered
    handle: Option<JoinHandle<bool>>,
}

impl PatternTask {
    /// Start `generator` for a `width` x `height` grid with its own seeded
    /// random source
    pub fn spawn(
        generator: Box<dyn PatternGenerator>,
        width: u32,
        height: u32,
        seed: u64,
    ) -> LifeResult<Self> {
        let name = generator.name().to_string();
        let (sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker_cancelled = cancelled.clone();

        let handle = thread::Builder::new()
            .name(format!("pattern-{}", name.to_lowercase().replace(' ', "-")))
            .spawn(move || {
                if worker_cancelled.load(Ordering::Acquire) {
                    debug!("{} cancelled before it started", generator.name());
                    return false;
                }

                let started = Instant::now();
                let mut rng = StdRng::seed_from_u64(seed);
                let result = generator.generate(width, height, &mut rng);

                if worker_cancelled.load(Ordering::Acquire) {
                    debug!(
                        "{} finished after cancellation, discarding {:?} of work",
                        generator.name(),
                        started.elapsed()
                    );
                    return false;
                }
                if let Ok(pattern) = &result {
                    debug!(
                        "{} produced {} cells in {:?} on worker",
                        generator.name(),
                        pattern.len(),
                        started.elapsed()
                    );
                }
                if sender.send(result).is_err() {
                    debug!("{} result dropped, no receiver", generator.name());
                    return false;
                }
                true
            })
            .map_err(|e| LifeError::Step(format!("failed to start generator thread: {e}")))?;

        info!("Generating {} for {}x{} in background", name, width, height);

        Ok(Self {
            name,
            width,
            height,
            receiver,
            cancelled,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid size the pattern is being generated for
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Non-blocking check for the result
    pub fn poll(&mut self) -> Option<LifeResult<Pattern>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(LifeError::Step(format!(
                    "{} generator exited without a result",
                    self.name
                ))))
            }
        }
    }

    /// Block until the worker finishes
    pub fn wait(mut self) -> LifeResult<Pattern> {
        let result = self.receiver.recv().unwrap_or_else(|_| {
            Err(LifeError::Step(format!(
                "{} generator exited without a result",
                self.name
            )))
        });
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} generator thread panicked", self.name);
            }
        }
    }
}

impl Drop for PatternTask {
    fn drop(&mut self) {
        // Still attached means no result was consumed; the worker is left detached
        if self.handle.is_some() {
            self.cancelled.store(true, Ordering::Release);
            debug!("Cancelled {} generation", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{presets::StaticPresetPlacer, GeneratorKind};
    use rand::RngCore;
    use std::sync::Mutex;

    struct Panicking;

    /// Blocks until released, then yields a single cell
    struct Gated {
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl PatternGenerator for Gated {
        fn name(&self) -> &str {
            "Gated"
        }

        fn generate(&self, _: u32, _: u32, _: &mut dyn RngCore) -> LifeResult<Pattern> {
            if let Ok(release) = self.release.lock() {
                let _ = release.recv();
            }
            Ok(Pattern::from_cells(vec![(0, 0)]))
        }
    }

    fn gated() -> (PatternTask, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        let generator = Gated {
            release: Mutex::new(gate),
        };
        let task = PatternTask::spawn(Box::new(generator), 4, 4, 0).unwrap();
        (task, release)
    }

    impl PatternGenerator for Panicking {
        fn name(&self) -> &str {
            "Panicking"
        }

        fn generate(&self, _: u32, _: u32, _: &mut dyn RngCore) -> LifeResult<Pattern> {
            panic!("generator blew up")
        }
    }

    #[test]
    fn test_background_result_matches_foreground() {
        let kind = GeneratorKind::Sierpinski;
        let task = PatternTask::spawn(kind.build(), 80, 60, 21).unwrap();
        assert_eq!(task.dimensions(), (80, 60));

        let background = task.wait().unwrap();
        let foreground = kind
            .build()
            .generate(80, 60, &mut StdRng::seed_from_u64(21))
            .unwrap();
        assert_eq!(background, foreground);
    }

    #[test]
    fn test_poll_eventually_yields() {
        let mut task =
            PatternTask::spawn(Box::new(StaticPresetPlacer::showcase()), 64, 64, 0).unwrap();
        let result = loop {
            if let Some(result) = task.poll() {
                break result;
            }
            thread::yield_now();
        };
        assert!(!result.unwrap().is_empty());
    }

    #[test]
    fn test_generator_errors_are_forwarded() {
        let bad = StaticPresetPlacer::new(Vec::new());
        let task = PatternTask::spawn(Box::new(bad), 10, 10, 0).unwrap();
        assert!(matches!(task.wait(), Err(LifeError::GeneratorInput(_))));
    }

    #[test]
    fn test_panicking_worker_reports_step_error() {
        let task = PatternTask::spawn(Box::new(Panicking), 10, 10, 0).unwrap();
        assert!(matches!(task.wait(), Err(LifeError::Step(_))));
    }

    #[test]
    fn test_cancelled_worker_discards_result() {
        let (mut task, release) = gated();
        task.cancelled.store(true, Ordering::Release);
        // The worker may skip the generator, dropping the gate
        let _ = release.send(());

        let handle = task.handle.take().unwrap();
        assert!(!handle.join().unwrap());
        assert!(task.receiver.try_recv().is_err());
    }

    #[test]
    fn test_uncancelled_worker_delivers() {
        let (mut task, release) = gated();
        release.send(()).unwrap();

        let handle = task.handle.take().unwrap();
        assert!(handle.join().unwrap());
        assert_eq!(task.receiver.recv().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_dropping_unfinished_task_cancels_it() {
        let (task, release) = gated();
        let cancelled = task.cancelled.clone();
        drop(task);
        assert!(cancelled.load(Ordering::Acquire));

        // Lets the detached worker finish
        let _ = release.send(());
    }

    #[test]
    fn test_consumed_task_is_not_cancelled() {
        let (task, release) = gated();
        let cancelled = task.cancelled.clone();
        release.send(()).unwrap();
        assert!(task.wait().is_ok());
        assert!(!cancelled.load(Ordering::Acquire));
    }
}
