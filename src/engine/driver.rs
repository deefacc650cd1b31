//! Cooperative scheduling of generation steps and the external command
//! surface.
//!
//! [`EvolutionDriver`] wraps the synchronous [`EvolutionEngine`] behind a
//! mutex and drives it with a cancellable periodic ticker thread. Generation
//! steps run one at a time at a fixed short spacing so observers (and pause
//! requests) can interleave between generations; there is no way to pause
//! mid-step. Every Start/Reset advances an epoch counter that is re-checked
//! under the engine lock, so a pending step scheduled by a superseded run is
//! guaranteed dead before the new command takes effect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use super::search::{EvolutionEngine, EvolutionSnapshot, RunStatus};
use crate::schema::{EvolutionConfig, EvolutionParams, Molecule, ParamUpdate, TargetProperty};

/// Invoked after every completed generation step with a fresh snapshot.
pub type ProgressCallback = Box<dyn Fn(&EvolutionSnapshot) + Send + Sync>;

/// Default spacing between scheduled generation steps.
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Periodic driver for an [`EvolutionEngine`].
pub struct EvolutionDriver {
    engine: Arc<Mutex<EvolutionEngine>>,
    epoch: Arc<AtomicU64>,
    callback: Option<Arc<ProgressCallback>>,
    tick: Duration,
}

impl EvolutionDriver {
    /// Create a driver around a fresh engine.
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            engine: Arc::new(Mutex::new(EvolutionEngine::new(config))),
            epoch: Arc::new(AtomicU64::new(0)),
            callback: None,
            tick: DEFAULT_TICK,
        }
    }

    /// Override the step spacing.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Install a progress callback fired after each completed generation.
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    fn engine(&self) -> MutexGuard<'_, EvolutionEngine> {
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current run status.
    pub fn status(&self) -> RunStatus {
        self.engine().status()
    }

    /// Read-only snapshot of the full controller state.
    pub fn snapshot(&self) -> EvolutionSnapshot {
        self.engine().snapshot()
    }

    /// Start a fresh run with a random population and begin stepping.
    pub fn start(&self) {
        let epoch = {
            let mut engine = self.engine();
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            engine.start();
            epoch
        };
        self.spawn_ticker(epoch);
    }

    /// Start a fresh run from a seed molecule and begin stepping.
    ///
    /// A zero-atom seed is ignored without disturbing any active run.
    pub fn start_from_seed(&self, seed: &Molecule) {
        if seed.atoms.is_empty() {
            return;
        }
        let epoch = {
            let mut engine = self.engine();
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            engine.start_from_seed(seed);
            epoch
        };
        self.spawn_ticker(epoch);
    }

    /// Suspend stepping; the ticker exits on its next wakeup.
    pub fn pause(&self) {
        self.engine().pause();
    }

    /// Resume a paused run with a fresh ticker.
    pub fn resume(&self) {
        let spawn = {
            let mut engine = self.engine();
            let was_paused = engine.status() == RunStatus::Paused;
            engine.resume();
            if was_paused && engine.status() == RunStatus::Running {
                Some(self.epoch.fetch_add(1, Ordering::SeqCst) + 1)
            } else {
                None
            }
        };
        if let Some(epoch) = spawn {
            self.spawn_ticker(epoch);
        }
    }

    /// Reset to Idle with new parameters and target property.
    pub fn reset(&self, params: EvolutionParams, target: TargetProperty) {
        let mut engine = self.engine();
        // Invalidate any pending scheduled step before the reset takes effect.
        self.epoch.fetch_add(1, Ordering::SeqCst);
        engine.reset(params, target);
    }

    /// Apply a single-parameter update (ignored during an active run).
    pub fn update_params(&self, update: ParamUpdate) {
        self.engine().update_params(update);
    }

    /// Swap the target property (ignored during an active run).
    pub fn update_target_property(&self, target: TargetProperty) {
        self.engine().update_target_property(target);
    }

    fn spawn_ticker(&self, epoch: u64) {
        let engine = Arc::clone(&self.engine);
        let epoch_counter = Arc::clone(&self.epoch);
        let callback = self.callback.clone();
        let tick = self.tick;

        thread::spawn(move || {
            loop {
                thread::sleep(tick);
                if epoch_counter.load(Ordering::SeqCst) != epoch {
                    break;
                }
                let snapshot = {
                    let mut engine = engine.lock().unwrap_or_else(|p| p.into_inner());
                    // Re-check under the lock: a start or reset issued while
                    // this tick slept must win over the pending step.
                    if epoch_counter.load(Ordering::SeqCst) != epoch {
                        break;
                    }
                    if engine.status() != RunStatus::Running {
                        break;
                    }
                    engine.step_generation();
                    callback.as_ref().map(|_| engine.snapshot())
                };
                if let (Some(cb), Some(snapshot)) = (&callback, snapshot) {
                    cb(&snapshot);
                }
            }
        });
    }
}

impl Drop for EvolutionDriver {
    fn drop(&mut self) {
        // Let any live ticker exit on its next wakeup.
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}
