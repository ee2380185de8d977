//! Thread-safe facade over a [`Stabilize`] implementation.
//!
//! All calls serialize on one mutex. A panic inside the stabilizer is caught
//! at this boundary: frame calls get a deep copy of their input back, other
//! calls report [`StabilizerError::Internal`]. The panic message is the
//! wrapper's last error until a later call completes. A poisoned lock is
//! recovered rather than propagated.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use tracing::error;

use crate::engine::StabilizerEngine;
use crate::error::{Result, StabilizerError};
use crate::frame::ImageBuffer;
use crate::metrics::PerformanceMetrics;
use crate::params::StabilizationParameters;
use crate::stabilize::Stabilize;
use crate::transform::Transform;

pub struct StabilizerWrapper<S: Stabilize = StabilizerEngine> {
    inner: Mutex<Slot<S>>,
}

struct Slot<S> {
    stabilizer: Option<S>,
    /// Message of the last contained panic; cleared by the next call that
    /// completes.
    panic_error: Option<String>,
}

impl<S> Slot<S> {
    fn settle<T>(&mut self, outcome: std::result::Result<T, String>) -> Option<T> {
        match outcome {
            Ok(value) => {
                self.panic_error = None;
                Some(value)
            }
            Err(msg) => {
                self.panic_error = Some(msg);
                None
            }
        }
    }
}

impl Default for StabilizerWrapper<StabilizerEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl StabilizerWrapper<StabilizerEngine> {
    /// Wrapper hosting the standard engine.
    pub fn new() -> Self {
        Self::with_stabilizer(StabilizerEngine::new())
    }
}

impl<S: Stabilize> StabilizerWrapper<S> {
    pub fn with_stabilizer(stabilizer: S) -> Self {
        Self::from_slot(Some(stabilizer))
    }

    /// Wrapper with nothing installed; every frame passes through.
    pub fn empty() -> Self {
        Self::from_slot(None)
    }

    fn from_slot(stabilizer: Option<S>) -> Self {
        Self {
            inner: Mutex::new(Slot {
                stabilizer,
                panic_error: None,
            }),
        }
    }

    /// Install `stabilizer`, returning the previous one.
    pub fn install(&self, stabilizer: S) -> Option<S> {
        let mut slot = self.lock();
        slot.panic_error = None;
        slot.stabilizer.replace(stabilizer)
    }

    pub fn initialize(
        &self,
        width: usize,
        height: usize,
        params: StabilizationParameters,
    ) -> Result<()> {
        let mut slot = self.lock();
        let Some(s) = slot.stabilizer.as_mut() else {
            return Err(StabilizerError::NotInitialized);
        };
        let outcome = guarded("initialize", || s.initialize(width, height, params));
        internal_on_panic(&mut *slot, outcome)
    }

    /// Stabilize one frame. Always returns a frame.
    pub fn process_frame(&self, frame: &ImageBuffer) -> ImageBuffer {
        let mut slot = self.lock();
        let Some(s) = slot.stabilizer.as_mut() else {
            return frame.clone();
        };
        let outcome = guarded("process_frame", || s.process_frame(frame));
        slot.settle(outcome).unwrap_or_else(|| frame.deep_copy())
    }

    pub fn update_parameters(&self, params: StabilizationParameters) -> Result<()> {
        let mut slot = self.lock();
        let Some(s) = slot.stabilizer.as_mut() else {
            return Err(StabilizerError::NotInitialized);
        };
        let outcome = guarded("update_parameters", || s.update_parameters(params));
        internal_on_panic(&mut *slot, outcome)
    }

    pub fn reset(&self) {
        let mut slot = self.lock();
        if let Some(s) = slot.stabilizer.as_mut() {
            let outcome = guarded("reset", || s.reset());
            slot.settle(outcome);
        }
    }

    /// Drop the hosted stabilizer and all of its state.
    pub fn clear_state(&self) {
        let mut slot = self.lock();
        slot.stabilizer = None;
        slot.panic_error = None;
    }

    /// A stabilizer is installed.
    pub fn is_initialized(&self) -> bool {
        self.lock().stabilizer.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.lock().stabilizer.as_ref().is_some_and(|s| s.is_ready())
    }

    /// A contained panic takes precedence over the stabilizer's own error.
    pub fn last_error(&self) -> Option<String> {
        let slot = self.lock();
        if let Some(msg) = &slot.panic_error {
            return Some(StabilizerError::Internal(msg.clone()).to_string());
        }
        match slot.stabilizer.as_ref() {
            Some(s) => s.last_error(),
            None => Some(StabilizerError::NotInitialized.to_string()),
        }
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.lock()
            .stabilizer
            .as_ref()
            .map(|s| s.performance_metrics())
            .unwrap_or_default()
    }

    pub fn current_parameters(&self) -> StabilizationParameters {
        self.lock()
            .stabilizer
            .as_ref()
            .map(|s| s.parameters())
            .unwrap_or_default()
    }

    pub fn transform_history(&self) -> Vec<Transform> {
        self.lock()
            .stabilizer
            .as_ref()
            .map(|s| s.transform_history())
            .unwrap_or_default()
    }

    /// Run `f` against the hosted stabilizer under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.lock().stabilizer.as_ref().map(f)
    }

    fn lock(&self) -> MutexGuard<'_, Slot<S>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            error!("stabilizer lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Record a contained panic and report it as [`StabilizerError::Internal`].
fn internal_on_panic<S>(
    slot: &mut Slot<S>,
    outcome: std::result::Result<Result<()>, String>,
) -> Result<()> {
    let message = outcome.as_ref().err().cloned();
    match slot.settle(outcome) {
        Some(result) => result,
        None => Err(StabilizerError::Internal(message.unwrap_or_default())),
    }
}

/// Run `f`, converting a panic into its message.
fn guarded<T>(op: &str, f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(op, "stabilizer panicked: {msg}");
        format!("{op} panicked: {msg}")
    })
}
