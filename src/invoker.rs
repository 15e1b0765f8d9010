use web_time::Instant;

use crate::error::{Error, Result};
use crate::gate::{ActionState, RunningGuard};
use crate::lifecycle::VolumeLifecycleManager;
use crate::scene::{Scene, VolumeId};
use crate::volume::Volume;

/// The external computation engine.
///
/// `parameters` arrive positionally in the algorithm's case-insensitive key
/// order; the engine knows nothing about parameter names. Implementations
/// write their result into `output`'s double precision samples and return
/// the computation time in seconds.
pub trait ProcessingEngine {
    fn invoke(
        &mut self,
        input: &Volume,
        output: &mut Volume,
        parameters: &[f64],
        algorithm: &str,
    ) -> Result<f64>;
}

pub fn round_to_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Runtime label text, e.g. `0.125 s.`. Trailing zeros are dropped, so a
/// quarter second reads `0.25 s.` and whole seconds keep one decimal.
pub fn format_runtime(seconds: f64) -> String {
    format!("{:?} s.", round_to_millis(seconds))
}

pub struct ProcessingInvoker<E> {
    engine: E,
}

impl<E: ProcessingEngine> ProcessingInvoker<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Run `algorithm` on `input`, writing into `output`. Blocks until the
    /// engine returns.
    ///
    /// `action` is held at [`ActionState::Running`] for the duration of the
    /// call and is back at idle when this returns, on success or failure.
    /// Returns the engine's elapsed time rounded to milliseconds.
    pub fn run(
        &mut self,
        scene: &mut Scene,
        input: VolumeId,
        output: VolumeId,
        parameters: &[f64],
        algorithm: &str,
        action: &mut ActionState,
    ) -> Result<f64> {
        let _running = RunningGuard::start(action).ok_or(Error::Busy)?;

        let (source, target) = scene.get_pair_mut(input, output)?;
        VolumeLifecycleManager::require_double(source)?;
        VolumeLifecycleManager::require_double(target)?;
        if source.dim() != target.dim() {
            return Err(Error::ShapeMismatch {
                role: target.name().to_string(),
                expected: source.dim(),
                actual: target.dim(),
            });
        }

        tracing::info!(algorithm, input = source.name(), ?parameters, "processing started");
        let started = Instant::now();
        let reported = self
            .engine
            .invoke(source, target, parameters, algorithm)
            .inspect_err(|err| tracing::error!(algorithm, %err, "processing failed"))?;
        let wall_clock = started.elapsed();

        let seconds = if reported.is_finite() && reported >= 0.0 {
            reported
        } else {
            tracing::warn!(algorithm, reported, "engine reported no usable runtime");
            wall_clock.as_secs_f64()
        };
        let elapsed = round_to_millis(seconds);
        target.mark_modified();

        tracing::info!(
            algorithm,
            runtime = %format_runtime(elapsed),
            wall_clock_ms = wall_clock.as_millis() as u64,
            "processing completed"
        );
        Ok(elapsed)
    }
}
