use super::{Callback, TrainingContext};
use crate::common::*;

type Schedule = dyn Fn(usize, f64) -> f64 + Send + Sync;

/// Sets the base learning rate at the beginning of every epoch.
#[derive(Clone)]
pub struct LearningRateScheduler {
    schedule: Arc<Schedule>,
    verbose: bool,
}

impl Debug for LearningRateScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearningRateScheduler")
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl LearningRateScheduler {
    /// The schedule maps the epoch and the current rate to a new rate.
    pub fn new<F>(schedule: F) -> Self
    where
        F: 'static + Fn(usize, f64) -> f64 + Send + Sync,
    {
        Self {
            schedule: Arc::new(schedule),
            verbose: false,
        }
    }

    /// `initial_lr * factor^floor(epoch / epochs_per_drop)`
    pub fn step_decay(initial_lr: f64, factor: f64, epochs_per_drop: usize) -> Self {
        let epochs_per_drop = epochs_per_drop.max(1);
        Self::new(move |epoch, _| step_decay(initial_lr, factor, epochs_per_drop, epoch))
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

pub fn step_decay(initial_lr: f64, factor: f64, epochs_per_drop: usize, epoch: usize) -> f64 {
    initial_lr * factor.powi((epoch / epochs_per_drop) as i32)
}

impl Callback for LearningRateScheduler {
    fn name(&self) -> &str {
        "LearningRateScheduler"
    }

    fn on_epoch_begin(&mut self, epoch: usize, ctx: &mut TrainingContext<'_>) -> Result<()> {
        let lr = (self.schedule)(epoch, ctx.lr);
        ensure!(
            lr.is_finite() && lr > 0.0,
            "the schedule returns an invalid learning rate {}",
            lr
        );
        if self.verbose {
            info!("epoch {}: learning rate is {}", epoch + 1, lr);
        }
        ctx.lr = lr;
        Ok(())
    }
}
