use super::{Callback, Logs, MonitorMode, TrainingContext};
use crate::{common::*, model::WeightSnapshot};

/// Stops training when the monitored quantity stops improving.
#[derive(Debug)]
pub struct EarlyStopping {
    monitor: String,
    min_delta: f64,
    patience: usize,
    verbose: bool,
    mode: MonitorMode,
    baseline: Option<f64>,
    restore_best_weights: bool,
    wait: usize,
    stopped_epoch: Option<usize>,
    best: f64,
    best_weights: Option<WeightSnapshot>,
}

impl EarlyStopping {
    pub fn new(monitor: impl Into<String>) -> Self {
        let monitor = monitor.into();
        let mode = MonitorMode::Auto.resolve(&monitor);
        Self {
            monitor,
            min_delta: 0.0,
            patience: 0,
            verbose: false,
            mode,
            baseline: None,
            restore_best_weights: false,
            wait: 0,
            stopped_epoch: None,
            best: mode.worst(),
            best_weights: None,
        }
    }

    /// The minimum change counted as an improvement. The sign is ignored.
    pub fn min_delta(mut self, min_delta: f64) -> Self {
        self.min_delta = min_delta.abs();
        self
    }

    pub fn patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn mode(mut self, mode: MonitorMode) -> Self {
        self.mode = mode.resolve(&self.monitor);
        self
    }

    /// Training stops unless the quantity beats the baseline within the patience.
    pub fn baseline(mut self, baseline: Option<f64>) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn restore_best_weights(mut self, restore_best_weights: bool) -> Self {
        self.restore_best_weights = restore_best_weights;
        self
    }

    /// The zero-based epoch at which training was stopped.
    pub fn stopped_epoch(&self) -> Option<usize> {
        self.stopped_epoch
    }
}

impl Callback for EarlyStopping {
    fn name(&self) -> &str {
        "EarlyStopping"
    }

    fn on_train_begin(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.wait = 0;
        self.stopped_epoch = None;
        self.best = self.baseline.unwrap_or_else(|| self.mode.worst());
        self.best_weights = None;
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &Logs, ctx: &mut TrainingContext<'_>) -> Result<()> {
        let current = match logs.get(&self.monitor) {
            Some(&current) => current,
            None => {
                let available = logs.keys().join(",");
                warn!(
                    "early stopping conditioned on metric '{}' which is not available, available metrics are: {}",
                    self.monitor, available
                );
                return Ok(());
            }
        };

        if self.mode.is_improvement(current, self.best, self.min_delta) {
            self.best = current;
            self.wait = 0;
            if self.restore_best_weights {
                self.best_weights = Some(WeightSnapshot::capture(ctx.vs));
            }
        } else {
            self.wait += 1;
            if self.wait >= self.patience {
                self.stopped_epoch = Some(epoch);
                ctx.stop_training = true;
                if let Some(weights) = &self.best_weights {
                    if self.verbose {
                        info!("restoring model weights from the end of the best epoch");
                    }
                    weights.restore(ctx.vs)?;
                }
            }
        }

        Ok(())
    }

    fn on_train_end(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        if let (Some(epoch), true) = (self.stopped_epoch, self.verbose) {
            info!("epoch {}: early stopping", epoch + 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::callback::test_utils;
    use super::*;

    #[test]
    fn stop_after_patience_and_restore() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let mut weight = vs.root().var("weight", &[1], nn::Init::Const(0.0));
        let topology = test_utils::topology();
        let mut ctx = TrainingContext {
            vs: &vs,
            topology: &topology,
            params: test_utils::params(10),
            lr: 0.01,
            stop_training: false,
        };

        let mut callback = EarlyStopping::new("val_loss")
            .patience(2)
            .restore_best_weights(true);
        callback.on_train_begin(&mut ctx)?;

        for (epoch, val_loss) in [1.0, 0.5, 0.6, 0.7, 0.4].iter().copied().enumerate() {
            tch::no_grad(|| {
                let _ = weight.fill_(epoch as f64);
            });
            callback.on_epoch_end(epoch, &test_utils::logs(&[("val_loss", val_loss)]), &mut ctx)?;
            if ctx.stop_training {
                break;
            }
        }

        assert_eq!(callback.stopped_epoch(), Some(3));
        assert!(ctx.stop_training);
        // weights of epoch 1 with the best val_loss
        approx::assert_abs_diff_eq!(f64::from(&weight), 1.0);
        Ok(())
    }

    #[test]
    fn baseline_must_be_beaten() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let topology = test_utils::topology();
        let mut ctx = TrainingContext {
            vs: &vs,
            topology: &topology,
            params: test_utils::params(10),
            lr: 0.01,
            stop_training: false,
        };

        let mut callback = EarlyStopping::new("val_accuracy")
            .patience(1)
            .baseline(Some(0.9));
        callback.on_train_begin(&mut ctx)?;
        callback.on_epoch_end(0, &test_utils::logs(&[("val_accuracy", 0.95)]), &mut ctx)?;
        assert!(!ctx.stop_training);
        callback.on_epoch_end(1, &test_utils::logs(&[("val_accuracy", 0.93)]), &mut ctx)?;
        assert!(ctx.stop_training);
        Ok(())
    }

    #[test]
    fn missing_monitor_is_ignored() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let topology = test_utils::topology();
        let mut ctx = TrainingContext {
            vs: &vs,
            topology: &topology,
            params: test_utils::params(10),
            lr: 0.01,
            stop_training: false,
        };

        let mut callback = EarlyStopping::new("val_loss");
        callback.on_train_begin(&mut ctx)?;
        callback.on_epoch_end(0, &test_utils::logs(&[("loss", 1.0)]), &mut ctx)?;
        assert!(!ctx.stop_training);
        Ok(())
    }
}
