use crate::{common::*, model::ModelTopology};

/// Named scalar values reported by the training loop.
pub type Logs = IndexMap<String, f64>;

/// Static parameters of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingParams {
    pub epochs: usize,
    pub initial_epoch: usize,
    pub steps_per_epoch: Option<usize>,
    pub batch_size: Option<usize>,
}

/// The mutable training state exposed to callbacks.
pub struct TrainingContext<'a> {
    pub vs: &'a nn::VarStore,
    pub topology: &'a ModelTopology,
    pub params: TrainingParams,
    /// The base learning rate of the current epoch.
    pub lr: f64,
    /// Set to end training after the current epoch.
    pub stop_training: bool,
}

impl Debug for TrainingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingContext")
            .field("params", &self.params)
            .field("lr", &self.lr)
            .field("stop_training", &self.stop_training)
            .finish()
    }
}

/// Epochs and batches are counted from zero.
pub trait Callback: Debug + Send {
    fn name(&self) -> &str;

    fn on_train_begin(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_train_end(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_epoch_begin(&mut self, _epoch: usize, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        _epoch: usize,
        _logs: &Logs,
        _ctx: &mut TrainingContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_batch_end(
        &mut self,
        _batch: usize,
        _logs: &Logs,
        _ctx: &mut TrainingContext<'_>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Dispatches hooks to callbacks in registration order.
#[derive(Debug)]
pub struct CallbackList<'a> {
    callbacks: Vec<&'a mut Box<dyn Callback>>,
}

impl<'a> CallbackList<'a> {
    pub fn new(callbacks: impl IntoIterator<Item = &'a mut Box<dyn Callback>>) -> Self {
        Self {
            callbacks: callbacks.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn on_train_begin(&mut self, ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.callbacks
            .iter_mut()
            .try_for_each(|callback| callback.on_train_begin(ctx))
    }

    pub fn on_train_end(&mut self, ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.callbacks
            .iter_mut()
            .try_for_each(|callback| callback.on_train_end(ctx))
    }

    pub fn on_epoch_begin(&mut self, epoch: usize, ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.callbacks
            .iter_mut()
            .try_for_each(|callback| callback.on_epoch_begin(epoch, ctx))
    }

    pub fn on_epoch_end(
        &mut self,
        epoch: usize,
        logs: &Logs,
        ctx: &mut TrainingContext<'_>,
    ) -> Result<()> {
        self.callbacks
            .iter_mut()
            .try_for_each(|callback| callback.on_epoch_end(epoch, logs, ctx))
    }

    pub fn on_batch_end(
        &mut self,
        batch: usize,
        logs: &Logs,
        ctx: &mut TrainingContext<'_>,
    ) -> Result<()> {
        self.callbacks
            .iter_mut()
            .try_for_each(|callback| callback.on_batch_end(batch, logs, ctx))
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use crate::model::{InputShape, SimpleCnnInit};

    pub fn topology() -> ModelTopology {
        SimpleCnnInit {
            name: "test".into(),
            input_shape: InputShape::default(),
            kernel_size: 3,
            layer_activation: Activation::Relu,
            num_output: 3,
            output_activation: Activation::Softmax,
        }
        .build()
        .unwrap()
    }

    pub fn params(epochs: usize) -> TrainingParams {
        TrainingParams {
            epochs,
            initial_epoch: 0,
            steps_per_epoch: Some(1),
            batch_size: None,
        }
    }

    pub fn logs(pairs: &[(&str, f64)]) -> Logs {
        pairs
            .iter()
            .map(|&(key, value)| (key.to_string(), value))
            .collect()
    }
}
