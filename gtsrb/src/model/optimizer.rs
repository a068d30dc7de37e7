use super::{loss::Loss, metrics::Metric};
use crate::common::*;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

/// Options of [Model::compile](crate::model::Model::compile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub optimizer: OptimizerKind,
    pub loss: Loss,
    pub metrics: Vec<Metric>,
    /// Inverse time decay applied per optimization step.
    pub decay: R64,
    pub momentum: R64,
    pub nesterov: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimizer: OptimizerKind::Sgd,
            loss: Loss::CategoricalCrossentropy,
            metrics: vec![Metric::Accuracy],
            decay: r64(1e-6),
            momentum: r64(0.9),
            nesterov: true,
        }
    }
}

/// The optimizer bound to a variable store with its step count.
pub struct CompiledOptimizer {
    options: CompileOptions,
    optimizer: nn::Optimizer,
    iterations: usize,
}

impl fmt::Debug for CompiledOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledOptimizer")
            .field("options", &self.options)
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl CompiledOptimizer {
    pub fn new(vs: &nn::VarStore, options: CompileOptions, lr: f64) -> Result<Self> {
        ensure!(lr > 0.0, "learning rate must be positive, but get {}", lr);
        ensure!(options.decay >= 0.0, "decay must be non-negative");

        let optimizer = match options.optimizer {
            OptimizerKind::Sgd => nn::Sgd {
                momentum: options.momentum.raw(),
                dampening: 0.0,
                wd: 0.0,
                nesterov: options.nesterov,
            }
            .build(vs, lr)?,
            OptimizerKind::Adam => nn::Adam::default().build(vs, lr)?,
        };

        Ok(Self {
            options,
            optimizer,
            iterations: 0,
        })
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// The learning rate of the next step, `lr / (1 + decay * iterations)`.
    pub fn decayed_lr(&self, base_lr: f64) -> f64 {
        decayed_lr(base_lr, self.options.decay.raw(), self.iterations)
    }

    /// Back-propagate the loss and update the variables.
    pub fn step(&mut self, loss: &Tensor, base_lr: f64) {
        let lr = self.decayed_lr(base_lr);
        self.optimizer.set_lr(lr);
        self.optimizer.backward_step(loss);
        self.iterations += 1;
    }
}

pub fn decayed_lr(base_lr: f64, decay: f64, iterations: usize) -> f64 {
    base_lr / (1.0 + decay * iterations as f64)
}
