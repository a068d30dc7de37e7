use super::{
    artifact_stem, name_to_file, CompileOptions, CompiledOptimizer, History, InputShape,
    LayerSummary, Loss, Metric, MetricMeter, ModelTopology, Network, SimpleCnnInit,
};
use crate::{
    callbacks::{
        callbacks_from_names, Callback, CallbackList, CsvLogger, LearningRateScheduler, Logs,
        TensorBoard, TrainingContext, TrainingParams, DEFAULT_CALLBACKS,
    },
    common::*,
    dataset::ArtifactLayout,
    generator::{with_prefetch, Batch},
    utils::{self, RateCounter},
};
use chrono::Utc;

/// The batch size used when evaluating or predicting tensors without an explicit one.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Hyper-parameters of a [Model].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInit {
    pub name: String,
    /// Save the topology before and the weights after each fit.
    pub auto_save: bool,
    pub layer_activation: Activation,
    pub num_output: usize,
    pub output_activation: Activation,
    pub kernel_size: usize,
    pub input_shape: InputShape,
    pub lr: R64,
}

impl Default for ModelInit {
    fn default() -> Self {
        Self {
            name: "Simple Model".into(),
            auto_save: true,
            layer_activation: Activation::Relu,
            num_output: 43,
            output_activation: Activation::Softmax,
            kernel_size: 3,
            input_shape: InputShape::default(),
            lr: r64(0.01),
        }
    }
}

impl ModelInit {
    pub fn build(self, device: Device, layout: ArtifactLayout) -> Result<Model> {
        let Self {
            name,
            auto_save,
            layer_activation,
            num_output,
            output_activation,
            kernel_size,
            input_shape,
            lr,
        } = self;

        ensure!(!name.is_empty(), "the model name must not be empty");
        ensure!(num_output > 0, "num_output must be positive");
        ensure!(kernel_size > 0, "kernel_size must be positive");
        ensure!(lr > 0.0, "lr must be positive");

        Ok(Model {
            name,
            auto_save,
            layer_activation,
            num_output,
            output_activation,
            kernel_size,
            input_shape,
            lr,
            device,
            layout,
            vs: nn::VarStore::new(device),
            network: None,
            topology: None,
            compiled: None,
            callbacks: vec![],
        })
    }
}

/// Options of [Model::fit].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// The trailing fraction of samples held out for validation.
    pub validation_split: R64,
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            validation_split: r64(0.25),
            epochs: 10,
            batch_size: 100,
            shuffle: true,
        }
    }
}

/// Options of [Model::fit_generator].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitGeneratorOptions {
    pub steps_per_epoch: usize,
    pub epochs: usize,
    /// The number of validation batches when the validation data does not specify it.
    pub validation_steps: Option<usize>,
    /// Zero produces batches on the training thread.
    pub workers: usize,
    pub max_queue_size: usize,
    pub initial_epoch: usize,
}

impl Default for FitGeneratorOptions {
    fn default() -> Self {
        Self {
            steps_per_epoch: 1000,
            epochs: 10,
            validation_steps: None,
            workers: 1,
            max_queue_size: 10,
            initial_epoch: 0,
        }
    }
}

/// Data evaluated at the end of each epoch.
pub enum ValidationData<'a> {
    Tensors {
        data: &'a Tensor,
        labels: &'a Tensor,
    },
    Batches {
        iter: &'a mut dyn Iterator<Item = Result<Batch>>,
        steps: Option<usize>,
    },
}

impl Debug for ValidationData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tensors { data, labels } => f
                .debug_struct("Tensors")
                .field("data", &data.size())
                .field("labels", &labels.size())
                .finish(),
            Self::Batches { steps, .. } => f.debug_struct("Batches").field("steps", steps).finish(),
        }
    }
}

/// A sequential image classifier with its training state and callbacks.
pub struct Model {
    name: String,
    auto_save: bool,
    layer_activation: Activation,
    num_output: usize,
    output_activation: Activation,
    kernel_size: usize,
    input_shape: InputShape,
    lr: R64,
    device: Device,
    layout: ArtifactLayout,
    vs: nn::VarStore,
    network: Option<Network>,
    topology: Option<ModelTopology>,
    compiled: Option<CompiledOptimizer>,
    callbacks: Vec<Box<dyn Callback>>,
}

impl Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("auto_save", &self.auto_save)
            .field("input_shape", &self.input_shape)
            .field("lr", &self.lr)
            .field("device", &self.device)
            .field("topology", &self.topology)
            .field("compiled", &self.compiled)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    pub fn lr(&self) -> f64 {
        self.lr.raw()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn topology(&self) -> Result<&ModelTopology> {
        self.topology
            .as_ref()
            .ok_or_else(|| format_err!("the model is not created, call create_model() or load_model() first"))
    }

    pub fn network(&self) -> Result<&Network> {
        self.network
            .as_ref()
            .ok_or_else(|| format_err!("the model is not created, call create_model() or load_model() first"))
    }

    pub fn summary(&self) -> Result<Vec<LayerSummary>> {
        self.topology()?.summary()
    }

    /// Build the three-block convolutional network from the hyper-parameters.
    pub fn create_model(&mut self) -> Result<&ModelTopology> {
        let topology = SimpleCnnInit {
            name: self.name.clone(),
            input_shape: self.input_shape,
            kernel_size: self.kernel_size,
            layer_activation: self.layer_activation,
            num_output: self.num_output,
            output_activation: self.output_activation,
        }
        .build()?;
        self.build_network(topology)?;
        self.topology()
    }

    /// Replace the network with fresh variables. The compile options are kept.
    fn build_network(&mut self, topology: ModelTopology) -> Result<()> {
        let vs = nn::VarStore::new(self.device);
        let network = Network::new(&vs.root(), &topology)?;
        let compiled = self
            .compiled
            .as_ref()
            .map(|compiled| CompiledOptimizer::new(&vs, compiled.options().clone(), self.lr.raw()))
            .transpose()?;

        self.input_shape = topology.input_shape;
        self.vs = vs;
        self.network = Some(network);
        self.topology = Some(topology);
        self.compiled = compiled;
        Ok(())
    }

    /// Attach the optimizer, the loss and the metrics.
    pub fn compile(&mut self, options: CompileOptions) -> Result<()> {
        self.network()?;
        self.compiled = Some(CompiledOptimizer::new(&self.vs, options, self.lr.raw())?);
        Ok(())
    }

    /// Train on in-memory tensors. The last `validation_split` fraction of the
    /// samples is used for validation.
    pub fn fit(&mut self, data: &Tensor, labels: &Tensor, options: &FitOptions) -> Result<History> {
        let FitOptions {
            validation_split,
            epochs,
            batch_size,
            shuffle,
        } = *options;

        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(
            (0.0..1.0).contains(&validation_split.raw()),
            "validation_split must be in [0, 1)"
        );
        let num_samples = utils::batch_len(data)?;
        let num_labels = utils::batch_len(labels)?;
        ensure!(
            num_labels == num_samples,
            "the number of labels {} does not match the number of samples {}",
            num_labels,
            num_samples
        );

        let split_at = (num_samples as f64 * (1.0 - validation_split.raw())) as i64;
        ensure!(
            split_at > 0,
            "no training samples are left after the validation split"
        );
        let train_data = data.narrow(0, 0, split_at);
        let train_labels = labels.narrow(0, 0, split_at);
        let valid = (split_at < num_samples).then(|| {
            (
                data.narrow(0, split_at, num_samples - split_at),
                labels.narrow(0, split_at, num_samples - split_at),
            )
        });

        if self.auto_save {
            self.auto_save_model()?;
        }

        let extra_callbacks = self.callbacks_pre_fit()?;
        let mut source = TensorEpochs {
            data: &train_data,
            labels: &train_labels,
            num_samples: split_at,
            batch_size,
            shuffle,
            rng: StdRng::from_entropy(),
        };
        let validation = valid
            .as_ref()
            .map(|(data, labels)| ValidationData::Tensors { data, labels });
        let params = TrainingParams {
            epochs,
            initial_epoch: 0,
            steps_per_epoch: None,
            batch_size: Some(batch_size),
        };

        let history = self.run_training(&mut source, validation, batch_size, params, extra_callbacks)?;

        if self.auto_save {
            self.auto_save_weights()?;
        }
        Ok(history)
    }

    /// Train on batches drawn from an endless generator, `steps_per_epoch` per epoch.
    pub fn fit_generator<I>(
        &mut self,
        generator: I,
        options: &FitGeneratorOptions,
        validation: Option<ValidationData<'_>>,
    ) -> Result<History>
    where
        I: Iterator<Item = Result<Batch>> + Send,
    {
        let FitGeneratorOptions {
            steps_per_epoch,
            epochs,
            validation_steps,
            workers,
            max_queue_size,
            initial_epoch,
        } = *options;

        ensure!(steps_per_epoch > 0, "steps_per_epoch must be positive");
        ensure!(
            initial_epoch <= epochs,
            "initial_epoch {} exceeds epochs {}",
            initial_epoch,
            epochs
        );

        let mut validation = validation;
        if let Some(ValidationData::Batches { steps, .. }) = &mut validation {
            if steps.is_none() {
                *steps = validation_steps;
            }
            ensure!(
                steps.map(|steps| steps > 0).unwrap_or(false),
                "validation_steps must be positive for validation batches"
            );
        }

        if self.auto_save {
            self.auto_save_model()?;
        }

        let extra_callbacks = self.callbacks_pre_fit()?;
        let params = TrainingParams {
            epochs,
            initial_epoch,
            steps_per_epoch: Some(steps_per_epoch),
            batch_size: None,
        };

        let history = with_prefetch(generator, workers, max_queue_size, |iter| {
            let mut source = GeneratorEpochs {
                iter,
                steps: steps_per_epoch,
            };
            self.run_training(
                &mut source,
                validation,
                DEFAULT_BATCH_SIZE,
                params,
                extra_callbacks,
            )
        })?;

        if self.auto_save {
            self.auto_save_weights()?;
        }
        Ok(history)
    }

    fn run_training(
        &mut self,
        source: &mut dyn EpochBatches,
        mut validation: Option<ValidationData<'_>>,
        eval_batch_size: usize,
        params: TrainingParams,
        mut extra_callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<History> {
        let device = self.device;
        let base_lr = self.lr.raw();
        let Self {
            vs,
            network,
            topology,
            compiled,
            callbacks,
            ..
        } = self;

        let network = network
            .as_ref()
            .ok_or_else(|| format_err!("the model is not created"))?;
        let topology = topology
            .as_ref()
            .ok_or_else(|| format_err!("the model is not created"))?;
        let compiled = compiled
            .as_mut()
            .ok_or_else(|| format_err!("the model must be compiled before training"))?;
        let loss_fn = compiled.options().loss;
        let metrics = compiled.options().metrics.clone();
        let activation = network.output_activation();

        let mut callbacks = CallbackList::new(callbacks.iter_mut().chain(extra_callbacks.iter_mut()));
        let mut ctx = TrainingContext {
            vs: &*vs,
            topology,
            params,
            lr: base_lr,
            stop_training: false,
        };
        let mut history = History::default();
        let mut rate_counter = RateCounter::with_second_interval();

        callbacks.on_train_begin(&mut ctx)?;

        for epoch in params.initial_epoch..params.epochs {
            callbacks.on_epoch_begin(epoch, &mut ctx)?;
            let mut meter = MetricMeter::new(&metrics);

            for (step, batch) in source.epoch_batches(epoch).enumerate() {
                let batch = batch?.to_device(device);
                let labels = batch.labels()?;

                let logits = network.forward_logits_t(&batch.images, true);
                let loss = loss_fn.compute(&logits, activation, labels)?;
                compiled.step(&loss, ctx.lr);

                let outputs = tch::no_grad(|| logits.detach().activation(activation));
                meter.update(&loss.detach(), &outputs, labels)?;
                callbacks.on_batch_end(step, &meter.logs(), &mut ctx)?;

                rate_counter.add(1.0);
                if let Some(rate) = rate_counter.rate() {
                    debug!(
                        "epoch: {}\tstep: {}\tloss: {:.5}\t{:.2} batches/s",
                        epoch + 1,
                        step,
                        meter.logs()["loss"],
                        rate
                    );
                }
            }
            ensure!(
                meter.count() > 0,
                "epoch {} has no training batches",
                epoch + 1
            );

            let mut logs = meter.logs();
            if let Some(validation) = &mut validation {
                let valid_logs = match validation {
                    ValidationData::Tensors { data, labels } => evaluate_batches(
                        network,
                        loss_fn,
                        &metrics,
                        device,
                        tensor_batches(*data, Some(*labels), eval_batch_size, sequential_order(*data)?),
                    )?,
                    ValidationData::Batches { iter, steps } => {
                        let steps = (*steps).ok_or_else(|| format_err!("validation_steps is not set"))?;
                        evaluate_batches(
                            network,
                            loss_fn,
                            &metrics,
                            device,
                            (&mut **iter).take(steps),
                        )?
                    }
                };
                logs.extend(
                    valid_logs
                        .into_iter()
                        .map(|(key, value)| (format!("val_{}", key), value)),
                );
            }
            logs.insert("lr".into(), compiled.decayed_lr(ctx.lr));

            info!(
                "epoch {}/{} - {}",
                epoch + 1,
                params.epochs,
                logs.iter()
                    .map(|(key, value)| format!("{}: {:.4}", key, value))
                    .join(" - ")
            );
            history.push(epoch, &logs);
            callbacks.on_epoch_end(epoch, &logs, &mut ctx)?;

            if ctx.stop_training {
                break;
            }
        }

        callbacks.on_train_end(&mut ctx)?;
        Ok(history)
    }

    /// Compute the loss and metrics on tensors.
    pub fn evaluate(
        &self,
        data: &Tensor,
        labels: &Tensor,
        batch_size: impl Into<Option<usize>>,
    ) -> Result<Logs> {
        let batch_size = batch_size.into().unwrap_or(DEFAULT_BATCH_SIZE);
        ensure!(batch_size > 0, "batch_size must be positive");
        let order = sequential_order(data)?;
        ensure!(
            utils::batch_len(labels)? == order.len() as i64,
            "the number of labels does not match the number of samples"
        );
        self.evaluate_iter(tensor_batches(data, Some(labels), batch_size, order))
    }

    /// Compute the loss and metrics on `steps` batches of a generator.
    pub fn evaluate_generator<I>(&self, generator: I, steps: usize) -> Result<Logs>
    where
        I: Iterator<Item = Result<Batch>>,
    {
        ensure!(steps > 0, "steps must be positive");
        self.evaluate_iter(generator.take(steps))
    }

    fn evaluate_iter(&self, batches: impl Iterator<Item = Result<Batch>>) -> Result<Logs> {
        let network = self.network()?;
        let compiled = self
            .compiled
            .as_ref()
            .ok_or_else(|| format_err!("the model must be compiled before evaluation"))?;
        let options = compiled.options();
        evaluate_batches(network, options.loss, &options.metrics, self.device, batches)
    }

    /// Output probabilities of tensors.
    pub fn predict(&self, data: &Tensor, batch_size: impl Into<Option<usize>>) -> Result<Tensor> {
        let batch_size = batch_size.into().unwrap_or(DEFAULT_BATCH_SIZE);
        ensure!(batch_size > 0, "batch_size must be positive");
        self.predict_iter(tensor_batches(data, None, batch_size, sequential_order(data)?))
    }

    /// Output probabilities of `steps` batches of a generator.
    pub fn predict_generator<I>(&self, generator: I, steps: usize) -> Result<Tensor>
    where
        I: Iterator<Item = Result<Batch>>,
    {
        ensure!(steps > 0, "steps must be positive");
        self.predict_iter(generator.take(steps))
    }

    fn predict_iter(&self, batches: impl Iterator<Item = Result<Batch>>) -> Result<Tensor> {
        let network = self.network()?;
        let device = self.device;
        let outputs: Vec<Tensor> = tch::no_grad(|| {
            batches
                .map(|batch| -> Result<_> {
                    let images = batch?.images.to_device(device);
                    Ok(network.forward_t(&images, false))
                })
                .try_collect()
        })?;
        ensure!(!outputs.is_empty(), "no batches to predict");
        Ok(Tensor::cat(&outputs, 0))
    }

    /// Write the topology as JSON.
    pub fn save_model(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let topology = self.topology()?;
        if let Some(parent) = path.parent() {
            utils::create_directory(parent)?;
        }
        topology.save(path)
    }

    /// Write the variables in the libtorch format.
    pub fn save_weights(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.network()?;
        if let Some(parent) = path.parent() {
            utils::create_directory(parent)?;
        }
        self.vs
            .save(path)
            .with_context(|| format!("failed to save weights to '{}'", path.display()))?;
        Ok(())
    }

    /// Rebuild the network from a JSON topology. Returns false if the file is missing.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.is_file() {
            warn!("{} not found", path.display());
            return Ok(false);
        }
        let topology = ModelTopology::load(path)?;
        self.build_network(topology)?;
        Ok(true)
    }

    /// Load variables into the network. Returns false if the file is missing.
    pub fn load_weights(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        self.network()?;
        if !path.is_file() {
            warn!("{} not found", path.display());
            return Ok(false);
        }
        self.vs
            .load(path)
            .with_context(|| format!("failed to load weights from '{}'", path.display()))?;
        Ok(true)
    }

    pub fn auto_save_model(&self) -> Result<PathBuf> {
        let path = self
            .layout
            .model_dir()
            .join(format!("{}.json", self.model_name_mode_now_to_string(true)));
        info!("saving model to {}", path.display());
        self.save_model(&path)?;
        Ok(path)
    }

    pub fn auto_save_weights(&self) -> Result<PathBuf> {
        let path = self
            .layout
            .weights_dir()
            .join(format!("{}.ckpt", self.model_name_mode_now_to_string(false)));
        info!("saving weights to {}", path.display());
        self.save_weights(&path)?;
        Ok(path)
    }

    pub fn callbacks(&self) -> &[Box<dyn Callback>] {
        &self.callbacks
    }

    /// Append the callbacks of known names. Unknown names are skipped.
    pub fn init_callbacks<S>(&mut self, names: impl IntoIterator<Item = S>)
    where
        S: AsRef<str>,
    {
        let callbacks = callbacks_from_names(names, &self.layout);
        self.callbacks.extend(callbacks);
    }

    pub fn init_default_callbacks(&mut self) {
        self.init_callbacks(DEFAULT_CALLBACKS);
    }

    /// Replace the registered callbacks.
    pub fn set_callbacks(&mut self, callbacks: Vec<Box<dyn Callback>>) {
        self.callbacks = callbacks;
    }

    /// Callbacks added to a single fit when any callback is registered.
    fn callbacks_pre_fit(&self) -> Result<Vec<Box<dyn Callback>>> {
        if self.callbacks.is_empty() {
            return Ok(vec![]);
        }

        let stem = self.model_name_mode_now_to_string(false);
        let csv_file = self.layout.log_dir().join(format!("history_{}.csv", stem));

        Ok(vec![
            Box::new(TensorBoard::new(self.tensorboard_dir())),
            Box::new(CsvLogger::new(csv_file, b',', false)),
            Box::new(LearningRateScheduler::step_decay(self.lr.raw(), 0.1, 10)),
        ])
    }

    pub fn name_to_file(&self) -> String {
        name_to_file(&self.name)
    }

    /// The `<name>-<color>-<time>` artifact stem. The time part is empty if `short`.
    pub fn model_name_mode_now_to_string(&self, short: bool) -> String {
        let time = (!short).then(Utc::now);
        artifact_stem(&self.name, &self.input_shape, time)
    }

    pub fn tensorboard_dir(&self) -> PathBuf {
        self.layout
            .log_dir()
            .join(format!("tensorboard-{}", self.model_name_mode_now_to_string(false)))
    }
}

/// Yields the training batches of an epoch.
trait EpochBatches {
    fn epoch_batches(&mut self, epoch: usize) -> Box<dyn Iterator<Item = Result<Batch>> + '_>;
}

struct TensorEpochs<'a> {
    data: &'a Tensor,
    labels: &'a Tensor,
    num_samples: i64,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl EpochBatches for TensorEpochs<'_> {
    fn epoch_batches(&mut self, _epoch: usize) -> Box<dyn Iterator<Item = Result<Batch>> + '_> {
        let mut order: Vec<i64> = (0..self.num_samples).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        Box::new(tensor_batches(
            self.data,
            Some(self.labels),
            self.batch_size,
            order,
        ))
    }
}

struct GeneratorEpochs<'a> {
    iter: &'a mut dyn Iterator<Item = Result<Batch>>,
    steps: usize,
}

impl EpochBatches for GeneratorEpochs<'_> {
    fn epoch_batches(&mut self, _epoch: usize) -> Box<dyn Iterator<Item = Result<Batch>> + '_> {
        Box::new((&mut *self.iter).take(self.steps))
    }
}

fn sequential_order(data: &Tensor) -> Result<Vec<i64>> {
    Ok((0..utils::batch_len(data)?).collect())
}

/// Split tensors into batches along the first dimension in the given order.
fn tensor_batches<'a>(
    data: &'a Tensor,
    labels: Option<&'a Tensor>,
    batch_size: usize,
    order: Vec<i64>,
) -> impl Iterator<Item = Result<Batch>> + 'a {
    let chunks: Vec<Tensor> = order.chunks(batch_size).map(Tensor::of_slice).collect();

    chunks.into_iter().map(move |index| {
        Ok(Batch {
            images: data.index_select(0, &index),
            labels: labels.map(|labels| labels.index_select(0, &index)),
        })
    })
}

fn evaluate_batches(
    network: &Network,
    loss_fn: Loss,
    metrics: &[Metric],
    device: Device,
    batches: impl Iterator<Item = Result<Batch>>,
) -> Result<Logs> {
    let activation = network.output_activation();
    let mut meter = MetricMeter::new(metrics);

    tch::no_grad(|| -> Result<()> {
        for batch in batches {
            let batch = batch?.to_device(device);
            let labels = batch.labels()?;
            let logits = network.forward_logits_t(&batch.images, false);
            let loss = loss_fn.compute(&logits, activation, labels)?;
            let outputs = logits.activation(activation);
            meter.update(&loss, &outputs, labels)?;
        }
        Ok(())
    })?;

    ensure!(meter.count() > 0, "no batches to evaluate");
    Ok(meter.logs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model(layout: ArtifactLayout) -> Result<Model> {
        let mut model = ModelInit {
            name: "Tiny Model".into(),
            num_output: 2,
            input_shape: InputShape::new(24, 24, 1),
            lr: r64(0.05),
            ..Default::default()
        }
        .build(Device::Cpu, layout)?;
        model.create_model()?;
        model.compile(CompileOptions::default())?;
        Ok(model)
    }

    /// Bright images are class 1 and dark images class 0.
    fn toy_data(num: i64) -> (Tensor, Tensor) {
        let classes = Tensor::of_slice(&(0..num).map(|index| index % 2).collect::<Vec<i64>>());
        let images = classes
            .to_kind(Kind::Float)
            .view([num, 1, 1, 1])
            .expand(&[num, 1, 24, 24], false)
            .contiguous();
        (images, classes.onehot(2).to_kind(Kind::Float))
    }

    #[test]
    fn fit_evaluate_predict() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let layout = ArtifactLayout::with_root(dir.path());
        let mut model = tiny_model(layout.clone())?;
        let (images, labels) = toy_data(16);

        let history = model.fit(
            &images,
            &labels,
            &FitOptions {
                epochs: 2,
                batch_size: 4,
                ..Default::default()
            },
        )?;
        assert_eq!(history.len(), 2);
        assert!(history.last("val_loss").is_some());
        assert!(history.last("accuracy").is_some());

        let logs = model.evaluate(&images, &labels, None)?;
        assert!(logs["loss"].is_finite());
        assert!((0.0..=1.0).contains(&logs["accuracy"]));

        let probs = model.predict(&images, 5)?;
        assert_eq!(probs.size(), vec![16, 2]);

        // auto-saved artifacts
        assert!(layout.model_dir().join("tiny_model-grayscale-.json").is_file());
        let weights: Vec<_> = fs::read_dir(layout.weights_dir())?.try_collect()?;
        assert_eq!(weights.len(), 1);
        Ok(())
    }

    #[test]
    fn fit_requires_compile() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut model = ModelInit {
            auto_save: false,
            ..Default::default()
        }
        .build(Device::Cpu, ArtifactLayout::with_root(dir.path()))?;
        let (images, labels) = toy_data(4);
        assert!(model.fit(&images, &labels, &FitOptions::default()).is_err());

        model.create_model()?;
        assert!(model.fit(&images, &labels, &FitOptions::default()).is_err());
        Ok(())
    }

    #[test]
    fn scalar_inputs_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut model = tiny_model(ArtifactLayout::with_root(dir.path()))?;
        let scalar = Tensor::from(1.0f32);
        let (images, labels) = toy_data(4);

        assert!(model.fit(&scalar, &labels, &FitOptions::default()).is_err());
        assert!(model.fit(&images, &scalar, &FitOptions::default()).is_err());
        assert!(model.evaluate(&images, &scalar, None).is_err());
        assert!(model.predict(&scalar, None).is_err());
        Ok(())
    }

    #[test]
    fn missing_files_leave_model_unchanged() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut model = tiny_model(ArtifactLayout::with_root(dir.path()))?;
        let (images, _) = toy_data(2);
        let before = model.predict(&images, None)?;

        assert!(!model.load_model(dir.path().join("missing.json"))?);
        assert!(!model.load_weights(dir.path().join("missing.ckpt"))?);

        let after = model.predict(&images, None)?;
        assert!(before.allclose(&after, 1e-6, 1e-6, false));
        Ok(())
    }

    #[test]
    fn save_and_load_artifacts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let layout = ArtifactLayout::with_root(dir.path());
        let model = tiny_model(layout.clone())?;
        let (images, _) = toy_data(2);
        let expect = model.predict(&images, None)?;

        let model_file = dir.path().join("model.json");
        let weights_file = dir.path().join("weights.ckpt");
        model.save_model(&model_file)?;
        model.save_weights(&weights_file)?;

        let mut restored = ModelInit::default().build(Device::Cpu, layout)?;
        assert!(restored.load_model(&model_file)?);
        assert_eq!(restored.input_shape(), InputShape::new(24, 24, 1));
        assert!(restored.load_weights(&weights_file)?);

        let output = restored.predict(&images, None)?;
        assert!(expect.allclose(&output, 1e-6, 1e-6, false));
        Ok(())
    }

    #[test]
    fn pre_fit_callbacks_only_with_registered_callbacks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut model = tiny_model(ArtifactLayout::with_root(dir.path()))?;
        assert!(model.callbacks_pre_fit()?.is_empty());

        model.init_callbacks(["CSVLogger", "TensorBoard"]);
        assert_eq!(model.callbacks().len(), 1);

        let names: Vec<_> = model
            .callbacks_pre_fit()?
            .iter()
            .map(|callback| callback.name().to_string())
            .collect();
        assert_eq!(names, ["TensorBoard", "CSVLogger", "LearningRateScheduler"]);
        assert_eq!(model.callbacks().len(), 1);
        Ok(())
    }

    #[test]
    fn artifact_names() -> Result<()> {
        let model = ModelInit::default().build(Device::Cpu, ArtifactLayout::default())?;
        assert_eq!(model.to_string(), "Simple Model");
        assert_eq!(model.name_to_file(), "simple_model");
        assert_eq!(model.model_name_mode_now_to_string(true), "simple_model-grayscale-");
        let tensorboard_dir = model.tensorboard_dir();
        let dir_name = tensorboard_dir.file_name().unwrap().to_str().unwrap();
        assert!(dir_name.starts_with("tensorboard-simple_model-grayscale-"));
        assert!(tensorboard_dir.starts_with("./log"));
        Ok(())
    }
}
