//! The training program of the traffic sign classifier.

pub mod common;
pub mod config;

use crate::{
    common::*,
    config::{Config, LoadCheckpoint},
};
use gtsrb::{
    callbacks::latest_checkpoint,
    dataset::{self, TESTING_TABLE_FILE},
    generator::{DataGenerator, DataGeneratorInit, DirectoryIterator, FlowOptions},
    model::{InputShape, Model, ModelInit, ValidationData},
    processor::Normalizer,
};

pub const FILE_STRFTIME: &str = "%Y-%m-%d-%H-%M-%S.%3f%z";

/// The entry of training program.
pub fn start(config: Arc<Config>) -> Result<()> {
    let start_time = Local::now();
    let layout = &config.layout;

    // create dirs and save config
    dataset::init_directories(layout)?;
    {
        let path = layout
            .log_dir()
            .join(format!("config-{}.json", start_time.format(FILE_STRFTIME)));
        let text = serde_json::to_string_pretty(&*config)?;
        fs::write(&path, text)?;
    }

    // prepare dataset
    let training_images = layout.training_dir().join("images");
    let testing_images = layout.testing_dir().join("images");
    let testing_table = layout.testing_dir().join(TESTING_TABLE_FILE);

    if !training_images.is_dir() {
        ensure!(
            config.dataset.download,
            "training images are not found at '{}' and downloading is disabled",
            training_images.display()
        );
        info!("downloading dataset");
        dataset::init_all(layout, &config.dataset.urls)?;
    }

    // load dataset
    info!("loading dataset");
    let mut generator = build_generator(&config, &training_images)?;
    let flow = &config.generator.flow;
    if let Some(max_samples) = config.generator.fit_samples {
        generator.fit(max_samples.get(), flow)?;
    }
    let train_iter = generator.get_generator(flow)?;
    let num_classes = train_iter.num_classes();
    info!(
        "{} training images in {} classes",
        train_iter.num_records(),
        num_classes
    );

    let mut test_iter: Option<DirectoryIterator> = if testing_images.is_dir() && testing_table.is_file() {
        let num_classes = config.dataset.num_classes.unwrap_or(num_classes);
        let test_flow = FlowOptions {
            shuffle: false,
            ..flow.clone()
        };
        Some(generator.flow_from_table(&testing_images, &testing_table, num_classes, &test_flow)?)
    } else {
        warn!(
            "test set is not found under '{}', skip validation",
            layout.testing_dir().display()
        );
        None
    };

    // build model
    let mut model = build_model(&config, &generator, num_classes)?;
    load_checkpoint(&config, &mut model)?;

    // train
    let fit = &config.training.fit;
    let validation = match (&mut test_iter, fit.validation_steps) {
        (Some(iter), Some(_)) => Some(ValidationData::Batches { iter, steps: None }),
        _ => None,
    };
    let history = model.fit_generator(train_iter, fit, validation)?;

    let stem = model.model_name_mode_now_to_string(false);
    {
        let path = layout.stats_dir().join(format!("history-{}.json", stem));
        fs::write(&path, serde_json::to_string_pretty(&history)?)?;
        info!("history is saved to {}", path.display());
    }

    // evaluate
    if let (Some(test_iter), true) = (&mut test_iter, config.training.evaluate_test_set) {
        test_iter.reset();
        let steps = test_iter.len();
        let logs = model.evaluate_generator(&mut *test_iter, steps)?;
        for (key, value) in &logs {
            info!("test {}: {:.5}", key, value);
        }
        let path = layout.stats_dir().join(format!("test-{}.json", stem));
        fs::write(&path, serde_json::to_string_pretty(&logs)?)?;
    }

    Ok(())
}

fn build_generator(config: &Config, data_dir: &Path) -> Result<DataGenerator> {
    let generator_config = &config.generator;
    let preprocessing_function = generator_config
        .normalize
        .as_ref()
        .map(|normalize| -> Arc<dyn gtsrb::processor::Preprocessor> {
            Arc::new(Normalizer::new(normalize.alpha.raw(), normalize.beta.raw()))
        });

    let mut generator = DataGeneratorInit {
        image_shape: generator_config.image_shape,
        batch_size: generator_config.batch_size.get(),
        preprocessing_function,
        use_augmentation: generator_config.use_augmentation,
        ..DataGeneratorInit::new(data_dir)
    }
    .build()?;
    generator.create(&generator_config.options)?;
    Ok(generator)
}

fn build_model(config: &Config, generator: &DataGenerator, num_classes: usize) -> Result<Model> {
    let model_config = &config.model;
    let [height, width] = generator.image_shape();
    let input_shape = InputShape::new(height, width, config.generator.flow.color_mode.channels());

    ensure!(
        model_config.init.num_output == num_classes,
        "the model has {} outputs, but the dataset has {} classes",
        model_config.init.num_output,
        num_classes
    );
    if model_config.init.input_shape != input_shape {
        info!(
            "use input shape {:?} of the generator instead of {:?}",
            input_shape, model_config.init.input_shape
        );
    }

    let mut model = ModelInit {
        input_shape,
        ..model_config.init.clone()
    }
    .build(config.training.device, config.layout.clone())?;
    model.create_model()?;
    model.compile(model_config.compile.clone())?;
    model.init_callbacks(&model_config.callbacks);
    info!(
        "created model '{}' with {} parameters",
        model,
        model.topology()?.num_params()?
    );
    Ok(model)
}

/// Load parameters with specified checkpoint loading method.
fn load_checkpoint(config: &Config, model: &mut Model) -> Result<()> {
    let path = match &config.training.load_checkpoint {
        LoadCheckpoint::Disabled => {
            info!("checkpoint loading is disabled");
            None
        }
        LoadCheckpoint::FromRecent => {
            let checkpoint_file = latest_checkpoint(&config.layout.checkpoint_dir())?;
            if checkpoint_file.is_none() {
                warn!("no checkpoint file found");
            }
            checkpoint_file
        }
        LoadCheckpoint::FromFile { file } => Some(file.to_owned()),
    };

    if let Some(path) = path {
        info!("load checkpoint file {}", path.display());
        model.load_weights(&path)?;
    }
    Ok(())
}
