use anyhow::Result;
use gtsrb::{
    callbacks::{Callback, EarlyStopping},
    dataset::{init_directories, ArtifactLayout},
    generator::{Batch, DataGeneratorInit, FlowOptions},
    model::{
        CompileOptions, FitGeneratorOptions, FitOptions, InputShape, Model, ModelInit,
        ValidationData,
    },
    processor::Normalizer,
};
use std::{
    fs, iter,
    path::{Path, PathBuf},
    sync::Arc,
};
use tch::{vision, Device, Kind, Tensor};

fn write_class_folders(dir: &Path) -> Result<()> {
    for (class, value) in [(0usize, 30.0), (1, 220.0)] {
        let class_dir = dir.join(format!("{:05}", class));
        fs::create_dir_all(&class_dir)?;
        for index in 0..6 {
            let noise = Tensor::rand(&[3, 20, 20], tch::kind::FLOAT_CPU) * 20.0;
            let image = (noise + value).clamp(0.0, 255.0).to_kind(Kind::Uint8);
            vision::image::save(&image, class_dir.join(format!("{:05}_{:05}.png", class, index)))?;
        }
    }
    Ok(())
}

#[test]
fn train_with_generator_and_callbacks() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let layout = ArtifactLayout::with_root(dir.path());
    init_directories(&layout)?;
    let data_dir = layout.training_dir().join("images");
    write_class_folders(&data_dir)?;

    let mut generator = DataGeneratorInit {
        image_shape: [24, 24],
        batch_size: 4,
        preprocessing_function: Some(Arc::new(Normalizer::default())),
        ..DataGeneratorInit::new(&data_dir)
    }
    .build()?;
    let train_iter = generator.get_generator(&FlowOptions::default())?;
    let mut valid_iter = generator.get_generator(&FlowOptions {
        shuffle: false,
        ..Default::default()
    })?;

    let mut model = ModelInit {
        num_output: 2,
        input_shape: InputShape::new(24, 24, 1),
        ..Default::default()
    }
    .build(Device::Cpu, layout.clone())?;
    model.create_model()?;
    model.compile(CompileOptions::default())?;
    model.init_default_callbacks();
    assert_eq!(model.callbacks().len(), 3);

    let history = model.fit_generator(
        train_iter,
        &FitGeneratorOptions {
            steps_per_epoch: 3,
            epochs: 2,
            validation_steps: Some(3),
            workers: 1,
            max_queue_size: 2,
            initial_epoch: 0,
        },
        Some(ValidationData::Batches {
            iter: &mut valid_iter,
            steps: None,
        }),
    )?;
    assert_eq!(history.epochs, [0, 1]);
    for key in ["loss", "accuracy", "val_loss", "val_accuracy", "lr"] {
        assert_eq!(history.get(key).map(|values| values.len()), Some(2), "{}", key);
    }
    // registered callbacks are not extended by the per-fit ones
    assert_eq!(model.callbacks().len(), 3);

    // artifacts
    let log_dir = layout.log_dir();
    let log_text = fs::read_to_string(log_dir.join("model.log"))?;
    assert!(log_text.lines().all(|line| line.starts_with("INFO: ")));
    let csv_text = fs::read_to_string(log_dir.join("last_history.csv"))?;
    assert_eq!(csv_text.lines().count(), 3);
    assert!(csv_text.starts_with("epoch,"));

    let file_names: Vec<String> = fs::read_dir(&log_dir)?
        .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_>>()?;
    assert!(file_names
        .iter()
        .any(|name| name.starts_with("history_simple_model-grayscale-")));
    assert!(file_names
        .iter()
        .any(|name| name.starts_with("tensorboard-simple_model-grayscale-")));

    assert!(fs::read_dir(layout.checkpoint_dir())?.next().is_some());
    assert!(layout.model_dir().join("simple_model-grayscale-.json").is_file());
    let weights: Vec<_> = fs::read_dir(layout.weights_dir())?.collect::<Result<_, _>>()?;
    assert_eq!(weights.len(), 1);

    // evaluation and prediction
    let logs = model.evaluate_generator(&mut valid_iter, 3)?;
    assert!(logs["loss"].is_finite());
    let probs = model.predict_generator(&mut valid_iter, 2)?;
    assert_eq!(probs.size(), [8, 2]);

    // reload into a fresh model
    let mut restored = ModelInit::default().build(Device::Cpu, layout.clone())?;
    assert!(restored.load_model(layout.model_dir().join("simple_model-grayscale-.json"))?);
    assert!(restored.load_weights(weights[0].path())?);
    restored.compile(CompileOptions::default())?;
    let restored_logs = restored.evaluate_generator(&mut valid_iter, 3)?;
    approx::assert_abs_diff_eq!(restored_logs["loss"], logs["loss"], epsilon = 1e-4);
    Ok(())
}

/// Eight solid images, dark for class 0 and bright for class 1.
fn toy_tensors() -> (Tensor, Tensor) {
    let classes = Tensor::of_slice(&[0i64, 1, 0, 1, 0, 1, 0, 1]);
    let images = (classes.to_kind(Kind::Float) * 0.8 + 0.1)
        .view([8, 1, 1, 1])
        .expand(&[8, 1, 24, 24], false)
        .contiguous();
    let labels = classes.onehot(2).to_kind(Kind::Float);
    (images, labels)
}

fn toy_model(layout: ArtifactLayout) -> Result<Model> {
    let mut model = ModelInit {
        name: "Toy Model".into(),
        auto_save: false,
        num_output: 2,
        input_shape: InputShape::new(24, 24, 1),
        ..Default::default()
    }
    .build(Device::Cpu, layout)?;
    model.create_model()?;
    model.compile(CompileOptions::default())?;
    Ok(model)
}

fn dir_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .map(|entry| Ok(entry?.path()))
        .collect::<Result<_>>()?;
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn early_stopping_ends_training() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let layout = ArtifactLayout::with_root(dir.path());
    let (images, labels) = toy_tensors();
    let mut model = toy_model(layout.clone())?;

    // the loss can never get below zero
    let callbacks: Vec<Box<dyn Callback>> = vec![Box::new(
        EarlyStopping::new("loss").patience(0).baseline(Some(0.0)),
    )];
    model.set_callbacks(callbacks);

    let history = model.fit(
        &images,
        &labels,
        &FitOptions {
            epochs: 5,
            batch_size: 4,
            ..Default::default()
        },
    )?;
    assert_eq!(history.epochs, [0]);

    // the per-fit TensorBoard writer left an event file
    let tensorboard_dirs: Vec<_> = dir_entries(&layout.log_dir())?
        .into_iter()
        .filter(|path| file_name(path).starts_with("tensorboard-toy_model-grayscale-"))
        .collect();
    assert_eq!(tensorboard_dirs.len(), 1);
    let events = dir_entries(&tensorboard_dirs[0])?;
    assert_eq!(events.len(), 1);
    assert!(file_name(&events[0]).starts_with("events.out.tfevents."));
    assert!(fs::metadata(&events[0])?.len() > 0);
    Ok(())
}

#[test]
fn resume_from_initial_epoch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let layout = ArtifactLayout::with_root(dir.path());
    let mut model = toy_model(layout.clone())?;
    model.init_callbacks(["CSVLogger"]);

    let batches = {
        let (images, labels) = toy_tensors();
        iter::repeat_with(move || -> Result<Batch> {
            Ok(Batch {
                images: images.shallow_clone(),
                labels: Some(labels.shallow_clone()),
            })
        })
    };
    let history = model.fit_generator(
        batches,
        &FitGeneratorOptions {
            steps_per_epoch: 2,
            epochs: 12,
            initial_epoch: 10,
            workers: 0,
            ..Default::default()
        },
        None,
    )?;
    assert_eq!(history.epochs, [10, 11]);

    // step decay drops 0.01 by a factor of ten at epoch 10
    for &lr in history.get("lr").unwrap() {
        approx::assert_abs_diff_eq!(lr, 0.001, epsilon = 1e-6);
    }

    let csv_text = fs::read_to_string(layout.log_dir().join("last_history.csv"))?;
    let epochs: Vec<_> = csv_text
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().to_owned())
        .collect();
    assert_eq!(epochs, ["10", "11"]);
    Ok(())
}

#[test]
fn fit_on_tensors_without_auto_save() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let layout = ArtifactLayout::with_root(dir.path());
    let (images, labels) = toy_tensors();
    let mut model = toy_model(layout.clone())?;

    let history = model.fit(&images, &labels, &Default::default())?;
    assert_eq!(history.len(), 10);
    assert!(history.get("val_loss").is_some());
    assert!(!layout.model_dir().exists());
    Ok(())
}
