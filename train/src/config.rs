//! Training program configuration format.

use crate::common::*;
use gtsrb::{
    callbacks::DEFAULT_CALLBACKS,
    dataset::{ArtifactLayout, DatasetUrls},
    generator::{FlowOptions, GeneratorOptions},
    model::{CompileOptions, FitGeneratorOptions, ModelInit},
};

pub use dataset::*;
pub use generator::*;
pub use model::*;
pub use training::*;

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub layout: ArtifactLayout,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub model: ModelConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

mod dataset {
    use super::*;

    /// Dataset options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct DatasetConfig {
        /// Download and lay out the dataset if the training images are missing.
        pub download: bool,
        pub urls: DatasetUrls,
        /// The number of classes of the ground truth table.
        pub num_classes: Option<usize>,
    }

    impl Default for DatasetConfig {
        fn default() -> Self {
            Self {
                download: true,
                urls: DatasetUrls::default(),
                num_classes: None,
            }
        }
    }
}

mod generator {
    use super::*;

    /// Batch generation options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct GeneratorConfig {
        /// Target `[height, width]` of images.
        pub image_shape: [usize; 2],
        pub batch_size: NonZeroUsize,
        pub use_augmentation: bool,
        /// If set, images are min-max rescaled into `[alpha, beta]`.
        pub normalize: Option<NormalizeConfig>,
        /// The number of images to fit featurewise statistics on.
        pub fit_samples: Option<NonZeroUsize>,
        pub options: GeneratorOptions,
        pub flow: FlowOptions,
    }

    impl Default for GeneratorConfig {
        fn default() -> Self {
            Self {
                image_shape: [46, 46],
                batch_size: NonZeroUsize::new(32).unwrap(),
                use_augmentation: false,
                normalize: Some(NormalizeConfig::default()),
                fit_samples: None,
                options: GeneratorOptions::default(),
                flow: FlowOptions::default(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct NormalizeConfig {
        pub alpha: R64,
        pub beta: R64,
    }

    impl Default for NormalizeConfig {
        fn default() -> Self {
            Self {
                alpha: r64(0.0),
                beta: r64(1.0),
            }
        }
    }
}

mod model {
    use super::*;

    /// The model configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ModelConfig {
        #[serde(flatten)]
        pub init: ModelInit,
        pub compile: CompileOptions,
        /// Names of callbacks to register.
        pub callbacks: Vec<String>,
    }

    impl Default for ModelConfig {
        fn default() -> Self {
            Self {
                init: ModelInit::default(),
                compile: CompileOptions::default(),
                callbacks: DEFAULT_CALLBACKS.iter().map(|name| name.to_string()).collect(),
            }
        }
    }
}

mod training {
    use super::*;

    /// The training options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrainingConfig {
        #[serde(with = "tch_serde::serde_device")]
        pub device: Device,
        #[serde(default)]
        pub fit: FitGeneratorOptions,
        /// Checkpoint file loading method.
        #[serde(default)]
        pub load_checkpoint: LoadCheckpoint,
        /// If set, the test set is evaluated after training.
        #[serde(default = "default_true")]
        pub evaluate_test_set: bool,
    }

    /// Checkpoint file loading method.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type")]
    pub enum LoadCheckpoint {
        /// Disable checkpoint file loading.
        Disabled,
        /// Load the most recent checkpoint file.
        FromRecent,
        /// Load the checkpoint file at specified path.
        FromFile { file: PathBuf },
    }

    impl Default for LoadCheckpoint {
        fn default() -> Self {
            Self::Disabled
        }
    }

    fn default_true() -> bool {
        true
    }
}
