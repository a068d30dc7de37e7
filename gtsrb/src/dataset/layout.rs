use crate::{common::*, utils};

/// The directory layout of datasets and training artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    /// The base directory. Relative paths below are joined to it.
    pub root: PathBuf,
    pub model_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub weights_dir: PathBuf,
    pub log_dir: PathBuf,
    pub stats_dir: PathBuf,
    pub training_dir: PathBuf,
    pub testing_dir: PathBuf,
}

impl ArtifactLayout {
    /// The default layout under a custom base directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.resolve(&self.model_dir)
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.resolve(&self.checkpoint_dir)
    }

    pub fn weights_dir(&self) -> PathBuf {
        self.resolve(&self.weights_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.log_dir)
    }

    pub fn stats_dir(&self) -> PathBuf {
        self.resolve(&self.stats_dir)
    }

    pub fn training_dir(&self) -> PathBuf {
        self.resolve(&self.training_dir)
    }

    pub fn testing_dir(&self) -> PathBuf {
        self.resolve(&self.testing_dir)
    }

    /// All directories of the layout in creation order.
    pub fn directories(&self) -> Vec<PathBuf> {
        vec![
            self.model_dir(),
            self.checkpoint_dir(),
            self.weights_dir(),
            self.log_dir(),
            self.stats_dir(),
            self.training_dir(),
            self.testing_dir(),
        ]
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            model_dir: PathBuf::from("model"),
            checkpoint_dir: PathBuf::from("model/checkpoints"),
            weights_dir: PathBuf::from("model/weights"),
            log_dir: PathBuf::from("log"),
            stats_dir: PathBuf::from("stats"),
            training_dir: PathBuf::from("data/training"),
            testing_dir: PathBuf::from("data/testing"),
        }
    }
}

/// Create every directory of the layout.
pub fn init_directories(layout: &ArtifactLayout) -> Result<()> {
    layout
        .directories()
        .into_iter()
        .try_for_each(utils::create_directory)
}
