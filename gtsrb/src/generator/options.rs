use crate::{common::*, dataset::IMAGE_EXTENSIONS, processor::StandardizeOptions};

/// How images are converted after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Grayscale,
    Rgb,
}

impl ColorMode {
    pub fn channels(&self) -> usize {
        match self {
            Self::Grayscale => 1,
            Self::Rgb => 3,
        }
    }
}

impl Default for ColorMode {
    fn default() -> Self {
        Self::Grayscale
    }
}

/// The label representation of produced batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassMode {
    /// One-hot float labels.
    Categorical,
    /// Int64 class indices.
    Sparse,
    /// No labels.
    None,
}

impl Default for ClassMode {
    fn default() -> Self {
        Self::Categorical
    }
}

/// Options of the image transformer created by the data generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    #[serde(flatten)]
    pub standardize: StandardizeOptions,
    /// Maximum horizontal shift as a fraction of the width.
    pub width_shift_range: R64,
    /// Maximum vertical shift as a fraction of the height.
    pub height_shift_range: R64,
    pub zoom_range: R64,
    /// Maximum shear angle in degrees.
    pub shear_range: R64,
    /// Maximum rotation angle in degrees.
    pub rotation_range: R64,
    pub brightness_range: Option<(R64, R64)>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            standardize: StandardizeOptions::default(),
            width_shift_range: r64(0.1),
            height_shift_range: r64(0.1),
            zoom_range: r64(0.2),
            shear_range: r64(0.1),
            rotation_range: r64(10.0),
            brightness_range: Some((r64(0.5), r64(1.5))),
        }
    }
}

/// Options of iterating over a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowOptions {
    pub color_mode: ColorMode,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub class_mode: ClassMode,
    /// Accepted image file extensions, compared case-insensitively.
    pub formats: Vec<String>,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Grayscale,
            shuffle: true,
            seed: Some(42),
            class_mode: ClassMode::Categorical,
            formats: IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}
