//! Fetches the GTSRB archives and lays them out under the data directories.

use super::{init_directories, ArtifactLayout};
use crate::{common::*, utils};

pub const TRAINING_IMAGES_URL: &str =
    "http://benchmark.ini.rub.de/Dataset/GTSRB_Final_Training_Images.zip";
pub const TESTING_IMAGES_URL: &str =
    "http://benchmark.ini.rub.de/Dataset/GTSRB_Final_Test_Images.zip";
pub const TESTING_GT_URL: &str = "http://benchmark.ini.rub.de/Dataset/GTSRB_Final_Test_GT.zip";

/// The file name of the ground truth table of testing images after layout.
pub const TESTING_TABLE_FILE: &str = "testing_table.csv";

/// The URLs of the dataset archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetUrls {
    pub training_images: String,
    pub testing_images: String,
    pub testing_ground_truth: String,
}

impl Default for DatasetUrls {
    fn default() -> Self {
        Self {
            training_images: TRAINING_IMAGES_URL.into(),
            testing_images: TESTING_IMAGES_URL.into(),
            testing_ground_truth: TESTING_GT_URL.into(),
        }
    }
}

/// Download the training archive and lay it out under `out_dir`.
pub fn init_training_data_folder(url: &str, out_dir: impl AsRef<Path>) -> Result<()> {
    let out_dir = out_dir.as_ref();
    utils::extract_dir_from_web(url, out_dir)?;
    layout_training_folder(out_dir)
}

/// Download the testing archive and lay it out under `out_dir`.
pub fn init_testing_data_folder(url: &str, out_dir: impl AsRef<Path>) -> Result<()> {
    let out_dir = out_dir.as_ref();
    utils::extract_dir_from_web(url, out_dir)?;
    layout_testing_folder(out_dir)
}

/// Download the testing ground truth archive and place the table under `out_dir`.
pub fn init_testing_id_file(url: &str, out_dir: impl AsRef<Path>) -> Result<()> {
    let out_dir = out_dir.as_ref();
    utils::extract_dir_from_web(url, out_dir)?;
    layout_testing_id_file(out_dir)
}

/// Create the directories and fetch every archive.
pub fn init_all(layout: &ArtifactLayout, urls: &DatasetUrls) -> Result<()> {
    init_directories(layout)?;

    let training_dir = layout.training_dir();
    let testing_dir = layout.testing_dir();
    init_training_data_folder(&urls.training_images, &training_dir)?;
    init_testing_data_folder(&urls.testing_images, &testing_dir)?;
    init_testing_id_file(&urls.testing_ground_truth, &testing_dir)?;

    info!("dataset is ready in {}", layout.root.display());
    Ok(())
}

/// Rearrange an extracted training archive.
pub fn layout_training_folder(out_dir: &Path) -> Result<()> {
    let extracted = out_dir.join("GTSRB");
    utils::move_file(
        extracted.join("Readme-Images.txt"),
        out_dir.join("readme-images.txt"),
    )?;
    utils::move_directory(
        extracted.join("Final_Training").join("Images"),
        out_dir.join("images"),
    )?;
    utils::remove_folder_tree(&extracted)?;
    Ok(())
}

/// Rearrange an extracted testing archive.
pub fn layout_testing_folder(out_dir: &Path) -> Result<()> {
    let extracted = out_dir.join("GTSRB");
    utils::move_file(
        extracted.join("Readme-Images-Final-test.txt"),
        out_dir.join("readme-images-final-test.txt"),
    )?;
    utils::move_directory(
        extracted.join("Final_Test").join("Images"),
        out_dir.join("images"),
    )?;
    utils::remove_folder_tree(&extracted)?;
    Ok(())
}

/// Rename an extracted ground truth table.
pub fn layout_testing_id_file(out_dir: &Path) -> Result<()> {
    utils::move_file(
        out_dir.join("GT-final_test.csv"),
        out_dir.join(TESTING_TABLE_FILE),
    )
}
