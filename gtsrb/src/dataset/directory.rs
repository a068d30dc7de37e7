use super::{ClassifiedDataset, ImageRecord};
use crate::common::*;

/// Image file extensions recognized by default when scanning directories.
pub const IMAGE_EXTENSIONS: &[&str] = &["ppm", "png", "jpg", "jpeg", "bmp"];

/// The dataset laid out as one sub-directory per class.
#[derive(Debug, Clone)]
pub struct DirectoryDataset {
    pub dir: PathBuf,
    pub classes: IndexSet<String>,
    pub records: Vec<ImageRecord>,
}

impl ClassifiedDataset for DirectoryDataset {
    fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }

    fn records(&self) -> &[ImageRecord] {
        &self.records
    }
}

impl DirectoryDataset {
    /// Scan a directory. Class names are the sorted sub-directory names and
    /// only files with one of `formats` extensions are kept.
    pub fn scan<S>(dir: impl AsRef<Path>, formats: &[S]) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let dir = dir.as_ref();
        ensure!(dir.is_dir(), "'{}' is not a directory", dir.display());
        ensure!(!formats.is_empty(), "no image formats are given");

        let class_dirs: Vec<PathBuf> = {
            let mut dirs: Vec<_> = fs::read_dir(dir)
                .with_context(|| format!("failed to read directory '{}'", dir.display()))?
                .map(|entry| -> Result<_> { Ok(entry?.path()) })
                .filter_ok(|path| path.is_dir())
                .try_collect()?;
            dirs.sort();
            dirs
        };

        let classes: IndexSet<String> = class_dirs
            .iter()
            .map(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.to_owned())
                    .ok_or_else(|| format_err!("invalid class directory '{}'", path.display()))
            })
            .try_collect()?;

        let records: Vec<ImageRecord> = class_dirs
            .iter()
            .enumerate()
            .map(|(class, class_dir)| -> Result<_> {
                let mut paths: Vec<_> = fs::read_dir(class_dir)?
                    .map(|entry| -> Result<_> { Ok(entry?.path()) })
                    .filter_ok(|path| path.is_file() && is_image_file(path, formats))
                    .try_collect()?;
                paths.sort();
                Ok(paths
                    .into_iter()
                    .map(move |path| ImageRecord { path, class }))
            })
            .flatten_ok()
            .try_collect()?;

        info!(
            "found {} images belonging to {} classes in {}",
            records.len(),
            classes.len(),
            dir.display()
        );

        Ok(Self {
            dir: dir.to_owned(),
            classes,
            records,
        })
    }
}

/// Check whether the path has one of the extensions.
pub fn is_image_file<S>(path: &Path, formats: &[S]) -> bool
where
    S: AsRef<str>,
{
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            formats
                .iter()
                .any(|format| format.as_ref().eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
