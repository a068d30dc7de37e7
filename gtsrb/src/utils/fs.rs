use crate::common::*;

/// Create a directory along with its parents. An existing directory is not an error.
pub fn create_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory '{}'", path.display()))?;
    Ok(())
}

/// Move a file to a new location, creating the parent directory of the target.
pub fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    ensure!(src.is_file(), "'{}' is not a file", src.display());
    rename(src, dst)
}

/// Move a directory to a new location, creating the parent directory of the target.
///
/// If the target directory already exists, the contents are merged into it and
/// files with the same name are replaced.
pub fn move_directory(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    ensure!(src.is_dir(), "'{}' is not a directory", src.display());
    if !dst.exists() {
        return rename(src, dst);
    }
    ensure!(dst.is_dir(), "'{}' exists and is not a directory", dst.display());

    let entries: Vec<_> = fs::read_dir(src)
        .with_context(|| format!("failed to read directory '{}'", src.display()))?
        .try_collect()?;
    for entry in entries {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            move_directory(&from, &to)?;
        } else {
            if to.is_dir() {
                remove_folder_tree(&to)?;
            }
            rename(&from, &to)?;
        }
    }
    fs::remove_dir(src).with_context(|| format!("failed to remove '{}'", src.display()))?;
    Ok(())
}

/// Remove a directory tree. A missing directory is not an error.
pub fn remove_folder_tree(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to remove '{}'", path.display()))
        }
    }
}

/// Get the last component of a slash-separated path.
pub fn get_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn rename(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        create_directory(parent)?;
    }
    fs::rename(src, dst).with_context(|| {
        format!(
            "failed to move '{}' to '{}'",
            src.display(),
            dst.display()
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_of_url() {
        assert_eq!(
            get_file_name("http://benchmark.ini.rub.de/Dataset/GTSRB_Final_Test_GT.zip"),
            "GTSRB_Final_Test_GT.zip"
        );
        assert_eq!(get_file_name("plain"), "plain");
        assert_eq!(get_file_name("dir/"), "");
    }

    #[test]
    fn move_and_remove() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();

        create_directory(root.join("a/b"))?;
        create_directory(root.join("a/b"))?;
        fs::write(root.join("a/b/file.txt"), "content")?;

        move_file(root.join("a/b/file.txt"), root.join("c/moved.txt"))?;
        assert_eq!(fs::read_to_string(root.join("c/moved.txt"))?, "content");

        move_directory(root.join("a/b"), root.join("d/b"))?;
        assert!(root.join("d/b").is_dir());
        assert!(!root.join("a/b").exists());

        remove_folder_tree(root.join("d"))?;
        assert!(!root.join("d").exists());
        remove_folder_tree(root.join("d"))?;

        assert!(move_file(root.join("missing"), root.join("x")).is_err());
        Ok(())
    }

    #[test]
    fn move_directory_merges_into_existing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();

        create_directory(root.join("dst/00000"))?;
        fs::write(root.join("dst/00000/kept.ppm"), "kept")?;
        fs::write(root.join("dst/00000/same.ppm"), "old")?;

        create_directory(root.join("src/00000"))?;
        create_directory(root.join("src/00001"))?;
        fs::write(root.join("src/00000/same.ppm"), "new")?;
        fs::write(root.join("src/00001/added.ppm"), "added")?;

        move_directory(root.join("src"), root.join("dst"))?;
        assert!(!root.join("src").exists());
        assert_eq!(fs::read_to_string(root.join("dst/00000/kept.ppm"))?, "kept");
        assert_eq!(fs::read_to_string(root.join("dst/00000/same.ppm"))?, "new");
        assert_eq!(fs::read_to_string(root.join("dst/00001/added.ppm"))?, "added");

        fs::write(root.join("file"), "")?;
        create_directory(root.join("other"))?;
        assert!(move_directory(root.join("other"), root.join("file")).is_err());
        Ok(())
    }
}
