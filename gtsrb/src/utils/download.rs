use super::create_directory;
use crate::common::*;
use reqwest::blocking::Client;
use std::io::{Cursor, Read as _};
use zip::ZipArchive;

/// Download a zip archive into memory and extract it into a directory.
pub fn extract_dir_from_web(url: &str, out_dir: impl AsRef<Path>) -> Result<()> {
    let out_dir = out_dir.as_ref();

    info!("loading file from url {}", url);
    let client = Client::builder()
        .timeout(None)
        .build()
        .context("failed to build http client")?;
    let mut res = client
        .get(url)
        .send()
        .with_context(|| format!("GET {}", url))?;
    let status = res.status();
    ensure!(status.is_success(), "HTTP {} for {}", status, url);

    let mut bytes = vec![];
    res.read_to_end(&mut bytes)
        .with_context(|| format!("failed to read body of {}", url))?;

    info!("extracting file in {}", out_dir.display());
    extract_zip_bytes(bytes, out_dir)
}

/// Extract an in-memory zip archive into a directory.
pub fn extract_zip_bytes(bytes: impl AsRef<[u8]>, out_dir: impl AsRef<Path>) -> Result<()> {
    let out_dir = out_dir.as_ref();
    create_directory(out_dir)?;

    let mut archive =
        ZipArchive::new(Cursor::new(bytes.as_ref())).context("not a valid zip archive")?;
    archive
        .extract(out_dir)
        .with_context(|| format!("failed to extract archive to '{}'", out_dir.display()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn make_zip(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    use zip::{write::FileOptions, ZipWriter};

    let mut writer = ZipWriter::new(Cursor::new(vec![]));
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default())?;
        } else {
            writer.start_file(*name, FileOptions::default())?;
            writer.write_all(content)?;
        }
    }
    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_in_memory_archive() -> Result<()> {
        let bytes = make_zip(&[
            ("GTSRB/", b""),
            ("GTSRB/Readme-Images.txt", b"readme"),
            ("GTSRB/Final_Training/Images/00000/00000_00000.ppm", b"P6"),
        ])?;

        let dir = tempfile::tempdir()?;
        extract_zip_bytes(&bytes, dir.path().join("out"))?;

        let out = dir.path().join("out");
        assert_eq!(
            fs::read_to_string(out.join("GTSRB/Readme-Images.txt"))?,
            "readme"
        );
        assert!(out
            .join("GTSRB/Final_Training/Images/00000/00000_00000.ppm")
            .is_file());
        Ok(())
    }

    #[test]
    fn reject_garbage() {
        let dir = tempfile::tempdir().unwrap();
        assert!(extract_zip_bytes(b"not a zip", dir.path()).is_err());
    }
}
