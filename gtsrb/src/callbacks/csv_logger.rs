use super::{Callback, Logs, TrainingContext};
use crate::{common::*, utils};
use std::fs::{File, OpenOptions};

/// Streams epoch logs to a CSV file.
#[derive(Debug)]
pub struct CsvLogger {
    filename: PathBuf,
    separator: u8,
    append: bool,
    writer: Option<csv::Writer<File>>,
    keys: Option<Vec<String>>,
    write_header: bool,
}

impl CsvLogger {
    pub fn new(filename: impl Into<PathBuf>, separator: u8, append: bool) -> Self {
        Self {
            filename: filename.into(),
            separator,
            append,
            writer: None,
            keys: None,
            write_header: true,
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }
}

impl Callback for CsvLogger {
    fn name(&self) -> &str {
        "CSVLogger"
    }

    fn on_train_begin(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        if let Some(parent) = self.filename.parent() {
            utils::create_directory(parent)?;
        }

        self.write_header = !(self.append
            && fs::metadata(&self.filename)
                .map(|meta| meta.len() > 0)
                .unwrap_or(false));

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.filename)
            .with_context(|| format!("failed to open '{}'", self.filename.display()))?;

        self.writer = Some(
            csv::WriterBuilder::new()
                .delimiter(self.separator)
                .has_headers(false)
                .from_writer(file),
        );
        self.keys = None;
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &Logs, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        let writer = match &mut self.writer {
            Some(writer) => writer,
            None => return Ok(()),
        };

        let keys = self.keys.get_or_insert_with(|| {
            let mut keys: Vec<_> = logs.keys().cloned().collect();
            keys.sort();
            keys
        });

        if self.write_header {
            writer.write_record(iter::once("epoch").chain(keys.iter().map(|key| key.as_str())))?;
            self.write_header = false;
        }

        let values = keys.iter().map(|key| match logs.get(key) {
            Some(value) => value.to_string(),
            None => "NA".to_string(),
        });
        writer.write_record(iter::once(epoch.to_string()).chain(values))?;
        writer.flush()?;
        Ok(())
    }

    fn on_train_end(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
