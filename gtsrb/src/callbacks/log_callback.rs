use super::{Callback, Logs, TrainingContext};
use crate::{common::*, utils};
use chrono::Local;
use log::Level;
use std::fs::{File, OpenOptions};

pub const DEFAULT_LOG_FORMAT: &str = "%(levelname)s: %(asctime)s: %(message)s";

/// Writes training progress lines into a log file.
#[derive(Debug)]
pub struct LogCallback {
    log_file: PathBuf,
    level: Level,
    format: String,
    writer: Option<BufWriter<File>>,
}

impl LogCallback {
    pub fn new(log_file: impl Into<PathBuf>, level: Level) -> Self {
        Self::with_format(log_file, level, DEFAULT_LOG_FORMAT)
    }

    /// The format may contain `%(levelname)s`, `%(asctime)s` and `%(message)s`.
    pub fn with_format(log_file: impl Into<PathBuf>, level: Level, format: impl Into<String>) -> Self {
        Self {
            log_file: log_file.into(),
            level,
            format: format.into(),
            writer: None,
        }
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    fn write(&mut self, level: Level, message: &str) -> Result<()> {
        if level > self.level {
            return Ok(());
        }
        let writer = match &mut self.writer {
            Some(writer) => writer,
            None => return Ok(()),
        };
        let time = Local::now().format("%Y-%m-%d %H:%M:%S,%3f").to_string();
        let line = self
            .format
            .replace("%(levelname)s", level.as_str())
            .replace("%(asctime)s", &time)
            .replace("%(message)s", message);
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

fn format_logs(logs: &Logs) -> String {
    logs.iter()
        .map(|(key, value)| format!("{}: {:.4}", key, value))
        .join(" - ")
}

impl Callback for LogCallback {
    fn name(&self) -> &str {
        "LogCallback"
    }

    fn on_train_begin(&mut self, ctx: &mut TrainingContext<'_>) -> Result<()> {
        if let Some(parent) = self.log_file.parent() {
            utils::create_directory(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("failed to open log file '{}'", self.log_file.display()))?;
        self.writer = Some(BufWriter::new(file));

        let message = format!(
            "start training '{}' from epoch {} to {}",
            ctx.topology.name,
            ctx.params.initial_epoch + 1,
            ctx.params.epochs
        );
        self.write(Level::Info, &message)
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &Logs, ctx: &mut TrainingContext<'_>) -> Result<()> {
        let message = format!(
            "epoch {}/{} - {}",
            epoch + 1,
            ctx.params.epochs,
            format_logs(logs)
        );
        self.write(Level::Info, &message)
    }

    fn on_train_end(&mut self, ctx: &mut TrainingContext<'_>) -> Result<()> {
        let message = if ctx.stop_training {
            "training stopped early".to_string()
        } else {
            "training finished".to_string()
        };
        self.write(Level::Info, &message)?;
        self.writer = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::callback::test_utils;
    use super::*;

    #[test]
    fn write_formatted_lines() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("log/model.log");
        let vs = nn::VarStore::new(Device::Cpu);
        let topology = test_utils::topology();
        let mut ctx = TrainingContext {
            vs: &vs,
            topology: &topology,
            params: test_utils::params(2),
            lr: 0.01,
            stop_training: false,
        };

        let mut callback = LogCallback::new(&path, Level::Info);
        callback.on_train_begin(&mut ctx)?;
        callback.on_epoch_end(0, &test_utils::logs(&[("loss", 0.5)]), &mut ctx)?;
        callback.on_train_end(&mut ctx)?;

        let text = fs::read_to_string(&path)?;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.starts_with("INFO: ")));
        assert!(lines[1].ends_with(": epoch 1/2 - loss: 0.5000"));
        Ok(())
    }

    #[test]
    fn skip_messages_below_level() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.log");
        let vs = nn::VarStore::new(Device::Cpu);
        let topology = test_utils::topology();
        let mut ctx = TrainingContext {
            vs: &vs,
            topology: &topology,
            params: test_utils::params(1),
            lr: 0.01,
            stop_training: false,
        };

        let mut callback = LogCallback::new(&path, Level::Warn);
        callback.on_train_begin(&mut ctx)?;
        callback.on_train_end(&mut ctx)?;
        assert_eq!(fs::read_to_string(&path)?, "");
        Ok(())
    }
}
