use super::{Callback, Logs, TrainingContext};
use crate::{common::*, utils};
use std::fs::File;
use tfrecord::{EventWriter, EventWriterConfig};

/// When batch-level scalars are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFreq {
    Epoch,
    Batch,
}

/// Writes epoch logs as TensorBoard scalar events.
pub struct TensorBoard {
    log_dir: PathBuf,
    update_freq: UpdateFreq,
    writer: Option<EventWriter<BufWriter<File>>>,
    global_step: i64,
}

impl Debug for TensorBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorBoard")
            .field("log_dir", &self.log_dir)
            .field("update_freq", &self.update_freq)
            .field("global_step", &self.global_step)
            .finish()
    }
}

impl TensorBoard {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            update_freq: UpdateFreq::Epoch,
            writer: None,
            global_step: 0,
        }
    }

    pub fn update_freq(mut self, update_freq: UpdateFreq) -> Self {
        self.update_freq = update_freq;
        self
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn write_logs(&mut self, prefix: &str, step: i64, logs: &Logs) -> Result<()> {
        let writer = match &mut self.writer {
            Some(writer) => writer,
            None => return Ok(()),
        };
        for (key, &value) in logs {
            writer.write_scalar(format!("{}/{}", prefix, key), step, value as f32)?;
        }
        Ok(())
    }
}

impl Callback for TensorBoard {
    fn name(&self) -> &str {
        "TensorBoard"
    }

    fn on_train_begin(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        utils::create_directory(&self.log_dir)?;
        let prefix = self
            .log_dir
            .join("events")
            .into_os_string()
            .into_string()
            .map_err(|path| format_err!("non-UTF-8 path {:?}", path))?;
        self.writer = Some(EventWriter::from_prefix(
            prefix,
            "",
            EventWriterConfig::default(),
        )?);
        Ok(())
    }

    fn on_batch_end(&mut self, _batch: usize, logs: &Logs, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.global_step += 1;
        if self.update_freq == UpdateFreq::Batch {
            self.write_logs("batch", self.global_step, logs)?;
        }
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &Logs, ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.write_logs("epoch", epoch as i64, logs)?;
        if let Some(writer) = &mut self.writer {
            writer.write_scalar("epoch/learning_rate", epoch as i64, ctx.lr as f32)?;
        }
        Ok(())
    }

    fn on_train_end(&mut self, _ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.writer = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::callback::test_utils;
    use super::*;

    #[test]
    fn create_event_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log_dir = dir.path().join("tensorboard-test");
        let vs = nn::VarStore::new(Device::Cpu);
        let topology = test_utils::topology();
        let mut ctx = TrainingContext {
            vs: &vs,
            topology: &topology,
            params: test_utils::params(1),
            lr: 0.01,
            stop_training: false,
        };

        let mut callback = TensorBoard::new(&log_dir).update_freq(UpdateFreq::Batch);
        callback.on_train_begin(&mut ctx)?;
        callback.on_batch_end(0, &test_utils::logs(&[("loss", 1.0)]), &mut ctx)?;
        callback.on_epoch_end(0, &test_utils::logs(&[("loss", 0.5)]), &mut ctx)?;
        callback.on_train_end(&mut ctx)?;

        let files: Vec<_> = fs::read_dir(&log_dir)?.try_collect()?;
        assert_eq!(files.len(), 1);
        assert!(files[0].metadata()?.len() > 0);
        Ok(())
    }
}
