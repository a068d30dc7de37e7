use super::{Callback, Logs, MonitorMode, TrainingContext};
use crate::{common::*, utils};
use regex::Regex;

static FIELD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)(?::([^}]*))?\}").unwrap());
static SPEC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0?)(\d*)(?:\.(\d+))?([df]?)$").unwrap());

/// Saves the weights after epochs, optionally only on improvement.
#[derive(Debug)]
pub struct ModelCheckpoint {
    filepath: String,
    monitor: String,
    verbose: bool,
    save_best_only: bool,
    save_weights_only: bool,
    mode: MonitorMode,
    period: usize,
    best: f64,
    epochs_since_last_save: usize,
}

impl ModelCheckpoint {
    /// The file path may contain `{epoch}` and log keys with format
    /// specifications, for example `weights-{epoch:02d}-{val_loss:.2f}.ckpt`.
    pub fn new(filepath: impl Into<String>, monitor: impl Into<String>) -> Self {
        let monitor = monitor.into();
        let mode = MonitorMode::Auto.resolve(&monitor);
        Self {
            filepath: filepath.into(),
            monitor,
            verbose: false,
            save_best_only: false,
            save_weights_only: false,
            mode,
            period: 1,
            best: mode.worst(),
            epochs_since_last_save: 0,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn save_best_only(mut self, save_best_only: bool) -> Self {
        self.save_best_only = save_best_only;
        self
    }

    pub fn save_weights_only(mut self, save_weights_only: bool) -> Self {
        self.save_weights_only = save_weights_only;
        self
    }

    pub fn mode(mut self, mode: MonitorMode) -> Self {
        self.mode = mode.resolve(&self.monitor);
        self.best = self.mode.worst();
        self
    }

    pub fn period(mut self, period: usize) -> Self {
        self.period = period.max(1);
        self
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    fn save(&self, path: &Path, ctx: &TrainingContext<'_>) -> Result<()> {
        if let Some(parent) = path.parent() {
            utils::create_directory(parent)?;
        }
        ctx.vs.save(path)?;
        if !self.save_weights_only {
            ctx.topology.save(path.with_extension("json"))?;
        }
        Ok(())
    }
}

impl Callback for ModelCheckpoint {
    fn name(&self) -> &str {
        "ModelCheckpoint"
    }

    fn on_epoch_end(&mut self, epoch: usize, logs: &Logs, ctx: &mut TrainingContext<'_>) -> Result<()> {
        self.epochs_since_last_save += 1;
        if self.epochs_since_last_save < self.period {
            return Ok(());
        }
        self.epochs_since_last_save = 0;

        if self.save_best_only {
            let current = match logs.get(&self.monitor) {
                Some(&current) => current,
                None => {
                    warn!(
                        "can save best model only with {} available, skipping",
                        self.monitor
                    );
                    return Ok(());
                }
            };

            if self.mode.is_improvement(current, self.best, 0.0) {
                let path = PathBuf::from(format_filepath(&self.filepath, epoch + 1, logs)?);
                if self.verbose {
                    info!(
                        "epoch {}: {} improved from {:.5} to {:.5}, saving model to {}",
                        epoch + 1,
                        self.monitor,
                        self.best,
                        current,
                        path.display()
                    );
                }
                self.best = current;
                self.save(&path, ctx)?;
            } else if self.verbose {
                info!(
                    "epoch {}: {} did not improve from {:.5}",
                    epoch + 1,
                    self.monitor,
                    self.best
                );
            }
        } else {
            let path = PathBuf::from(format_filepath(&self.filepath, epoch + 1, logs)?);
            if self.verbose {
                info!("epoch {}: saving model to {}", epoch + 1, path.display());
            }
            self.save(&path, ctx)?;
        }

        Ok(())
    }
}

/// Find the most recently modified `.ckpt` file in the directory.
pub fn latest_checkpoint(checkpoint_dir: &Path) -> Result<Option<PathBuf>> {
    let paths: Vec<_> = glob::glob(&format!("{}/*.ckpt", checkpoint_dir.display()))?.try_collect()?;
    let paths: Vec<_> = paths
        .into_iter()
        .map(|path| -> Result<_> {
            let modified = fs::metadata(&path)?.modified()?;
            Ok((path, modified))
        })
        .try_collect()?;
    let checkpoint_file = paths
        .into_iter()
        .max_by_key(|(_path, modified)| *modified)
        .map(|(path, _modified)| path);
    Ok(checkpoint_file)
}

/// Substitute `{key}` and `{key:spec}` fields of a path template.
///
/// `epoch` is taken from the argument and the other keys from the logs. The
/// spec supports zero padding, width, precision and `d`/`f` types.
pub fn format_filepath(template: &str, epoch: usize, logs: &Logs) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut last = 0;

    for captures in FIELD_REGEX.captures_iter(template) {
        let whole = captures.get(0).unwrap();
        let key = &captures[1];
        let spec = captures.get(2).map(|spec| spec.as_str()).unwrap_or("");

        let value = if key == "epoch" {
            epoch as f64
        } else {
            *logs
                .get(key)
                .ok_or_else(|| format_err!("the key '{}' is not found in logs", key))?
        };

        output.push_str(&template[last..whole.start()]);
        output.push_str(&format_value(value, spec, key == "epoch")?);
        last = whole.end();
    }
    output.push_str(&template[last..]);

    Ok(output)
}

fn format_value(value: f64, spec: &str, is_integer: bool) -> Result<String> {
    let captures = SPEC_REGEX
        .captures(spec)
        .ok_or_else(|| format_err!("unsupported format specification '{}'", spec))?;
    let zero_pad = !captures[1].is_empty();
    let width: usize = match &captures[2] {
        "" => 0,
        width => width.parse()?,
    };
    let precision: Option<usize> = captures
        .get(3)
        .map(|precision| precision.as_str().parse())
        .transpose()?;
    let as_integer = match &captures[4] {
        "d" => true,
        "f" => false,
        _ => is_integer && precision.is_none(),
    };

    let text = match (as_integer, precision) {
        (true, _) => format!("{}", value.round() as i64),
        (false, Some(precision)) => format!("{:.*}", precision, value),
        (false, None) if captures[4].is_empty() => format!("{}", value),
        (false, None) => format!("{:.6}", value),
    };

    let text = if zero_pad {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(digits) => ("-", digits),
            None => ("", text.as_str()),
        };
        let pad = width.saturating_sub(text.len());
        format!("{}{}{}", sign, "0".repeat(pad), digits)
    } else {
        format!("{:>width$}", text, width = width)
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::super::callback::test_utils;
    use super::*;

    #[test]
    fn format_template() -> Result<()> {
        let logs = test_utils::logs(&[("val_loss", 0.123_456), ("loss", 1.5)]);
        assert_eq!(
            format_filepath("weights-{epoch:02d}-{val_loss:.2f}.ckpt", 3, &logs)?,
            "weights-03-0.12.ckpt"
        );
        assert_eq!(format_filepath("w-{epoch}-{loss}", 12, &logs)?, "w-12-1.5");
        assert_eq!(format_filepath("{loss:06.2f}", 1, &logs)?, "001.50");
        assert!(format_filepath("{acc}", 1, &logs).is_err());
        Ok(())
    }

    #[test]
    fn save_best_only() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let template = dir
            .path()
            .join("weights-{epoch:02d}-{val_loss:.2f}.ckpt")
            .to_str()
            .unwrap()
            .to_string();

        let vs = nn::VarStore::new(Device::Cpu);
        let _ = vs.root().var("weight", &[2], nn::Init::Const(1.0));
        let topology = test_utils::topology();
        let mut ctx = TrainingContext {
            vs: &vs,
            topology: &topology,
            params: test_utils::params(3),
            lr: 0.01,
            stop_training: false,
        };

        let mut checkpoint = ModelCheckpoint::new(template, "val_loss")
            .save_best_only(true)
            .save_weights_only(true);

        for (epoch, val_loss) in [0.5, 0.7, 0.25].iter().copied().enumerate() {
            let logs = test_utils::logs(&[("val_loss", val_loss)]);
            checkpoint.on_epoch_end(epoch, &logs, &mut ctx)?;
        }
        // missing monitor is skipped
        checkpoint.on_epoch_end(3, &test_utils::logs(&[("loss", 0.1)]), &mut ctx)?;

        let mut files: Vec<_> = fs::read_dir(dir.path())?
            .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
            .collect::<Result<_>>()?;
        files.sort();
        assert_eq!(files, ["weights-01-0.50.ckpt", "weights-03-0.25.ckpt"]);
        approx::assert_abs_diff_eq!(checkpoint.best(), 0.25);

        let latest = latest_checkpoint(dir.path())?;
        assert!(latest.is_some());
        assert!(latest_checkpoint(&dir.path().join("missing"))?.is_none());
        Ok(())
    }
}
