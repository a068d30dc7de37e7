use super::{Callback, CsvLogger, EarlyStopping, LogCallback, ModelCheckpoint, MonitorMode};
use crate::{common::*, dataset::ArtifactLayout};
use log::Level;

/// Callback names registered when none are given.
pub const DEFAULT_CALLBACKS: &[&str] = &["LogCallback", "CSVLogger", "ModelCheckpoint", "TensorBoard"];

pub const CHECKPOINT_TEMPLATE: &str = "weights-{epoch:02d}-{val_loss:.2f}.ckpt";

/// Callbacks constructible by name with fixed settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display, strum::EnumIter)]
pub enum CallbackKind {
    LogCallback,
    #[strum(serialize = "CSVLogger")]
    CsvLogger,
    ModelCheckpoint,
    EarlyStopping,
}

impl CallbackKind {
    pub fn build(&self, layout: &ArtifactLayout) -> Box<dyn Callback> {
        match self {
            Self::LogCallback => Box::new(LogCallback::new(
                layout.log_dir().join("model.log"),
                Level::Info,
            )),
            Self::CsvLogger => Box::new(CsvLogger::new(
                layout.log_dir().join("last_history.csv"),
                b',',
                false,
            )),
            Self::ModelCheckpoint => {
                let template = layout.checkpoint_dir().join(CHECKPOINT_TEMPLATE);
                Box::new(
                    ModelCheckpoint::new(template.to_string_lossy(), "val_loss")
                        .save_best_only(true)
                        .save_weights_only(true)
                        .mode(MonitorMode::Auto)
                        .period(1),
                )
            }
            Self::EarlyStopping => Box::new(
                EarlyStopping::new("val_loss")
                    .min_delta(0.0)
                    .patience(2)
                    .mode(MonitorMode::Auto)
                    .baseline(None)
                    .restore_best_weights(true),
            ),
        }
    }
}

/// Build the callbacks of known names. Unknown names are skipped with a warning.
pub fn callbacks_from_names<S>(
    names: impl IntoIterator<Item = S>,
    layout: &ArtifactLayout,
) -> Vec<Box<dyn Callback>>
where
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            match CallbackKind::from_str(name) {
                Ok(kind) => Some(kind.build(layout)),
                Err(_) => {
                    warn!("callback '{}' is not available, skipping", name);
                    None
                }
            }
        })
        .collect()
}
