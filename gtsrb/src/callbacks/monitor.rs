use crate::common::*;

/// Whether the monitored quantity should decrease or increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMode {
    /// Maximize quantities named like accuracy and minimize the rest.
    Auto,
    Min,
    Max,
}

impl Default for MonitorMode {
    fn default() -> Self {
        Self::Auto
    }
}

impl MonitorMode {
    /// Resolve the auto mode into min or max for the quantity.
    pub fn resolve(self, monitor: &str) -> Self {
        match self {
            Self::Auto => {
                if monitor.contains("acc") {
                    Self::Max
                } else {
                    Self::Min
                }
            }
            mode => mode,
        }
    }

    /// The initial best value.
    pub fn worst(self) -> f64 {
        match self {
            Self::Max => f64::NEG_INFINITY,
            _ => f64::INFINITY,
        }
    }

    /// Check whether `current` beats `best` by more than `min_delta`.
    pub fn is_improvement(self, current: f64, best: f64, min_delta: f64) -> bool {
        match self {
            Self::Max => current - min_delta > best,
            _ => current + min_delta < best,
        }
    }
}
