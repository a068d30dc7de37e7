use crate::common::*;

/// Per-epoch values of the training logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub epochs: Vec<usize>,
    pub history: IndexMap<String, Vec<f64>>,
}

impl History {
    pub fn push(&mut self, epoch: usize, logs: &IndexMap<String, f64>) {
        self.epochs.push(epoch);
        logs.iter().for_each(|(key, &value)| {
            self.history.entry(key.clone()).or_default().push(value);
        });
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.history.get(key).map(|values| values.as_slice())
    }

    /// The value of the last recorded epoch.
    pub fn last(&self, key: &str) -> Option<f64> {
        self.get(key)?.last().copied()
    }
}
