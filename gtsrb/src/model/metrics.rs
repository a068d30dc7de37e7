use crate::{common::*, utils};

/// Metrics reported next to the loss.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    #[strum(to_string = "accuracy", serialize = "acc")]
    Accuracy,
}

impl Metric {
    /// Evaluate the metric on output probabilities.
    pub fn compute(&self, outputs: &Tensor, targets: &Tensor) -> Result<f64> {
        match self {
            Self::Accuracy => {
                let predicted = outputs.argmax(1, false);
                let truth = match targets.dim() {
                    1 => targets.to_kind(Kind::Int64),
                    2 => targets.argmax(1, false),
                    dim => bail!("targets must have 1 or 2 dimensions, but get {}", dim),
                };
                let accuracy = predicted
                    .eq_tensor(&truth)
                    .to_kind(Kind::Float)
                    .mean(Kind::Float);
                Ok(f64::from(&accuracy))
            }
        }
    }
}

/// Batch-size weighted running means of the loss and metrics.
#[derive(Debug, Clone)]
pub struct MetricMeter {
    metrics: Vec<Metric>,
    loss_sum: f64,
    metric_sums: Vec<f64>,
    count: usize,
}

impl MetricMeter {
    pub fn new(metrics: &[Metric]) -> Self {
        Self {
            metrics: metrics.to_vec(),
            loss_sum: 0.0,
            metric_sums: vec![0.0; metrics.len()],
            count: 0,
        }
    }

    pub fn update(&mut self, loss: &Tensor, outputs: &Tensor, targets: &Tensor) -> Result<()> {
        let batch_size = utils::batch_len(outputs)? as usize;
        let loss = f64::from(loss);

        let values: Vec<_> = self
            .metrics
            .iter()
            .map(|metric| metric.compute(outputs, targets))
            .try_collect()?;

        self.loss_sum += loss * batch_size as f64;
        izip!(&mut self.metric_sums, values).for_each(|(sum, value)| {
            *sum += value * batch_size as f64;
        });
        self.count += batch_size;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// The averages keyed by `loss` and the metric names.
    pub fn logs(&self) -> IndexMap<String, f64> {
        let denom = self.count.max(1) as f64;
        iter::once(("loss".to_string(), self.loss_sum / denom))
            .chain(
                izip!(&self.metrics, &self.metric_sums)
                    .map(|(metric, sum)| (metric.to_string(), sum / denom)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_on_one_hot_and_sparse() -> Result<()> {
        let outputs = Tensor::of_slice(&[0.9f32, 0.1, 0.2, 0.8, 0.6, 0.4, 0.3, 0.7]).view([4, 2]);
        let sparse = Tensor::of_slice(&[0i64, 1, 1, 1]);
        let onehot = sparse.onehot(2);

        approx::assert_abs_diff_eq!(Metric::Accuracy.compute(&outputs, &sparse)?, 0.75);
        approx::assert_abs_diff_eq!(Metric::Accuracy.compute(&outputs, &onehot)?, 0.75);
        Ok(())
    }

    #[test]
    fn meter_weights_by_batch_size() -> Result<()> {
        let mut meter = MetricMeter::new(&[Metric::Accuracy]);

        let outputs = Tensor::of_slice(&[1.0f32, 0.0, 1.0, 0.0, 1.0, 0.0]).view([3, 2]);
        let targets = Tensor::of_slice(&[0i64, 0, 0]);
        meter.update(&Tensor::from(1.0f32), &outputs, &targets)?;

        let outputs = Tensor::of_slice(&[1.0f32, 0.0]).view([1, 2]);
        let targets = Tensor::of_slice(&[1i64]);
        meter.update(&Tensor::from(3.0f32), &outputs, &targets)?;

        let logs = meter.logs();
        assert_eq!(meter.count(), 4);
        assert_eq!(logs.keys().collect::<Vec<_>>(), ["loss", "accuracy"]);
        approx::assert_abs_diff_eq!(logs["loss"], 1.5);
        approx::assert_abs_diff_eq!(logs["accuracy"], 0.75);
        Ok(())
    }
}
