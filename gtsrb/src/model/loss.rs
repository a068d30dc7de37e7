use crate::{common::*, utils};

const PROB_EPSILON: f64 = 1e-7;

/// Training objectives selectable by name.
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
pub enum Loss {
    CategoricalCrossentropy,
    SparseCategoricalCrossentropy,
    MeanSquaredError,
}

impl Default for Loss {
    fn default() -> Self {
        Self::CategoricalCrossentropy
    }
}

impl Loss {
    /// Compute the scalar loss from the network logits.
    ///
    /// Targets are either one-hot `[N, classes]` or class indices `[N]`.
    pub fn compute(&self, logits: &Tensor, activation: Activation, targets: &Tensor) -> Result<Tensor> {
        let (batch_size, num_classes) = logits.size2()?;
        let num_targets = utils::batch_len(targets)?;
        ensure!(
            num_targets == batch_size,
            "expect {} targets, but get {}",
            batch_size,
            num_targets
        );
        let device = logits.device();

        let loss = match self {
            Self::CategoricalCrossentropy | Self::SparseCategoricalCrossentropy => {
                if *self == Self::SparseCategoricalCrossentropy {
                    ensure!(
                        targets.dim() == 1,
                        "sparse categorical crossentropy expects class indices"
                    );
                }
                let targets = one_hot_targets(targets, num_classes)?.to_device(device);
                let log_probs = match activation {
                    Activation::Softmax => logits.log_softmax(1, Kind::Float),
                    _ => logits
                        .activation(activation)
                        .clamp(PROB_EPSILON, 1.0 - PROB_EPSILON)
                        .log(),
                };
                (targets * log_probs)
                    .sum_dim_intlist(&[1], false, Kind::Float)
                    .mean(Kind::Float)
                    .neg()
            }
            Self::MeanSquaredError => {
                let targets = one_hot_targets(targets, num_classes)?.to_device(device);
                logits
                    .activation(activation)
                    .mse_loss(&targets, Reduction::Mean)
            }
        };
        Ok(loss)
    }
}

/// Convert class indices to one-hot float vectors on the device of `targets`.
/// One-hot input is passed through.
pub fn one_hot_targets(targets: &Tensor, num_classes: i64) -> Result<Tensor> {
    let targets = match targets.dim() {
        // onehot() always allocates on CPU
        1 => targets
            .to_kind(Kind::Int64)
            .onehot(num_classes)
            .to_device(targets.device()),
        2 => {
            let (_, classes) = targets.size2()?;
            ensure!(
                classes == num_classes,
                "expect {} classes in one-hot targets, but get {}",
                num_classes,
                classes
            );
            targets.shallow_clone()
        }
        dim => bail!("targets must have 1 or 2 dimensions, but get {}", dim),
    };
    Ok(targets.to_kind(Kind::Float))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossentropy_matches_definition() -> Result<()> {
        let logits = Tensor::of_slice(&[2.0f32, 1.0, 0.1, 0.5, 2.5, 0.3]).view([2, 3]);
        let onehot = Tensor::of_slice(&[1.0f32, 0.0, 0.0, 0.0, 0.0, 1.0]).view([2, 3]);
        let sparse = Tensor::of_slice(&[0i64, 2]);

        let probs = logits.softmax(1, Kind::Float);
        let p0 = probs.double_value(&[0, 0]);
        let p1 = probs.double_value(&[1, 2]);
        let expect = -(p0.ln() + p1.ln()) / 2.0;

        let categorical = Loss::CategoricalCrossentropy
            .compute(&logits, Activation::Softmax, &onehot)?
            .double_value(&[]);
        let from_sparse = Loss::SparseCategoricalCrossentropy
            .compute(&logits, Activation::Softmax, &sparse)?
            .double_value(&[]);
        let clamped = Loss::CategoricalCrossentropy
            .compute(&logits, Activation::Sigmoid, &onehot)?
            .double_value(&[]);

        approx::assert_abs_diff_eq!(categorical, expect, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(from_sparse, expect, epsilon = 1e-5);
        assert!(clamped.is_finite() && clamped > 0.0);
        Ok(())
    }

    #[test]
    fn one_hot_targets_follow_device() -> Result<()> {
        let device = Device::cuda_if_available();
        let indices = Tensor::of_slice(&[1i64, 0, 2]).to_device(device);
        let onehot = one_hot_targets(&indices, 3)?;
        assert_eq!(onehot.device(), device);
        assert_eq!(onehot.size(), [3, 3]);

        let logits = Tensor::zeros(&[3, 3], (Kind::Float, device));
        let loss = Loss::MeanSquaredError.compute(&logits, Activation::Linear, &indices.to_device(Device::Cpu))?;
        assert_eq!(loss.device(), device);
        approx::assert_abs_diff_eq!(loss.double_value(&[]), 1.0 / 3.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn scalar_targets_are_rejected() {
        let logits = Tensor::zeros(&[1, 3], FLOAT_CPU);
        let scalar = Tensor::from(0i64);
        assert!(Loss::SparseCategoricalCrossentropy
            .compute(&logits, Activation::Softmax, &scalar)
            .is_err());
    }

    #[test]
    fn sparse_loss_rejects_one_hot() {
        let logits = Tensor::zeros(&[2, 3], FLOAT_CPU);
        let onehot = Tensor::zeros(&[2, 3], FLOAT_CPU);
        assert!(Loss::SparseCategoricalCrossentropy
            .compute(&logits, Activation::Softmax, &onehot)
            .is_err());
    }

    #[test]
    fn loss_names() -> Result<()> {
        assert_eq!(
            "categorical_crossentropy".parse::<Loss>()?,
            Loss::CategoricalCrossentropy
        );
        assert_eq!(Loss::MeanSquaredError.to_string(), "mean_squared_error");
        Ok(())
    }
}
