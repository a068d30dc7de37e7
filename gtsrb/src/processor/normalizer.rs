//! The min-max rescaling preprocessor.

use super::Preprocessor;
use crate::common::*;

/// Rescales an image linearly so its minimum and maximum land on `alpha` and `beta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub title: String,
    pub alpha: f64,
    pub beta: f64,
}

impl Normalizer {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self {
            alpha,
            beta,
            ..Default::default()
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            title: "Normalizer".into(),
            alpha: 0.0,
            beta: 1.0,
        }
    }
}

impl Preprocessor for Normalizer {
    fn title(&self) -> &str {
        &self.title
    }

    fn evaluate(&self, image: &Tensor) -> Result<Tensor> {
        ensure!(
            image.dim() == 3,
            "expect a [channels, height, width] image, but get shape {:?}",
            image.size()
        );
        Ok(normalize_min_max(image, self.alpha, self.beta))
    }
}

/// Min-max normalization over all elements of a tensor.
///
/// A constant input maps to the lower bound.
pub fn normalize_min_max(tensor: &Tensor, alpha: f64, beta: f64) -> Tensor {
    tch::no_grad(|| {
        let lower = alpha.min(beta);
        let upper = alpha.max(beta);
        let tensor = tensor.to_kind(Kind::Float);

        let min = f64::from(tensor.min());
        let max = f64::from(tensor.max());
        let range = max - min;
        let scale = if range > f64::EPSILON {
            (upper - lower) / range
        } else {
            0.0
        };

        (tensor - min) * scale + lower
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rescale_to_unit_range() -> Result<()> {
        let image = Tensor::of_slice(&[10.0f32, 20.0, 30.0, 50.0]).view([1, 2, 2]);
        let output = Normalizer::default().evaluate(&image)?;

        assert_eq!(output.size(), [1, 2, 2]);
        let values = Vec::<f32>::from(&output.view([-1]));
        [0.0, 0.25, 0.5, 1.0]
            .iter()
            .zip(values)
            .for_each(|(&expect, value)| assert_abs_diff_eq!(value, expect, epsilon = 1e-6));
        Ok(())
    }

    #[test]
    fn swapped_bounds_and_constant_image() -> Result<()> {
        let normalizer = Normalizer::new(2.0, -2.0);

        let image = Tensor::of_slice(&[0.0f32, 255.0, 0.0]).view([3, 1, 1]);
        let values = Vec::<f32>::from(&normalizer.evaluate(&image)?.view([-1]));
        assert_eq!(values, [-2.0, 2.0, -2.0]);

        let flat = Tensor::ones(&[1, 4, 4], FLOAT_CPU) * 7.0;
        let output = normalizer.evaluate(&flat)?;
        assert_abs_diff_eq!(f64::from(output.min()), -2.0);
        assert_abs_diff_eq!(f64::from(output.max()), -2.0);
        Ok(())
    }

    #[test]
    fn reject_batched_input() {
        let batch = Tensor::zeros(&[2, 1, 4, 4], FLOAT_CPU);
        assert!(Normalizer::default().evaluate(&batch).is_err());
    }
}
