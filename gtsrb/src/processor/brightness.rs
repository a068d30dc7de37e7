use crate::common::*;

/// Multiplies pixel intensities by a random factor.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomBrightness {
    lower: f64,
    upper: f64,
}

impl RandomBrightness {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        ensure!(lower >= 0.0, "brightness lower bound must be non-negative");
        ensure!(
            lower <= upper,
            "brightness lower bound must not exceed upper bound"
        );
        Ok(Self { lower, upper })
    }

    /// Apply to an image with pixel values in `[0, 255]`.
    pub fn forward<R>(&self, image: &Tensor, rng: &mut R) -> Tensor
    where
        R: Rng + ?Sized,
    {
        let factor = rng.gen_range(self.lower..=self.upper);
        tch::no_grad(|| (image * factor).clamp(0.0, 255.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_stays_in_range() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let brightness = RandomBrightness::new(0.5, 1.5)?;
        let image = Tensor::of_slice(&[0.0f32, 100.0, 200.0, 255.0]).view([1, 2, 2]);

        for _ in 0..20 {
            let output = brightness.forward(&image, &mut rng);
            assert!(f64::from(output.max()) <= 255.0);
            assert!(f64::from(output.min()) >= 0.0);
            let mid = f64::from(output.view([-1]).get(1));
            assert!((50.0..=150.0).contains(&mid));
        }

        assert!(RandomBrightness::new(1.5, 0.5).is_err());
        Ok(())
    }
}
