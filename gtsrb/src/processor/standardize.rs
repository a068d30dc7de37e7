use crate::common::*;

const STD_EPSILON: f64 = 1e-6;

/// Centering and scaling of pixel statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizeOptions {
    pub featurewise_center: bool,
    pub samplewise_center: bool,
    pub featurewise_std_normalization: bool,
    pub samplewise_std_normalization: bool,
}

/// Applies [StandardizeOptions] to images. Featurewise statistics are
/// per-channel and come from [Standardizer::fit].
#[derive(Debug, Clone)]
pub struct Standardizer {
    options: StandardizeOptions,
    mean: Option<Vec<f32>>,
    std: Option<Vec<f32>>,
    warned: Arc<std::sync::Once>,
}

impl Standardizer {
    pub fn new(options: StandardizeOptions) -> Self {
        Self {
            options,
            mean: None,
            std: None,
            warned: Arc::new(std::sync::Once::new()),
        }
    }

    pub fn options(&self) -> &StandardizeOptions {
        &self.options
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    pub fn needs_fit(&self) -> bool {
        let StandardizeOptions {
            featurewise_center,
            featurewise_std_normalization,
            ..
        } = self.options;
        featurewise_center || featurewise_std_normalization
    }

    /// Compute per-channel statistics from a `[batch, channels, height, width]` sample.
    pub fn fit(&mut self, samples: &Tensor) -> Result<()> {
        let (batch_size, _channels, _height, _width) = samples.size4()?;
        ensure!(batch_size > 0, "cannot fit on an empty sample");

        let (mean, std) = tch::no_grad(|| {
            let samples = samples.to_kind(Kind::Float);
            let mean = samples.mean_dim(&[0, 2, 3], false, Kind::Float);
            let std = samples.std_dim(&[0, 2, 3], false, false);
            (Vec::<f32>::from(&mean), Vec::<f32>::from(&std))
        });

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    /// Standardize one `[channels, height, width]` image.
    pub fn forward(&self, image: &Tensor) -> Result<Tensor> {
        let StandardizeOptions {
            featurewise_center,
            samplewise_center,
            featurewise_std_normalization,
            samplewise_std_normalization,
        } = self.options;
        let (channels, _height, _width) = image.size3()?;

        tch::no_grad(|| {
            let mut image = image.to_kind(Kind::Float);

            if samplewise_center {
                image = &image - image.mean(Kind::Float);
            }
            if samplewise_std_normalization {
                let std = f64::from(image.std(false));
                image = image / (std + STD_EPSILON);
            }

            if self.needs_fit() && !self.is_fitted() {
                self.warned.call_once(|| {
                    warn!("featurewise standardization is set, but the generator is not fitted")
                });
                return Ok(image);
            }

            let per_channel = |values: &[f32]| -> Result<Tensor> {
                ensure!(
                    values.len() as i64 == channels,
                    "fitted on {} channels, but the image has {} channels",
                    values.len(),
                    channels
                );
                Ok(Tensor::of_slice(values)
                    .view([channels, 1, 1])
                    .to_device(image.device()))
            };

            if featurewise_center {
                if let Some(mean) = &self.mean {
                    image = &image - per_channel(mean)?;
                }
            }
            if featurewise_std_normalization {
                if let Some(std) = &self.std {
                    image = &image / (per_channel(std)? + STD_EPSILON);
                }
            }

            Ok(image)
        })
    }
}
