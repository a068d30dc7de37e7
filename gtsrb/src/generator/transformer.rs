use super::GeneratorOptions;
use crate::{
    common::*,
    processor::{Preprocessor, RandomAffine, RandomAffineInit, RandomBrightness, Standardizer},
};

/// Per-image augmentation and standardization pipeline.
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    preprocessing_function: Option<Arc<dyn Preprocessor>>,
    standardizer: Standardizer,
    affine: Option<RandomAffine>,
    brightness: Option<RandomBrightness>,
}

impl ImageTransformer {
    /// Build the pipeline. Augmentation options take effect only if `augment` is set.
    pub fn new(
        options: &GeneratorOptions,
        preprocessing_function: Option<Arc<dyn Preprocessor>>,
        augment: bool,
    ) -> Result<Self> {
        let GeneratorOptions {
            ref standardize,
            width_shift_range,
            height_shift_range,
            zoom_range,
            shear_range,
            rotation_range,
            brightness_range,
        } = *options;

        let (affine, brightness) = if augment {
            let affine = RandomAffineInit {
                width_shift: Some(width_shift_range),
                height_shift: Some(height_shift_range),
                zoom: Some(zoom_range),
                shear_degrees: Some(shear_range),
                rotation_degrees: Some(rotation_range),
            }
            .build()?;
            let brightness = brightness_range
                .map(|(lower, upper)| RandomBrightness::new(lower.raw(), upper.raw()))
                .transpose()?;
            (Some(affine), brightness)
        } else {
            (None, None)
        };

        Ok(Self {
            preprocessing_function,
            standardizer: Standardizer::new(standardize.clone()),
            affine,
            brightness,
        })
    }

    pub fn is_augmenting(&self) -> bool {
        self.affine.is_some() || self.brightness.is_some()
    }

    pub fn standardizer(&self) -> &Standardizer {
        &self.standardizer
    }

    /// Fit featurewise statistics on preprocessed `[channels, height, width]` images.
    pub fn fit(&mut self, images: &[Tensor]) -> Result<()> {
        ensure!(!images.is_empty(), "no images to fit on");
        let images: Vec<_> = images
            .iter()
            .map(|image| self.preprocess(image))
            .try_collect()?;
        self.standardizer.fit(&Tensor::stack(&images, 0))
    }

    fn preprocess(&self, image: &Tensor) -> Result<Tensor> {
        match &self.preprocessing_function {
            Some(func) => func
                .evaluate(image)
                .with_context(|| format!("preprocessor '{}' failed", func.title())),
            None => Ok(image.shallow_clone()),
        }
    }

    /// Apply random geometric and brightness transforms.
    pub fn random_transform<R>(&self, image: &Tensor, rng: &mut R) -> Result<Tensor>
    where
        R: Rng + ?Sized,
    {
        let image = match &self.affine {
            Some(affine) => affine.forward(image, rng)?,
            None => image.shallow_clone(),
        };
        let image = match &self.brightness {
            Some(brightness) => brightness.forward(&image, rng),
            None => image,
        };
        Ok(image)
    }

    /// Apply the preprocessing function, then standardization.
    pub fn standardize(&self, image: &Tensor) -> Result<Tensor> {
        let image = self.preprocess(image)?;
        self.standardizer.forward(&image)
    }

    pub fn transform<R>(&self, image: &Tensor, rng: &mut R) -> Result<Tensor>
    where
        R: Rng + ?Sized,
    {
        let image = self.random_transform(image, rng)?;
        self.standardize(&image)
    }
}
