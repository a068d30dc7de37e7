//! Random geometric augmentation.

use crate::common::*;

#[derive(Debug, Clone, PartialEq)]
pub struct RandomAffineInit {
    /// Maximum horizontal shift as a fraction of the image width.
    pub width_shift: Option<R64>,
    /// Maximum vertical shift as a fraction of the image height.
    pub height_shift: Option<R64>,
    /// The zoom factors are sampled from `[1 - zoom, 1 + zoom]`.
    pub zoom: Option<R64>,
    /// Maximum shear angle in degrees.
    pub shear_degrees: Option<R64>,
    /// Maximum rotation angle in degrees.
    pub rotation_degrees: Option<R64>,
}

impl RandomAffineInit {
    pub fn build(self) -> Result<RandomAffine> {
        let Self {
            width_shift,
            height_shift,
            zoom,
            shear_degrees,
            rotation_degrees,
        } = self;

        let non_negative = |val: Option<R64>, name: &str| -> Result<f64> {
            match val {
                Some(val) => {
                    ensure!(val >= 0.0, "{} must be non-negative", name);
                    Ok(val.raw())
                }
                None => Ok(0.0),
            }
        };

        let width_shift = non_negative(width_shift, "width_shift")?;
        let height_shift = non_negative(height_shift, "height_shift")?;
        let zoom = non_negative(zoom, "zoom")?;
        ensure!(zoom < 1.0, "zoom must be less than 1");
        let shear = non_negative(shear_degrees, "shear_degrees")?.to_radians();
        let rotation = non_negative(rotation_degrees, "rotation_degrees")?.to_radians();

        Ok(RandomAffine {
            width_shift,
            height_shift,
            zoom,
            shear,
            rotation,
        })
    }
}

impl Default for RandomAffineInit {
    fn default() -> Self {
        Self {
            width_shift: None,
            height_shift: None,
            zoom: None,
            shear_degrees: None,
            rotation_degrees: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomAffine {
    width_shift: f64,
    height_shift: f64,
    zoom: f64,
    shear: f64,
    rotation: f64,
}

impl RandomAffine {
    /// Sample a transform mapping output coordinates to input coordinates.
    ///
    /// The matrix works on coordinates normalized to `[-1, 1]` in `(x, y)` order.
    pub fn sample_transform<R>(&self, rng: &mut R) -> [[f64; 3]; 3]
    where
        R: Rng + ?Sized,
    {
        let symmetric = |rng: &mut R, max: f64| {
            if max > 0.0 {
                rng.gen_range(-max..=max)
            } else {
                0.0
            }
        };

        let angle = symmetric(rng, self.rotation);
        let tx = symmetric(rng, self.width_shift) * 2.0;
        let ty = symmetric(rng, self.height_shift) * 2.0;
        let shear = symmetric(rng, self.shear);
        let (zx, zy) = if self.zoom > 0.0 {
            (
                rng.gen_range((1.0 - self.zoom)..=(1.0 + self.zoom)),
                rng.gen_range((1.0 - self.zoom)..=(1.0 + self.zoom)),
            )
        } else {
            (1.0, 1.0)
        };

        let rotation = [
            [angle.cos(), -angle.sin(), 0.0],
            [angle.sin(), angle.cos(), 0.0],
            [0.0, 0.0, 1.0],
        ];
        let translation = [[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]];
        let shearing = [
            [1.0, -shear.sin(), 0.0],
            [0.0, shear.cos(), 0.0],
            [0.0, 0.0, 1.0],
        ];
        let zooming = [[zx, 0.0, 0.0], [0.0, zy, 0.0], [0.0, 0.0, 1.0]];

        matmul3(&matmul3(&matmul3(&rotation, &translation), &shearing), &zooming)
    }

    /// Transform a `[channels, height, width]` image. Pixels sampled outside
    /// the image take the value of the nearest border pixel.
    pub fn forward<R>(&self, image: &Tensor, rng: &mut R) -> Result<Tensor>
    where
        R: Rng + ?Sized,
    {
        let transform = self.sample_transform(rng);
        apply_affine(image, &transform)
    }
}

/// Resample an image with an output-to-input affine matrix in normalized coordinates.
pub fn apply_affine(image: &Tensor, transform: &[[f64; 3]; 3]) -> Result<Tensor> {
    tch::no_grad(|| {
        let (channels, height, width) = image.size3()?;
        let device = image.device();

        let theta: Vec<f32> = transform[0..2]
            .iter()
            .flat_map(|row| row.iter().map(|&val| val as f32))
            .collect();
        let theta = Tensor::of_slice(&theta)
            .view([1, 2, 3])
            .to_device(device);

        let affine_grid =
            Tensor::affine_grid_generator(&theta, &[1, channels, height, width], false);
        let output = image
            .to_kind(Kind::Float)
            .view([1, channels, height, width])
            // bilinear interpolation, border padding
            .grid_sampler(&affine_grid, 0, 1, false)
            .view([channels, height, width]);

        Ok(output)
    })
}

fn matmul3(lhs: &[[f64; 3]; 3], rhs: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for row in 0..3 {
        for col in 0..3 {
            out[row][col] = (0..3).map(|k| lhs[row][k] * rhs[k][col]).sum();
        }
    }
    out
}
