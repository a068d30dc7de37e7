use super::ColorMode;
use crate::common::*;

/// Load an image file as a `[channels, height, width]` float tensor in `[0, 255]`,
/// resized to `height` x `width`.
pub fn load_image(
    path: impl AsRef<Path>,
    height: usize,
    width: usize,
    color_mode: ColorMode,
) -> Result<Tensor> {
    let path = path.as_ref();
    ensure!(height > 0 && width > 0, "target size must be positive");

    tch::no_grad(|| {
        let image = vision::image::load(path)
            .with_context(|| format!("failed to load image '{}'", path.display()))?;
        let image = to_rgb(&image)?;
        let image = vision::image::resize(&image, width as i64, height as i64)?;
        convert_color(&image.to_kind(Kind::Float), color_mode)
    })
}

/// Convert a `[3, height, width]` RGB image to the color mode.
pub fn convert_color(rgb: &Tensor, color_mode: ColorMode) -> Result<Tensor> {
    let (channels, _height, _width) = rgb.size3()?;
    ensure!(
        channels == 3,
        "expect an RGB image, but get {} channels",
        channels
    );

    let output = match color_mode {
        ColorMode::Rgb => rgb.shallow_clone(),
        ColorMode::Grayscale => {
            let weights = Tensor::of_slice(&[0.299f32, 0.587, 0.114])
                .view([3, 1, 1])
                .to_device(rgb.device());
            (rgb.to_kind(Kind::Float) * weights).sum_dim_intlist(&[0], true, Kind::Float)
        }
    };
    Ok(output)
}

fn to_rgb(image: &Tensor) -> Result<Tensor> {
    let (channels, _height, _width) = image.size3()?;
    let rgb = match channels {
        1 => image.repeat(&[3, 1, 1]),
        3 => image.shallow_clone(),
        4 => image.narrow(0, 0, 3),
        _ => bail!("unsupported number of image channels {}", channels),
    };
    Ok(rgb)
}
