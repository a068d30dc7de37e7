//! Serializable description of a sequential network.

use crate::common::*;

/// The `(height, width, channels)` shape of input images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// The color mode tag used in artifact names.
    pub fn color_tag(&self) -> &'static str {
        if self.channels == 3 {
            "rgb"
        } else {
            "grayscale"
        }
    }
}

impl Default for InputShape {
    fn default() -> Self {
        Self::new(46, 46, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Keep the spatial size. Only odd kernel sizes are supported, since
    /// the padding is always split evenly between both sides.
    Same,
    /// No padding.
    Valid,
}

/// A layer of the sequential network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerConfig {
    Conv2d {
        filters: usize,
        kernel_size: usize,
        stride: usize,
        padding: Padding,
        activation: Activation,
    },
    MaxPool2d {
        pool_size: usize,
        stride: usize,
    },
    Dropout {
        rate: R64,
    },
    Flatten,
    Dense {
        units: usize,
        activation: Activation,
    },
}

impl LayerConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Conv2d { .. } => "conv2d",
            Self::MaxPool2d { .. } => "max_pool2d",
            Self::Dropout { .. } => "dropout",
            Self::Flatten => "flatten",
            Self::Dense { .. } => "dense",
        }
    }
}

/// The output shape of a layer, excluding the batch dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerShape {
    /// `[channels, height, width]` feature map.
    Map([usize; 3]),
    /// Flat feature vector.
    Flat(usize),
}

impl LayerShape {
    pub fn numel(&self) -> usize {
        match *self {
            Self::Map([c, h, w]) => c * h * w,
            Self::Flat(n) => n,
        }
    }
}

impl fmt::Display for LayerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map([c, h, w]) => write!(f, "[{}, {}, {}]", c, h, w),
            Self::Flat(n) => write!(f, "[{}]", n),
        }
    }
}

/// Shape and parameter count of a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub index: usize,
    pub kind: &'static str,
    pub input_shape: LayerShape,
    pub output_shape: LayerShape,
    pub num_params: usize,
}

/// The architecture of a sequential network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTopology {
    pub name: String,
    pub input_shape: InputShape,
    pub layers: Vec<LayerConfig>,
}

/// Parameters of the three-block classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCnnInit {
    pub name: String,
    pub input_shape: InputShape,
    pub kernel_size: usize,
    pub layer_activation: Activation,
    pub num_output: usize,
    pub output_activation: Activation,
}

impl SimpleCnnInit {
    /// Three convolution, max-pooling and dropout blocks followed by a dense output layer.
    pub fn build(self) -> Result<ModelTopology> {
        let Self {
            name,
            input_shape,
            kernel_size,
            layer_activation,
            num_output,
            output_activation,
        } = self;

        let block = |filters: usize, padding: Padding| {
            [
                LayerConfig::Conv2d {
                    filters,
                    kernel_size,
                    stride: 1,
                    padding,
                    activation: layer_activation,
                },
                LayerConfig::MaxPool2d {
                    pool_size: 2,
                    stride: 2,
                },
                LayerConfig::Dropout { rate: r64(0.2) },
            ]
        };

        let layers: Vec<_> = iter::empty()
            .chain(block(32, Padding::Same))
            .chain(block(64, Padding::Valid))
            .chain(block(128, Padding::Valid))
            .chain([
                LayerConfig::Flatten,
                LayerConfig::Dense {
                    units: num_output,
                    activation: output_activation,
                },
            ])
            .collect();

        let topology = ModelTopology {
            name,
            input_shape,
            layers,
        };
        topology.summary()?;
        Ok(topology)
    }
}

impl ModelTopology {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let topology: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse model file '{}'", path.display()))?;
        topology.summary()?;
        Ok(topology)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("failed to write model file '{}'", path.display()))?;
        Ok(())
    }

    /// The activation applied by the last layer.
    pub fn output_activation(&self) -> Activation {
        match self.layers.last() {
            Some(LayerConfig::Dense { activation, .. })
            | Some(LayerConfig::Conv2d { activation, .. }) => *activation,
            _ => Activation::Linear,
        }
    }

    pub fn output_shape(&self) -> Result<LayerShape> {
        let shape = match self.summary()?.last() {
            Some(layer) => layer.output_shape,
            None => self.input_layer_shape(),
        };
        Ok(shape)
    }

    pub fn num_params(&self) -> Result<usize> {
        Ok(self.summary()?.iter().map(|layer| layer.num_params).sum())
    }

    fn input_layer_shape(&self) -> LayerShape {
        let InputShape {
            height,
            width,
            channels,
        } = self.input_shape;
        LayerShape::Map([channels, height, width])
    }

    /// Infer the shape of every layer. Fails on invalid layer arrangements.
    pub fn summary(&self) -> Result<Vec<LayerSummary>> {
        ensure!(
            self.input_shape.height > 0 && self.input_shape.width > 0 && self.input_shape.channels > 0,
            "input shape must be positive"
        );

        let mut shape = self.input_layer_shape();

        self.layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                let input_shape = shape;
                let (output_shape, num_params) = layer_output(index, layer, input_shape)?;
                shape = output_shape;

                Ok(LayerSummary {
                    index,
                    kind: layer.kind_name(),
                    input_shape,
                    output_shape,
                    num_params,
                })
            })
            .try_collect()
    }
}

fn layer_output(index: usize, layer: &LayerConfig, input: LayerShape) -> Result<(LayerShape, usize)> {
    let output = match (layer, input) {
        (
            &LayerConfig::Conv2d {
                filters,
                kernel_size,
                stride,
                padding,
                ..
            },
            LayerShape::Map([channels, height, width]),
        ) => {
            ensure!(
                filters > 0 && kernel_size > 0 && stride > 0,
                "layer {}: filters, kernel_size and stride must be positive",
                index
            );
            let (out_h, out_w) = match padding {
                Padding::Same => {
                    ensure!(
                        kernel_size % 2 == 1,
                        "layer {}: kernel size {} is even, but same padding only supports odd kernel sizes",
                        index,
                        kernel_size
                    );
                    ((height + stride - 1) / stride, (width + stride - 1) / stride)
                }
                Padding::Valid => {
                    ensure!(
                        height >= kernel_size && width >= kernel_size,
                        "layer {}: input [{}, {}] is smaller than the kernel",
                        index,
                        height,
                        width
                    );
                    (
                        (height - kernel_size) / stride + 1,
                        (width - kernel_size) / stride + 1,
                    )
                }
            };
            let num_params = kernel_size * kernel_size * channels * filters + filters;
            (LayerShape::Map([filters, out_h, out_w]), num_params)
        }
        (
            &LayerConfig::MaxPool2d { pool_size, stride },
            LayerShape::Map([channels, height, width]),
        ) => {
            ensure!(
                pool_size > 0 && stride > 0,
                "layer {}: pool_size and stride must be positive",
                index
            );
            ensure!(
                height >= pool_size && width >= pool_size,
                "layer {}: input [{}, {}] is smaller than the pooling window",
                index,
                height,
                width
            );
            let out_h = (height - pool_size) / stride + 1;
            let out_w = (width - pool_size) / stride + 1;
            (LayerShape::Map([channels, out_h, out_w]), 0)
        }
        (&LayerConfig::Dropout { rate }, shape) => {
            ensure!(
                (0.0..1.0).contains(&rate.raw()),
                "layer {}: dropout rate must be in [0, 1)",
                index
            );
            (shape, 0)
        }
        (LayerConfig::Flatten, shape) => (LayerShape::Flat(shape.numel()), 0),
        (&LayerConfig::Dense { units, .. }, LayerShape::Flat(in_features)) => {
            ensure!(units > 0, "layer {}: units must be positive", index);
            (LayerShape::Flat(units), in_features * units + units)
        }
        (layer, shape) => bail!(
            "layer {}: {} cannot take input of shape {}",
            index,
            layer.kind_name(),
            shape
        ),
    };
    Ok(output)
}
