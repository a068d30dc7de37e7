use super::topology::{LayerConfig, LayerShape, ModelTopology, Padding};
use crate::common::*;

#[derive(Debug)]
enum Layer {
    Conv2d {
        conv: nn::Conv2D,
        activation: Activation,
    },
    MaxPool2d {
        pool_size: i64,
        stride: i64,
    },
    Dropout {
        rate: f64,
    },
    Flatten,
    Dense {
        linear: nn::Linear,
        activation: Activation,
    },
}

/// The sequential network instantiated from a [ModelTopology].
///
/// The last layer's activation is kept apart so the loss can work on logits.
#[derive(Debug)]
pub struct Network {
    layers: Vec<Layer>,
    output_activation: Activation,
}

impl Network {
    pub fn new<'p, P>(path: P, topology: &ModelTopology) -> Result<Self>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let summary = topology.summary()?;
        let last_index = topology.layers.len().checked_sub(1);

        let layers: Vec<_> = izip!(&topology.layers, &summary)
            .map(|(config, layer_summary)| -> Result<_> {
                let index = layer_summary.index;
                let is_last = Some(index) == last_index;
                let vars = path / format!("layer_{}", index);

                let layer = match *config {
                    LayerConfig::Conv2d {
                        filters,
                        kernel_size,
                        stride,
                        padding,
                        activation,
                    } => {
                        let in_channels = match layer_summary.input_shape {
                            LayerShape::Map([c, _, _]) => c,
                            LayerShape::Flat(_) => bail!("layer {}: expect a feature map input", index),
                        };
                        let padding = match padding {
                            Padding::Same => kernel_size as i64 / 2,
                            Padding::Valid => 0,
                        };
                        let conv = nn::conv2d(
                            &vars,
                            in_channels as i64,
                            filters as i64,
                            kernel_size as i64,
                            nn::ConvConfig {
                                stride: stride as i64,
                                padding,
                                ..Default::default()
                            },
                        );
                        Layer::Conv2d {
                            conv,
                            activation: if is_last { Activation::Linear } else { activation },
                        }
                    }
                    LayerConfig::MaxPool2d { pool_size, stride } => Layer::MaxPool2d {
                        pool_size: pool_size as i64,
                        stride: stride as i64,
                    },
                    LayerConfig::Dropout { rate } => Layer::Dropout { rate: rate.raw() },
                    LayerConfig::Flatten => Layer::Flatten,
                    LayerConfig::Dense { units, activation } => {
                        let in_features = layer_summary.input_shape.numel();
                        let linear = nn::linear(
                            &vars,
                            in_features as i64,
                            units as i64,
                            Default::default(),
                        );
                        Layer::Dense {
                            linear,
                            activation: if is_last { Activation::Linear } else { activation },
                        }
                    }
                };
                Ok(layer)
            })
            .try_collect()?;

        Ok(Self {
            layers,
            output_activation: topology.output_activation(),
        })
    }

    pub fn output_activation(&self) -> Activation {
        self.output_activation
    }

    /// Run every layer, leaving out the activation of the last one.
    pub fn forward_logits_t(&self, input: &Tensor, train: bool) -> Tensor {
        self.layers
            .iter()
            .fold(input.shallow_clone(), |xs, layer| match layer {
                Layer::Conv2d { conv, activation } => xs.apply(conv).activation(*activation),
                Layer::MaxPool2d { pool_size, stride } => xs.max_pool2d(
                    &[*pool_size, *pool_size],
                    &[*stride, *stride],
                    &[0, 0],
                    &[1, 1],
                    false,
                ),
                Layer::Dropout { rate } => xs.dropout(*rate, train),
                Layer::Flatten => xs.flat_view(),
                Layer::Dense { linear, activation } => xs.apply(linear).activation(*activation),
            })
    }
}

impl nn::ModuleT for Network {
    fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        self.forward_logits_t(input, train)
            .activation(self.output_activation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputShape, SimpleCnnInit};

    #[test]
    fn forward_shape_and_probabilities() -> Result<()> {
        let topology = SimpleCnnInit {
            name: "test".into(),
            input_shape: InputShape::default(),
            kernel_size: 3,
            layer_activation: Activation::Relu,
            num_output: 43,
            output_activation: Activation::Softmax,
        }
        .build()?;

        let vs = nn::VarStore::new(Device::Cpu);
        let network = Network::new(&vs.root(), &topology)?;
        assert_eq!(vs.variables().len(), 8);

        let input = Tensor::rand(&[2, 1, 46, 46], FLOAT_CPU);
        let logits = network.forward_logits_t(&input, false);
        assert_eq!(logits.size(), vec![2, 43]);

        let probs = network.forward_t(&input, false);
        let sums = Vec::<f32>::from(&probs.sum_dim_intlist(&[1], false, Kind::Float));
        for sum in sums {
            approx::assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-4);
        }
        Ok(())
    }
}
