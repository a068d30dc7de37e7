use crate::Activation;
use tch::{nn, Kind, Tensor};

impl nn::Module for Activation {
    fn forward(&self, xs: &Tensor) -> Tensor {
        use Activation::*;

        match *self {
            Linear => xs.shallow_clone(),
            Relu => xs.relu(),
            Elu => xs.elu(),
            Selu => xs.selu(),
            Gelu => xs.gelu(),
            Tanh => xs.tanh(),
            Sigmoid => xs.sigmoid(),
            Leaky => leaky(xs),
            Swish => swish(xs),
            Mish => mish(xs),
            HardMish => hard_mish(xs),
            Softmax => xs.softmax(1, Kind::Float),
        }
    }
}

pub fn leaky(xs: &Tensor) -> Tensor {
    xs.clamp_min(0.0) + xs.clamp_max(0.0) * 0.1
}

pub fn swish(tensor: &Tensor) -> Tensor {
    tensor * tensor.sigmoid()
}

pub fn mish(tensor: &Tensor) -> Tensor {
    tensor * tensor.softplus().tanh()
}

pub fn hard_mish(tensor: &Tensor) -> Tensor {
    let case1 = tensor.clamp(-2.0, 0.0);
    let case2 = tensor.clamp_min(0.0);
    (&case1 * &case1 / 2.0 + &case1) + case2
}
