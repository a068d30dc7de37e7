use crate::{impls, Activation};
use tch::{nn::Module, Tensor};

pub trait TensorActivationExt {
    fn activation(&self, act: Activation) -> Tensor;

    fn leaky(&self) -> Tensor;

    /// Swish activation function.
    fn swish(&self) -> Tensor;

    /// Hard-Mish activation function.
    fn hard_mish(&self) -> Tensor;
}

impl TensorActivationExt for Tensor {
    fn activation(&self, act: Activation) -> Tensor {
        act.forward(self)
    }

    fn leaky(&self) -> Tensor {
        impls::leaky(self)
    }

    fn swish(&self) -> Tensor {
        impls::swish(self)
    }

    fn hard_mish(&self) -> Tensor {
        impls::hard_mish(self)
    }
}
