//! Activation functions addressable by name.

#[cfg(feature = "tch")]
pub use impls::*;
#[cfg(feature = "tch")]
mod impls;

#[cfg(feature = "tch")]
pub use r#trait::*;
#[cfg(feature = "tch")]
mod r#trait;

use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Activation {
    Linear,
    Relu,
    Elu,
    Selu,
    Gelu,
    Tanh,
    Sigmoid,
    Leaky,
    Swish,
    Mish,
    HardMish,
    /// Softmax over the channel (class) dimension.
    Softmax,
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::IntoEnumIterator;

    #[test]
    fn activation_names() {
        assert_eq!(Activation::iter().count(), 12);
        for act in Activation::iter() {
            assert_eq!(act.to_string(), act.as_ref());
            assert_eq!(act.as_ref().parse::<Activation>().unwrap(), act);
        }
        assert_eq!(Activation::HardMish.to_string(), "hard_mish");
        assert!("softplus".parse::<Activation>().is_err());
    }
}
