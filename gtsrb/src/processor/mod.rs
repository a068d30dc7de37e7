//! Image preprocessing building blocks.

pub mod brightness;
pub mod normalizer;
pub mod preprocessor;
pub mod random_affine;
pub mod standardize;

pub use brightness::*;
pub use normalizer::*;
pub use preprocessor::*;
pub use random_affine::*;
pub use standardize::*;
