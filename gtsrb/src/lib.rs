//! Building blocks of the GTSRB traffic-sign classification harness.

mod common;
pub mod callbacks;
pub mod dataset;
pub mod generator;
pub mod model;
pub mod processor;
pub mod utils;

pub use tch_act::Activation;
