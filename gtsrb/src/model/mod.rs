//! The sequential convolutional classifier and its training wrapper.

mod history;
mod loss;
mod metrics;
mod model;
mod naming;
mod network;
mod optimizer;
mod topology;
mod weights;

pub use history::*;
pub use loss::*;
pub use metrics::*;
pub use model::*;
pub use naming::*;
pub use network::*;
pub use optimizer::*;
pub use topology::*;
pub use weights::*;
