//! Batched image feeding from labeled image directories.

mod batch;
mod data_generator;
mod directory_iterator;
mod image;
mod options;
mod prefetch;
mod transformer;

pub use batch::*;
pub use data_generator::*;
pub use directory_iterator::*;
pub use image::*;
pub use options::*;
pub use prefetch::*;
pub use transformer::*;
