//! File system and network helpers.

mod download;
mod fs;
mod rate_counter;
mod tensor;

pub use download::*;
pub use fs::*;
pub use rate_counter::*;
pub use tensor::*;
