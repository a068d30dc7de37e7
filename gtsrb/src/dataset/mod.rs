//! Dataset fetching and on-disk dataset readers.

mod directory;
mod init;
mod layout;
mod record;
mod table;

pub use directory::*;
pub use init::*;
pub use layout::*;
pub use record::*;
pub use table::*;
