//! Hooks invoked by the training loop.

mod callback;
mod csv_logger;
mod early_stopping;
mod log_callback;
mod lr_scheduler;
mod model_checkpoint;
mod monitor;
mod table;
mod tensorboard;

pub use callback::*;
pub use csv_logger::*;
pub use early_stopping::*;
pub use log_callback::*;
pub use lr_scheduler::*;
pub use model_checkpoint::*;
pub use monitor::*;
pub use table::*;
pub use tensorboard::*;
