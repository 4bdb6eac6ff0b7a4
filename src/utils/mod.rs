//! Process utilities: cancellation and log setup

pub mod logging;
pub mod shutdown;

pub use logging::{init_logging, Verbosity};
pub use shutdown::Shutdown;
