mod app;
mod broker;
mod config;
mod error;
mod index;
mod signaling;
mod sweeper;

pub use app::*;
pub use broker::*;
pub use config::*;
pub use error::*;
pub use index::*;
pub use signaling::*;
pub use sweeper::*;
