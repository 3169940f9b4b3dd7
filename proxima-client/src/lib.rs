mod attenuator;
mod client;
mod config;
mod engine;
mod error;
mod peer;
mod reporter;
mod signaling;
mod transport;

pub use attenuator::*;
pub use client::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use peer::*;
pub use reporter::*;
pub use signaling::*;
pub use transport::*;
