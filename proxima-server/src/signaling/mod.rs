mod connection_registry;
mod session;
mod signaling_output;
mod signaling_relay;
mod ws_handler;

pub use connection_registry::*;
pub use session::*;
pub use signaling_output::*;
pub use signaling_relay::*;
pub use ws_handler::*;
