mod peer_manager;
mod peer_state;

pub use peer_manager::*;
pub use peer_state::*;
