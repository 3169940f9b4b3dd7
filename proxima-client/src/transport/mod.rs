mod peer_link;
mod rtc_link;

pub use peer_link::*;
pub use rtc_link::*;
