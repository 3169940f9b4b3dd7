mod broker_link;

pub use broker_link::*;
