mod introduction_engine;
mod proximity_index;

pub use introduction_engine::*;
pub use proximity_index::*;
