mod engine_harness;

pub use engine_harness::*;
pub use mock_link::*;
