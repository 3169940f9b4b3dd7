pub use proxima_core::ClientId;

pub mod model {
    pub use proxima_core::model::*;
    pub use proxima_core::utils::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use proxima_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use proxima_client::*;
}
