//! peerhop-discovery — LAN UDP broadcast peer location.

pub mod discover;
pub mod model;
pub mod net;

pub use discover::DiscoveryService;
pub use model::DiscoverResponse;
