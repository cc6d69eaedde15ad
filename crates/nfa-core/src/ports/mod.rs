//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core services expect from
//! infrastructure. They use only domain types; HTTP details stay in the
//! adapter crates.

pub mod marketplace;

pub use marketplace::{ByteStream, MarketplaceError, MarketplacePort};
