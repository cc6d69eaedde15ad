#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

mod client;
mod config;
mod credentials;
mod error;
mod http;
mod port;

pub use client::MarketplaceClient;
pub use config::{DEFAULT_FEE, MarketplaceClientConfig};
pub use credentials::{Credentials, CredentialsError};
pub use error::{ClientError, ClientResult};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use wiremock as _;
