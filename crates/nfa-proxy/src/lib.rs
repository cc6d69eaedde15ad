#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod error;
pub mod forward;
pub mod models;
pub mod passthrough;
pub mod server;
pub mod sink;

pub use server::{ProxyState, create_router, serve};
