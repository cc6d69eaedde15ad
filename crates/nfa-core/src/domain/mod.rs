//! Domain types shared by every layer of the proxy.
//!
//! These are plain data types with serde support. They carry no
//! transport or locking concerns.

mod chat;
mod model;
mod session;

pub use chat::{ChatMessage, UpstreamChatRequest};
pub use model::{ModelList, ModelRecord};
pub use session::{ActiveSession, CachedSession, SessionGrant};
