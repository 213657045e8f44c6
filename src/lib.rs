// MCP server answering "what time is it?" from an NTP server, falling back
// to the local clock when the server cannot be reached.

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ntp;
pub mod resolver;
pub mod retry;
pub mod rpc;
pub mod stdio;
pub mod tools;
pub mod types;

pub use config::TimeSourceConfig;
pub use error::TimeError;
pub use resolver::{Resolution, TimeResolver};
