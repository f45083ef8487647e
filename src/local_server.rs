//! One-shot loopback listener that captures Google's OAuth redirect.

mod config;
mod http;
mod server;
mod target;

pub use config::LocalServerConfig;
pub use server::LocalServer;
