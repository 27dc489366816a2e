#![warn(rust_2018_idioms)]

pub mod rand;
pub mod server;
pub mod state;

pub use server::{IceEvent, IceServer, server_config::ServerConfig};
pub use state::IceState;
