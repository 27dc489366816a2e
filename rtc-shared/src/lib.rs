#![warn(rust_2018_idioms)]

pub mod error;
pub(crate) mod transport;
pub mod util;

pub use transport::{
    EcnCodepoint, TaggedBytesMut, TransportContext, TransportMessage,
    TransportProtocol,
};
