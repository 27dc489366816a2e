#![warn(rust_2018_idioms)]

pub mod attributes;
pub mod checks;
pub mod error_code;
pub mod fingerprint;
pub mod ice_attrs;
pub mod integrity;
pub mod message;
pub mod textattrs;
pub mod xoraddr;


// IANA assigned ports for "stun" protocol.
pub const DEFAULT_PORT: u16 = 3478;
