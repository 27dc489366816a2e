#![warn(rust_2018_idioms)]

pub mod header;
pub mod rtcp_header;

pub use header::RtpHeader;
pub use rtcp_header::RtcpHeader;
