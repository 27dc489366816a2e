#![warn(rust_2018_idioms)]

pub mod packet;
pub mod ring;
pub mod source;
pub mod track;

pub use packet::MediaPacket;
pub use ring::{RingData, RingReader};
pub use source::MediaSource;
pub use track::TrackType;
