use shared::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Kind of media a track carries, named as in an SDP `m=` line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TrackType {
    Video,
    Audio,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for TrackType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(TrackType::Video),
            "audio" => Ok(TrackType::Audio),
            _ => Err(Error::OtherMediaErr(format!("unknown track type {s}"))),
        }
    }
}
