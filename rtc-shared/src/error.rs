use std::io;
use std::net;
use std::string::FromUtf8Error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //RTP/RTCP
    #[error("RTP header size insufficient")]
    ErrHeaderSizeInsufficient,
    #[error("RTP header size insufficient for extension")]
    ErrHeaderSizeInsufficientForExtension,
    #[error("invalid packet version")]
    ErrBadVersion,
    #[error("packet is too short to be RTP packet")]
    ErrTooShortRtp,
    #[error("packet is too short to be RTCP packet")]
    ErrTooShortRtcp,

    //STUN
    #[error("attribute not found")]
    ErrAttributeNotFound,
    #[error("unexpected EOF")]
    ErrUnexpectedEof,
    #[error("unexpected EOF: not enough bytes to read header")]
    ErrUnexpectedHeaderEof,
    #[error("attribute size is invalid")]
    ErrAttributeSizeInvalid,
    #[error("attribute size overflow")]
    ErrAttributeSizeOverflow,
    #[error("integrity check failed")]
    ErrIntegrityMismatch,
    #[error("fingerprint check failed")]
    ErrFingerprintMismatch,
    #[error("FINGERPRINT before MESSAGE-INTEGRITY attribute")]
    ErrFingerprintBeforeIntegrity,
    #[error("invalid length of IP value")]
    ErrBadIpLength,
    #[error("{0:x} is invalid magic cookie (should be {1:x})")]
    ErrInvalidMagicCookie(u32, u32),
    #[error("buffer length {0} is less than {1} (expected message size)")]
    ErrBufferTooSmall(usize, usize),
    #[error("unexpected attribute value {0}")]
    ErrUnexpectedAttributeValue(String),

    //ICE
    #[error("ICE server is closed")]
    ErrIceServerClosed,

    //DTLS
    #[error("attempted to start DTLS transport twice")]
    ErrDtlsMultipleStart,
    #[error("DTLS transport is not started")]
    ErrDtlsNotStarted,
    #[error("DTLS handshake completed without a SRTP protection profile")]
    ErrNoSrtpProtectionProfile,
    #[error("remote certificate is not available")]
    ErrNoRemoteCertificate,
    #[error("remote certificate fingerprint mismatch: expected {0}, got {1}")]
    ErrMismatchFingerprint(String, String),
    #[error("unsupported fingerprint algorithm {0}")]
    ErrUnsupportedFingerprintAlgorithm(String),
    #[error("invalid fingerprint")]
    ErrInvalidFingerprint,

    //SRTP
    #[error("SRTP Master Key must be len {0}, got {1}")]
    SrtpMasterKeyLength(usize, usize),
    #[error("SRTP Salt must be len {0}, got {1}")]
    SrtpSaltLength(usize, usize),
    #[error("too short SRTP packet: only {0} bytes, expected > {1} bytes")]
    SrtpTooSmall(usize, usize),
    #[error("failed to verify rtp auth tag")]
    RtpFailedToVerifyAuthTag,

    //Media
    #[error("no media source attached")]
    ErrNoMediaSource,
    #[error("no {0} track in media source")]
    ErrNoSuchTrack(String),
    #[error("media source SDP has no payload type for {0}")]
    ErrNoPayloadType(String),
    #[error("RTP packet of {0} bytes does not fit the {1} bytes interleaved length")]
    ErrMediaPacketTooLarge(usize, usize),

    //Transport
    #[error("no selected ICE tuple to send through")]
    ErrNoSelectedTuple,
    #[error("SDP answer is {0} bytes, larger than the {1} bytes its fields allow")]
    ErrSdpAnswerTooLarge(usize, usize),
    #[error("transport is closed")]
    ErrTransportClosed,

    //Third Party Error
    #[error("{0}")]
    RcGen(#[from] rcgen::Error),
    #[error("aes gcm: {0}")]
    AesGcm(#[from] aes_gcm::Error),
    #[error("{0}")]
    Aes(#[from] aes::cipher::InvalidLength),
    #[error("parse ip: {0}")]
    ParseIp(#[from] net::AddrParseError),
    #[error("{0}")]
    Io(#[source] IoError),
    #[error("utf8: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("fmt: {0}")]
    Fmt(#[from] std::fmt::Error),

    //Other Errors
    #[error("Other STUN Err: {0}")]
    OtherStunErr(String),
    #[error("Other DTLS Err: {0}")]
    OtherDtlsErr(String),
    #[error("Other SRTP Err: {0}")]
    OtherSrtpErr(String),
    #[error("Other SDP Err: {0}")]
    OtherSdpErr(String),
    #[error("Other Media Err: {0}")]
    OtherMediaErr(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::OtherDtlsErr(e.to_string())
    }
}

impl From<openssl::ssl::Error> for Error {
    fn from(e: openssl::ssl::Error) -> Self {
        Error::OtherDtlsErr(e.to_string())
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::Other(errs_strs.join("\n")))
    }
}
