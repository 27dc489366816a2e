use rand::{Rng, rng};

/// match_range accepts packets with the first byte in [lower..upper]
fn match_range(lower: u8, upper: u8, buf: &[u8]) -> bool {
    if buf.is_empty() {
        return false;
    }
    let b = buf[0];
    b >= lower && b <= upper
}

/// MatchFuncs as described in RFC7983
/// <https://tools.ietf.org/html/rfc7983>
///
/// ```text
///              +----------------+
///              |        [0..3] -+--> forward to STUN
///              |                |
///              |      [16..19] -+--> forward to ZRTP
///              |                |
///  packet -->  |      [20..63] -+--> forward to DTLS
///              |                |
///              |      [64..79] -+--> forward to TURN Channel
///              |                |
///              |    [128..191] -+--> forward to RTP/RTCP
///              +----------------+
/// ```
///
/// match_dtls accepts packets with the first byte in [20..63]
pub fn match_dtls(b: &[u8]) -> bool {
    match_range(20, 63, b)
}

/// match_srtp_or_srtcp accepts packets with the first byte in [128..191]
pub fn match_srtp_or_srtcp(b: &[u8]) -> bool {
    match_range(128, 191, b)
}

/// is_rtcp reports whether the 2nd byte, read as an RTP payload type
/// (marker bit masked off), falls in the band [64, 96) that RFC 5761
/// reserves for RTCP packet types 192..=223.
pub fn is_rtcp(buf: &[u8]) -> bool {
    if buf.len() < 2 {
        return false;
    }

    let payload_type = buf[1] & 0x7F;
    (64..96).contains(&payload_type)
}

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// math_rand_alpha generates a random alphabet sequence of the requested length.
pub fn math_rand_alpha(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA)
}

/// generates a random string from the thread-local CSPRNG.
pub fn generate_crypto_random_string(n: usize, runes: &[u8]) -> String {
    generate_random_string(&mut rng(), n, runes)
}

/// generates a random string of `n` runes drawn from `runes` with the given generator.
pub fn generate_random_string<R: Rng + ?Sized>(rng: &mut R, n: usize, runes: &[u8]) -> String {
    (0..n)
        .map(|_| {
            let idx = rng.random_range(0..runes.len());
            runes[idx] as char
        })
        .collect()
}
