use dtls::Fingerprint;
use shared::error::{Error, Result};
use std::fmt::Write;
use std::net::IpAddr;

/// RFC 8445 host candidate priority for component 1:
/// `(2^24) * 126 + (2^8) * 65535 + (256 - 1)`.
pub const HOST_CANDIDATE_PRIORITY: u32 = (1 << 24) * 126 + (1 << 8) * 65535 + 255;

/// Bytes of the answer template outside its substituted fields.
const TEMPLATE_TEXT_LEN: usize = 445;

const MAX_ADDRTYPE_LEN: usize = 3;
const MAX_IP_LEN: usize = 39;
const MAX_PORT_LEN: usize = 5;
const MAX_PAYLOAD_TYPE_LEN: usize = 3;
const MAX_U32_LEN: usize = 10;
/// RFC 8839 bounds ice-ufrag and ice-pwd to 256 characters.
const MAX_ICE_CREDENTIAL_LEN: usize = 256;
/// `sha-512` followed by 64 colon separated hex bytes.
const MAX_FINGERPRINT_LEN: usize = 7 + 1 + 64 * 3 - 1;

/// Largest answer the field set can produce; anything longer is an error.
pub const MAX_SDP_ANSWER_SIZE: usize = TEMPLATE_TEXT_LEN
    + 2 * MAX_ADDRTYPE_LEN
    + 3 * MAX_IP_LEN
    + 2 * MAX_PORT_LEN
    + 2 * MAX_PAYLOAD_TYPE_LEN
    + 2 * MAX_ICE_CREDENTIAL_LEN
    + MAX_FINGERPRINT_LEN
    + 5 * MAX_U32_LEN;

/// The fields of a local SDP answer offering one send-only H264 video
/// section over a single host candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpAnswer {
    pub ip: IpAddr,
    pub port: u16,
    pub payload_type: u8,
    pub ssrc: u32,
    pub ice_ufrag: String,
    pub ice_pwd: String,
    pub fingerprint: Fingerprint,
}

impl SdpAnswer {
    /// Renders the answer text with CRLF line endings.
    pub fn render(&self) -> Result<String> {
        let addrtype = match self.ip {
            IpAddr::V4(_) => "IP4",
            IpAddr::V6(_) => "IP6",
        };
        let ip = self.ip;
        let port = self.port;
        let pt = self.payload_type;
        let ssrc = self.ssrc;
        let ufrag = &self.ice_ufrag;
        let pwd = &self.ice_pwd;
        let fingerprint = &self.fingerprint;
        let priority = HOST_CANDIDATE_PRIORITY;

        let mut sdp = String::with_capacity(1024);
        write!(
            sdp,
            "v=0\r\n\
             o=- 1495799811084970 1495799811084970 IN {addrtype} {ip}\r\n\
             s=Streaming Test\r\n\
             t=0 0\r\n\
             a=group:BUNDLE video\r\n\
             a=msid-semantic: WMS janus\r\n\
             m=video {port} RTP/SAVPF {pt}\r\n\
             c=IN {addrtype} {ip}\r\n\
             a=mid:video\r\n\
             a=sendonly\r\n\
             a=rtcp-mux\r\n\
             a=ice-ufrag:{ufrag}\r\n\
             a=ice-pwd:{pwd}\r\n\
             a=ice-options:trickle\r\n\
             a=fingerprint:{fingerprint}\r\n\
             a=setup:actpass\r\n\
             a=connection:new\r\n\
             a=rtpmap:{pt} H264/90000\r\n\
             a=ssrc:{ssrc} cname:janusvideo\r\n\
             a=ssrc:{ssrc} msid:janus janusv0\r\n\
             a=ssrc:{ssrc} mslabel:janus\r\n\
             a=ssrc:{ssrc} label:janusv0\r\n\
             a=candidate:4 1 udp {priority} {ip} {port} typ host\r\n"
        )?;

        if sdp.len() > MAX_SDP_ANSWER_SIZE {
            return Err(Error::ErrSdpAnswerTooLarge(sdp.len(), MAX_SDP_ANSWER_SIZE));
        }

        Ok(sdp)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dtls::FingerprintAlgorithm;

    const FINGERPRINT: &str = "ba:78:16:bf:8f:01:cf:ea:41:41:40:de:5d:ae:22:23:\
                               b0:03:61:a3:96:17:7a:9c:b4:10:ff:61:f2:00:15:ad";

    fn answer() -> SdpAnswer {
        SdpAnswer {
            ip: "192.0.2.10".parse().unwrap(),
            port: 40000,
            payload_type: 96,
            ssrc: 1234,
            ice_ufrag: "abcd".to_owned(),
            ice_pwd: "0123456789abcdefghijklmn".to_owned(),
            fingerprint: Fingerprint {
                algorithm: FingerprintAlgorithm::Sha256,
                value: FINGERPRINT.to_owned(),
            },
        }
    }

    #[test]
    fn test_host_candidate_priority() {
        assert_eq!(HOST_CANDIDATE_PRIORITY, 2130706431);
    }

    #[test]
    fn test_render_answer() -> Result<()> {
        let expected = concat!(
            "v=0\r\n",
            "o=- 1495799811084970 1495799811084970 IN IP4 192.0.2.10\r\n",
            "s=Streaming Test\r\n",
            "t=0 0\r\n",
            "a=group:BUNDLE video\r\n",
            "a=msid-semantic: WMS janus\r\n",
            "m=video 40000 RTP/SAVPF 96\r\n",
            "c=IN IP4 192.0.2.10\r\n",
            "a=mid:video\r\n",
            "a=sendonly\r\n",
            "a=rtcp-mux\r\n",
            "a=ice-ufrag:abcd\r\n",
            "a=ice-pwd:0123456789abcdefghijklmn\r\n",
            "a=ice-options:trickle\r\n",
            "a=fingerprint:sha-256 ba:78:16:bf:8f:01:cf:ea:41:41:40:de:5d:ae:22:23:",
            "b0:03:61:a3:96:17:7a:9c:b4:10:ff:61:f2:00:15:ad\r\n",
            "a=setup:actpass\r\n",
            "a=connection:new\r\n",
            "a=rtpmap:96 H264/90000\r\n",
            "a=ssrc:1234 cname:janusvideo\r\n",
            "a=ssrc:1234 msid:janus janusv0\r\n",
            "a=ssrc:1234 mslabel:janus\r\n",
            "a=ssrc:1234 label:janusv0\r\n",
            "a=candidate:4 1 udp 2130706431 192.0.2.10 40000 typ host\r\n",
        );

        let sdp = answer().render()?;
        assert_eq!(sdp, expected);
        assert!(sdp.len() <= MAX_SDP_ANSWER_SIZE);

        Ok(())
    }

    #[test]
    fn test_render_ipv6_answer() -> Result<()> {
        let mut answer = answer();
        answer.ip = "2001:db8::1".parse().unwrap();

        let sdp = answer.render()?;
        assert!(sdp.contains("o=- 1495799811084970 1495799811084970 IN IP6 2001:db8::1\r\n"));
        assert!(sdp.contains("c=IN IP6 2001:db8::1\r\n"));
        assert!(sdp.contains("a=candidate:4 1 udp 2130706431 2001:db8::1 40000 typ host\r\n"));

        Ok(())
    }

    #[test]
    fn test_render_largest_answer_fits() -> Result<()> {
        let answer = SdpAnswer {
            ip: "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff".parse().unwrap(),
            port: u16::MAX,
            payload_type: u8::MAX,
            ssrc: u32::MAX,
            ice_ufrag: "u".repeat(MAX_ICE_CREDENTIAL_LEN),
            ice_pwd: "p".repeat(MAX_ICE_CREDENTIAL_LEN),
            fingerprint: Fingerprint::of_der(FingerprintAlgorithm::Sha512, b"certificate"),
        };

        let sdp = answer.render()?;
        assert_eq!(sdp.len(), MAX_SDP_ANSWER_SIZE);

        Ok(())
    }

    #[test]
    fn test_render_oversized_answer_is_error() {
        let mut answer = answer();
        answer.ice_pwd = "p".repeat(MAX_SDP_ANSWER_SIZE);

        let result = answer.render();
        assert!(
            matches!(result, Err(Error::ErrSdpAnswerTooLarge(len, max)) if len > max && max == MAX_SDP_ANSWER_SIZE),
            "{result:?}"
        );
    }
}
