use crate::attributes::*;
use crate::message::*;
use shared::error::*;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const FAMILY_IPV4: u16 = 0x01;
const FAMILY_IPV6: u16 = 0x02;
const IPV4LEN: usize = 4;
const IPV6LEN: usize = 16;

/// XorMappedAddress implements XOR-MAPPED-ADDRESS attribute.
///
/// RFC 5389 Section 15.2
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct XorMappedAddress {
    pub ip: IpAddr,
    pub port: u16,
}

impl Default for XorMappedAddress {
    fn default() -> Self {
        XorMappedAddress {
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
        }
    }
}

impl fmt::Display for XorMappedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V4(_) => write!(f, "{}:{}", self.ip, self.port),
            IpAddr::V6(_) => write!(f, "[{}]:{}", self.ip, self.port),
        }
    }
}

impl Setter for XorMappedAddress {
    /// add_to adds XOR-MAPPED-ADDRESS to m. Can return ErrBadIPLength
    /// if len(a.IP) is invalid.
    fn add_to(&self, m: &mut Message) -> Result<()> {
        self.add_to_as(m, ATTR_XORMAPPED_ADDRESS)
    }
}

impl Getter for XorMappedAddress {
    /// get_from decodes XOR-MAPPED-ADDRESS attribute in message and returns
    /// error if any. While decoding, a.IP is reused if possible and can be
    /// rendered to invalid state (e.g. if a.IP was set to IPv6 and then
    /// IPv4 value were decoded into it), be careful.
    fn get_from(&mut self, m: &Message) -> Result<()> {
        self.get_from_as(m, ATTR_XORMAPPED_ADDRESS)
    }
}

impl XorMappedAddress {
    fn xor_value(transaction_id: &TransactionId) -> [u8; IPV6LEN] {
        let mut xor_value = [0u8; IPV6LEN];
        xor_value[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
        xor_value[4..].copy_from_slice(&transaction_id.0);
        xor_value
    }

    /// add_to_as adds XOR-MAPPED-ADDRESS value to m as t attribute.
    pub fn add_to_as(&self, m: &mut Message, t: AttrType) -> Result<()> {
        let (family, ip): (u16, Vec<u8>) = match self.ip {
            IpAddr::V4(ipv4) => (FAMILY_IPV4, ipv4.octets().to_vec()),
            IpAddr::V6(ipv6) => (FAMILY_IPV6, ipv6.octets().to_vec()),
        };

        let mut value = vec![0; 4 + ip.len()];
        value[0..2].copy_from_slice(&family.to_be_bytes());
        value[2..4].copy_from_slice(&(self.port ^ (MAGIC_COOKIE >> 16) as u16).to_be_bytes());
        let xor_value = Self::xor_value(&m.transaction_id);
        for (i, b) in ip.iter().enumerate() {
            value[4 + i] = b ^ xor_value[i];
        }
        m.add(t, &value);
        Ok(())
    }

    /// get_from_as decodes XOR-MAPPED-ADDRESS attribute value in message
    /// getting it as for t type.
    pub fn get_from_as(&mut self, m: &Message, t: AttrType) -> Result<()> {
        let v = m.get(t)?;
        if v.len() <= 4 {
            return Err(Error::ErrUnexpectedEof);
        }

        let family = u16::from_be_bytes([v[0], v[1]]);
        let ip_len = match family {
            FAMILY_IPV4 => IPV4LEN,
            FAMILY_IPV6 => IPV6LEN,
            _ => {
                return Err(Error::ErrUnexpectedAttributeValue(format!(
                    "bad value {family}"
                )));
            }
        };
        if v[4..].len() != ip_len {
            return Err(Error::ErrBadIpLength);
        }

        self.port = u16::from_be_bytes([v[2], v[3]]) ^ (MAGIC_COOKIE >> 16) as u16;
        let xor_value = Self::xor_value(&m.transaction_id);
        let mut ip = [0u8; IPV6LEN];
        for i in 0..ip_len {
            ip[i] = v[4 + i] ^ xor_value[i];
        }
        self.ip = if ip_len == IPV4LEN {
            IpAddr::V4(Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]))
        } else {
            IpAddr::V6(Ipv6Addr::from(ip))
        };

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_xor_mapped_address_rfc5769_ipv4() -> Result<()> {
        let mut m = Message::new();
        m.transaction_id = TransactionId([
            0xb7, 0xe7, 0xa7, 0x01, 0xbc, 0x34, 0xd6, 0x86, 0xfa, 0x87, 0xdf, 0xae,
        ]);
        m.write_header();
        let addr = XorMappedAddress {
            ip: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            port: 32853,
        };
        addr.add_to(&mut m)?;
        assert_eq!(
            &m.raw[MESSAGE_HEADER_SIZE..],
            &[0x00, 0x20, 0x00, 0x08, 0x00, 0x01, 0xa1, 0x47, 0xe1, 0x12, 0xa6, 0x43]
        );

        let mut got = XorMappedAddress::default();
        got.get_from(&m)?;
        assert_eq!(got, addr);
        assert_eq!(got.to_string(), "192.0.2.1:32853");
        Ok(())
    }

    #[test]
    fn test_xor_mapped_address_ipv6() -> Result<()> {
        let mut m = Message::new();
        m.new_transaction_id()?;
        m.write_header();
        let addr = XorMappedAddress {
            ip: "2001:db8:1234:5678:11:2233:4455:6677".parse()?,
            port: 32853,
        };
        addr.add_to(&mut m)?;

        let mut decoded = Message::new();
        decoded.unmarshal_binary(&m.raw)?;
        let mut got = XorMappedAddress::default();
        got.get_from(&decoded)?;
        assert_eq!(got, addr);
        Ok(())
    }

    #[test]
    fn test_xor_mapped_address_bad_length() {
        let mut m = Message::new();
        m.write_header();
        m.add(ATTR_XORMAPPED_ADDRESS, &[0x00, 0x01, 0x01, 0x02, 0x03]);
        let mut got = XorMappedAddress::default();
        assert_eq!(got.get_from(&m), Err(Error::ErrBadIpLength));

        let mut m = Message::new();
        m.write_header();
        m.add(ATTR_XORMAPPED_ADDRESS, &[0x00, 0x01, 0x01]);
        assert_eq!(got.get_from(&m), Err(Error::ErrUnexpectedEof));
    }
}
