//! Common protocol types

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// MAC address (6 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);

    /// Generate a locally administered unicast address of the form
    /// `02:00:xx:xx:xx:xx`.
    pub fn random_local() -> Self {
        let tail: [u8; 4] = rand::random();
        MacAddr([0x02, 0x00, tail[0], tail[1], tail[2], tail[3]])
    }

    pub fn from_slice(slice: &[u8]) -> Self {
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&slice[..6]);
        MacAddr(bytes)
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }

    pub fn is_local_admin(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error type for MAC address parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMacAddrError {
    kind: ParseMacAddrErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseMacAddrErrorKind {
    Length,
    Format,
    Hex,
}

impl fmt::Display for ParseMacAddrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParseMacAddrErrorKind::Length => write!(f, "invalid MAC address length"),
            ParseMacAddrErrorKind::Format => write!(f, "invalid MAC address format"),
            ParseMacAddrErrorKind::Hex => write!(f, "invalid hex digit in MAC address"),
        }
    }
}

impl std::error::Error for ParseMacAddrError {}

impl FromStr for MacAddr {
    type Err = ParseMacAddrError;

    /// Parse a MAC address in `xx:xx:xx:xx:xx:xx` form.
    ///
    /// Each octet is one or two hex digits, so `2:0:0:0:0:1` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets: Vec<&str> = s.split(':').collect();
        if octets.len() != 6 {
            return Err(ParseMacAddrError {
                kind: ParseMacAddrErrorKind::Length,
            });
        }

        let mut result = [0u8; 6];
        for (i, octet) in octets.iter().enumerate() {
            if octet.is_empty() || octet.len() > 2 {
                return Err(ParseMacAddrError {
                    kind: ParseMacAddrErrorKind::Format,
                });
            }
            result[i] = u8::from_str_radix(octet, 16).map_err(|_| ParseMacAddrError {
                kind: ParseMacAddrErrorKind::Hex,
            })?;
        }

        Ok(MacAddr(result))
    }
}

/// Error type for dotted-decimal IPv4 parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIpv4Error(String);

impl fmt::Display for ParseIpv4Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid IPv4 address: {}", self.0)
    }
}

impl std::error::Error for ParseIpv4Error {}

/// Parse a `d.d.d.d` IPv4 literal.
///
/// Exactly four decimal fields are required. Field values are not range
/// checked: anything above 255 wraps modulo 256, so `10.0.0.261` reads as
/// `10.0.0.5`.
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, ParseIpv4Error> {
    let fields: Vec<&str> = s.split('.').collect();
    if fields.len() != 4 {
        return Err(ParseIpv4Error(s.to_string()));
    }

    let mut octets = [0u8; 4];
    for (i, field) in fields.iter().enumerate() {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseIpv4Error(s.to_string()));
        }
        octets[i] = field
            .bytes()
            .fold(0u8, |acc, b| acc.wrapping_mul(10).wrapping_add(b - b'0'));
    }

    Ok(Ipv4Addr::from(octets))
}

/// EtherType values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_addr_broadcast() {
        assert!(MacAddr::BROADCAST.is_multicast());
        assert!(!MacAddr::BROADCAST.is_unicast());
    }

    #[test]
    fn test_mac_addr_multicast() {
        let mac = MacAddr([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]);
        assert_ne!(mac, MacAddr::BROADCAST);
        assert!(mac.is_multicast());
    }

    #[test]
    fn test_mac_addr_display() {
        let mac = MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(format!("{}", mac), "02:11:22:33:44:55");
    }

    #[test]
    fn test_mac_addr_parse() {
        let mac: MacAddr = "aa:BB:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(mac, MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]));
    }

    #[test]
    fn test_mac_addr_parse_short_octets() {
        let mac: MacAddr = "2:0:0:a:b:c".parse().unwrap();
        assert_eq!(mac, MacAddr([0x02, 0x00, 0x00, 0x0a, 0x0b, 0x0c]));
    }

    #[test]
    fn test_mac_addr_parse_rejects_other_separators() {
        assert!("00-11-22-33-44-55".parse::<MacAddr>().is_err());
        assert!("001122334455".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_addr_parse_invalid() {
        assert!("00:11:22:33:44".parse::<MacAddr>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<MacAddr>().is_err());
        assert!("00:11:22:33:44:gg".parse::<MacAddr>().is_err());
        assert!("00:11:22:33:44:555".parse::<MacAddr>().is_err());
        assert!("00:11::33:44:55".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_random_local_mac() {
        let mac = MacAddr::random_local();
        assert_eq!(mac.0[0], 0x02);
        assert_eq!(mac.0[1], 0x00);
        assert!(mac.is_local_admin());
        assert!(mac.is_unicast());
    }

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ipv4("10.0.0.5").unwrap(), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(
            parse_ipv4("192.168.1.254").unwrap(),
            Ipv4Addr::new(192, 168, 1, 254)
        );
    }

    #[test]
    fn test_parse_ipv4_wraps_large_fields() {
        assert_eq!(parse_ipv4("10.0.0.261").unwrap(), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(parse_ipv4("256.0.0.1").unwrap(), Ipv4Addr::new(0, 0, 0, 1));
    }

    #[test]
    fn test_parse_ipv4_invalid() {
        assert!(parse_ipv4("10.0.0").is_err());
        assert!(parse_ipv4("10.0.0.1.2").is_err());
        assert!(parse_ipv4("10.0.x.1").is_err());
        assert!(parse_ipv4("10..0.1").is_err());
        assert!(parse_ipv4("-1.0.0.1").is_err());
    }

    #[test]
    fn test_ethertype_values() {
        assert_eq!(EtherType::Ipv4 as u16, 0x0800);
        assert_eq!(EtherType::Arp as u16, 0x0806);
    }
}
