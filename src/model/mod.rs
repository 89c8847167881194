pub mod report;

use std::net::Ipv4Addr;

use serde::Serialize;

/// IPv4 payload protocol, as carried in the IP header's protocol field.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other(u8),
}

impl Protocol {
    pub fn from_number(proto: u8) -> Self {
        match proto {
            6 => Self::Tcp,
            17 => Self::Udp,
            1 => Self::Icmp,
            other => Self::Other(other),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Tcp => 6,
            Self::Udp => 17,
            Self::Icmp => 1,
            Self::Other(n) => n,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
            Self::Icmp => write!(f, "ICMP"),
            Self::Other(n) => write!(f, "Proto={n}"),
        }
    }
}

/// Coarse label for one link-layer frame.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "network", rename_all = "lowercase")]
pub enum Classification {
    /// EtherType is not IPv4; nothing past the Ethernet header was read.
    #[serde(rename = "not_ip")]
    NotIp,
    Ipv4 {
        protocol: Protocol,
        src: Ipv4Addr,
        dst: Ipv4Addr,
    },
}

impl Classification {
    pub fn is_ip(&self) -> bool {
        matches!(self, Self::Ipv4 { .. })
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotIp => write!(f, "non-IP"),
            Self::Ipv4 { protocol, src, dst } => write!(f, "{src} -> {dst}, {protocol}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_numbers_map_both_ways() {
        for n in 0..=u8::MAX {
            assert_eq!(Protocol::from_number(n).number(), n);
        }
        assert_eq!(Protocol::from_number(6), Protocol::Tcp);
        assert_eq!(Protocol::from_number(17), Protocol::Udp);
        assert_eq!(Protocol::from_number(1), Protocol::Icmp);
        assert_eq!(Protocol::from_number(47), Protocol::Other(47));
    }

    #[test]
    fn protocol_display() {
        assert_eq!(Protocol::Tcp.to_string(), "TCP");
        assert_eq!(Protocol::Udp.to_string(), "UDP");
        assert_eq!(Protocol::Icmp.to_string(), "ICMP");
        assert_eq!(Protocol::Other(47).to_string(), "Proto=47");
    }

    #[test]
    fn classification_display_uses_dotted_decimal() {
        let c = Classification::Ipv4 {
            protocol: Protocol::Udp,
            src: Ipv4Addr::new(192, 168, 1, 10),
            dst: Ipv4Addr::new(8, 8, 8, 8),
        };
        assert_eq!(c.to_string(), "192.168.1.10 -> 8.8.8.8, UDP");
        assert_eq!(Classification::NotIp.to_string(), "non-IP");
    }

    #[test]
    fn classification_serializes_with_network_tag() {
        let c = Classification::Ipv4 {
            protocol: Protocol::Other(47),
            src: Ipv4Addr::new(10, 0, 0, 1),
            dst: Ipv4Addr::new(10, 0, 0, 2),
        };
        let v = serde_json::to_value(c).unwrap();
        assert_eq!(v["network"], "ipv4");
        assert_eq!(v["protocol"]["other"], 47);
        assert_eq!(v["src"], "10.0.0.1");
        assert_eq!(v["dst"], "10.0.0.2");

        let v = serde_json::to_value(Classification::NotIp).unwrap();
        assert_eq!(v["network"], "not_ip");
    }
}
