// Frame types and the Ethernet/IPv4 classifier.
//
// Used by every capture source: live AF_PACKET, pcap replay and in-memory replay.
// Reads only the Ethernet header and the fixed 20-byte IPv4 header; ports,
// options and checksums are never inspected.

use std::net::Ipv4Addr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CapstatError;
use crate::model::{Classification, Protocol};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// Ethernet
pub const ETH_HLEN: usize = 14;
const ETHERTYPE_OFFSET: usize = 12;
pub const ETHERTYPE_IPV4: u16 = 0x0800;

// IPv4
pub const IPV4_MIN_HLEN: usize = 20;
const IPV4_PROTO_OFFSET: usize = 9;
const IPV4_SRC_OFFSET: usize = 12;
const IPV4_DST_OFFSET: usize = 16;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A captured link-layer frame borrowed from the capture source.
///
/// `data` holds the captured bytes, which may be shorter than the frame was
/// on the wire when the source truncates to a snap length. `wire_len` is the
/// original length and is what statistics count.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub data: &'a [u8],
    pub wire_len: u32,
    pub timestamp: SystemTime,
}

impl<'a> Frame<'a> {
    pub fn new(data: &'a [u8], wire_len: u32, timestamp: SystemTime) -> Self {
        Self {
            data,
            wire_len,
            timestamp,
        }
    }

    /// Number of bytes actually captured.
    pub fn captured_len(&self) -> usize {
        self.data.len()
    }

    /// Timestamp in microseconds since epoch (0 for pre-epoch clocks).
    pub fn timestamp_us(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

/// Owned counterpart of [`Frame`], used by replay sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFrame {
    pub data: Vec<u8>,
    pub wire_len: u32,
    pub timestamp: SystemTime,
}

impl OwnedFrame {
    /// Frame whose wire length equals its captured length.
    pub fn new(data: Vec<u8>, timestamp: SystemTime) -> Self {
        let wire_len = data.len() as u32;
        Self {
            data,
            wire_len,
            timestamp,
        }
    }

    /// Frame that was truncated on capture: `wire_len` may exceed `data.len()`.
    pub fn truncated(data: Vec<u8>, wire_len: u32, timestamp: SystemTime) -> Self {
        Self {
            data,
            wire_len,
            timestamp,
        }
    }

    pub fn as_frame(&self) -> Frame<'_> {
        Frame::new(&self.data, self.wire_len, self.timestamp)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classifies an Ethernet frame.
///
/// Returns [`Classification::NotIp`] for any EtherType other than IPv4
/// without looking past the Ethernet header. Fails with
/// [`CapstatError::MalformedFrame`] when the frame is shorter than the
/// Ethernet header, or when it claims IPv4 but does not carry a full
/// 20-byte IPv4 header.
pub fn classify(frame: &Frame<'_>) -> Result<Classification, CapstatError> {
    let data = frame.data;
    if data.len() < ETH_HLEN {
        return Err(CapstatError::MalformedFrame {
            layer: "ethernet",
            needed: ETH_HLEN,
            actual: data.len(),
        });
    }

    let ethertype = u16::from_be_bytes([data[ETHERTYPE_OFFSET], data[ETHERTYPE_OFFSET + 1]]);
    if ethertype != ETHERTYPE_IPV4 {
        return Ok(Classification::NotIp);
    }

    let l3 = &data[ETH_HLEN..];
    if l3.len() < IPV4_MIN_HLEN {
        return Err(CapstatError::MalformedFrame {
            layer: "ipv4",
            needed: IPV4_MIN_HLEN,
            actual: l3.len(),
        });
    }

    Ok(Classification::Ipv4 {
        protocol: Protocol::from_number(l3[IPV4_PROTO_OFFSET]),
        src: read_ipv4(l3, IPV4_SRC_OFFSET),
        dst: read_ipv4(l3, IPV4_DST_OFFSET),
    })
}

fn read_ipv4(l3: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(l3[offset], l3[offset + 1], l3[offset + 2], l3[offset + 3])
}

// ===========================================================================
// Unit tests
// ===========================================================================
