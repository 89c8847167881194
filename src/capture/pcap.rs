use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, Linktype, PcapBlockOwned, PcapError};

use crate::error::CapstatError;
use crate::packet::Frame;

use super::{CaptureEvent, CaptureSource};

const READ_BUFFER_SIZE: usize = 65536;
/// Upper bound for the reader buffer; a record larger than this is rejected.
const MAX_READ_BUFFER_SIZE: usize = 64 * 1024 * 1024;
/// Per-record header in a classic pcap file.
const RECORD_HEADER_LEN: usize = 16;

/// Replays frames from a classic (libpcap) capture file.
///
/// Only Ethernet link type is accepted. Reaching the end of the file is
/// reported as end-of-stream.
pub struct PcapFileCapture {
    path: PathBuf,
    name: String,
    reader: Option<LegacyPcapReader<File>>,
    capacity: usize,
    nanosecond: bool,
    buffer: Vec<u8>,
    wire_len: u32,
    timestamp: SystemTime,
    records: u64,
}

/// Owned data pulled out of one pcap block, so the reader can be advanced.
enum Block {
    Header {
        linktype: Linktype,
        nanosecond: bool,
        snaplen: u32,
    },
    Record { ts_sec: u32, ts_frac: u32, origlen: u32 },
    Skip,
}

impl PcapFileCapture {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CapstatError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .map_err(|e| CapstatError::PcapFile(format!("open {}: {e}", path.display())))?;
        let reader = LegacyPcapReader::new(READ_BUFFER_SIZE, file)
            .map_err(|e| CapstatError::PcapFile(format!("{}: {e:?}", path.display())))?;

        log::info!("replaying pcap file {}", path.display());

        Ok(Self {
            name: path.display().to_string(),
            path,
            reader: Some(reader),
            capacity: READ_BUFFER_SIZE,
            nanosecond: false,
            buffer: Vec::new(),
            wire_len: 0,
            timestamp: UNIX_EPOCH,
            records: 0,
        })
    }

    /// Records delivered so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    fn record_time(&self, ts_sec: u32, ts_frac: u32) -> SystemTime {
        let frac = if self.nanosecond {
            Duration::from_nanos(u64::from(ts_frac))
        } else {
            Duration::from_micros(u64::from(ts_frac))
        };
        UNIX_EPOCH + Duration::from_secs(u64::from(ts_sec)) + frac
    }
}

impl CaptureSource for PcapFileCapture {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self, _timeout: Duration) -> Result<CaptureEvent<'_>, CapstatError> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                return Err(CapstatError::CaptureRead(format!(
                    "pcap file {} is closed",
                    self.path.display()
                )));
            };

            let (offset, block) = match reader.next() {
                Ok((offset, block)) => (offset, take_block(block, &mut self.buffer)),
                Err(PcapError::Eof) => return Ok(CaptureEvent::EndOfStream),
                Err(PcapError::BufferTooSmall) => {
                    let wanted = self.capacity.saturating_mul(2);
                    if wanted > MAX_READ_BUFFER_SIZE || !reader.grow(wanted) {
                        return Err(CapstatError::CaptureRead(format!(
                            "{}: record larger than {} bytes",
                            self.path.display(),
                            self.capacity
                        )));
                    }
                    log::debug!("pcap read buffer grown to {wanted} bytes");
                    self.capacity = wanted;
                    reader.refill().map_err(|e| {
                        CapstatError::CaptureRead(format!("{}: {e:?}", self.path.display()))
                    })?;
                    continue;
                }
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| {
                        CapstatError::CaptureRead(format!("{}: {e:?}", self.path.display()))
                    })?;
                    continue;
                }
                Err(e) => {
                    return Err(CapstatError::CaptureRead(format!(
                        "{}: {e:?}",
                        self.path.display()
                    )))
                }
            };
            reader.consume(offset);

            match block {
                Block::Header {
                    linktype,
                    nanosecond,
                    snaplen,
                } => {
                    if linktype != Linktype::ETHERNET {
                        return Err(CapstatError::PcapFile(format!(
                            "{}: unsupported link type {:?}, only Ethernet is supported",
                            self.path.display(),
                            linktype
                        )));
                    }
                    self.nanosecond = nanosecond;
                    // Fit one full-snaplen record up front.
                    let wanted = (snaplen as usize)
                        .saturating_add(RECORD_HEADER_LEN)
                        .min(MAX_READ_BUFFER_SIZE);
                    if wanted > self.capacity && reader.grow(wanted) {
                        self.capacity = wanted;
                    }
                }
                Block::Record {
                    ts_sec,
                    ts_frac,
                    origlen,
                } => {
                    self.records += 1;
                    self.wire_len = origlen.max(self.buffer.len() as u32);
                    self.timestamp = self.record_time(ts_sec, ts_frac);
                    return Ok(CaptureEvent::Frame(Frame::new(
                        &self.buffer,
                        self.wire_len,
                        self.timestamp,
                    )));
                }
                Block::Skip => {}
            }
        }
    }

    fn drop_count(&mut self) -> u64 {
        0
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            log::info!(
                "pcap file {} closed after {} records",
                self.path.display(),
                self.records
            );
        }
    }
}

/// Copy what we need out of a borrowed block. Record data lands in `buffer`.
fn take_block(block: PcapBlockOwned<'_>, buffer: &mut Vec<u8>) -> Block {
    match block {
        PcapBlockOwned::LegacyHeader(header) => Block::Header {
            linktype: header.network,
            nanosecond: header.is_nanosecond_precision(),
            snaplen: header.snaplen,
        },
        PcapBlockOwned::Legacy(record) => {
            buffer.clear();
            buffer.extend_from_slice(record.data);
            Block::Record {
                ts_sec: record.ts_sec,
                ts_frac: record.ts_usec,
                origlen: record.origlen,
            }
        }
        PcapBlockOwned::NG(_) => Block::Skip,
    }
}
