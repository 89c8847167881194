// Capture sources feeding the session loop.
//
// On Linux: live AF_PACKET raw socket (see linux.rs).
// Everywhere: classic pcap file replay and in-memory replay.
//
// All sources export the same contract through `CaptureSource`:
//   - next_frame(timeout) -> Frame | Timeout | EndOfStream | error
//   - drop_count()        -> frames the capture layer lost
//   - close()             -> release the handle

use std::time::Duration;

use crate::error::CapstatError;
use crate::packet::Frame;

mod pcap;
mod replay;

pub use pcap::PcapFileCapture;
pub use replay::ReplayCapture;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;

/// Outcome of one read from a capture source.
#[derive(Debug, Clone, Copy)]
pub enum CaptureEvent<'a> {
    Frame(Frame<'a>),
    /// Nothing arrived within the timeout, or the wait was interrupted.
    Timeout,
    /// The source has no more frames.
    EndOfStream,
}

/// A source of captured link-layer frames.
pub trait CaptureSource {
    /// Interface name or file path, for logs.
    fn name(&self) -> &str;

    /// Wait up to `timeout` for the next frame. Errors are fatal for the session.
    fn next_frame(&mut self, timeout: Duration) -> Result<CaptureEvent<'_>, CapstatError>;

    /// Total frames dropped by the capture layer so far.
    fn drop_count(&mut self) -> u64;

    /// Release the capture handle.
    fn close(&mut self);
}

impl<S: CaptureSource + ?Sized> CaptureSource for &mut S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_frame(&mut self, timeout: Duration) -> Result<CaptureEvent<'_>, CapstatError> {
        (**self).next_frame(timeout)
    }

    fn drop_count(&mut self) -> u64 {
        (**self).drop_count()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_frame(&mut self, timeout: Duration) -> Result<CaptureEvent<'_>, CapstatError> {
        (**self).next_frame(timeout)
    }

    fn drop_count(&mut self) -> u64 {
        (**self).drop_count()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Which frames a live capture keeps, relative to the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Frames received by this host.
    Rx,
    /// Frames sent by this host.
    Tx,
    #[default]
    Both,
}

/// Settings for opening a live capture.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub interface: String,
    /// Bytes kept per frame; longer frames are truncated but keep their wire length.
    pub snaplen: u32,
    pub promiscuous: bool,
    pub direction: Direction,
}

impl LiveConfig {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            snaplen: DEFAULT_SNAPLEN,
            promiscuous: true,
            direction: Direction::Both,
        }
    }
}

pub const DEFAULT_SNAPLEN: u32 = 1536;

/// Open a live capture on the configured interface.
#[cfg(target_os = "linux")]
pub fn open_live(config: &LiveConfig) -> Result<Box<dyn CaptureSource>, CapstatError> {
    check_capture_access()?;
    let cap = AfPacketCapture::new(config)?;
    Ok(Box::new(cap))
}

#[cfg(not(target_os = "linux"))]
pub fn open_live(config: &LiveConfig) -> Result<Box<dyn CaptureSource>, CapstatError> {
    Err(CapstatError::CaptureDevice(format!(
        "live capture on {} requires Linux AF_PACKET; use --read to replay a pcap file",
        config.interface
    )))
}
