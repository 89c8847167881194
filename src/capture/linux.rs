// Linux capture implementation: AF_PACKET raw socket.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::{Duration, Instant, SystemTime};

use crate::error::CapstatError;
use crate::packet::Frame;

use super::{CaptureEvent, CaptureSource, Direction, LiveConfig};

// ---------------------------------------------------------------------------
// AF_PACKET constants
// ---------------------------------------------------------------------------

const ETH_P_ALL: u16 = 0x0003;
const SOL_PACKET: i32 = 263;
const PACKET_ADD_MEMBERSHIP: i32 = 1;
const PACKET_STATISTICS: i32 = 6;
const PACKET_MR_PROMISC: u16 = 1;
const PACKET_OUTGOING: u8 = 4;

#[repr(C)]
#[allow(non_camel_case_types)]
struct packet_mreq {
    mr_ifindex: i32,
    mr_type: u16,
    mr_alen: u16,
    mr_address: [u8; 8],
}

#[repr(C)]
#[derive(Default)]
#[allow(non_camel_case_types)]
struct tpacket_stats {
    tp_packets: u32,
    tp_drops: u32,
}

/// AF_PACKET capture device.
pub struct AfPacketCapture {
    fd: Option<OwnedFd>,
    buffer: Vec<u8>,
    interface: String,
    direction: Direction,
    kernel_received: u64,
    kernel_dropped: u64,
}

impl AfPacketCapture {
    /// Create a new AF_PACKET capture device bound to `config.interface`.
    pub fn new(config: &LiveConfig) -> Result<Self, CapstatError> {
        let interface = config.interface.as_str();

        // 1. Create raw socket
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (ETH_P_ALL as u32).to_be() as i32,
            )
        };
        if fd < 0 {
            return Err(CapstatError::CaptureDevice(format!(
                "socket(AF_PACKET) failed: {}",
                io::Error::last_os_error()
            )));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        // 2. Get interface index
        let if_index = if_nametoindex(interface)?;

        // 3. Bind to interface
        let mut sll: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        #[allow(clippy::unnecessary_cast)]
        {
            sll.sll_protocol = (ETH_P_ALL as u16).to_be();
        }
        sll.sll_ifindex = if_index as i32;

        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(CapstatError::CaptureDevice(format!(
                "bind(AF_PACKET, {}) failed: {}",
                interface,
                io::Error::last_os_error()
            )));
        }

        // 4. Enable promiscuous mode
        if config.promiscuous {
            let mreq = packet_mreq {
                mr_ifindex: if_index as i32,
                mr_type: PACKET_MR_PROMISC,
                mr_alen: 0,
                mr_address: [0u8; 8],
            };
            let ret = unsafe {
                libc::setsockopt(
                    fd.as_raw_fd(),
                    SOL_PACKET,
                    PACKET_ADD_MEMBERSHIP,
                    &mreq as *const packet_mreq as *const libc::c_void,
                    std::mem::size_of::<packet_mreq>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                log::warn!(
                    "PACKET_MR_PROMISC failed on {}: {} (continuing without promiscuous mode)",
                    interface,
                    io::Error::last_os_error()
                );
            }
        }

        let buffer = vec![0u8; config.snaplen.max(64) as usize];

        log::info!(
            "AF_PACKET capture on {} (if_index={}, snaplen={}, promisc={}, direction={:?})",
            interface,
            if_index,
            buffer.len(),
            config.promiscuous,
            config.direction
        );

        let mut cap = Self {
            fd: Some(fd),
            buffer,
            interface: interface.to_string(),
            direction: config.direction,
            kernel_received: 0,
            kernel_dropped: 0,
        };
        // Reading PACKET_STATISTICS resets the kernel counters; start from zero.
        cap.poll_kernel_stats();
        cap.kernel_received = 0;
        cap.kernel_dropped = 0;
        Ok(cap)
    }

    fn wants(&self, pkttype: u8) -> bool {
        match self.direction {
            Direction::Both => true,
            Direction::Rx => pkttype != PACKET_OUTGOING,
            Direction::Tx => pkttype == PACKET_OUTGOING,
        }
    }

    /// Fold the kernel's since-last-read counters into the running totals.
    fn poll_kernel_stats(&mut self) {
        let Some(fd) = self.fd.as_ref() else {
            return;
        };
        let mut st = tpacket_stats::default();
        let mut len = std::mem::size_of::<tpacket_stats>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockopt(
                fd.as_raw_fd(),
                SOL_PACKET,
                PACKET_STATISTICS,
                &mut st as *mut tpacket_stats as *mut libc::c_void,
                &mut len,
            )
        };
        if ret < 0 {
            log::warn!(
                "PACKET_STATISTICS failed on {}: {}",
                self.interface,
                io::Error::last_os_error()
            );
            return;
        }
        self.kernel_received += u64::from(st.tp_packets);
        self.kernel_dropped += u64::from(st.tp_drops);
    }
}

impl CaptureSource for AfPacketCapture {
    fn name(&self) -> &str {
        &self.interface
    }

    /// Blocking read of one frame, bounded by `timeout`.
    ///
    /// Frames filtered out by direction do not end the wait; the call keeps
    /// reading until a wanted frame arrives or the deadline passes.
    fn next_frame(&mut self, timeout: Duration) -> Result<CaptureEvent<'_>, CapstatError> {
        let deadline = Instant::now() + timeout;
        loop {
            let fd = match self.fd.as_ref() {
                Some(fd) => fd.as_raw_fd(),
                None => {
                    return Err(CapstatError::CaptureRead(format!(
                        "capture on {} is closed",
                        self.interface
                    )))
                }
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if !wait_readable(fd, remaining, &self.interface)? {
                return Ok(CaptureEvent::Timeout);
            }

            let mut sll: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
            let mut sll_len = std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
            // MSG_TRUNC makes recvfrom return the full frame length even when
            // the buffer only holds the first snaplen bytes.
            let n = unsafe {
                libc::recvfrom(
                    fd,
                    self.buffer.as_mut_ptr() as *mut libc::c_void,
                    self.buffer.len(),
                    libc::MSG_TRUNC | libc::MSG_DONTWAIT,
                    &mut sll as *mut libc::sockaddr_ll as *mut libc::sockaddr,
                    &mut sll_len,
                )
            };

            if n < 0 {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EAGAIN) | Some(libc::EINTR) => {
                        if Instant::now() >= deadline {
                            return Ok(CaptureEvent::Timeout);
                        }
                        continue;
                    }
                    _ => {
                        return Err(CapstatError::CaptureRead(format!(
                            "recvfrom on {} failed: {}",
                            self.interface, err
                        )))
                    }
                }
            }

            if !self.wants(sll.sll_pkttype) {
                continue;
            }

            let wire_len = n as usize;
            let captured = wire_len.min(self.buffer.len());
            return Ok(CaptureEvent::Frame(Frame::new(
                &self.buffer[..captured],
                wire_len as u32,
                SystemTime::now(),
            )));
        }
    }

    fn drop_count(&mut self) -> u64 {
        self.poll_kernel_stats();
        self.kernel_dropped
    }

    fn close(&mut self) {
        self.poll_kernel_stats();
        if self.fd.take().is_some() {
            log::info!(
                "AF_PACKET {} closed: kernel_recv={}, kernel_drop={}",
                self.interface,
                self.kernel_received,
                self.kernel_dropped
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check that we have raw socket access on Linux.
pub fn check_capture_access() -> Result<(), CapstatError> {
    // Root always has access
    if unsafe { libc::getuid() } == 0 {
        return Ok(());
    }

    // Try to open a test socket to check capabilities
    let fd = unsafe {
        libc::socket(
            libc::AF_PACKET,
            libc::SOCK_RAW,
            (ETH_P_ALL as u32).to_be() as i32,
        )
    };
    if fd >= 0 {
        unsafe { libc::close(fd) };
        return Ok(());
    }

    Err(CapstatError::InsufficientPermission(
        "capstat requires raw socket access. Either:\n  \
         1. Run with sudo: sudo capstat <interface>\n  \
         2. Grant the capability: sudo setcap cap_net_raw,cap_net_admin=eip $(which capstat)"
            .to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn if_nametoindex(name: &str) -> Result<u32, CapstatError> {
    let c_name = std::ffi::CString::new(name)
        .map_err(|_| CapstatError::CaptureDevice("invalid interface name".to_string()))?;
    let idx = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if idx == 0 {
        return Err(CapstatError::CaptureDevice(format!(
            "if_nametoindex({}) failed: {}",
            name,
            io::Error::last_os_error()
        )));
    }
    Ok(idx)
}

/// Wait until `fd` is readable. Returns `false` on timeout or signal interruption.
fn wait_readable(fd: RawFd, timeout: Duration, interface: &str) -> Result<bool, CapstatError> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
    let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if ret < 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            return Ok(false);
        }
        return Err(CapstatError::CaptureRead(format!(
            "poll on {} failed: {}",
            interface, err
        )));
    }
    if ret == 0 {
        return Ok(false);
    }
    if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
        return Err(CapstatError::CaptureRead(format!(
            "poll on {} reported socket error (revents={:#x})",
            interface, pfd.revents
        )));
    }
    Ok(true)
}
