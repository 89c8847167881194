#[derive(Debug, thiserror::Error)]
pub enum CapstatError {
    #[error("malformed frame: {layer} header needs {needed} bytes, got {actual}")]
    MalformedFrame {
        layer: &'static str,
        needed: usize,
        actual: usize,
    },
    #[error("capture session is closed")]
    SessionClosed,
    #[error("final report was already taken for this session")]
    FinalReportTaken,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    InsufficientPermission(String),
    #[error("cannot open capture device: {0}")]
    CaptureDevice(String),
    #[error("capture read error: {0}")]
    CaptureRead(String),
    #[error("pcap file error: {0}")]
    PcapFile(String),
    #[error("output error: {0}")]
    Output(#[source] std::io::Error),
}

impl CapstatError {
    /// True for errors raised while acquiring the capture handle.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPermission(_) | Self::CaptureDevice(_) | Self::PcapFile(_)
        )
    }
}
