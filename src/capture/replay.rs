use std::collections::VecDeque;
use std::time::Duration;

use crate::error::CapstatError;
use crate::packet::{Frame, OwnedFrame};

use super::{CaptureEvent, CaptureSource};

/// In-memory capture source that replays a fixed list of frames.
///
/// After the last frame it either reports end-of-stream or, when configured
/// with [`fail_after`](Self::fail_after), a read error.
pub struct ReplayCapture {
    name: String,
    pending: VecDeque<OwnedFrame>,
    current: Option<OwnedFrame>,
    dropped: u64,
    failure: Option<String>,
    close_count: u32,
}

impl ReplayCapture {
    pub fn new(frames: impl IntoIterator<Item = OwnedFrame>) -> Self {
        Self {
            name: "replay".to_string(),
            pending: frames.into_iter().collect(),
            current: None,
            dropped: 0,
            failure: None,
            close_count: 0,
        }
    }

    /// Drop count the source reports, standing in for capture-layer losses.
    pub fn with_drops(mut self, dropped: u64) -> Self {
        self.dropped = dropped;
        self
    }

    /// Fail with a read error once the frames are exhausted.
    pub fn fail_after(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of times `close` has been called.
    pub fn close_count(&self) -> u32 {
        self.close_count
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl CaptureSource for ReplayCapture {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self, _timeout: Duration) -> Result<CaptureEvent<'_>, CapstatError> {
        if self.close_count > 0 {
            return Err(CapstatError::CaptureRead("replay source is closed".to_string()));
        }
        self.current = self.pending.pop_front();
        match &self.current {
            Some(owned) => Ok(CaptureEvent::Frame(Frame::new(
                &owned.data,
                owned.wire_len,
                owned.timestamp,
            ))),
            None => match &self.failure {
                Some(msg) => Err(CapstatError::CaptureRead(msg.clone())),
                None => Ok(CaptureEvent::EndOfStream),
            },
        }
    }

    fn drop_count(&mut self) -> u64 {
        self.dropped
    }

    fn close(&mut self) {
        self.close_count += 1;
        self.pending.clear();
        self.current = None;
    }
}
