use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Cooperative cancellation flag shared between a signal handler and the
/// capture loop. The loop checks it once per iteration.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Token that SIGINT/SIGTERM flip. Set once by `install_signal_handlers`.
static SIGNAL_TOKEN: OnceLock<ShutdownToken> = OnceLock::new();

extern "C" fn signal_handler(_sig: libc::c_int) {
    // Only an atomic store happens here.
    if let Some(token) = SIGNAL_TOKEN.get() {
        token.request();
    }
}

/// Route SIGINT and SIGTERM to `token`.
///
/// Only the first token passed in is wired; later calls keep the original.
pub fn install_signal_handlers(token: &ShutdownToken) {
    if SIGNAL_TOKEN.set(token.clone()).is_err() {
        log::warn!("signal handlers already installed; keeping the first shutdown token");
        return;
    }
    unsafe {
        libc::signal(
            libc::SIGTERM,
            signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            signal_handler as *const () as libc::sighandler_t,
        );
    }
}
