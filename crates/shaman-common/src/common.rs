//! Print layer shared by every crate in the workspace.
//!
//! Messages go through the `log` facade unless a redirect buffer is active,
//! in which case they are captured verbatim.

use parking_lot::Mutex;

// ============================================================
// Redirect buffer for com_printf
// ============================================================

static RD_BUFFER: Mutex<Option<String>> = Mutex::new(None);

/// Begin redirecting printed output into a buffer.
pub fn com_begin_redirect() {
    *RD_BUFFER.lock() = Some(String::new());
}

/// End redirect and return the captured output.
pub fn com_end_redirect() -> Option<String> {
    RD_BUFFER.lock().take()
}

/// Append to the redirect buffer. Returns false when no redirect is active.
fn redirect(msg: &str) -> bool {
    let mut buf = RD_BUFFER.lock();
    match *buf {
        Some(ref mut s) => {
            s.push_str(msg);
            true
        }
        None => false,
    }
}

// ============================================================
// com_printf / com_dprintf / com_warnf / com_errorf
// ============================================================

/// General-purpose print.
pub fn com_printf(msg: &str) {
    if redirect(msg) {
        return;
    }
    log::info!("{}", msg.trim_end());
}

/// Developer-only print. Emitted at debug level.
pub fn com_dprintf(msg: &str) {
    if redirect(msg) {
        return;
    }
    log::debug!("{}", msg.trim_end());
}

/// Recoverable problem the caller should know about.
pub fn com_warnf(msg: &str) {
    if redirect(msg) {
        return;
    }
    log::warn!("{}", msg.trim_end());
}

/// Failure of a requested operation. The caller gets the error back as well.
pub fn com_errorf(msg: &str) {
    if redirect(msg) {
        return;
    }
    log::error!("{}", msg.trim_end());
}
