//! Developer-level benchmark lines ("dev6") with a per-thread capture buffer.
//!
//! Store finds and gateway searches emit one JSON line each through [`dev6!`].
//! Lines always go to the `mongo_search::dev6` log target at TRACE; when a test
//! has called [`enable_thread_sink`] they are also kept in memory for that
//! thread only, so parallel tests never see each other's lines.

use std::cell::RefCell;

thread_local! {
    static CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Stops capturing on the owning thread when dropped.
#[must_use = "capture stops as soon as the guard is dropped"]
pub struct DevSinkGuard;

impl Drop for DevSinkGuard {
    fn drop(&mut self) {
        CAPTURE.with(|c| *c.borrow_mut() = None);
    }
}

pub fn enable_thread_sink() -> DevSinkGuard {
    CAPTURE.with(|c| *c.borrow_mut() = Some(Vec::new()));
    DevSinkGuard
}

#[doc(hidden)]
pub fn write_str(msg: &str) {
    CAPTURE.with(|c| {
        if let Some(lines) = c.borrow_mut().as_mut() {
            lines.push(msg.to_owned());
        }
    });
}

/// Takes every captured line, leaving the buffer empty.
pub fn drain() -> Vec<String> {
    CAPTURE.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Captured lines whose `"op"` field equals `op`, without clearing the buffer.
pub fn lines_for_op(op: &str) -> Vec<String> {
    let needle = format!("\"op\":\"{op}\"");
    CAPTURE.with(|c| {
        c.borrow()
            .as_ref()
            .map(|lines| lines.iter().filter(|l| l.contains(&needle)).cloned().collect())
            .unwrap_or_default()
    })
}

#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __line = format!($($arg)*);
        $crate::utils::devlog::write_str(&__line);
        log::log!(target: "mongo_search::dev6", log::Level::Trace, "{}", __line);
    }};
}
