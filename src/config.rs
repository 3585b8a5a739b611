//! Runtime configuration for devices and volumes.
//!
//! The original implementation kept a process-global `adfEnv` of function
//! pointers (verbose/warning/error callbacks, a read/write access trace
//! hook, a progress bar callback). Global mutable callback state does not
//! fit a library used from multiple threads or tests, so this crate passes
//! a `Config` value explicitly into [`crate::device::Device::open`] and
//! [`crate::device::Device::create`] instead.

/// Access direction reported to [`Config::trace`], mirroring the original's
/// read/write access trace hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// A block was read.
    Read,
    /// A block was written.
    Write,
}

/// Configuration passed to device and volume operations.
///
/// Construct with [`Config::default()`] and adjust fields, or use the
/// builder methods to wire up callbacks.
pub struct Config {
    /// Treat checksum mismatches as warnings instead of hard errors when
    /// reading (not writing). Useful for salvaging partially corrupt
    /// images. Default: `false`.
    pub ignore_checksum_errors: bool,
    /// Enable the directory cache (`DOSFS_DIRCACHE`) on newly formatted
    /// volumes. Has no effect when mounting an existing volume, whose
    /// mode is read from the boot block. Default: `false`.
    pub use_dir_cache: bool,
    /// Called with a 0-100 percent value during long-running operations
    /// (format, bitmap rebuild).
    pub progress: Option<Box<dyn FnMut(u8)>>,
    /// Called with a human-readable message when a recoverable problem is
    /// encountered (e.g. an unreadable FSHD/LSEG block during RDB mount).
    pub warn: Option<Box<dyn FnMut(&str)>>,
    /// Called with a human-readable message before a fatal error is
    /// returned, for host applications that want to log in addition to
    /// handling the `Result`.
    pub error: Option<Box<dyn FnMut(&str)>>,
    /// Called on every block-level read/write, mirroring the original's
    /// `rwhAccess` trace hook. Primarily useful for tests and debugging
    /// tools.
    pub trace: Option<Box<dyn FnMut(AccessKind, u32)>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_checksum_errors: false,
            use_dir_cache: false,
            progress: None,
            warn: None,
            error: None,
            trace: None,
        }
    }
}

impl Config {
    /// Report progress, if a callback is registered.
    pub fn report_progress(&mut self, percent: u8) {
        if let Some(cb) = self.progress.as_mut() {
            cb(percent);
        }
        log::trace!("progress: {percent}%");
    }

    /// Report a warning, via the callback (if any) and the `log` facade.
    pub fn report_warn(&mut self, msg: &str) {
        if let Some(cb) = self.warn.as_mut() {
            cb(msg);
        }
        log::warn!("{msg}");
    }

    /// Report an error, via the callback (if any) and the `log` facade.
    pub fn report_error(&mut self, msg: &str) {
        if let Some(cb) = self.error.as_mut() {
            cb(msg);
        }
        log::error!("{msg}");
    }

    /// Report a block access, via the callback (if any) and the `log` facade.
    pub fn report_access(&mut self, kind: AccessKind, block: u32) {
        if let Some(cb) = self.trace.as_mut() {
            cb(kind, block);
        }
        log::trace!("{kind:?} block {block}");
    }
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("ignore_checksum_errors", &self.ignore_checksum_errors)
            .field("use_dir_cache", &self.use_dir_cache)
            .field("progress", &self.progress.is_some())
            .field("warn", &self.warn.is_some())
            .field("error", &self.error.is_some())
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_default_config_is_silent() {
        let mut cfg = Config::default();
        cfg.report_warn("test warning");
        cfg.report_error("test error");
        cfg.report_progress(50);
    }

    #[test]
    fn test_warn_callback_invoked() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let mut cfg = Config {
            warn: Some(Box::new(move |msg: &str| {
                seen_clone.borrow_mut().push(msg.to_string());
            })),
            ..Config::default()
        };
        cfg.report_warn("chain broken");
        assert_eq!(seen.borrow().as_slice(), [String::from("chain broken")]);
    }
}
