// src/core/hooks.rs

use lazy_static::lazy_static;
use log::LevelFilter;
use std::panic::{self, PanicHookInfo};
use std::sync::{Mutex, Once};

/// A failure caught by the panic hook, with the place it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fatal {
    pub message: String,
    pub file: String,
    pub line: u32,
}

static INSTALL: Once = Once::new();

lazy_static! {
    static ref LAST_FATAL: Mutex<Option<Fatal>> = Mutex::new(None);
}

/// Serializes tests that panic on purpose, since the record is process-wide.
#[cfg(test)]
pub(crate) static PANIC_TEST_LOCK: Mutex<()> = Mutex::new(());

/// Installs the process-wide panic hook. Later calls do nothing.
///
/// The hook records the failure for [`take_last_fatal`]. The previous hook
/// (normally the one printing the panic and backtrace) still runs whenever
/// any log level is enabled; with logging off the hook only records.
pub fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            record(info);
            if forwards_to_previous(log::max_level()) {
                previous(info);
            }
        }));
        log::debug!("Failure hooks installed");
    });
}

fn reporting_enabled(level: LevelFilter) -> bool {
    level != LevelFilter::Off
}

fn forwards_to_previous(level: LevelFilter) -> bool {
    // Unit tests never set a logger and still need failing tests reported.
    cfg!(test) || reporting_enabled(level)
}

fn record(info: &PanicHookInfo<'_>) {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown error".to_string());
    let (file, line) = info
        .location()
        .map(|l| (l.file().to_string(), l.line()))
        .unwrap_or_else(|| ("<unknown>".to_string(), 0));

    if let Ok(mut last) = LAST_FATAL.lock() {
        *last = Some(Fatal { message, file, line });
    }
}

/// Returns and clears the last recorded failure.
pub fn take_last_fatal() -> Option<Fatal> {
    LAST_FATAL.lock().ok().and_then(|mut last| last.take())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explode() -> u8 {
        panic!("disk on fire")
    }

    #[test]
    fn test_records_panic_location() {
        let _guard = PANIC_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        install();
        install();
        let _ = take_last_fatal();

        let result = panic::catch_unwind(explode);
        assert!(result.is_err());

        let fatal = take_last_fatal().unwrap();
        assert_eq!(fatal.message, "disk on fire");
        assert!(fatal.file.ends_with("hooks.rs"));
        assert!(fatal.line > 0);
        assert!(take_last_fatal().is_none());
    }

    #[test]
    fn test_any_log_level_enables_reporting() {
        assert!(reporting_enabled(LevelFilter::Error));
        assert!(reporting_enabled(LevelFilter::Trace));
        assert!(!reporting_enabled(LevelFilter::Off));
    }

    #[test]
    fn test_test_harness_keeps_panic_output() {
        assert!(forwards_to_previous(LevelFilter::Off));
    }
}
