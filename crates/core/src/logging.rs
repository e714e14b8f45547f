//! Category logging for the VDP boundary and its collaborators.
//!
//! Library crates log through [`log`] instead of a logging facade so a host
//! can enable one area (say, keyboard injection) without drowning in
//! per-frame display traffic.
//!
//! # Architecture
//!
//! - **LogConfig**: process-wide configuration held in atomics
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: Lifecycle, Display, Keyboard, Mouse, Link, Stubs
//! - **log()**: lazily formatted, rate limited, written to stderr or a
//!   background file writer
//!
//! # Usage
//!
//! ```rust
//! use vdp_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Display, LogLevel::Debug, || {
//!     format!("copy {}x{}", 320, 240)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const CATEGORY_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// setup, tick, shutdown, registry install/uninstall
    Lifecycle,
    /// Framebuffer capture and mode changes
    Display,
    /// Scancode injection
    Keyboard,
    /// Mouse packet injection
    Mouse,
    /// Host <-> VDP byte link
    Link,
    /// Unhandled commands and unimplemented paths
    Stubs,
}

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Lifecycle,
        LogCategory::Display,
        LogCategory::Keyboard,
        LogCategory::Mouse,
        LogCategory::Link,
        LogCategory::Stubs,
    ];

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lifecycle" => Some(LogCategory::Lifecycle),
            "display" | "video" => Some(LogCategory::Display),
            "keyboard" | "kb" => Some(LogCategory::Keyboard),
            "mouse" => Some(LogCategory::Mouse),
            "link" => Some(LogCategory::Link),
            "stubs" => Some(LogCategory::Stubs),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            LogCategory::Lifecycle => 0,
            LogCategory::Display => 1,
            LogCategory::Keyboard => 2,
            LogCategory::Mouse => 3,
            LogCategory::Link => 4,
            LogCategory::Stubs => 5,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sliding one-second window per category.
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    timestamps: Mutex<[VecDeque<Instant>; CATEGORY_COUNT]>,
    dropped_counts: Mutex<[usize; CATEGORY_COUNT]>,
    last_drop_report: Mutex<[Option<Instant>; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            timestamps: Mutex::new(Default::default()),
            dropped_counts: Mutex::new([0; CATEGORY_COUNT]),
            last_drop_report: Mutex::new([None; CATEGORY_COUNT]),
        }
    }

    fn set_max_logs_per_second(&self, max: usize) {
        self.max_logs_per_second.store(max, Ordering::Relaxed);
    }

    fn get_max_logs_per_second(&self) -> usize {
        self.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Returns (allowed, dropped) where dropped is Some(n) when a drop summary is due
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let idx = category.index();

        let mut timestamps = lock(&self.timestamps);
        let mut dropped_counts = lock(&self.dropped_counts);
        let mut last_drop_report = lock(&self.last_drop_report);

        let window = &mut timestamps[idx];
        while let Some(&front) = window.front() {
            if now.duration_since(front) > self.window_duration {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.get_max_logs_per_second() {
            window.push_back(now);

            let dropped = dropped_counts[idx];
            if dropped > 0 {
                dropped_counts[idx] = 0;
                last_drop_report[idx] = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        dropped_counts[idx] += 1;
        let report_due = match last_drop_report[idx] {
            None => true,
            Some(last) => now.duration_since(last) >= Duration::from_secs(1),
        };
        if report_due {
            let dropped = dropped_counts[idx];
            dropped_counts[idx] = 0;
            last_drop_report[idx] = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

pub struct LogConfig {
    global_level: AtomicU8,
    /// Off means "use the global level"
    category_levels: [AtomicU8; CATEGORY_COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// Everything off, 120 messages per second per category.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(120),
        }
    }

    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category level, when set, wins over the global level.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .set_max_logs_per_second(max_logs_per_second);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.get_max_logs_per_second()
    }

    /// Send output to `path` through a background writer thread. Replaces
    /// any previous log file.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("vdp-log-writer".to_string())
            .spawn(move || {
                let mut file = file;
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        *lock(&self.log_sender) = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop writing to the log file. The writer thread exits once the
    /// sender is dropped.
    pub fn clear_log_file(&self) {
        *lock(&self.log_sender) = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            let log_sender = lock(&self.log_sender);
            if let Some(ref sender) = *log_sender {
                if sender.send(message.to_string()).is_ok() {
                    return;
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a lazily formatted message under `category`.
///
/// The closure only runs when the level is enabled and the category is
/// under its rate limit. Dropped messages are summarized at most once a
/// second.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.write_message(&format!(
            "[{:?}] WARNING: rate limit exceeded, {} message(s) dropped",
            category, count
        ));
    }
    if allowed {
        let message = message_fn();
        config.write_message(&format!("[{:?}] {}", category, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("loud"), None);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(LogCategory::from_str("Display"), Some(LogCategory::Display));
        assert_eq!(LogCategory::from_str("kb"), Some(LogCategory::Keyboard));
        assert_eq!(LogCategory::from_str("link"), Some(LogCategory::Link));
        assert_eq!(LogCategory::from_str("cpu"), None);
    }

    #[test]
    fn test_category_indices_are_unique() {
        let mut seen = [false; CATEGORY_COUNT];
        for category in LogCategory::ALL {
            assert!(!seen[category.index()]);
            seen[category.index()] = true;
        }
    }

    #[test]
    fn test_should_log_with_category_level() {
        let config = LogConfig::new();
        config.set_level(LogCategory::Keyboard, LogLevel::Info);

        assert!(config.should_log(LogCategory::Keyboard, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Keyboard, LogLevel::Info));
        assert!(!config.should_log(LogCategory::Keyboard, LogLevel::Debug));
        // Untouched category follows the global level, which is Off
        assert!(!config.should_log(LogCategory::Display, LogLevel::Error));
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Display, LogLevel::Trace);

        assert!(config.should_log(LogCategory::Display, LogLevel::Trace));
        assert!(!config.should_log(LogCategory::Link, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Link, LogLevel::Error));
    }

    #[test]
    fn test_off_is_never_logged() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        assert!(!config.should_log(LogCategory::Stubs, LogLevel::Off));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Mouse, LogLevel::Debug);

        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        assert_eq!(config.get_level(LogCategory::Mouse), LogLevel::Off);
    }

    #[test]
    fn test_rate_limiter_per_category() {
        let limiter = RateLimiter::new(10);
        for _ in 0..10 {
            assert!(limiter.should_allow(LogCategory::Display).0);
        }
        let (allowed, dropped) = limiter.should_allow(LogCategory::Display);
        assert!(!allowed);
        // First drop in a window is reported immediately
        assert_eq!(dropped, Some(1));

        assert!(limiter.should_allow(LogCategory::Keyboard).0);
    }

    #[test]
    fn test_rate_limiter_sliding_window() {
        let limiter = RateLimiter::new(3);
        for _ in 0..3 {
            limiter.should_allow(LogCategory::Link);
        }
        for _ in 0..5 {
            limiter.should_allow(LogCategory::Link);
        }
        assert!(!limiter.should_allow(LogCategory::Link).0);

        thread::sleep(Duration::from_millis(1100));

        let (allowed, dropped) = limiter.should_allow(LogCategory::Link);
        assert!(allowed);
        // 1 drop was reported right away; the other 5 are summarized now
        assert_eq!(dropped, Some(5));
    }

    #[test]
    fn test_rate_limit_setting() {
        let config = LogConfig::new();
        assert_eq!(config.get_rate_limit(), 120);
        config.set_rate_limit(5);
        assert_eq!(config.get_rate_limit(), 5);
    }
}
