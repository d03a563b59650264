//! Centralized logging for the 8086 engine.
//!
//! # Architecture
//!
//! - **LogConfig**: process-wide configuration held in atomics
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: CPU, Decode, Interrupts, Ports, Timing, Stubs
//! - **log()**: the single output path, with rate limiting and optional
//!   asynchronous file output
//!
//! A category with its own level ignores the global level; a category left at
//! `Off` falls back to the global level. Messages are built lazily, so a
//! disabled category costs one atomic load.
//!
//! # Usage
//!
//! ```rust
//! use hemu86_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::CPU, LogLevel::Debug, || {
//!     format!("CPU: HLT at {:04X}:{:04X}", 0xF000, 0xFFF0)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const CATEGORY_COUNT: usize = 6;

/// Log level for controlling verbosity
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

/// Log category for the parts of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Instruction execution, halts, resets
    CPU,
    /// Opcode table construction
    Decode,
    /// Software and external interrupts, divide errors
    Interrupts,
    /// IN/OUT traffic and device attachment
    Ports,
    /// Clock accounting
    Timing,
    /// ESC, WAIT, LOCK and other accepted-but-inert opcodes
    Stubs,
}

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::CPU,
        LogCategory::Decode,
        LogCategory::Interrupts,
        LogCategory::Ports,
        LogCategory::Timing,
        LogCategory::Stubs,
    ];

    /// Parse category name (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Some(LogCategory::CPU),
            "decode" => Some(LogCategory::Decode),
            "interrupts" | "int" => Some(LogCategory::Interrupts),
            "ports" | "io" => Some(LogCategory::Ports),
            "timing" => Some(LogCategory::Timing),
            "stubs" => Some(LogCategory::Stubs),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            LogCategory::CPU => 0,
            LogCategory::Decode => 1,
            LogCategory::Interrupts => 2,
            LogCategory::Ports => 3,
            LogCategory::Timing => 4,
            LogCategory::Stubs => 5,
        }
    }
}

/// A poisoned lock only means another thread panicked mid-log; keep going
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-category sliding-window limiter
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    state: Mutex<[Window; CATEGORY_COUNT]>,
}

#[derive(Default)]
struct Window {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            state: Mutex::new(Default::default()),
        }
    }

    fn set_max_logs_per_second(&self, max: usize) {
        self.max_logs_per_second.store(max, Ordering::Relaxed);
    }

    fn get_max_logs_per_second(&self) -> usize {
        self.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Returns (allowed, dropped_count) where dropped_count is Some(n) if we should report drops
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let mut state = lock(&self.state);
        let window = &mut state[category.index()];

        while let Some(&front) = window.timestamps.front() {
            if now.duration_since(front) > self.window_duration {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        if window.timestamps.len() < self.get_max_logs_per_second() {
            window.timestamps.push_back(now);
            if window.dropped > 0 {
                let dropped = std::mem::take(&mut window.dropped);
                window.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        window.dropped += 1;
        let should_report = match window.last_drop_report {
            None => true,
            Some(last) => now.duration_since(last) >= Duration::from_secs(1),
        };
        if should_report {
            let dropped = std::mem::take(&mut window.dropped);
            window.last_drop_report = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    levels: [AtomicU8; CATEGORY_COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All logging disabled, 60 messages per second per category
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
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
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// True if the category's own level (or the global level when the
    /// category is Off) admits `level`
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
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

    /// Send output to a file, written from a background thread
    ///
    /// Replaces any previously configured file.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("hemu86-log".to_string())
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

    /// Stop file output; the writer thread exits when its channel closes
    pub fn clear_log_file(&self) {
        *lock(&self.log_sender) = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            let log_sender = lock(&self.log_sender);
            match log_sender.as_ref() {
                Some(sender) if sender.send(message.to_string()).is_ok() => {}
                _ => eprintln!("{}", message),
            }
        } else {
            eprintln!("{}", message);
        }
    }
}

/// Log a message with the specified category and level
///
/// `message_fn` only runs when the category/level is enabled and the rate
/// limiter admits the message. Dropped messages are summarised at most once
/// per second per category.
///
/// ```rust
/// use hemu86_core::logging::{log, LogCategory, LogLevel};
///
/// log(LogCategory::Ports, LogLevel::Trace, || {
///     format!("Ports: OUT {:04X} = {:02X}", 0x3F8, 0x41)
/// });
/// ```
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped_count) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped_count.filter(|&n| n > 0) {
        config.write_message(&format!(
            "[{:?}] WARNING: Rate limit exceeded, {} log message(s) dropped in the last second",
            category, count
        ));
    }

    if allowed {
        config.write_message(&message_fn());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("OFF"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("err"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("Trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("loud"), None);
    }

    #[test]
    fn test_category_parsing() {
        for category in LogCategory::ALL {
            let name = format!("{:?}", category);
            assert_eq!(LogCategory::from_str(&name), Some(category));
        }
        assert_eq!(LogCategory::from_str("io"), Some(LogCategory::Ports));
        assert_eq!(LogCategory::from_str("ppu"), None);
    }

    #[test]
    fn test_category_indices_are_distinct() {
        let mut seen = [false; CATEGORY_COUNT];
        for category in LogCategory::ALL {
            assert!(!seen[category.index()]);
            seen[category.index()] = true;
        }
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Decode, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Decode, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Decode, LogLevel::Trace));
        // Ports has no level of its own
        assert!(!config.should_log(LogCategory::Ports, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Ports, LogLevel::Error));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::CPU, LogLevel::Debug);
        config.set_level(LogCategory::Timing, LogLevel::Info);

        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        for category in LogCategory::ALL {
            assert_eq!(config.get_level(category), LogLevel::Off);
        }
    }

    #[test]
    fn test_rate_limiter_per_category() {
        let limiter = RateLimiter::new(60);
        for _ in 0..60 {
            let (allowed, _) = limiter.should_allow(LogCategory::CPU);
            assert!(allowed);
        }

        let (allowed, _) = limiter.should_allow(LogCategory::CPU);
        assert!(!allowed, "61st CPU message should be dropped");

        let (allowed, _) = limiter.should_allow(LogCategory::Interrupts);
        assert!(allowed, "other categories keep their own budget");
    }

    #[test]
    fn test_rate_limiter_reports_dropped_count() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            limiter.should_allow(LogCategory::Ports);
        }
        for _ in 0..10 {
            limiter.should_allow(LogCategory::Ports);
        }

        std::thread::sleep(Duration::from_millis(1100));

        let (allowed, dropped) = limiter.should_allow(LogCategory::Ports);
        assert!(allowed, "window should have slid");
        // The first drop is reported immediately, the rest on the next admit
        let dropped = dropped.expect("drop report");
        assert!((9..=10).contains(&dropped), "got {}", dropped);
    }
}
