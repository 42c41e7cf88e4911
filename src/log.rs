//! Diagnostic logging. This is not to be confused with the simulation's event log
//! (see [`crate::history`]), which is model output describing what happened each day.
//!
//! The crate (re)exports the five logging macros: `error!`, `warn!`, `info!`, `debug!` and
//! `trace!`. Logging is _disabled_ by default. Turn it on with:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!
//! Per-module filters can be added with `set_module_filter()` and dropped with
//! `remove_module_filter()`:
//!
//! ```rust
//! use airborne_city_sim::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! // The movement scheduler is chatty; only show its warnings.
//! set_module_filter("airborne_city_sim::movement", LevelFilter::Warn);
//! ```

pub use log::{debug, error, info, trace, warn, LevelFilter};

use crate::hashing::HashMap;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::{Config, Handle};
use std::sync::{LazyLock, Mutex, MutexGuard};

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;
// Use an ISO 8601 timestamp format and color coded level tag
const DEFAULT_LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// Holds the level filters and a handle to the installed `log4rs` logger. Loggers are installed
/// process-wide, so only the singleton behind `LOG_CONFIGURATION` exists.
struct LogConfiguration {
    /// Level for modules without an explicit filter. `LevelFilter::Off` disables logging.
    global_log_level: LevelFilter,
    module_levels: HashMap<String, LevelFilter>,
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        LogConfiguration {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_levels: HashMap::default(),
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn build_config(&self) -> Option<Config> {
        let encoder = Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN));
        let stdout = ConsoleAppender::builder().encoder(encoder).build();
        let mut builder =
            Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));

        for (module, level) in &self.module_levels {
            builder = builder.logger(Logger::builder().build(module.clone(), *level));
        }

        let root = Root::builder()
            .appender("stdout")
            .build(self.global_log_level);
        match builder.build(root) {
            Ok(config) => Some(config),
            Err(errors) => {
                eprintln!("failed to build log configuration: {errors:?}");
                None
            }
        }
    }

    /// Installs the logger on first use and swaps its configuration afterward.
    fn apply(&mut self) {
        let Some(config) = self.build_config() else {
            return;
        };

        match self.root_handle {
            Some(ref handle) => handle.set_config(config),
            None => match log4rs::init_config(config) {
                Ok(handle) => self.root_handle = Some(handle),
                // Another logger owns the process (e.g. a test harness). Leave it alone.
                Err(error) => eprintln!("failed to install logger: {error}"),
            },
        }
    }
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    // A poisoned lock only means another thread panicked while logging; the data is still usable.
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Enables the logger with no global level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    let mut configuration = get_log_configuration();
    configuration.global_log_level = level;
    configuration.apply();
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level: LevelFilter) {
    let mut configuration = get_log_configuration();
    let previous = configuration
        .module_levels
        .insert(module_path.to_string(), level);
    if previous != Some(level) {
        configuration.apply();
    }
}

/// Removes a module-specific level filter for the given module path. The global level filter will
/// apply to the module.
pub fn remove_module_filter(module_path: &str) {
    let mut configuration = get_log_configuration();
    if configuration.module_levels.remove(module_path).is_some() {
        configuration.apply();
    }
}

/// Parses a level name as accepted on the command line (`off`, `error`, `warn`, `info`, `debug`,
/// `trace`), case-insensitively.
pub fn parse_level_filter(name: &str) -> Option<LevelFilter> {
    name.parse().ok()
}
