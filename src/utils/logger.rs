//! Logging helpers built on the tracing framework

use std::fmt::Display;

/// Log an informational message (wrapper around tracing::info)
pub fn log_info<T: Display>(msg: T) {
    tracing::info!("{}", msg);
}

/// Log a warning message (wrapper around tracing::warn)
pub fn log_warn<T: Display>(msg: T) {
    tracing::warn!("{}", msg);
}

/// Log an error message (wrapper around tracing::error)
pub fn log_error<T: Display>(msg: T) {
    tracing::error!("{}", msg);
}

/// Log a section banner around a title, used by the command summaries
pub fn log_banner<T: Display>(title: T) {
    let line = "=".repeat(46);
    tracing::info!("{}", line);
    tracing::info!("{}", title);
    tracing::info!("{}", line);
}

/// Macro for convenient info logging
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::utils::logger::log_info(format!($($arg)*))
    };
}

/// Macro for convenient warning logging
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::utils::logger::log_warn(format!($($arg)*))
    };
}

/// Macro for convenient error logging
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::utils::logger::log_error(format!($($arg)*))
    };
}

/// Macro for banner sections in command output
#[macro_export]
macro_rules! log_banner {
    ($($arg:tt)*) => {
        $crate::utils::logger::log_banner(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_functions() {
        // These should not panic
        log_info("server ready");
        log_warn("helm not found");
        log_error("join failed");
        log_banner("K3s server installation complete");
    }
}
