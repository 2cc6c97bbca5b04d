//! Utility modules for druid-dev

pub mod dryrun;
pub mod errors;
pub mod logger;
pub mod net;
pub mod polling;
pub mod prereqs;
pub mod privilege;
pub mod progress;
pub mod prompt;
pub mod service;

// Re-export commonly used items
pub use errors::DruidDevError;
pub use logger::{log_error, log_info, log_warn};
pub use polling::PollConfig;
pub use prereqs::{CommonPrereqs, Prerequisite};
pub use prompt::{confirm, wait_for_enter};
