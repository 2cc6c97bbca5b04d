//! druid-dev: stand up a two-node Apache Druid demo cluster on K3s
//!
//! The binary drives four machines-eye-view operations (server install,
//! worker join, deploy, cleanup) plus read-only verification and a
//! small HTTP server for the bundled sample datasets. Library form
//! exists for the test suite; this crate is not a published API.

pub mod commands;
pub mod config;
pub mod install;
pub mod k8s;
pub mod sampledata;
pub mod utils;
