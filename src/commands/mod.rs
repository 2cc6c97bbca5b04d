//! Command implementations for the druid-dev CLI

pub mod check;
pub mod cleanup;
pub mod deploy;
pub mod interactive;
pub mod serve;
pub mod server;
pub mod verify;
pub mod worker;
