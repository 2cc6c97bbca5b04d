//! Installation modules for the cluster stack

pub mod druid;
pub mod helm_cli;
pub mod k3s;
