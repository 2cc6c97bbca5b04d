//! Kubernetes operations via the kubectl/helm binaries

pub mod helm;
pub mod kubectl;
pub mod status;
