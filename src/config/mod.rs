//! Configuration for druid-dev

pub mod cluster_info;
pub mod settings;

pub use cluster_info::ClusterInfo;
pub use settings::Settings;
