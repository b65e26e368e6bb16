/// Configuration management
#[allow(clippy::module_inception)]
mod config;

pub use config::{parse_tolerance, Config, SnmpConfig};
