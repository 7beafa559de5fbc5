pub mod config;
pub mod file_format;

pub use config::{ConnectionConfig, TidemarkConfig, default_version_table};
pub use file_format::FileFormat;
