pub mod config;
pub mod loader;
pub mod registry;
pub mod step_file;

pub use config::{CONFIG_FILE, load_config, load_config_from_path, load_config_or_default};
pub use loader::{LoadSkipped, StepFileName, StepLoader, parse_step_file_name};
pub use registry::{MigrationRegistry, RegisteredStep};
pub use step_file::StepFile;
