pub mod init;
pub mod migrate;
pub mod new;
pub mod sql;
pub mod status;

pub use init::cmd_init;
pub use migrate::{MigrateArgs, cmd_migrate};
pub use new::cmd_new;
pub use sql::cmd_sql;
pub use status::cmd_status;
