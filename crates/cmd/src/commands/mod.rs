pub mod init;
pub mod partitions;
pub mod plan;
pub mod run;

pub use init::init_command;
pub use partitions::partitions_command;
pub use plan::plan_command;
pub use run::run_command;
