//! CLI argument parsing for the subrun client commands.
//!
//! Each command has an Args struct whose `apply` performs the final
//! overlay pass onto the options built from defaults and environment.
//! Every field is optional so an untouched flag never clobbers a
//! value from an earlier pass.

pub mod attach;
pub mod batch;
pub mod common;
pub mod launch;
pub mod run;

pub use attach::AttachArgs;
pub use batch::BatchArgs;
pub use common::CommonArgs;
pub use launch::LaunchArgs;
pub use run::RunArgs;
