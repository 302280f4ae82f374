//! Job-submission options model.
//!
//! Each client command owns an options struct populated in three
//! overlaid passes (compiled defaults, then environment variables,
//! then command-line flags) followed by a verification pass that
//! cross-checks fields and derives the remaining values. After
//! verification the struct is read-only.

pub mod env;
pub mod error;
pub mod export;
pub mod multiprog;
pub mod options;
pub mod path;
mod verify;

pub use env::{env_snapshot, Env};
pub use error::OptionsError;
pub use export::exported_env;
pub use multiprog::{MultiProg, MultiProgError};
pub use options::{
    AttachOptions, BatchOptions, CommonOptions, Identity, IoRedirect, LaunchOptions, RunOptions,
    StepId,
};
