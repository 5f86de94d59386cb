//! Command implementations.

mod info;
mod run;
mod sessions;
mod validate;

pub use info::run_info;
pub use run::run_recorder;
pub use sessions::run_sessions;
pub use validate::run_validate;
