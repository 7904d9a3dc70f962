//! Allow-listed maintenance script execution.

pub mod error;
pub mod runner;


pub use error::AdminError;
pub use runner::{SCRIPT_WHITELIST, ScriptOutput, ScriptRunner, exit_trailer};
