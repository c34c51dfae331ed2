#![forbid(unsafe_code)]

pub mod cli;
pub mod error;
pub mod evaluate;
pub mod inspect;
pub mod prioritize;
pub mod util;

pub use cli::run_from_env;
pub use error::{CliError, Result};
