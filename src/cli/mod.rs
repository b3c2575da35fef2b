//! Command-line interface module.

mod args;
pub mod build;
pub mod inspect;
pub mod validate;

pub use args::{Cli, Commands};
