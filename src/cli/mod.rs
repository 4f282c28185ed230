//! Command-line interface for storefeed.

mod commands;
pub mod icons;

pub use commands::{is_verbose, run};
