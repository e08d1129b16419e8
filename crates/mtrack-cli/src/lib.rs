//! Shared utilities for mtrack-cli
//!
//! Argument parsing helpers and the command implementations behind the
//! `mtrack` binary.

pub mod commands;
pub mod parsers;
pub mod types;

pub use parsers::{parse_id_list, parse_range};
pub use types::Overrides;
