//! # Trellis
//!
//! Command-line front end for `trellis-core`: CLI parsing, command
//! implementations and configuration resolution.

pub mod cli;
pub mod config;
