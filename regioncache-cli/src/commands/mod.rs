//! CLI subcommands.

pub mod clear;
pub mod common;
pub mod config;
pub mod status;
