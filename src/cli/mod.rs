//! CLI command handlers

pub mod commands;

pub use commands::{audit, compile, eval, extract, watch, CompileArgs};
