//! CLI module - argument parsing and configuration resolution

mod args;
pub mod config;

pub use args::Cli;
pub use config::{apply_overrides, load_config, resolve_config, save_config};
