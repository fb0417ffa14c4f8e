//! CLI module for kbchat.
//!
//! This module provides the command-line front end:
//! - Argument parsing (clap derive)
//! - Command execution against [`crate::client::ChatClient`]
//! - Text and JSON output
//!
//! # Usage
//!
//! ```ignore
//! use clap::Parser;
//! use kbchat::cli::{execute, resolve_config, Cli};
//! use kbchat::config::ClientConfig;
//!
//! let cli = Cli::parse();
//! let config = resolve_config(&cli, ClientConfig::from_env()?)?;
//! runtime.block_on(execute(&cli, config, ctrl_c, &mut std::io::stdout()))?;
//! ```

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, Commands};
pub use commands::{cmd_send, execute, resolve_config, SendRequest};
pub use output::{format_error, OutputFormat};
