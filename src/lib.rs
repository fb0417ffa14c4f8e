//! kbchat - client library and CLI for a knowledge-base chat backend
//!
//! This library exposes modules for use in integration tests.

pub mod cli;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod stream;
pub mod table;
