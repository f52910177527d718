//! Core logic of the mini-app survey client.
//!
//! This crate is framework-agnostic. The Telegram host, the VK bridge, the
//! HTTP backend and the form UI live behind ports (traits) implemented in
//! adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod guard;
pub mod identity;
pub mod init_data;
pub mod logging;
pub mod messages;
pub mod page;
pub mod ports;
pub mod submission;

pub use errors::{Error, Result};
