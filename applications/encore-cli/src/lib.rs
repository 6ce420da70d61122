//! Encore CLI
//!
//! Terminal front-end that drives the playback coordinator against a
//! simulated device, so queue and switching behaviour can be exercised
//! without an audio stack.

pub mod config;
pub mod library;
pub mod repl;
pub mod sim;
