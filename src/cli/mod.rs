// ABOUTME: CLI module for the wfcheck specification checker
// ABOUTME: Exports command line interface components and main application logic

pub mod app;
pub mod args;
pub mod commands;
pub mod config;
pub mod loader;

pub use app::App;
pub use args::{Args, Commands};
pub use config::Config;
