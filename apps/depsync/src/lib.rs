//! # depsync
//!
//! Filesystem and CLI layer around `depsync-core`.
//!
//! - `cli` - clap commands and report printing
//! - `config` - `depsync.toml` run configuration
//! - `inputs` - graph, descriptor and suppression files

pub mod cli;
pub mod config;
pub mod inputs;
