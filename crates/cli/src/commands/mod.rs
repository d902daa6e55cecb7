//! CLI subcommands

pub mod account;
pub mod models;
pub mod predict;
pub mod train;
