//! Terminal rendering for the CLI commands

pub mod advise;
pub mod budget;
pub mod market;
pub mod setup;
pub mod ui;
