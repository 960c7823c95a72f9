//! CLI module for Equilibrium

pub mod app;
pub mod commands;

pub use app::{render_transcript, EquilibriumApp};
pub use commands::{Cli, Commands, TableArgs};
