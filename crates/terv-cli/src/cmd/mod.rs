//! Subcommand implementations.

pub mod detect;
pub mod install;
pub mod list;
pub mod reset;
pub mod uninstall;
pub mod r#use;
