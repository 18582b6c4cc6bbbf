//! The module for the rvisl CLI commands.

mod generate;

pub use self::generate::*;
