//! The rvisl command line interface (CLI) crate.
//!
//! This crate implements the `rvisl` command line tool, which turns RISC-V
//! instruction set listings into C headers using the `rvisl` library.

#![deny(missing_docs)]

pub mod commands;
