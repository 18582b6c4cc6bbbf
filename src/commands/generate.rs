//! The module that implements the `rvisl` header generation.

use anyhow::{Context, Result};
use clap::Parser;
use rvisl::Options;
use rvisl::emit::{self, Emitted};
use rvisl::srcgen::Update;
use std::fmt;
use std::path::PathBuf;

/// Generates opcode, creation macro and decode trie headers from RISC-V
/// instruction set listings.
#[derive(Parser, Debug)]
pub struct GenerateCommand {
    /// Log the parsed listing, operand rewrites and trie construction.
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory holding the `*.txt` instruction set listings.
    #[arg(value_name = "ISL_DIR")]
    pub isl_dir: PathBuf,

    /// Directory holding the `*.h.in` templates.
    #[arg(value_name = "TEMPLATE_DIR")]
    pub template_dir: PathBuf,

    /// Directory the generated headers are written to.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,
}

/// The part of a run that failed. Each has its own exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// The command line could not be parsed.
    Usage,
    /// Parsing, operand fixup or the consistency checks.
    Frontend,
    /// Generating `opcode_api.h`.
    Opcodes,
    /// Generating `instr_create_api.h`.
    Macros,
    /// Building the trie and generating `instr_info_trie.h`.
    Info,
}

impl Stage {
    /// The process exit code for a failure in this stage.
    pub fn exit_code(self) -> u8 {
        match self {
            Stage::Usage => 1,
            Stage::Frontend => 2,
            Stage::Opcodes => 3,
            Stage::Macros => 4,
            Stage::Info => 5,
        }
    }

    fn fail(self, error: anyhow::Error) -> Failure {
        Failure { stage: self, error }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Stage::Usage => "usage",
            Stage::Frontend => "front end",
            Stage::Opcodes => "opcode emitter",
            Stage::Macros => "macro emitter",
            Stage::Info => "info emitter",
        })
    }
}

/// A failed run.
#[derive(Debug)]
pub struct Failure {
    /// Where it failed.
    pub stage: Stage,
    /// What went wrong.
    pub error: anyhow::Error,
}

impl GenerateCommand {
    /// Executes the command.
    pub fn execute(&self) -> Result<(), Failure> {
        let options = Options {
            verbose: self.verbose,
        };

        let listing = rvisl::compile::frontend(&self.isl_dir, &options)
            .with_context(|| format!("failed to compile `{}`", self.isl_dir.display()))
            .map_err(|e| Stage::Frontend.fail(e))?;

        let (emitted, op_offset) =
            emit::opcodes::emit(&listing, &self.template_dir, &self.output_dir)
                .context("failed to generate opcodes")
                .map_err(|e| Stage::Opcodes.fail(e))?;
        report(&emitted);

        let emitted = emit::macros::emit(&listing, &self.template_dir, &self.output_dir)
            .context("failed to generate instruction creation macros")
            .map_err(|e| Stage::Macros.fail(e))?;
        report(&emitted);

        let emitted = emit::info::emit(
            &listing,
            op_offset,
            &self.template_dir,
            &self.output_dir,
            options.verbose,
        )
        .context("failed to generate instruction info and decode trie")
        .map_err(|e| Stage::Info.fail(e))?;
        report(&emitted);

        Ok(())
    }
}

fn report(emitted: &Emitted) {
    match emitted.update {
        Update::Written => println!("wrote {}", emitted.path.display()),
        Update::Unchanged => println!("{} is unchanged", emitted.path.display()),
    }
}
