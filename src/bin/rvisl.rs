//! The `rvisl` command line tool.
//!
//! Compiles RISC-V instruction set listings into opcode, instruction
//! creation and decode trie headers. See `rvisl --help` for usage.

use clap::Parser;
use rvisl_cli::commands::{GenerateCommand, Stage};
use std::io::Write;
use std::process::ExitCode;

/// RISC-V instruction set listing compiler
#[derive(Parser)]
#[command(
    name = "rvisl",
    version,
    after_help = "The listing directory holds one `<extension>.txt` file per ISA extension.\n\
                  The template directory must provide `opcode_api.h.in`,\n\
                  `instr_create_api.h.in` and `instr_info_trie.h.in`.\n\
                  \n\
                  Exit codes: 1 usage, 2 listing errors, 3 opcodes, 4 macros,\n\
                  5 instruction info and trie."
)]
struct Rvisl {
    #[command(flatten)]
    generate: GenerateCommand,
}

fn main() -> ExitCode {
    let cli = match Rvisl::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(Stage::Usage.exit_code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logger(cli.generate.verbose);

    match cli.generate.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {:?}", failure.error);
            log::debug!("{} failed", failure.stage);
            ExitCode::from(failure.stage.exit_code())
        }
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Rvisl::command().debug_assert()
}
