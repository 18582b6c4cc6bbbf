use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const RV64I: &str = "\
# Base integer instructions.
addi | i | i_imm rs1 rd | .................000.....0010011
lw | i | i_imm rs1 rd | .................010.....0000011
sw | s | s_imm rs2 rs1 | .................010.....0100011
beq | b | b_imm rs2 rs1 | .................000.....1100011
";

const RVC: &str = "\
c.addi | ci | cimm5 crd | 000...........01
";

fn run_rvisl(args: &[&Path]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_rvisl")).args(args).output()?)
}

/// Listings, templates and an empty output directory.
struct Workspace {
    isl: TempDir,
    templates: TempDir,
    out: TempDir,
}

impl Workspace {
    fn new() -> Result<Workspace> {
        let ws = Workspace {
            isl: tempfile::tempdir()?,
            templates: tempfile::tempdir()?,
            out: tempfile::tempdir()?,
        };
        fs::write(ws.isl.path().join("rv64i.txt"), RV64I)?;
        fs::write(ws.isl.path().join("rvc.txt"), RVC)?;
        fs::write(
            ws.templates.path().join("opcode_api.h.in"),
            "enum {\n    /*   0 */ OP_INVALID,\n@OPCODES@\n    OP_LAST,\n};\n",
        )?;
        fs::write(
            ws.templates.path().join("instr_create_api.h.in"),
            "#ifndef INSTR_CREATE_API_H\n@INSTR_MACROS@\n#endif\n",
        )?;
        fs::write(
            ws.templates.path().join("instr_info_trie.h.in"),
            "@INSTR_INFO_TRIE@\n",
        )?;
        Ok(ws)
    }

    fn run(&self) -> Result<Output> {
        run_rvisl(&[self.isl.path(), self.templates.path(), self.out.path()])
    }

    fn output(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.out.path().join(name))?)
    }
}

#[test]
fn generates_all_headers() -> Result<()> {
    let ws = Workspace::new()?;
    let output = ws.run()?;
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.matches("wrote ").count(), 3, "{stdout}");

    let opcodes = ws.output("opcode_api.h")?;
    assert!(opcodes.contains("    /*   1 */ OP_addi = 1,   /**< rv64i addi opcode. */\n"));
    assert!(opcodes.contains("    /*   5 */ OP_c_addi = 5,   /**< rvc c.addi opcode. */\n    OP_LAST,"));

    let macros = ws.output("instr_create_api.h")?;
    assert!(macros.contains("#define INSTR_CREATE_beq(dc, Imm, Rs1, Rs2) \\"));

    let info = ws.output("instr_info_trie.h")?;
    assert!(info.contains("[OP_sw] = { /* sw rs2, imm(rs1) */"));
    assert!(info.contains("{.mask = 0x0, .shift = 0, .index = 2}, /* lw */"));
    Ok(())
}

#[test]
fn unchanged_outputs_are_not_rewritten() -> Result<()> {
    let ws = Workspace::new()?;
    assert!(ws.run()?.status.success());
    let path = ws.out.path().join("opcode_api.h");
    let before = fs::metadata(&path)?.modified()?;

    let output = ws.run()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.matches("is unchanged").count(), 3, "{stdout}");
    assert_eq!(fs::metadata(&path)?.modified()?, before);
    Ok(())
}

#[test]
fn exit_codes_name_the_failing_stage() -> Result<()> {
    // Missing arguments.
    let ws = Workspace::new()?;
    let output = run_rvisl(&[ws.isl.path()])?;
    assert_eq!(output.status.code(), Some(1));

    // A malformed listing line.
    fs::write(ws.isl.path().join("bad.txt"), "add | r | rd\n")?;
    let output = ws.run()?;
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("bad.txt:1: error:"), "{stderr}");
    fs::remove_file(ws.isl.path().join("bad.txt"))?;

    // Each template missing its placeholder in turn.
    for (template, code) in [
        ("instr_info_trie.h.in", 5),
        ("instr_create_api.h.in", 4),
        ("opcode_api.h.in", 3),
    ] {
        fs::write(ws.templates.path().join(template), "nothing to see\n")?;
        let output = ws.run()?;
        assert_eq!(output.status.code(), Some(code), "{template}");
    }
    Ok(())
}

#[test]
fn help_succeeds() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_rvisl"))
        .arg("--help")
        .output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("ISL_DIR"));
    Ok(())
}
