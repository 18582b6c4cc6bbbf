//! Code emitters.
//!
//! Each emitter renders its part of the generated C headers, splices it
//! into a template in place of a placeholder and writes the output file if
//! its contents changed.

use crate::error::Error;
use crate::listing::Listing;
use crate::srcgen::{Template, Update, update_file};
use std::path::{Path, PathBuf};

pub mod info;
pub mod macros;
pub mod opcodes;

/// The generator named in the header of generated code.
pub const GENERATOR: &str = "rvisl";

/// What an emitter did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Emitted {
    /// The output file.
    pub path: PathBuf,
    /// Whether it was written.
    pub update: Update,
}

/// Render `template_name` from `template_dir` into `output_name` in
/// `output_dir`.
fn emit_file(
    listing: &Listing,
    template_dir: &Path,
    template_name: &str,
    output_dir: &Path,
    output_name: &str,
    render: impl FnOnce(&Template) -> Result<String, Error>,
) -> Result<Emitted, Error> {
    let path = output_dir.join(output_name);
    if listing.is_empty() {
        return Err(Error::NoInstructions(path));
    }
    let template = Template::load(&template_dir.join(template_name))?;
    let text = render(&template)?;
    let update = update_file(&path, &text)?;
    Ok(Emitted { path, update })
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::listing::Listing;
    use crate::parser::parse_str;
    use std::path::{Path, PathBuf};

    /// A listing with a load, a store, a branch, a nullary instruction and
    /// two compressed variants, run through the fixup pass.
    pub(crate) fn sample() -> Listing {
        let rv64i = "\
addi | i | i_imm rs1 rd | .................000.....0010011
lw | i | i_imm rs1 rd | .................010.....0000011
sd | s | s_imm rs2 rs1 | .................011.....0100011
beq | b | b_imm rs2 rs1 | .................000.....1100011
ecall | i | | 00000000000000000000000001110011
";
        let rvc = "\
c.nop | ci | | 0000000000000001
c.lw | cl | clw_imm crs1_ crd_ | 010...........00
c.nop | ci | | 0000000000000101
";
        let mut insts = parse_str(0, Path::new("rv64i.txt"), rv64i).unwrap();
        insts.extend(parse_str(1, Path::new("rvc.txt"), rvc).unwrap());
        let mut listing = Listing::new(
            vec![PathBuf::from("rv64i.txt"), PathBuf::from("rvc.txt")],
            insts,
        );
        crate::fixup::run(&mut listing, false).unwrap();
        listing
    }
}
