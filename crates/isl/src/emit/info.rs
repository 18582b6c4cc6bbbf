//! Instruction info records and the decode trie, `instr_info_trie.h`.

use super::{Emitted, GENERATOR, emit_file};
use crate::catalog::{Field, size_of};
use crate::error::Error;
use crate::listing::{Instruction, Listing};
use crate::srcgen::{Formatter, Template, fmtln};
use crate::trie::Trie;
use std::path::Path;

/// The template file name.
pub const TEMPLATE: &str = "instr_info_trie.h.in";

/// The output file name.
pub const OUTPUT: &str = "instr_info_trie.h";

/// Replaced by the info array and the trie array.
pub const PLACEHOLDER: &str = "@INSTR_INFO_TRIE@";

/// Operand slots of an info record. The destination goes in the first slot
/// and sources fill the rest in order, so the fourth source lands in `dst2`.
const SLOTS: [&str; 5] = ["dst1", "src1", "src2", "src3", "dst2"];

const MAX_DSTS: usize = 1;
const MAX_SRCS: usize = SLOTS.len() - MAX_DSTS;

/// Build the decode trie and emit it together with the info records.
///
/// `op_offset` is the id of the first generated opcode, as returned by
/// [`super::opcodes::emit`].
pub fn emit(
    listing: &Listing,
    op_offset: usize,
    template_dir: &Path,
    output_dir: &Path,
    verbose: bool,
) -> Result<Emitted, Error> {
    emit_file(listing, template_dir, TEMPLATE, output_dir, OUTPUT, |t| {
        let trie = Trie::build(listing, op_offset, verbose)?;
        render(listing, &trie, t)
    })
}

/// Render the template.
pub fn render(listing: &Listing, trie: &Trie, template: &Template) -> Result<String, Error> {
    let mut fmt = Formatter::new(GENERATOR);
    fmt.empty_line();
    fmt.doc_comment("Instruction info array.");
    fmt.line("rv_instr_info_t instr_infos[] = {");
    fmt.indent(|fmt| {
        for id in listing.opcodes().representatives() {
            info_record(fmt, &listing[id])?;
        }
        Ok::<_, Error>(())
    })?;
    fmt.line("};");
    fmt.empty_line();
    fmt.doc_comment("Trie lookup structure.");
    fmt.line("trie_node_t instr_infos_trie[] = {");
    fmt.indent(|fmt| {
        for (i, node) in trie.nodes().iter().enumerate() {
            let name = match trie.leaf_instruction(i) {
                Some(id) => format!(" /* {} */", listing[id].name),
                None => String::new(),
            };
            fmtln!(
                fmt,
                "{{.mask = {:#x}, .shift = {}, .index = {}}},{name}",
                node.mask,
                node.shift,
                node.index
            );
        }
    });
    fmt.line("};");
    template.substitute(PLACEHOLDER, &fmt.finish())
}

/// The operands of `inst` in macro order, each with its record slot, and the
/// destination and source counts.
pub fn operand_slots(
    inst: &Instruction,
) -> Result<(Vec<(&'static str, Field)>, usize, usize), Error> {
    let mut slots = vec![];
    let mut ndst = 0;
    let mut nsrc = 0;
    for &f in inst.fields.iter().rev() {
        let slot = if f.is_dest() {
            ndst += 1;
            0
        } else {
            nsrc += 1;
            nsrc
        };
        if ndst > MAX_DSTS || nsrc > MAX_SRCS {
            return Err(Error::OperandLayout {
                name: inst.name.clone(),
                msg: format!(
                    "at most {MAX_DSTS} destination and {MAX_SRCS} source operands fit, \
                     found {} and {}",
                    inst.fields.iter().filter(|f| f.is_dest()).count(),
                    inst.fields.iter().filter(|f| !f.is_dest()).count(),
                ),
            });
        }
        slots.push((SLOTS[slot], f));
    }
    Ok((slots, ndst, nsrc))
}

fn info_record(fmt: &mut Formatter, inst: &Instruction) -> Result<(), Error> {
    let (slots, ndst, nsrc) = operand_slots(inst)?;
    let name = inst.formatted_name();
    let asm: String = if inst.fields.is_empty() {
        String::new()
    } else {
        let ops: Vec<&str> = inst.fields.iter().rev().map(|f| f.asm_name()).collect();
        format!(" {}", ops.join(", "))
    };
    let counts = ((ndst as u32) << 31) | ((nsrc as u32) << 28);

    fmtln!(fmt, "[OP_{name}] = {{ /* {}{asm} */", inst.name);
    fmt.indent(|fmt| {
        fmt.line(".nfo = {");
        fmt.indent(|fmt| {
            fmtln!(fmt, ".type = OP_{name},");
            fmtln!(fmt, ".opcode = 0x{counts:08x}, /* {ndst} dst, {nsrc} src */");
            fmtln!(fmt, ".name = \"{}\",", inst.name);
            for (slot, f) in &slots {
                fmtln!(fmt, ".{slot}_type = RISCV64_FLD_{},", f.name());
                fmtln!(fmt, ".{slot}_size = {},", size_of(*f, &inst.name));
            }
            fmtln!(
                fmt,
                ".code = (((uint64){:#x}) << 32) | ({:#x}),",
                inst.value,
                inst.mask
            );
        });
        fmt.line("},");
        fmtln!(fmt, ".ext = {},", inst.formatted_ext());
    });
    fmt.line("},");
    Ok(())
}
