//! Operand-list rewrites applied after parsing.
//!
//! Listings spell out every encoded field, but the decoder works with memory
//! operands and puts branch and jump targets first among the sources. Which
//! rewrite an instruction gets depends only on the fixed bits of its
//! encoding, and each rewrite leaves already-rewritten operand lists alone,
//! so running the pass twice is the same as running it once.

use crate::catalog::Field;
use crate::error::{Error, Errors};
use crate::listing::{Instruction, Listing};

const OPC_LOAD: u32 = 0b000_0011;
const OPC_LOAD_FP: u32 = 0b000_0111;
const OPC_STORE: u32 = 0b010_0011;
const OPC_STORE_FP: u32 = 0b010_0111;
const OPC_BRANCH: u32 = 0b110_0011;
const OPC_JAL: u32 = 0b110_1111;

/// `prefetch.[irw]` are encoded as `ori` with `rd == 0`.
const PREFETCH_MASK: u32 = 0x01f0_7fff;
const PREFETCH_MATCH: [u32; 3] = [0x0000_6013, 0x0010_6013, 0x0030_6013];

/// What a rewrite does to an operand list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rewrite {
    /// Drop the base register at `index`; the displacement field already
    /// names the memory operand.
    DropBase { index: usize },
    /// Replace the displacement in front with `virt` and drop the base
    /// register at `base`.
    MergeDisplacement { virt: Field, base: usize },
    /// Move the branch target immediate to the end of the list so it
    /// becomes the first source operand.
    TargetFirst,
}

/// Rewrite the operand lists of every instruction in `listing`.
pub fn run(listing: &mut Listing, verbose: bool) -> Result<(), Errors> {
    let files = listing.files().to_vec();
    let mut errors = vec![];
    for inst in listing.instructions_mut() {
        if let Err(msg) = fixup(inst, verbose) {
            errors.push(Error::Fixup {
                name: inst.name.clone(),
                msg,
                path: files[inst.pos.file].clone(),
                line: inst.pos.line,
            });
        }
    }
    Errors::from_vec(errors)
}

/// Rewrite the operand list of one instruction.
pub fn fixup(inst: &mut Instruction, verbose: bool) -> Result<(), String> {
    let Some(rewrite) = classify(inst) else {
        return Ok(());
    };
    let before = inst.fields.clone();
    apply(rewrite, &mut inst.fields)?;
    if verbose && before != inst.fields {
        log::debug!("{} {:?}", inst.name, names(&before));
        log::debug!("{} {:?}", " ".repeat(inst.name.len()), names(&inst.fields));
    }
    Ok(())
}

fn names(fields: &[Field]) -> Vec<&'static str> {
    fields.iter().map(|f| f.name()).collect()
}

fn classify(inst: &Instruction) -> Option<Rewrite> {
    let fixed = inst.value & inst.mask;
    if inst.is_compressed() {
        let opc = fixed & 0b11;
        let funct3 = (fixed >> 13) & 0b111;
        match (opc, funct3) {
            // C.LW, C.LD, C.FLD, C.SW, C.SD, C.FSD, ...
            (0b00, f) if f != 0b000 && f != 0b100 => Some(Rewrite::DropBase { index: 1 }),
            // C.J, C.BEQZ, C.BNEZ
            (0b01, 0b101 | 0b110 | 0b111) => Some(Rewrite::TargetFirst),
            _ => None,
        }
    } else {
        match fixed & 0x7f {
            OPC_LOAD | OPC_LOAD_FP => Some(Rewrite::MergeDisplacement {
                virt: Field::V_L_RS1_DISP,
                base: 1,
            }),
            OPC_STORE | OPC_STORE_FP => Some(Rewrite::MergeDisplacement {
                virt: Field::V_S_RS1_DISP,
                base: 2,
            }),
            OPC_BRANCH | OPC_JAL => Some(Rewrite::TargetFirst),
            _ if inst.mask == PREFETCH_MASK && PREFETCH_MATCH.contains(&inst.value) => {
                Some(Rewrite::MergeDisplacement {
                    virt: Field::V_S_RS1_DISP,
                    base: 1,
                })
            }
            _ => None,
        }
    }
}

fn is_base_register(f: Field) -> bool {
    matches!(f, Field::RS1 | Field::CRS1 | Field::CRS1_)
}

fn is_target(f: Field) -> bool {
    matches!(
        f,
        Field::B_IMM | Field::J_IMM | Field::CB_IMM | Field::CJ_IMM
    )
}

fn apply(rewrite: Rewrite, fields: &mut Vec<Field>) -> Result<(), String> {
    match rewrite {
        Rewrite::DropBase { index } => {
            match fields.get(index) {
                Some(&f) if is_base_register(f) => {
                    fields.remove(index);
                }
                // Already rewritten.
                Some(_) if fields.len() == 2 => {}
                _ => return Err(format!("expected a base register at operand {index}")),
            }
        }
        Rewrite::MergeDisplacement { virt, base } => {
            if fields.first() == Some(&virt) {
                return Ok(());
            }
            match fields.get(base) {
                Some(&f) if is_base_register(f) => {
                    fields[0] = virt;
                    fields.remove(base);
                }
                _ => return Err(format!("expected a base register at operand {base}")),
            }
        }
        Rewrite::TargetFirst => {
            let Some(at) = fields.iter().position(|&f| is_target(f)) else {
                return Err("missing branch target".to_string());
            };
            let target = fields.remove(at);
            fields.push(target);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use std::path::{Path, PathBuf};

    fn listing(src: &str) -> Listing {
        let insts = parse_str(0, Path::new("x.txt"), src).unwrap();
        Listing::new(vec![PathBuf::from("x.txt")], insts)
    }

    fn fields_after(src: &str) -> Vec<Field> {
        let mut l = listing(src);
        run(&mut l, false).unwrap();
        l.instructions()[0].fields.clone()
    }

    #[test]
    fn loads_and_stores() {
        assert_eq!(
            fields_after("lw | i | i_imm rs1 rd | .................010.....0000011"),
            vec![Field::V_L_RS1_DISP, Field::RD]
        );
        assert_eq!(
            fields_after("fld | i | i_imm rs1 rd(fp) | .................011.....0000111"),
            vec![Field::V_L_RS1_DISP, Field::RDFP]
        );
        assert_eq!(
            fields_after("sd | s | s_imm rs2 rs1 | .................011.....0100011"),
            vec![Field::V_S_RS1_DISP, Field::RS2]
        );
    }

    #[test]
    fn prefetch_is_a_store() {
        assert_eq!(
            fields_after("prefetch.r | i | imm rs1 | .......00001.....110000000010011"),
            vec![Field::V_S_RS1_DISP]
        );
        // Plain `ori` is untouched.
        assert_eq!(
            fields_after("ori | i | i_imm rs1 rd | .................110.....0010011"),
            vec![Field::I_IMM, Field::RS1, Field::RD]
        );
    }

    #[test]
    fn branches_put_the_target_last() {
        assert_eq!(
            fields_after("beq | b | b_imm rs2 rs1 | .................000.....1100011"),
            vec![Field::RS2, Field::RS1, Field::B_IMM]
        );
        assert_eq!(
            fields_after("jal | j | j_imm rd | .........................1101111"),
            vec![Field::RD, Field::J_IMM]
        );
        // jalr computes its target from a register.
        assert_eq!(
            fields_after("jalr | i | i_imm rs1 rd | .................000.....1100111"),
            vec![Field::I_IMM, Field::RS1, Field::RD]
        );
        assert_eq!(
            fields_after("c.beqz | cb | cb_imm crs1_ | 110...........01"),
            vec![Field::CRS1_, Field::CB_IMM]
        );
    }

    #[test]
    fn compressed_memory_drops_base() {
        assert_eq!(
            fields_after("c.lw | cl | clw_imm crs1_ crd_ | 010...........00"),
            vec![Field::CLW_IMM, Field::CRD_]
        );
        assert_eq!(
            fields_after("c.sd | cs | csd_imm crs1_ crs2_ | 111...........00"),
            vec![Field::CSD_IMM, Field::CRS2_]
        );
        // C.ADDI4SPN shares the quadrant but is not a memory access.
        assert_eq!(
            fields_after("c.addi4spn | ciw | ciw_imm crd_ | 000...........00"),
            vec![Field::CIW_IMM, Field::CRD_]
        );
    }

    #[test]
    fn idempotent() {
        let src = "\
lw | i | i_imm rs1 rd | .................010.....0000011
sw | s | s_imm rs2 rs1 | .................010.....0100011
bne | b | b_imm rs2 rs1 | .................001.....1100011
c.ld | cl | cld_imm crs1_ crd_ | 011...........00
c.bnez | cb | cb_imm crs1_ | 111...........01
prefetch.w | i | imm rs1 | .......00011.....110000000010011
";
        let mut once = listing(src);
        run(&mut once, false).unwrap();
        let mut twice = once.clone();
        run(&mut twice, false).unwrap();
        assert_eq!(once.instructions(), twice.instructions());
    }

    #[test]
    fn malformed_operands_are_reported() {
        let mut l = listing("lw | i | i_imm | .................010.....0000011");
        let errors = run(&mut l, false).unwrap_err();
        let text = errors.to_string();
        assert!(text.starts_with("x.txt:1: error: cannot rewrite operands of `lw`"), "{text}");
    }
}
