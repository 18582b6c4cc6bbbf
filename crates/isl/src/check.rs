//! Consistency checks over a fixed-up listing.

use crate::error::{Error, Errors};
use crate::listing::{InstId, Listing};
use std::collections::HashMap;

/// Check that the listing can be numbered and decoded unambiguously.
///
/// Two non-compressed instructions may not share a `(mask, match)` pair, and
/// a mnemonic may only repeat within one file and only between compressed
/// variants. Every violation is reported.
pub fn check(listing: &Listing) -> Result<(), Errors> {
    let mut errors = vec![];
    check_encodings(listing, &mut errors);
    check_opcodes(listing, &mut errors);
    Errors::from_vec(errors)
}

fn check_encodings(listing: &Listing, errors: &mut Vec<Error>) {
    let mut seen: HashMap<(u32, u32), InstId> = HashMap::new();
    for (id, inst) in listing.iter() {
        if inst.is_compressed() {
            continue;
        }
        if let Some(prev) = seen.insert((inst.mask, inst.value), id) {
            errors.push(Error::DuplicateEncoding {
                name: inst.name.clone(),
                existing: listing[prev].to_string(),
                conflicting: inst.to_string(),
            });
        }
    }
}

fn check_opcodes(listing: &Listing, errors: &mut Vec<Error>) {
    let mut first: HashMap<&str, InstId> = HashMap::new();
    for (id, inst) in listing.iter() {
        let Some(&prev) = first.get(inst.name.as_str()) else {
            first.insert(&inst.name, id);
            continue;
        };
        let prev_inst = &listing[prev];
        let same_file = prev_inst.pos.file == inst.pos.file;
        if !same_file || !prev_inst.is_compressed() || !inst.is_compressed() {
            errors.push(Error::DuplicateOpcode {
                name: inst.name.clone(),
                first: listing.location(prev_inst.pos),
                second: listing.location(inst.pos),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use std::path::{Path, PathBuf};

    fn listing(files: &[(&str, &str)]) -> Listing {
        let mut insts = vec![];
        for (i, (name, src)) in files.iter().enumerate() {
            insts.extend(parse_str(i, Path::new(name), src).unwrap());
        }
        Listing::new(files.iter().map(|(n, _)| PathBuf::from(n)).collect(), insts)
    }

    #[test]
    fn clean_listing_passes() {
        let l = listing(&[(
            "rv64i.txt",
            "addi | i | i_imm rs1 rd | .................000.....0010011\n\
             ori | i | i_imm rs1 rd | .................110.....0010011\n",
        )]);
        assert!(check(&l).is_ok());
    }

    #[test]
    fn duplicate_encodings() {
        let l = listing(&[(
            "rv64i.txt",
            "addi | i | i_imm rs1 rd | .................000.....0010011\n\
             mv | i | i_imm rs1 rd | .................000.....0010011\n",
        )]);
        let errors = check(&l).unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        match &errors.errors()[0] {
            Error::DuplicateEncoding {
                name,
                existing,
                conflicting,
            } => {
                assert_eq!(name, "mv");
                assert!(existing.starts_with("addi | i |"), "{existing}");
                assert!(conflicting.starts_with("mv | i |"), "{conflicting}");
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn compressed_variants_may_share_a_mnemonic() {
        let l = listing(&[(
            "rvc.txt",
            "c.nop | ci | | 0000000000000001\n\
             c.nop | ci | | 0000000000000101\n",
        )]);
        assert!(check(&l).is_ok());
    }

    #[test]
    fn repeated_mnemonics() {
        let l = listing(&[
            (
                "rvc.txt",
                "c.nop | ci | | 0000000000000001\n",
            ),
            (
                "rvc2.txt",
                "c.nop | ci | | 0000000000000101\n\
                 add | r | rs2 rs1 rd | 0000000..........000.....0110011\n\
                 add | r | rs2 rs1 rd | 0000001..........000.....0110011\n",
            ),
        ]);
        let errors = check(&l).unwrap_err();
        let text = errors.to_string();
        assert_eq!(errors.errors().len(), 2, "{text}");
        assert!(
            text.contains("opcode `c.nop` is defined at rvc.txt:1 and again at rvc2.txt:1"),
            "{text}"
        );
        assert!(
            text.contains("opcode `add` is defined at rvc2.txt:2 and again at rvc2.txt:3"),
            "{text}"
        );
    }
}
