//! Parsed instructions and the listing that owns them.

use crate::catalog::{Field, Format};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

declare_id!(
    /// The index of an instruction within its [`Listing`].
    InstId
);

/// A source position: a listing file and a line in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
pub struct Pos {
    /// Index into [`Listing::files`].
    pub file: usize,
    /// The 1-based line number.
    pub line: usize,
}

/// One instruction encoding parsed from a listing line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// The mnemonic, e.g. `addi` or `c.lw`.
    pub name: String,
    /// The layout class.
    pub format: Format,
    /// Bits set here are fixed by the encoding.
    pub mask: u32,
    /// The values of the fixed bits (the encoding's `match`). Bits outside
    /// `mask` are always zero.
    pub value: u32,
    /// Operand fields; the order is the argument order of generated code,
    /// reversed.
    pub fields: Vec<Field>,
    /// The extension tag, i.e. the base name of the listing file.
    pub ext: String,
    /// Where the instruction was defined.
    pub pos: Pos,
}

impl Instruction {
    /// Whether this is a 16-bit compressed instruction.
    pub fn is_compressed(&self) -> bool {
        (self.value & 0b11) != 0b11
    }

    /// Whether `word` is an encoding of this instruction.
    pub fn matches(&self, word: u32) -> bool {
        word & self.mask == self.value
    }

    /// The number of fixed bits.
    pub fn fixed_bits(&self) -> u32 {
        self.mask.count_ones()
    }

    /// The name used for the opcode constant and the macro, e.g. `c_addi`
    /// for `c.addi`.
    pub fn formatted_name(&self) -> String {
        self.name.to_lowercase().replace('.', "_")
    }

    /// The extension enumerator, e.g. `RISCV64_ISA_EXT_RV64I`.
    pub fn formatted_ext(&self) -> String {
        let ext: String = self
            .ext
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("RISCV64_ISA_EXT_{ext}")
    }

    /// The encoding as a bit pattern, most significant bit first.
    pub fn pattern(&self) -> String {
        let width = if self.is_compressed() { 16 } else { 32 };
        (0..width)
            .rev()
            .map(|bit| {
                if (self.mask >> bit) & 1 == 0 {
                    '.'
                } else if (self.value >> bit) & 1 == 1 {
                    '1'
                } else {
                    '0'
                }
            })
            .collect()
    }
}

impl fmt::Display for Instruction {
    /// Formats the instruction as a listing line with its extension appended.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<String> = self.fields.iter().map(|f| f.to_string()).collect();
        write!(
            f,
            "{} | {} | {} | {} | {}",
            self.name,
            self.format,
            fields.join(" "),
            self.pattern(),
            self.ext
        )
    }
}

/// An ordered sequence of instructions together with the files they came
/// from.
#[derive(Clone, Debug, Default)]
pub struct Listing {
    files: Vec<PathBuf>,
    instructions: Vec<Instruction>,
}

impl Listing {
    /// Create a listing. Every instruction's `pos.file` must index `files`.
    pub fn new(files: Vec<PathBuf>, instructions: Vec<Instruction>) -> Listing {
        debug_assert!(instructions.iter().all(|i| i.pos.file < files.len()));
        Listing {
            files,
            instructions,
        }
    }

    /// The listing files, in the order they were read.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// The instructions, in listing order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Mutable access for the fixup pass.
    pub fn instructions_mut(&mut self) -> &mut [Instruction] {
        &mut self.instructions
    }

    /// The number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether there are no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterate over instructions with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (InstId, &Instruction)> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstId(i), inst))
    }

    /// The file an instruction was defined in.
    pub fn file(&self, pos: Pos) -> &Path {
        &self.files[pos.file]
    }

    /// Render a position as `file:line`.
    pub fn location(&self, pos: Pos) -> String {
        format!("{}:{}", self.file(pos).display(), pos.line)
    }

    /// Number the opcodes of this listing.
    pub fn opcodes(&self) -> Opcodes {
        Opcodes::new(self)
    }
}

impl Index<InstId> for Listing {
    type Output = Instruction;

    fn index(&self, id: InstId) -> &Instruction {
        &self.instructions[id.index()]
    }
}

/// The opcode numbering of a listing.
///
/// Each distinct mnemonic gets one opcode, numbered in order of first
/// appearance. Compressed variants sharing a mnemonic share its opcode; the
/// first variant represents it in generated tables.
#[derive(Clone, Debug)]
pub struct Opcodes {
    first: Vec<InstId>,
    of_inst: Vec<usize>,
}

impl Opcodes {
    fn new(listing: &Listing) -> Opcodes {
        let mut first = Vec::new();
        let mut of_inst = Vec::with_capacity(listing.len());
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (id, inst) in listing.iter() {
            let op = *by_name.entry(inst.name.as_str()).or_insert_with(|| {
                first.push(id);
                first.len() - 1
            });
            of_inst.push(op);
        }
        Opcodes { first, of_inst }
    }

    /// The number of opcodes.
    pub fn len(&self) -> usize {
        self.first.len()
    }

    /// The zero-based opcode index of an instruction.
    pub fn index_of(&self, id: InstId) -> usize {
        self.of_inst[id.index()]
    }

    /// The instruction representing each opcode, in opcode order.
    pub fn representatives(&self) -> impl Iterator<Item = InstId> + '_ {
        self.first.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(name: &str, mask: u32, value: u32, file: usize) -> Instruction {
        Instruction {
            name: name.to_string(),
            format: Format::I,
            mask,
            value,
            fields: vec![Field::I_IMM, Field::RS1, Field::RD],
            ext: "rv64i".to_string(),
            pos: Pos { file, line: 1 },
        }
    }

    #[test]
    fn renders_as_listing_line() {
        let i = inst("addi", 0x707f, 0x13, 0);
        assert_eq!(
            i.to_string(),
            "addi | i | i_imm rs1 rd | .................000.....0010011 | rv64i"
        );
        assert!(!i.is_compressed());
        assert!(i.matches(0x0010_0093));
        assert!(!i.matches(0x0010_1093));
    }

    #[test]
    fn names() {
        let mut i = inst("c.addi", 0xe003, 0x1, 0);
        i.ext = "rv64zb-x".to_string();
        assert!(i.is_compressed());
        assert_eq!(i.formatted_name(), "c_addi");
        assert_eq!(i.formatted_ext(), "RISCV64_ISA_EXT_RV64ZB_X");
        assert_eq!(i.pattern(), "000...........01");
    }

    #[test]
    fn compressed_variants_share_an_opcode() {
        let listing = Listing::new(
            vec![PathBuf::from("rvc.txt")],
            vec![
                inst("c.a", 0xffff, 0x1, 0),
                inst("c.b", 0xffff, 0x5, 0),
                inst("c.a", 0xffff, 0x9, 0),
            ],
        );
        let ops = listing.opcodes();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops.index_of(InstId(0)), 0);
        assert_eq!(ops.index_of(InstId(1)), 1);
        assert_eq!(ops.index_of(InstId(2)), 0);
        assert_eq!(
            ops.representatives().collect::<Vec<_>>(),
            vec![InstId(0), InstId(1)]
        );
    }
}
