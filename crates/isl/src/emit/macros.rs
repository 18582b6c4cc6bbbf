//! Instruction creation macros, `instr_create_api.h`.

use super::{Emitted, emit_file};
use crate::catalog::Field;
use crate::error::Error;
use crate::listing::{Instruction, Listing};
use crate::srcgen::{Formatter, Template, fmtln};
use std::path::Path;

/// The template file name.
pub const TEMPLATE: &str = "instr_create_api.h.in";

/// The output file name.
pub const OUTPUT: &str = "instr_create_api.h";

/// Replaced by the generated macros.
pub const PLACEHOLDER: &str = "@INSTR_MACROS@";

/// Emit one `INSTR_CREATE_*` macro per opcode.
pub fn emit(listing: &Listing, template_dir: &Path, output_dir: &Path) -> Result<Emitted, Error> {
    emit_file(listing, template_dir, TEMPLATE, output_dir, OUTPUT, |t| {
        render(listing, t)
    })
}

/// Render the template.
pub fn render(listing: &Listing, template: &Template) -> Result<String, Error> {
    let mut fmt = Formatter::default();
    for (i, id) in listing.opcodes().representatives().enumerate() {
        if i > 0 {
            fmt.empty_line();
        }
        create_macro(&mut fmt, &listing[id]);
    }
    template.substitute(PLACEHOLDER, &fmt.finish())
}

fn create_macro(fmt: &mut Formatter, inst: &Instruction) {
    let fields: Vec<Field> = inst.fields.iter().rev().copied().collect();
    let args: String = fields
        .iter()
        .map(|f| format!(", {}", f.formatted_name()))
        .collect();
    let ndst = fields.iter().filter(|f| f.is_dest()).count();
    let nsrc = fields.len() - ndst;
    let name = inst.formatted_name();

    fmt.line("/**");
    fmtln!(fmt, " * Creates a {} instruction.", inst.name);
    fmt.line(" *");
    fmt.line(" * \\param dc      The void * dcontext used to allocate memory for the instr_t.");
    for f in &fields {
        fmtln!(fmt, " * \\param {:6}  {}", f.formatted_name(), f.doc());
    }
    fmt.line(" */");
    fmtln!(fmt, "#define INSTR_CREATE_{name}(dc{args}) \\");
    fmtln!(fmt, "    instr_create_{ndst}dst_{nsrc}src(dc, OP_{name}{args})");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::tests::sample;

    fn rendered() -> String {
        let t = Template::new(TEMPLATE, "#ifndef X\n@INSTR_MACROS@\n#endif\n");
        render(&sample(), &t).unwrap()
    }

    #[test]
    fn operands_are_reversed_and_counted() {
        let text = rendered();
        let lw = format!(
            "/**
 * Creates a lw instruction.
 *
 * \\param dc      The void * dcontext used to allocate memory for the instr_t.
 * \\param Rd      {}
 * \\param Mem     {}
 */
#define INSTR_CREATE_lw(dc, Rd, Mem) \\
    instr_create_1dst_1src(dc, OP_lw, Rd, Mem)
",
            Field::RD.doc(),
            Field::V_L_RS1_DISP.doc()
        );
        assert!(text.contains(&lw), "{text}");

        // The store's memory operand is its destination.
        assert!(
            text.contains("#define INSTR_CREATE_sd(dc, Rs2, Mem) \\\n    instr_create_1dst_1src(dc, OP_sd, Rs2, Mem)"),
            "{text}"
        );
        // The branch target comes first.
        assert!(
            text.contains("#define INSTR_CREATE_beq(dc, Imm, Rs1, Rs2) \\\n    instr_create_0dst_3src(dc, OP_beq, Imm, Rs1, Rs2)"),
            "{text}"
        );
    }

    #[test]
    fn nullary_and_shared_opcodes() {
        let text = rendered();
        assert!(
            text.contains("#define INSTR_CREATE_ecall(dc) \\\n    instr_create_0dst_0src(dc, OP_ecall)"),
            "{text}"
        );
        assert_eq!(text.matches("#define INSTR_CREATE_c_nop(").count(), 1);
        assert_eq!(text.matches("#define ").count(), 7);
        assert!(text.starts_with("#ifndef X\n/**\n"), "{text}");
        assert!(text.ends_with("OP_c_lw, Rd, Mem)\n#endif\n"), "{text}");
    }
}
