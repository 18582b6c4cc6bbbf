//! The opcode enumeration, `opcode_api.h`.

use super::{Emitted, emit_file};
use crate::error::Error;
use crate::listing::Listing;
use crate::srcgen::{Formatter, Template, fmtln};
use std::path::Path;

/// The template file name.
pub const TEMPLATE: &str = "opcode_api.h.in";

/// The output file name.
pub const OUTPUT: &str = "opcode_api.h";

/// Replaced by the generated enumerators.
pub const PLACEHOLDER: &str = "@OPCODES@";

/// Lines containing this are enumerators already present in the template.
const MARKER: &str = "*/ OP_";

/// Emit the opcode enumeration.
///
/// Returns the id of the first generated opcode along with the outcome;
/// the info emitter needs it to number trie leaves.
pub fn emit(
    listing: &Listing,
    template_dir: &Path,
    output_dir: &Path,
) -> Result<(Emitted, usize), Error> {
    let mut first = 0;
    let emitted = emit_file(listing, template_dir, TEMPLATE, output_dir, OUTPUT, |t| {
        let (text, offset) = render(listing, t)?;
        first = offset;
        Ok(text)
    })?;
    Ok((emitted, first))
}

/// Render the template, returning the text and the first generated id.
pub fn render(listing: &Listing, template: &Template) -> Result<(String, usize), Error> {
    let first = op_offset(template);
    let mut fmt = Formatter::default();
    fmt.indent(|fmt| {
        for (i, id) in listing.opcodes().representatives().enumerate() {
            let inst = &listing[id];
            let idx = first + i;
            fmtln!(
                fmt,
                "/* {idx:3} */ OP_{} = {idx},   /**< {} {} opcode. */",
                inst.formatted_name(),
                inst.ext,
                inst.name
            );
        }
    });
    let text = template.substitute(PLACEHOLDER, &fmt.finish())?;
    Ok((text, first))
}

/// The id of the first generated opcode: one past the last enumerator
/// numbered `/* N */ OP_...` in front of the placeholder.
pub fn op_offset(template: &Template) -> usize {
    let mut last = None;
    for line in template.lines_before(PLACEHOLDER) {
        if !line.contains(MARKER) {
            continue;
        }
        match marker_id(line) {
            Some(n) => last = Some(n),
            None => log::warn!(
                "{}: opcode line without an index: `{}`",
                template.path().display(),
                line.trim()
            ),
        }
    }
    match last {
        Some(n) => n + 1,
        None => {
            log::warn!(
                "{}: starting opcode index not found, using 0",
                template.path().display()
            );
            0
        }
    }
}

fn marker_id(line: &str) -> Option<usize> {
    let rest = line.trim_start().strip_prefix("/*")?;
    let (id, _) = rest.split_once("*/")?;
    id.trim().parse().ok()
}
