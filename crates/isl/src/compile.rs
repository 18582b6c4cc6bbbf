//! Compilation front end, from listing files to a checked listing.
//!
//! The emitters in [`crate::emit`] take the listing from here.

use crate::error::Errors;
use crate::listing::Listing;
use crate::{check, fixup, parser};
use std::path::Path;

/// Options passed to every pipeline stage.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Log the parsed listing, every operand rewrite and every trie split.
    pub verbose: bool,
}

/// Parse every listing file in `isl_dir`, rewrite operand lists and check
/// the result.
pub fn frontend(isl_dir: &Path, options: &Options) -> Result<Listing, Errors> {
    let mut listing = parser::parse_dir(isl_dir)?;
    if options.verbose {
        for inst in listing.instructions() {
            log::debug!("{inst}");
        }
    }
    fixup::run(&mut listing, options.verbose)?;
    check::check(&listing)?;
    log::info!(
        "{} instructions ({} opcodes) from {} files",
        listing.len(),
        listing.opcodes().len(),
        listing.files().len()
    );
    Ok(listing)
}
