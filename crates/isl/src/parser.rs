//! Parser for instruction set listing files.
//!
//! A listing line has four `|`-separated columns: mnemonic, format, a
//! space-separated field list and a bit pattern. Everything after `#` is a
//! comment.

use crate::catalog::{Field, Format};
use crate::error::{Error, Errors};
use crate::listing::{Instruction, Listing, Pos};
use std::fs;
use std::path::{Path, PathBuf};

/// Mnemonics with this prefix are compressed and have 16-bit patterns.
pub const COMPRESSED_PREFIX: &str = "c.";

/// The canonical illegal instruction; it is written as a 16-bit pattern.
pub const UNIMP: &str = "unimp";

/// The file extension of listing files.
pub const LISTING_EXTENSION: &str = "txt";

/// The result of parsing a set of listing files.
///
/// Parsing stops at the first bad line of a file but always moves on to the
/// next file, so `results` holds one entry per file.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// The files that were parsed, in order.
    pub files: Vec<PathBuf>,
    /// Per file, the number of instructions parsed or the error that stopped
    /// parsing it.
    pub results: Vec<Result<usize, Error>>,
    /// Instructions from every file that parsed successfully.
    pub instructions: Vec<Instruction>,
}

impl ParseOutcome {
    /// Produce the listing, or every error encountered.
    pub fn into_listing(self) -> Result<Listing, Errors> {
        let errors: Vec<Error> = self.results.into_iter().filter_map(|r| r.err()).collect();
        Errors::from_vec(errors)?;
        Ok(Listing::new(self.files, self.instructions))
    }
}

/// Parse every listing file in `dir`.
pub fn parse_dir(dir: &Path) -> Result<Listing, Errors> {
    let paths = listing_files(dir)?;
    parse_files(&paths).into_listing()
}

/// The listing files in `dir`, sorted by name so that opcode numbering does
/// not depend on directory iteration order.
pub fn listing_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == LISTING_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Parse the given listing files, in order.
pub fn parse_files(paths: &[PathBuf]) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for (file, path) in paths.iter().enumerate() {
        let parsed = fs::read_to_string(path)
            .map_err(|e| Error::io(path, e))
            .and_then(|src| parse_str(file, path, &src));
        match parsed {
            Ok(instructions) => {
                log::debug!(
                    "{}: {} instructions",
                    path.display(),
                    instructions.len()
                );
                outcome.results.push(Ok(instructions.len()));
                outcome.instructions.extend(instructions);
            }
            Err(e) => outcome.results.push(Err(e)),
        }
        outcome.files.push(path.clone());
    }
    outcome
}

/// The extension tag of a listing file: its base name without extension.
pub fn extension_tag(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse the contents of one listing file.
///
/// `file` is the index recorded in each instruction's [`Pos`], and `path`
/// provides the extension tag and error locations.
pub fn parse_str(file: usize, path: &Path, src: &str) -> Result<Vec<Instruction>, Error> {
    let ext = extension_tag(path);
    let mut instructions = vec![];
    for (i, raw) in src.lines().enumerate() {
        let line = match raw.find('#') {
            Some(comment) => &raw[..comment],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let pos = Pos { file, line: i + 1 };
        let inst = parse_line(line, &ext, pos).map_err(|msg| Error::Parse {
            msg,
            path: path.to_path_buf(),
            line: pos.line,
        })?;
        instructions.push(inst);
    }
    Ok(instructions)
}

fn parse_line(line: &str, ext: &str, pos: Pos) -> Result<Instruction, String> {
    let tokens: Vec<&str> = line.split('|').map(str::trim).collect();
    let &[name, format, fields, pattern] = &tokens[..] else {
        return Err(format!(
            "expected 4 `|`-separated columns, found {}",
            tokens.len()
        ));
    };
    if name.is_empty() {
        return Err("missing mnemonic".to_string());
    }

    let format = Format::from_isl(format)
        .ok_or_else(|| format!("`{name}`: unknown instruction format `{format}`"))?;
    let fields = fields
        .split_whitespace()
        .map(|f| Field::from_isl(f).ok_or_else(|| format!("`{name}`: unknown field `{f}`")))
        .collect::<Result<Vec<_>, _>>()?;

    let width = pattern.chars().count();
    let expected = pattern_width(name);
    let kind = if expected == 16 {
        "compressed"
    } else {
        "uncompressed"
    };
    if width != expected {
        return Err(format!(
            "`{name}`: invalid {kind} instruction size: {width} != {expected}"
        ));
    }
    if format.is_compressed() != (expected == 16) {
        return Err(format!(
            "`{name}`: format `{format}` cannot encode {kind} instructions"
        ));
    }
    let (mask, value) = parse_pattern(pattern)
        .map_err(|c| format!("`{name}`: invalid character `{c}` in bit pattern `{pattern}`"))?;

    Ok(Instruction {
        name: name.to_string(),
        format,
        mask,
        value,
        fields,
        ext: ext.to_string(),
        pos,
    })
}

/// The required width of the bit pattern of `name`.
pub fn pattern_width(name: &str) -> usize {
    if name.starts_with(COMPRESSED_PREFIX) || name == UNIMP {
        16
    } else {
        32
    }
}

/// Turn a bit pattern into a `(mask, match)` pair.
///
/// The last character is bit 0. `1` and `0` are fixed bits, `.` is a bit the
/// encoding leaves free; any other character is returned as the error.
pub fn parse_pattern(pattern: &str) -> Result<(u32, u32), char> {
    let mut mask = 0u32;
    let mut value = 0u32;
    for c in pattern.chars() {
        mask <<= 1;
        value <<= 1;
        match c {
            '.' => {}
            '0' => mask |= 1,
            '1' => {
                mask |= 1;
                value |= 1;
            }
            other => return Err(other),
        }
    }
    Ok((mask, value))
}
