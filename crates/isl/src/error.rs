//! Error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors produced while compiling instruction set listings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A listing line is malformed.
    #[error("{}:{line}: error: {msg}", .path.display())]
    Parse {
        /// The error message.
        msg: String,
        /// The listing file the error occurs in.
        path: PathBuf,
        /// The 1-based line number of the offending line.
        line: usize,
    },

    /// An instruction's operand list does not have the shape its opcode
    /// class requires.
    #[error("{}:{line}: error: cannot rewrite operands of `{name}`: {msg}", .path.display())]
    Fixup {
        /// The mnemonic of the instruction.
        name: String,
        /// What was wrong with the operand list.
        msg: String,
        /// The listing file the instruction comes from.
        path: PathBuf,
        /// The line the instruction is defined on.
        line: usize,
    },

    /// Two non-compressed instructions have the same mask and match.
    #[error("duplicate instruction `{name}`: `{conflicting}` has the same encoding as `{existing}`")]
    DuplicateEncoding {
        /// The mnemonic of the later instruction.
        name: String,
        /// The earlier instruction, rendered as a listing line.
        existing: String,
        /// The later instruction, rendered as a listing line.
        conflicting: String,
    },

    /// The same mnemonic would be assigned two opcode ids.
    #[error("opcode `{name}` is defined at {first} and again at {second}")]
    DuplicateOpcode {
        /// The mnemonic.
        name: String,
        /// Location of the first definition (`file:line`).
        first: String,
        /// Location of the second definition (`file:line`).
        second: String,
    },

    /// A template does not honour its placeholder contract.
    #[error("{}: {msg}", .path.display())]
    Template {
        /// The template file.
        path: PathBuf,
        /// The error message.
        msg: String,
    },

    /// An emitter was asked to generate code for an empty listing.
    #[error("no instructions to emit into {}", .0.display())]
    NoInstructions(PathBuf),

    /// An instruction's operands do not fit the positional layout of the
    /// generated info record.
    #[error("operands of `{name}` do not fit an info record: {msg}")]
    OperandLayout {
        /// The mnemonic of the instruction.
        name: String,
        /// The error message.
        msg: String,
    },

    /// The decode trie could not be built or failed its self-check.
    #[error("decode trie: {0}")]
    Trie(String),

    /// Reading or writing a file failed.
    #[error("{}: {source}", .path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Error {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-empty collection of errors, reported together.
#[derive(Debug)]
pub struct Errors(pub Vec<Error>);

impl Errors {
    /// The individual errors, in the order they were found.
    pub fn errors(&self) -> &[Error] {
        &self.0
    }

    /// Turn a list of errors into `Ok(())` when empty, `Err` otherwise.
    pub fn from_vec(errors: Vec<Error>) -> Result<(), Errors> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Errors(errors))
        }
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl From<Error> for Errors {
    fn from(e: Error) -> Errors {
        Errors(vec![e])
    }
}
