//! Helpers for generating C source and writing it out.
//!
//! Emitters render into a [`Formatter`], splice the result into a
//! [`Template`] and hand the text to [`update_file`], which leaves the output
//! alone when nothing changed.

use crate::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

static SHIFTWIDTH: usize = 4;

/// Append a formatted line to a [`Formatter`].
macro_rules! fmtln {
    ($fmt:ident, $fmtstring:expr, $($fmtargs:expr),*) => {
        $fmt.line(format!($fmtstring, $($fmtargs),*))
    };

    ($fmt:ident, $arg:expr) => {{
        $fmt.line(format!($arg))
    }};

    ($_:tt, $($args:expr),+) => {
        compile_error!("This macro requires at least two arguments: the Formatter instance and a format string.")
    };

    ($_:tt) => {
        compile_error!("This macro requires at least two arguments: the Formatter instance and a format string.")
    };
}
pub(crate) use fmtln;

/// Collect generated lines and keep track of indentation.
#[derive(Default)]
pub struct Formatter {
    indent: usize,
    lines: Vec<String>,
}

impl Formatter {
    /// Construct a [`Formatter`] whose first line names the generator.
    pub fn new(generated_by: &str) -> Self {
        let mut fmt = Self::default();
        fmt.comment(format!("This file is generated by {generated_by}."));
        fmt
    }

    /// Increase current indentation level by one.
    pub fn indent_push(&mut self) {
        self.indent += 1;
    }

    /// Decrease indentation by one level.
    pub fn indent_pop(&mut self) {
        debug_assert!(self.indent > 0, "Already at top level indentation");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write all formatting commands in `f` while indented one level.
    pub fn indent<T, F: FnOnce(&mut Formatter) -> T>(&mut self, f: F) -> T {
        self.indent_push();
        let ret = f(self);
        self.indent_pop();
        ret
    }

    /// Add an indented line. Embedded newlines start further lines at the
    /// same indentation.
    pub fn line(&mut self, contents: impl AsRef<str>) {
        let indent = " ".repeat(self.indent * SHIFTWIDTH);
        for l in contents.as_ref().split('\n') {
            if l.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{indent}{l}"));
            }
        }
    }

    /// Push an empty line.
    pub fn empty_line(&mut self) {
        self.lines.push(String::new());
    }

    /// Add a C comment line.
    pub fn comment(&mut self, s: impl AsRef<str>) {
        self.line(format!("/* {} */", s.as_ref()));
    }

    /// Add a doc comment line, as used in front of declarations.
    pub fn doc_comment(&mut self, s: impl AsRef<str>) {
        self.line(format!("/** {} */", s.as_ref()));
    }

    /// The collected lines, separated by newlines and without a trailing
    /// one.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// A template file with a placeholder to be replaced by generated code.
#[derive(Clone, Debug)]
pub struct Template {
    path: PathBuf,
    text: String,
}

impl Template {
    /// Read a template from disk.
    pub fn load(path: &Path) -> Result<Template, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Template::new(path, text))
    }

    /// A template with the given contents; `path` is used in diagnostics.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Template {
        Template {
            path: path.into(),
            text: text.into(),
        }
    }

    /// The template file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lines in front of the line holding `placeholder`.
    pub fn lines_before<'a>(&'a self, placeholder: &'a str) -> impl Iterator<Item = &'a str> {
        self.text.lines().take_while(move |l| !l.contains(placeholder))
    }

    /// Replace the single occurrence of `placeholder` with `generated`.
    pub fn substitute(&self, placeholder: &str, generated: &str) -> Result<String, Error> {
        match self.text.matches(placeholder).count() {
            1 => Ok(self.text.replacen(placeholder, generated, 1)),
            0 => Err(self.error(format!("placeholder `{placeholder}` not found"))),
            n => Err(self.error(format!(
                "placeholder `{placeholder}` appears {n} times, expected once"
            ))),
        }
    }

    /// A [`Error::Template`] for this template.
    pub fn error(&self, msg: String) -> Error {
        Error::Template {
            path: self.path.clone(),
            msg,
        }
    }
}

/// The outcome of [`update_file`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Update {
    /// The file was created or its contents replaced.
    Written,
    /// The file already had the requested contents and was not touched.
    Unchanged,
}

/// Write `contents` to `path` unless the file already holds exactly that.
pub fn update_file(path: &Path, contents: &str) -> Result<Update, Error> {
    if let Ok(existing) = fs::read(path) {
        if existing == contents.as_bytes() {
            log::debug!("{}: unchanged", path.display());
            return Ok(Update::Unchanged);
        }
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))?;
    log::debug!("{}: written", path.display());
    Ok(Update::Written)
}
