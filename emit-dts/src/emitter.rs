//! Line-oriented text buffer used by the printers.
//!
//! Indentation is written lazily: [`Emitter::indent`] and [`Emitter::dedent`] change the level
//! and the first non-empty write on each line is prefixed accordingly, so callers never emit
//! leading whitespace themselves.

use parse_dts::loc::Loc;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indent {
  Spaces(u8),
  Tab,
}

/// Options for configuring output.
#[derive(Clone, Copy, Debug)]
pub struct EmitOptions {
  pub indent: Indent,
}

impl Default for EmitOptions {
  fn default() -> Self {
    EmitOptions {
      indent: Indent::Spaces(2),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitErrorKind {
  /// A node appeared where its syntax category cannot be printed, e.g. a type in statement
  /// position.
  Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitError {
  pub kind: EmitErrorKind,
  pub loc: Option<Loc>,
}

impl EmitError {
  pub(crate) fn unsupported(message: &'static str) -> Self {
    Self {
      kind: EmitErrorKind::Unsupported(message),
      loc: None,
    }
  }

  pub(crate) fn with_loc(mut self, loc: Loc) -> Self {
    if self.loc.is_none() && loc != Loc::SYNTHETIC {
      self.loc = Some(loc);
    }
    self
  }
}

impl fmt::Display for EmitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.kind {
      EmitErrorKind::Unsupported(what) => write!(f, "cannot print {what}")?,
    };
    if let Some(loc) = self.loc {
      write!(f, " at [{}:{}]", loc.0, loc.1)?;
    }
    Ok(())
  }
}

impl std::error::Error for EmitError {}

pub type EmitResult = Result<(), EmitError>;

#[derive(Debug, Clone)]
pub struct Emitter {
  out: String,
  opts: EmitOptions,
  level: usize,
  line_start: bool,
}

impl Emitter {
  pub fn new(opts: EmitOptions) -> Self {
    Emitter {
      out: String::new(),
      opts,
      level: 0,
      line_start: true,
    }
  }

  pub fn with_capacity(capacity: usize, opts: EmitOptions) -> Self {
    Emitter {
      out: String::with_capacity(capacity),
      opts,
      level: 0,
      line_start: true,
    }
  }

  pub fn options(&self) -> EmitOptions {
    self.opts
  }

  pub fn as_str(&self) -> &str {
    &self.out
  }

  pub fn into_string(self) -> String {
    self.out
  }

  pub fn len(&self) -> usize {
    self.out.len()
  }

  pub fn is_empty(&self) -> bool {
    self.out.is_empty()
  }

  fn write_indent(&mut self) {
    for _ in 0..self.level {
      match self.opts.indent {
        Indent::Spaces(n) => {
          for _ in 0..n {
            self.out.push(' ');
          }
        }
        Indent::Tab => self.out.push('\t'),
      }
    }
  }

  /// Writes a fragment as-is. Line breaks inside it are not followed by indentation.
  pub fn write_str(&mut self, s: &str) {
    if s.is_empty() {
      return;
    }
    if self.line_start {
      self.write_indent();
      self.line_start = false;
    }
    self.out.push_str(s);
  }

  /// Writes text that may span lines, indenting each line at the current level.
  pub fn write_multiline(&mut self, s: &str) {
    for (i, line) in s.split('\n').enumerate() {
      if i > 0 {
        self.newline();
      }
      self.write_str(line.trim_end_matches('\r'));
    }
  }

  pub fn newline(&mut self) {
    self.out.push('\n');
    self.line_start = true;
  }

  pub fn indent(&mut self) {
    self.level += 1;
  }

  pub fn dedent(&mut self) {
    self.level = self.level.saturating_sub(1);
  }
}
