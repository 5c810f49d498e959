use crate::loc::Loc;
use crate::token::TT;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Formatter;
use std::error::Error;
use std::fmt::Display;

/// A stable classification of syntax errors produced by the parser.
///
/// Diagnostic codes (prefix `DS`) are assigned per variant and are stable:
/// - `DS0001`: [`SyntaxErrorType::ExpectedNotFound`]
/// - `DS0002`: [`SyntaxErrorType::ExpectedSyntax`]
/// - `DS0003`: [`SyntaxErrorType::RequiredTokenNotFound`]
/// - `DS0004`: [`SyntaxErrorType::UnexpectedEnd`]
/// - `DS0005`: [`SyntaxErrorType::UnterminatedBlock`]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SyntaxErrorType {
  ExpectedNotFound,
  ExpectedSyntax(&'static str),
  RequiredTokenNotFound(TT),
  UnexpectedEnd,
  UnterminatedBlock,
}

#[derive(Clone)]
pub struct SyntaxError {
  pub typ: SyntaxErrorType,
  pub loc: Loc,
  pub actual_token: Option<TT>,
}

impl SyntaxError {
  pub fn new(typ: SyntaxErrorType, loc: Loc, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError {
      typ,
      loc,
      actual_token,
    }
  }

  /// Renders `line:column` (both 1-based) of the error start within `source`.
  pub fn position(&self, source: &str) -> (usize, usize) {
    let upto = &source[..self.loc.0.min(source.len())];
    let line = upto.matches('\n').count() + 1;
    let column = upto.rfind('\n').map_or(upto.len(), |nl| upto.len() - nl - 1) + 1;
    (line, column)
  }
}

impl Debug for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} around loc [{}:{}]", self, self.loc.0, self.loc.1)
  }
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} ({})",
      self.typ.message(self.actual_token),
      self.typ.code()
    )
  }
}

impl Error for SyntaxError {}

impl PartialEq for SyntaxError {
  fn eq(&self, other: &Self) -> bool {
    self.typ == other.typ
  }
}

impl Eq for SyntaxError {}

pub type SyntaxResult<T> = Result<T, SyntaxError>;

impl SyntaxErrorType {
  /// Stable diagnostic code for this syntax error variant.
  pub fn code(&self) -> &'static str {
    match self {
      SyntaxErrorType::ExpectedNotFound => "DS0001",
      SyntaxErrorType::ExpectedSyntax(_) => "DS0002",
      SyntaxErrorType::RequiredTokenNotFound(_) => "DS0003",
      SyntaxErrorType::UnexpectedEnd => "DS0004",
      SyntaxErrorType::UnterminatedBlock => "DS0005",
    }
  }

  /// Human-readable message describing this syntax error.
  pub fn message(&self, actual_token: Option<TT>) -> String {
    let found = actual_token
      .map(|tok| format!(", found {:?}", tok))
      .unwrap_or_default();
    match self {
      SyntaxErrorType::ExpectedNotFound => format!("expected token not found{found}"),
      SyntaxErrorType::ExpectedSyntax(expected) => format!("expected {expected}{found}"),
      SyntaxErrorType::RequiredTokenNotFound(token) => format!("expected token {token:?}{found}"),
      SyntaxErrorType::UnexpectedEnd => "unexpected end of input".into(),
      SyntaxErrorType::UnterminatedBlock => "unterminated block".into(),
    }
  }
}
