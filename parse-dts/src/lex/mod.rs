use crate::char::is_id_continue;
use crate::char::is_id_start;
use crate::char::is_line_terminator;
use crate::char::is_whitespace;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use aho_corasick::AhoCorasick;
use aho_corasick::AhoCorasickBuilder;
use aho_corasick::AhoCorasickKind;
use aho_corasick::Anchored;
use aho_corasick::Input;
use aho_corasick::MatchKind;
use aho_corasick::StartKind;
use core::ops::Index;
use memchr::memchr;
use memchr::memchr2;
use memchr::memchr3;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

#[cfg(test)]
mod tests;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LexMode {
  SlashIsRegex,
  Standard,
  // Resume a template literal after the `}` closing a substitution.
  TemplateContinue,
}

#[derive(Copy, Clone)]
pub struct LexerCheckpoint {
  next: usize,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CommentKind {
  Line,
  Block,
}

/// A comment skipped while lexing. `text` is the raw source including its delimiters.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Comment {
  pub loc: Loc,
  pub kind: CommentKind,
  pub text: String,
}

impl Comment {
  /// Whether this is a `/** ... */` documentation comment.
  pub fn is_jsdoc(&self) -> bool {
    self.kind == CommentKind::Block && self.text.starts_with("/**") && self.text != "/**/"
  }

  /// Whether this is a `//#region` style marker emitted by bundlers.
  pub fn is_region_marker(&self) -> bool {
    self.kind == CommentKind::Line && self.text[2..].trim_start().starts_with('#')
  }
}

struct PatternMatcher {
  patterns: Vec<TT>,
  matcher: AhoCorasick,
}

impl PatternMatcher {
  fn new(patterns: &[(TT, &str)]) -> Self {
    let (tts, syns): (Vec<_>, Vec<_>) = patterns.iter().copied().unzip();
    let matcher = AhoCorasickBuilder::new()
      .start_kind(StartKind::Anchored)
      .kind(Some(AhoCorasickKind::DFA))
      .match_kind(MatchKind::LeftmostLongest)
      .build(syns)
      .expect("punctuator patterns are static and valid");
    PatternMatcher {
      patterns: tts,
      matcher,
    }
  }

  fn find(&self, rest: &str) -> Option<(TT, usize)> {
    self
      .matcher
      .find(Input::new(rest).anchored(Anchored::Yes))
      .map(|m| (self.patterns[m.pattern().as_usize()], m.end()))
  }
}

#[rustfmt::skip]
static PUNCTUATORS: Lazy<PatternMatcher> = Lazy::new(|| {
  PatternMatcher::new(&[
    (TT::Ampersand, "&"),
    (TT::AmpersandAmpersand, "&&"),
    (TT::AssignmentOperator, "&&="),
    (TT::AssignmentOperator, "&="),
    (TT::Asterisk, "*"),
    (TT::AsteriskAsterisk, "**"),
    (TT::AssignmentOperator, "**="),
    (TT::AssignmentOperator, "*="),
    (TT::At, "@"),
    (TT::Bar, "|"),
    (TT::BarBar, "||"),
    (TT::AssignmentOperator, "||="),
    (TT::AssignmentOperator, "|="),
    (TT::BraceClose, "}"),
    (TT::BraceOpen, "{"),
    (TT::BracketClose, "]"),
    (TT::BracketOpen, "["),
    (TT::Caret, "^"),
    (TT::AssignmentOperator, "^="),
    (TT::ChevronLeft, "<"),
    (TT::ChevronLeftChevronLeft, "<<"),
    (TT::AssignmentOperator, "<<="),
    (TT::ChevronLeftEquals, "<="),
    (TT::ChevronRight, ">"),
    (TT::Colon, ":"),
    (TT::Comma, ","),
    (TT::Dot, "."),
    (TT::DotDotDot, "..."),
    (TT::Equals, "="),
    (TT::EqualsChevronRight, "=>"),
    (TT::EqualsEquals, "=="),
    (TT::EqualsEqualsEquals, "==="),
    (TT::Exclamation, "!"),
    (TT::ExclamationEquals, "!="),
    (TT::ExclamationEqualsEquals, "!=="),
    (TT::Hyphen, "-"),
    (TT::AssignmentOperator, "-="),
    (TT::HyphenHyphen, "--"),
    (TT::ParenthesisClose, ")"),
    (TT::ParenthesisOpen, "("),
    (TT::Percent, "%"),
    (TT::AssignmentOperator, "%="),
    (TT::Plus, "+"),
    (TT::AssignmentOperator, "+="),
    (TT::PlusPlus, "++"),
    (TT::Question, "?"),
    (TT::QuestionDot, "?."),
    (TT::QuestionQuestion, "??"),
    (TT::AssignmentOperator, "??="),
    (TT::Semicolon, ";"),
    (TT::Slash, "/"),
    (TT::AssignmentOperator, "/="),
    (TT::Tilde, "~"),
  ])
});

pub static KEYWORDS: Lazy<HashMap<&'static str, TT>> = Lazy::new(|| {
  let mut map = HashMap::new();
  map.insert("break", TT::KeywordBreak);
  map.insert("case", TT::KeywordCase);
  map.insert("catch", TT::KeywordCatch);
  map.insert("class", TT::KeywordClass);
  map.insert("const", TT::KeywordConst);
  map.insert("continue", TT::KeywordContinue);
  map.insert("debugger", TT::KeywordDebugger);
  map.insert("default", TT::KeywordDefault);
  map.insert("delete", TT::KeywordDelete);
  map.insert("do", TT::KeywordDo);
  map.insert("else", TT::KeywordElse);
  map.insert("enum", TT::KeywordEnum);
  map.insert("export", TT::KeywordExport);
  map.insert("extends", TT::KeywordExtends);
  map.insert("false", TT::LiteralFalse);
  map.insert("finally", TT::KeywordFinally);
  map.insert("for", TT::KeywordFor);
  map.insert("function", TT::KeywordFunction);
  map.insert("if", TT::KeywordIf);
  map.insert("import", TT::KeywordImport);
  map.insert("in", TT::KeywordIn);
  map.insert("instanceof", TT::KeywordInstanceof);
  map.insert("new", TT::KeywordNew);
  map.insert("null", TT::LiteralNull);
  map.insert("return", TT::KeywordReturn);
  map.insert("super", TT::KeywordSuper);
  map.insert("switch", TT::KeywordSwitch);
  map.insert("this", TT::KeywordThis);
  map.insert("throw", TT::KeywordThrow);
  map.insert("true", TT::LiteralTrue);
  map.insert("try", TT::KeywordTry);
  map.insert("typeof", TT::KeywordTypeof);
  map.insert("var", TT::KeywordVar);
  map.insert("void", TT::KeywordVoid);
  map.insert("while", TT::KeywordWhile);
  map.insert("with", TT::KeywordWith);
  map
});

pub struct Lexer<'a> {
  source: &'a str,
  next: usize,
  // Keyed by start offset so re-lexing after a parser reset does not record a comment twice.
  comments: BTreeMap<usize, Comment>,
}

impl<'a> Lexer<'a> {
  pub fn new(code: &'a str) -> Lexer<'a> {
    Lexer {
      source: code,
      next: 0,
      comments: BTreeMap::new(),
    }
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  pub fn next(&self) -> usize {
    self.next
  }

  fn end(&self) -> usize {
    self.source.len()
  }

  fn at_end(&self) -> bool {
    self.next >= self.end()
  }

  fn rest(&self) -> &'a str {
    &self.source[self.next..]
  }

  fn peek_char(&self, n: usize) -> Option<char> {
    self.rest().chars().nth(n)
  }

  /// WARNING: Prefer checkpoints instead. Only use this if you know what you're doing.
  pub fn set_next(&mut self, next: usize) {
    self.next = next;
  }

  pub fn checkpoint(&self) -> LexerCheckpoint {
    LexerCheckpoint { next: self.next }
  }

  pub fn since_checkpoint(&self, checkpoint: LexerCheckpoint) -> Loc {
    Loc(checkpoint.next, self.next)
  }

  pub fn apply_checkpoint(&mut self, checkpoint: LexerCheckpoint) {
    self.next = checkpoint.next;
  }

  /// Comments whose start lies within `[start, end)`, in source order.
  pub fn comments_between(&self, start: usize, end: usize) -> impl Iterator<Item = &Comment> {
    self.comments.range(start..end).map(|(_, c)| c)
  }

  pub fn into_comments(self) -> Vec<Comment> {
    self.comments.into_values().collect()
  }

  fn skip(&mut self, n: usize) {
    debug_assert!(self.next + n <= self.end());
    self.next += n;
  }

  fn skip_char(&mut self) -> Option<char> {
    let c = self.peek_char(0)?;
    self.next += c.len_utf8();
    Some(c)
  }

  fn skip_through_char_or_end(&mut self, c: u8) {
    let rest = self.rest();
    let len = memchr(c, rest.as_bytes()).map_or(rest.len(), |pos| pos + 1);
    self.next += len;
  }

  fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
    let len: usize = self
      .rest()
      .chars()
      .take_while(|&c| pred(c))
      .map(char::len_utf8)
      .sum();
    self.next += len;
  }

  fn record_comment(&mut self, start: usize, kind: CommentKind) {
    let loc = Loc(start, self.next);
    let text = self.source[start..self.next].trim_end_matches(['\r', '\n']);
    if !self.comments.contains_key(&start) {
      self.comments.insert(start, Comment {
        loc,
        kind,
        text: text.to_string(),
      });
    }
  }
}

impl<'a> Index<Loc> for Lexer<'a> {
  type Output = str;

  fn index(&self, index: Loc) -> &Self::Output {
    &self.source[index.0..index.1]
  }
}

/// Skips whitespace and comments, returning whether a line terminator was crossed.
fn skip_insignificant(lexer: &mut Lexer<'_>) -> bool {
  let mut preceded_by_line_terminator = false;
  if lexer.next == 0 && lexer.source.starts_with("#!") {
    lexer.skip_through_char_or_end(b'\n');
    preceded_by_line_terminator = true;
  }
  loop {
    let Some(c) = lexer.peek_char(0) else {
      break;
    };
    if is_line_terminator(c) {
      preceded_by_line_terminator = true;
      lexer.skip(c.len_utf8());
    } else if is_whitespace(c) {
      lexer.skip(c.len_utf8());
    } else if lexer.rest().starts_with("//") {
      let start = lexer.next;
      lexer.skip(2);
      let rest = lexer.rest();
      let len = memchr2(b'\n', b'\r', rest.as_bytes()).unwrap_or(rest.len());
      lexer.skip(len);
      lexer.record_comment(start, CommentKind::Line);
    } else if lexer.rest().starts_with("/*") {
      let start = lexer.next;
      lexer.skip(2);
      // An unterminated comment consumes the rest of the source.
      let close = lexer.rest().find("*/").map_or(lexer.rest().len(), |pos| pos + 2);
      if memchr2(b'\n', b'\r', lexer.rest()[..close].as_bytes()).is_some() {
        preceded_by_line_terminator = true;
      }
      lexer.skip(close);
      lexer.record_comment(start, CommentKind::Block);
    } else {
      break;
    }
  }
  preceded_by_line_terminator
}

fn lex_identifier(lexer: &mut Lexer<'_>) -> TT {
  let start = lexer.next;
  loop {
    match lexer.peek_char(0) {
      Some('\\') => {
        if !lex_unicode_escape(lexer) {
          return TT::Invalid;
        }
      }
      Some(c) if (lexer.next == start && is_id_start(c)) || (lexer.next > start && is_id_continue(c)) => {
        lexer.skip(c.len_utf8());
      }
      _ => break,
    }
  }
  if lexer.next == start {
    return TT::Invalid;
  }
  KEYWORDS
    .get(&lexer.source[start..lexer.next])
    .copied()
    .unwrap_or(TT::Identifier)
}

fn lex_unicode_escape(lexer: &mut Lexer<'_>) -> bool {
  if !lexer.rest().starts_with("\\u") {
    return false;
  }
  lexer.skip(2);
  if lexer.rest().starts_with('{') {
    lexer.skip(1);
    let before = lexer.next;
    lexer.skip_while(|c| c.is_ascii_hexdigit());
    if lexer.next == before || !lexer.rest().starts_with('}') {
      return false;
    }
    lexer.skip(1);
    true
  } else {
    for _ in 0..4 {
      match lexer.peek_char(0) {
        Some(c) if c.is_ascii_hexdigit() => lexer.skip(1),
        _ => return false,
      }
    }
    true
  }
}

fn lex_number(lexer: &mut Lexer<'_>) -> TT {
  let is_digit = |radix: u32| move |c: char| c.is_digit(radix) || c == '_';
  let radix = match lexer.rest().get(..2) {
    Some("0x" | "0X") => 16,
    Some("0b" | "0B") => 2,
    Some("0o" | "0O") => 8,
    _ => 10,
  };
  if radix != 10 {
    lexer.skip(2);
    lexer.skip_while(is_digit(radix));
  } else {
    lexer.skip_while(is_digit(10));
    if lexer.rest().starts_with('.') {
      lexer.skip(1);
      lexer.skip_while(is_digit(10));
    }
    if matches!(lexer.peek_char(0), Some('e' | 'E')) {
      lexer.skip(1);
      if matches!(lexer.peek_char(0), Some('+' | '-')) {
        lexer.skip(1);
      }
      let before = lexer.next;
      lexer.skip_while(is_digit(10));
      if lexer.next == before {
        return TT::Invalid;
      }
    }
  }
  if lexer.rest().starts_with('n') {
    lexer.skip(1);
    return TT::LiteralBigInt;
  }
  if lexer.peek_char(0).is_some_and(is_id_start) {
    return TT::Invalid;
  }
  TT::LiteralNumber
}

fn lex_string(lexer: &mut Lexer<'_>, quote: char) -> TT {
  lexer.skip(1);
  loop {
    let quote_byte = quote as u8;
    let Some(pos) = memchr3(b'\\', quote_byte, b'\n', lexer.rest().as_bytes()) else {
      lexer.next = lexer.end();
      return TT::Invalid;
    };
    lexer.skip(pos);
    match lexer.rest().as_bytes()[0] {
      b'\\' => {
        lexer.skip(1);
        // Line continuations and escaped quotes are both a single escaped character.
        if lexer.rest().starts_with("\r\n") {
          lexer.skip(2);
        } else {
          lexer.skip_char();
        }
      }
      b'\n' => return TT::Invalid,
      _ => {
        lexer.skip(1);
        return TT::LiteralString;
      }
    }
  }
}

/// Scans template characters up to and including the closing backtick or `${`.
/// Returns whether the template ended.
fn scan_template_chars(lexer: &mut Lexer<'_>) -> Option<bool> {
  loop {
    let pos = memchr3(b'\\', b'`', b'$', lexer.rest().as_bytes())?;
    lexer.skip(pos);
    let rest = lexer.rest();
    if rest.starts_with('\\') {
      lexer.skip(1);
      lexer.skip_char();
    } else if rest.starts_with('`') {
      lexer.skip(1);
      return Some(true);
    } else if rest.starts_with("${") {
      lexer.skip(2);
      return Some(false);
    } else {
      lexer.skip(1);
    }
  }
}

fn lex_template_start(lexer: &mut Lexer<'_>) -> TT {
  lexer.skip(1);
  match scan_template_chars(lexer) {
    Some(true) => TT::LiteralTemplate,
    Some(false) => TT::TemplateHead,
    None => {
      lexer.next = lexer.end();
      TT::Invalid
    }
  }
}

fn lex_template_continue(lexer: &mut Lexer<'_>) -> TT {
  if !lexer.rest().starts_with('}') {
    return TT::Invalid;
  }
  lexer.skip(1);
  match scan_template_chars(lexer) {
    Some(true) => TT::TemplateTail,
    Some(false) => TT::TemplateMiddle,
    None => {
      lexer.next = lexer.end();
      TT::Invalid
    }
  }
}

fn lex_regex(lexer: &mut Lexer<'_>) -> TT {
  lexer.skip(1);
  let mut in_class = false;
  loop {
    let Some(c) = lexer.skip_char() else {
      return TT::Invalid;
    };
    match c {
      '\\' => {
        lexer.skip_char();
      }
      '[' => in_class = true,
      ']' => in_class = false,
      '/' if !in_class => break,
      c if is_line_terminator(c) => return TT::Invalid,
      _ => {}
    }
  }
  lexer.skip_while(is_id_continue);
  TT::LiteralRegex
}

pub fn lex_next(lexer: &mut Lexer<'_>, mode: LexMode) -> Token {
  if mode == LexMode::TemplateContinue {
    // The `}` closing a substitution may follow whitespace or comments.
    skip_insignificant(lexer);
    let start = lexer.next;
    let typ = lex_template_continue(lexer);
    return Token {
      loc: Loc(start, lexer.next),
      preceded_by_line_terminator: false,
      typ,
    };
  }

  let preceded_by_line_terminator = skip_insignificant(lexer);
  let start = lexer.next;
  if lexer.at_end() {
    return Token {
      loc: Loc(start, start),
      preceded_by_line_terminator,
      typ: TT::EOF,
    };
  }

  let rest = lexer.rest();
  let Some(first) = rest.chars().next() else {
    return Token {
      loc: Loc(start, start),
      preceded_by_line_terminator,
      typ: TT::EOF,
    };
  };
  let typ = match first {
    '"' | '\'' => lex_string(lexer, first),
    '`' => lex_template_start(lexer),
    '#' => {
      lexer.skip(1);
      match lex_identifier(lexer) {
        TT::Invalid => TT::Invalid,
        _ => TT::PrivateName,
      }
    }
    '0'..='9' => lex_number(lexer),
    '.' if rest[1..].starts_with(|c: char| c.is_ascii_digit()) => lex_number(lexer),
    '/' if mode == LexMode::SlashIsRegex => lex_regex(lexer),
    '\\' => lex_identifier(lexer),
    c if is_id_start(c) => lex_identifier(lexer),
    _ => match PUNCTUATORS.find(rest) {
      // `?.` followed by a digit is a conditional operator then a number.
      Some((TT::QuestionDot, len))
        if rest[len..].starts_with(|c: char| c.is_ascii_digit()) =>
      {
        lexer.skip(1);
        TT::Question
      }
      Some((tt, len)) => {
        lexer.skip(len);
        tt
      }
      None => {
        lexer.skip(first.len_utf8());
        TT::Invalid
      }
    },
  };
  Token {
    loc: Loc(start, lexer.next),
    preceded_by_line_terminator,
    typ,
  }
}
