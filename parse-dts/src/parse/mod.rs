use crate::ast::Ast;
use crate::ast::NodeId;
use crate::ast::Syntax;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::lex_next;
use crate::lex::Comment;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;

pub mod class_or_object;
pub mod expr;
pub mod import_export;
pub mod opaque;
pub mod stmt;
#[cfg(test)]
mod tests;
pub mod toplevel;
pub mod type_expr;

#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
  /// Keep statements the grammar here does not cover as [`OpaqueStmt`](crate::ast::stmt::OpaqueStmt)
  /// instead of failing. Used for bundler output, which may contain arbitrary runtime helpers.
  pub lenient: bool,
}

#[derive(Debug)]
#[must_use]
pub struct MaybeToken {
  typ: TT,
  loc: Loc,
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }

  pub fn match_loc(&self) -> Option<Loc> {
    if self.matched {
      Some(self.loc)
    } else {
      None
    }
  }

  pub fn error(&self, err: SyntaxErrorType) -> SyntaxError {
    debug_assert!(!self.matched);
    self.loc.error(err, Some(self.typ))
  }
}

#[derive(Clone, Copy)]
pub struct ParserCheckpoint {
  next_tok_i: usize,
  nodes: usize,
}

/// To get the lexer's `next` after this token was lexed, use `token.loc.1`.
struct BufferedToken {
  token: Token,
  lex_mode: LexMode,
}

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  buf: Vec<BufferedToken>,
  next_tok_i: usize,
  ast: &'a mut Ast,
  options: ParseOptions,
  // Set while parsing the `extends` operand of a conditional type.
  disallow_conditional: bool,
}

// Like parse-js, grammar productions are methods on `Parser` spread across the submodules.
impl<'a> Parser<'a> {
  pub fn new(lexer: Lexer<'a>, ast: &'a mut Ast, options: ParseOptions) -> Parser<'a> {
    Parser {
      lexer,
      buf: Vec::new(),
      next_tok_i: 0,
      ast,
      options,
      disallow_conditional: false,
    }
  }

  pub fn options(&self) -> ParseOptions {
    self.options
  }

  pub fn ast(&mut self) -> &mut Ast {
    &mut *self.ast
  }

  pub fn str(&self, loc: Loc) -> &'a str {
    &self.lexer.source()[loc.0..loc.1]
  }

  pub fn string(&self, loc: Loc) -> String {
    self.str(loc).to_string()
  }

  pub fn checkpoint(&self) -> ParserCheckpoint {
    ParserCheckpoint {
      next_tok_i: self.next_tok_i,
      nodes: self.ast.len(),
    }
  }

  /// Rewinds to `checkpoint`, discarding nodes allocated since then.
  pub fn restore_checkpoint(&mut self, checkpoint: ParserCheckpoint) {
    self.next_tok_i = checkpoint.next_tok_i;
    self.ast.truncate(checkpoint.nodes);
  }

  fn reset_to(&mut self, n: usize) {
    self.next_tok_i = n;
    self.buf.truncate(n);
    match self.buf.last() {
      Some(t) => self.lexer.set_next(t.token.loc.1),
      None => self.lexer.set_next(0),
    };
  }

  fn forward<K: FnOnce(&Token) -> bool>(&mut self, mode: LexMode, keep: K) -> (bool, Token) {
    if self
      .buf
      .get(self.next_tok_i)
      .is_some_and(|t| t.lex_mode != mode)
    {
      self.reset_to(self.next_tok_i);
    }
    if self.buf.len() == self.next_tok_i {
      let token = lex_next(&mut self.lexer, mode);
      self.buf.push(BufferedToken {
        token,
        lex_mode: mode,
      });
    }
    let t = self.buf[self.next_tok_i].token.clone();
    let k = keep(&t);
    if k {
      self.next_tok_i += 1;
    };
    (k, t)
  }

  /// End offset of the last consumed token.
  pub fn prev_end(&self) -> usize {
    match self.next_tok_i {
      0 => 0,
      i => self.buf[i - 1].token.loc.1,
    }
  }

  /// Comments between the previous token and the next one.
  pub fn take_leading_comments(&mut self) -> Vec<Comment> {
    let start = self.peek().loc.0;
    let prev = self.prev_end();
    self
      .lexer
      .comments_between(prev, start)
      .cloned()
      .collect()
  }

  pub fn into_comments(self) -> Vec<Comment> {
    self.lexer.into_comments()
  }

  pub fn consume_with_mode(&mut self, mode: LexMode) -> Token {
    self.forward(mode, |_| true).1
  }

  pub fn consume(&mut self) -> Token {
    self.consume_with_mode(LexMode::Standard)
  }

  pub fn peek_with_mode(&mut self, mode: LexMode) -> Token {
    self.forward(mode, |_| false).1
  }

  pub fn peek(&mut self) -> Token {
    self.peek_with_mode(LexMode::Standard)
  }

  /// The token `n` positions ahead of the next one (`peek_nth(0)` is `peek()`).
  pub fn peek_nth(&mut self, n: usize) -> Token {
    let cp = self.checkpoint();
    for _ in 0..n {
      self.consume();
    }
    let t = self.peek();
    self.restore_checkpoint(cp);
    t
  }

  pub fn consume_if(&mut self, typ: TT) -> MaybeToken {
    let (matched, t) = self.forward(LexMode::Standard, |t| t.typ == typ);
    MaybeToken {
      typ,
      matched,
      loc: t.loc,
    }
  }

  pub fn require_with_mode(&mut self, typ: TT, mode: LexMode) -> SyntaxResult<Token> {
    let t = self.consume_with_mode(mode);
    if t.typ == TT::EOF && typ != TT::EOF {
      Err(t.error(SyntaxErrorType::UnexpectedEnd))
    } else if t.typ != typ {
      Err(t.error(SyntaxErrorType::RequiredTokenNotFound(typ)))
    } else {
      Ok(t)
    }
  }

  pub fn require(&mut self, typ: TT) -> SyntaxResult<Token> {
    self.require_with_mode(typ, LexMode::Standard)
  }

  /// Whether `t` is the identifier `word` (contextual keywords such as `type` or `declare`).
  pub fn is_word(&self, t: &Token, word: &str) -> bool {
    t.typ == TT::Identifier && self.str(t.loc) == word
  }

  pub fn peek_word(&mut self, word: &str) -> bool {
    let t = self.peek();
    self.is_word(&t, word)
  }

  pub fn consume_if_word(&mut self, word: &str) -> bool {
    if self.peek_word(word) {
      self.consume();
      true
    } else {
      false
    }
  }

  pub fn require_word(&mut self, word: &'static str) -> SyntaxResult<Token> {
    let t = self.consume();
    if self.is_word(&t, word) {
      Ok(t)
    } else {
      Err(t.error(SyntaxErrorType::ExpectedSyntax(word)))
    }
  }

  /// Requires a binding identifier (not a reserved word).
  pub fn require_identifier(&mut self) -> SyntaxResult<String> {
    let t = self.consume();
    if t.typ != TT::Identifier {
      return Err(t.error(SyntaxErrorType::ExpectedSyntax("identifier")));
    }
    Ok(self.string(t.loc))
  }

  /// Requires any identifier name, including reserved words (`a.default`, `{ class: 1 }`).
  pub fn require_identifier_name(&mut self) -> SyntaxResult<String> {
    let t = self.consume();
    if !t.typ.is_identifier_name() {
      return Err(t.error(SyntaxErrorType::ExpectedSyntax("identifier name")));
    }
    Ok(self.string(t.loc))
  }

  /// Allocates a binding identifier node for the next token.
  pub fn binding_ident(&mut self) -> SyntaxResult<NodeId> {
    let loc = self.peek().loc;
    let name = self.require_identifier()?;
    Ok(self.alloc(loc, crate::ast::Ident { name }))
  }

  pub fn alloc(&mut self, loc: Loc, stx: impl Into<Syntax>) -> NodeId {
    self.ast.alloc(loc, stx)
  }

  /// Allocates a node spanning from `start` to the end of the last consumed token.
  pub fn finish(&mut self, start: usize, stx: impl Into<Syntax>) -> NodeId {
    let end = self.prev_end().max(start);
    self.ast.alloc(Loc(start, end), stx)
  }

  pub fn start(&mut self) -> usize {
    self.peek().loc.0
  }

  /// Consumes an optional `;`, accepting automatic semicolon insertion.
  pub fn consume_semicolon(&mut self) -> SyntaxResult<()> {
    let t = self.peek();
    match t.typ {
      TT::Semicolon => {
        self.consume();
        Ok(())
      }
      TT::BraceClose | TT::EOF => Ok(()),
      _ if t.preceded_by_line_terminator => Ok(()),
      _ => Err(t.error(SyntaxErrorType::ExpectedSyntax("`;`"))),
    }
  }

  /// Parses `open item (sep item)* [sep] close`.
  pub fn list<T>(
    &mut self,
    open: TT,
    close: TT,
    mut item: impl FnMut(&mut Self) -> SyntaxResult<T>,
  ) -> SyntaxResult<Vec<T>> {
    self.require(open)?;
    let mut items = Vec::new();
    while self.peek().typ != close {
      items.push(item(self)?);
      if !self.consume_if(TT::Comma).is_match() {
        break;
      }
    }
    self.require(close)?;
    Ok(items)
  }
}
