use super::Parser;
use crate::ast::expr::OpaqueExpr;
use crate::ast::stmt::OpaqueStmt;
use crate::ast::NodeId;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::LexMode;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Open {
  Paren,
  Bracket,
  Brace,
  Substitution,
}

/// Whether a `/` after `prev` starts a regular expression rather than a division.
fn regex_allowed_after(prev: Option<TT>) -> bool {
  match prev {
    None => true,
    Some(tt) => !matches!(
      tt,
      TT::Identifier
        | TT::PrivateName
        | TT::LiteralBigInt
        | TT::LiteralFalse
        | TT::LiteralNull
        | TT::LiteralNumber
        | TT::LiteralRegex
        | TT::LiteralString
        | TT::LiteralTemplate
        | TT::LiteralTrue
        | TT::TemplateTail
        | TT::KeywordThis
        | TT::KeywordSuper
        | TT::ParenthesisClose
        | TT::BracketClose
        | TT::BraceClose
        | TT::PlusPlus
        | TT::HyphenHyphen
    ),
  }
}

fn can_end_statement(tt: TT) -> bool {
  matches!(
    tt,
    TT::Identifier
      | TT::PrivateName
      | TT::LiteralBigInt
      | TT::LiteralFalse
      | TT::LiteralNull
      | TT::LiteralNumber
      | TT::LiteralRegex
      | TT::LiteralString
      | TT::LiteralTemplate
      | TT::LiteralTrue
      | TT::TemplateTail
      | TT::KeywordThis
      | TT::KeywordSuper
      | TT::KeywordBreak
      | TT::KeywordContinue
      | TT::KeywordDebugger
      | TT::KeywordReturn
      | TT::ParenthesisClose
      | TT::BracketClose
      | TT::BraceClose
      | TT::PlusPlus
      | TT::HyphenHyphen
  )
}

/// Tokens that continue the previous line's expression even across a line break.
fn continues_expression(tt: TT) -> bool {
  matches!(
    tt,
    TT::Dot
      | TT::QuestionDot
      | TT::ParenthesisOpen
      | TT::BracketOpen
      | TT::Comma
      | TT::Question
      | TT::QuestionQuestion
      | TT::Colon
      | TT::Equals
      | TT::EqualsChevronRight
      | TT::AssignmentOperator
      | TT::Ampersand
      | TT::AmpersandAmpersand
      | TT::Asterisk
      | TT::AsteriskAsterisk
      | TT::Bar
      | TT::BarBar
      | TT::Caret
      | TT::ChevronLeft
      | TT::ChevronLeftChevronLeft
      | TT::ChevronLeftEquals
      | TT::ChevronRight
      | TT::EqualsEquals
      | TT::EqualsEqualsEquals
      | TT::ExclamationEquals
      | TT::ExclamationEqualsEquals
      | TT::Percent
      | TT::Plus
      | TT::Hyphen
      | TT::Slash
      | TT::KeywordIn
      | TT::KeywordInstanceof
      | TT::LiteralTemplate
      | TT::TemplateHead
  )
}

impl<'a> Parser<'a> {
  /// Consumes one token of code that is skipped rather than parsed, tracking nesting in `stack`.
  fn skip_token(&mut self, stack: &mut Vec<Open>, prev: Option<TT>) -> SyntaxResult<Token> {
    let next = self.peek();
    let t = if next.typ == TT::BraceClose && stack.last() == Some(&Open::Substitution) {
      self.consume_with_mode(LexMode::TemplateContinue)
    } else if (next.typ == TT::Slash
      || (next.typ == TT::AssignmentOperator && self.str(next.loc) == "/="))
      && regex_allowed_after(prev)
    {
      self.consume_with_mode(LexMode::SlashIsRegex)
    } else {
      self.consume()
    };
    match t.typ {
      TT::EOF => return Err(t.error(SyntaxErrorType::UnterminatedBlock)),
      TT::Invalid => return Err(t.error(SyntaxErrorType::ExpectedNotFound)),
      TT::ParenthesisOpen => stack.push(Open::Paren),
      TT::BracketOpen => stack.push(Open::Bracket),
      TT::BraceOpen => stack.push(Open::Brace),
      TT::TemplateHead => stack.push(Open::Substitution),
      TT::TemplateTail => {
        stack.pop();
      }
      TT::ParenthesisClose | TT::BracketClose | TT::BraceClose => {
        let expected = match t.typ {
          TT::ParenthesisClose => Open::Paren,
          TT::BracketClose => Open::Bracket,
          _ => Open::Brace,
        };
        if stack.pop() != Some(expected) {
          return Err(t.error(SyntaxErrorType::ExpectedNotFound));
        }
      }
      _ => {}
    };
    Ok(t)
  }

  /// Consumes a bracketed group starting at the next token (`{`, `[` or `(`) through its
  /// matching close, returning the raw text.
  pub fn raw_balanced(&mut self) -> SyntaxResult<String> {
    let start = self.start();
    let first = self.peek();
    if !matches!(
      first.typ,
      TT::BraceOpen | TT::BracketOpen | TT::ParenthesisOpen
    ) {
      return Err(first.error(SyntaxErrorType::ExpectedSyntax("bracketed group")));
    }
    let mut stack = Vec::new();
    let mut prev = None;
    loop {
      let t = self.skip_token(&mut stack, prev)?;
      prev = Some(t.typ);
      if stack.is_empty() {
        break;
      }
    }
    Ok(self.string(Loc(start, self.prev_end())))
  }

  /// Consumes a `{ ... }` block and returns its raw text including braces.
  pub fn opaque_block(&mut self) -> SyntaxResult<String> {
    if self.peek().typ != TT::BraceOpen {
      return Err(self.peek().error(SyntaxErrorType::RequiredTokenNotFound(TT::BraceOpen)));
    }
    self.raw_balanced()
  }

  /// Skips a template literal with substitutions as a single expression.
  pub fn opaque_template(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let mut stack = Vec::new();
    let mut prev = None;
    loop {
      let t = self.skip_token(&mut stack, prev)?;
      prev = Some(t.typ);
      if stack.is_empty() {
        break;
      }
    }
    let text = self.string(Loc(start, self.prev_end()));
    Ok(self.finish(start, OpaqueExpr { text }))
  }

  /// Skips a function or class expression: everything up to and including the first
  /// top-level `{ ... }` block.
  pub fn opaque_function_or_class(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let mut stack = Vec::new();
    let mut prev = None;
    loop {
      let t = self.skip_token(&mut stack, prev)?;
      prev = Some(t.typ);
      if stack.is_empty() && t.typ == TT::BraceClose {
        break;
      }
    }
    let text = self.string(Loc(start, self.prev_end()));
    Ok(self.finish(start, OpaqueExpr { text }))
  }

  /// Skips one statement of arbitrary JavaScript, keeping its text.
  ///
  /// The statement ends at a top-level `;`, at the `}` that closes a block-bodied statement, at
  /// a line break where automatic semicolon insertion applies, or before an unmatched `}`.
  pub fn opaque_stmt(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let first = self.peek();
    let block_like = matches!(
      first.typ,
      TT::KeywordFunction
        | TT::KeywordClass
        | TT::KeywordIf
        | TT::KeywordFor
        | TT::KeywordWhile
        | TT::KeywordTry
        | TT::KeywordSwitch
        | TT::KeywordDo
        | TT::KeywordWith
        | TT::BraceOpen
    ) || self.is_word(&first, "async");
    let is_do = first.typ == TT::KeywordDo;
    let mut stack = Vec::new();
    let mut prev: Option<TT> = None;
    loop {
      let next = self.peek();
      if stack.is_empty() {
        match next.typ {
          TT::EOF if prev.is_some() => break,
          TT::BraceClose if prev.is_some() => break,
          TT::Semicolon => {
            self.consume();
            break;
          }
          tt if next.preceded_by_line_terminator
            && prev.is_some_and(can_end_statement)
            && !(block_like && prev == Some(TT::ParenthesisClose))
            && !continues_expression(tt)
            && !(block_like
              && matches!(
                tt,
                TT::KeywordElse | TT::KeywordCatch | TT::KeywordFinally
              )) =>
          {
            break
          }
          _ => {}
        };
      }
      let t = self.skip_token(&mut stack, prev)?;
      prev = Some(t.typ);
      if stack.is_empty() && t.typ == TT::BraceClose && block_like {
        let after = self.peek();
        let continues = matches!(
          after.typ,
          TT::KeywordElse | TT::KeywordCatch | TT::KeywordFinally
        ) || (is_do && after.typ == TT::KeywordWhile);
        if !continues {
          break;
        }
      }
    }
    let text = self.string(Loc(start, self.prev_end()));
    Ok(self.finish(start, OpaqueStmt { text }))
  }
}
