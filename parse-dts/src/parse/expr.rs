use super::Parser;
use crate::ast::class_or_object::PropKey;
use crate::ast::expr::*;
use crate::ast::Ident;
use crate::ast::NodeId;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::LexMode;
use crate::loc::Loc;
use crate::token::TT;

struct BinaryOp {
  text: &'static str,
  precedence: u8,
  // `>>` and `>=` are lexed as separate `>` tokens.
  tokens: usize,
}

impl<'a> Parser<'a> {
  /// An expression without the comma operator.
  pub fn expr(&mut self) -> SyntaxResult<NodeId> {
    self.assignment_expr()
  }

  pub fn assignment_expr(&mut self) -> SyntaxResult<NodeId> {
    if let Some(arrow) = self.try_arrow()? {
      return Ok(arrow);
    }
    let start = self.start();
    let target = self.conditional_expr()?;
    let t = self.peek();
    if matches!(t.typ, TT::Equals | TT::AssignmentOperator) {
      self.consume();
      let op = self.string(t.loc);
      let value = self.assignment_expr()?;
      return Ok(self.finish(start, AssignExpr { op, target, value }));
    }
    Ok(target)
  }

  fn try_arrow(&mut self) -> SyntaxResult<Option<NodeId>> {
    let start = self.start();
    let t = self.peek();
    let params = if t.typ == TT::Identifier
      && self.peek_nth(1).typ == TT::EqualsChevronRight
    {
      vec![self.binding_ident()?]
    } else if t.typ == TT::ParenthesisOpen {
      let cp = self.checkpoint();
      match self.list(TT::ParenthesisOpen, TT::ParenthesisClose, |p| {
        p.binding_ident()
      }) {
        Ok(params) if self.peek().typ == TT::EqualsChevronRight => params,
        _ => {
          self.restore_checkpoint(cp);
          return Ok(None);
        }
      }
    } else {
      return Ok(None);
    };
    self.require(TT::EqualsChevronRight)?;
    let body = if self.peek().typ == TT::BraceOpen {
      ArrowBody::Block(self.opaque_block()?)
    } else {
      ArrowBody::Expr(self.assignment_expr()?)
    };
    Ok(Some(self.finish(start, ArrowFunc { params, body })))
  }

  fn conditional_expr(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let test = self.binary_expr(0)?;
    if !self.consume_if(TT::Question).is_match() {
      return Ok(test);
    }
    let consequent = self.assignment_expr()?;
    self.require(TT::Colon)?;
    let alternate = self.assignment_expr()?;
    Ok(self.finish(start, CondExpr {
      test,
      consequent,
      alternate,
    }))
  }

  fn peek_binary_op(&mut self) -> Option<BinaryOp> {
    let t = self.peek();
    let op = |text, precedence| {
      Some(BinaryOp {
        text,
        precedence,
        tokens: 1,
      })
    };
    match t.typ {
      TT::QuestionQuestion => op("??", 1),
      TT::BarBar => op("||", 2),
      TT::AmpersandAmpersand => op("&&", 3),
      TT::Bar => op("|", 4),
      TT::Caret => op("^", 5),
      TT::Ampersand => op("&", 6),
      TT::EqualsEquals => op("==", 7),
      TT::ExclamationEquals => op("!=", 7),
      TT::EqualsEqualsEquals => op("===", 7),
      TT::ExclamationEqualsEquals => op("!==", 7),
      TT::ChevronLeft => op("<", 8),
      TT::ChevronLeftEquals => op("<=", 8),
      TT::KeywordInstanceof => op("instanceof", 8),
      TT::KeywordIn => op("in", 8),
      TT::ChevronRight => {
        let adjacent = |p: &mut Self, n: usize, typ: TT| {
          let prev = p.peek_nth(n - 1);
          let next = p.peek_nth(n);
          next.typ == typ && next.loc.0 == prev.loc.1
        };
        if adjacent(self, 1, TT::ChevronRight) {
          if adjacent(self, 2, TT::ChevronRight) {
            Some(BinaryOp {
              text: ">>>",
              precedence: 9,
              tokens: 3,
            })
          } else {
            Some(BinaryOp {
              text: ">>",
              precedence: 9,
              tokens: 2,
            })
          }
        } else if adjacent(self, 1, TT::Equals) {
          Some(BinaryOp {
            text: ">=",
            precedence: 8,
            tokens: 2,
          })
        } else {
          op(">", 8)
        }
      }
      TT::ChevronLeftChevronLeft => op("<<", 9),
      TT::Plus => op("+", 10),
      TT::Hyphen => op("-", 10),
      TT::Asterisk => op("*", 11),
      TT::Slash => op("/", 11),
      TT::Percent => op("%", 11),
      TT::AsteriskAsterisk => op("**", 12),
      _ => None,
    }
  }

  fn binary_expr(&mut self, min_precedence: u8) -> SyntaxResult<NodeId> {
    let start = self.start();
    let mut left = self.unary_expr()?;
    while let Some(op) = self.peek_binary_op() {
      if op.precedence < min_precedence {
        break;
      }
      for _ in 0..op.tokens {
        self.consume();
      }
      let right = if op.text == "**" {
        self.binary_expr(op.precedence)?
      } else {
        self.binary_expr(op.precedence + 1)?
      };
      left = self.finish(start, BinaryExpr {
        op: op.text.to_string(),
        left,
        right,
      });
    }
    Ok(left)
  }

  fn unary_expr(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.peek_with_mode(LexMode::SlashIsRegex);
    let op = match t.typ {
      TT::Exclamation
      | TT::Hyphen
      | TT::Plus
      | TT::Tilde
      | TT::PlusPlus
      | TT::HyphenHyphen
      | TT::KeywordTypeof
      | TT::KeywordVoid
      | TT::KeywordDelete => self.string(t.loc),
      _ => return self.call_member_expr(),
    };
    self.consume_with_mode(LexMode::SlashIsRegex);
    let arg = self.unary_expr()?;
    Ok(self.finish(start, UnaryExpr { op, arg }))
  }

  /// The expression after `@` in a decorator: a member chain with optional call.
  pub fn decorator_expr(&mut self) -> SyntaxResult<NodeId> {
    self.call_member_expr()
  }

  fn call_member_expr(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let mut expr = if self.peek().typ == TT::KeywordNew {
      self.new_expr()?
    } else {
      self.primary_expr()?
    };
    loop {
      let t = self.peek();
      expr = match t.typ {
        TT::Dot => {
          self.consume();
          let property = self.member_name()?;
          self.finish(start, MemberExpr {
            object: expr,
            optional: false,
            property,
          })
        }
        TT::QuestionDot => {
          self.consume();
          match self.peek().typ {
            TT::ParenthesisOpen => {
              let args = self.args()?;
              self.finish(start, CallExpr {
                callee: expr,
                optional: true,
                args,
              })
            }
            TT::BracketOpen => {
              self.consume();
              let member = self.expr()?;
              self.require(TT::BracketClose)?;
              self.finish(start, ComputedMemberExpr {
                object: expr,
                optional: true,
                member,
              })
            }
            _ => {
              let property = self.member_name()?;
              self.finish(start, MemberExpr {
                object: expr,
                optional: true,
                property,
              })
            }
          }
        }
        TT::BracketOpen => {
          self.consume();
          let member = self.expr()?;
          self.require(TT::BracketClose)?;
          self.finish(start, ComputedMemberExpr {
            object: expr,
            optional: false,
            member,
          })
        }
        TT::ParenthesisOpen => {
          let args = self.args()?;
          self.finish(start, CallExpr {
            callee: expr,
            optional: false,
            args,
          })
        }
        _ => break,
      };
    }
    Ok(expr)
  }

  fn member_name(&mut self) -> SyntaxResult<String> {
    let t = self.consume();
    if t.typ.is_identifier_name() || t.typ == TT::PrivateName {
      Ok(self.string(t.loc))
    } else {
      Err(t.error(SyntaxErrorType::ExpectedSyntax("property name")))
    }
  }

  fn args(&mut self) -> SyntaxResult<Vec<NodeId>> {
    self.list(TT::ParenthesisOpen, TT::ParenthesisClose, |p| {
      p.spread_or_assignment()
    })
  }

  fn spread_or_assignment(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    if self.consume_if(TT::DotDotDot).is_match() {
      let arg = self.assignment_expr()?;
      return Ok(self.finish(start, SpreadExpr { arg }));
    }
    self.assignment_expr()
  }

  fn new_expr(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require(TT::KeywordNew)?;
    let cstart = self.start();
    let mut callee = if self.peek().typ == TT::KeywordNew {
      self.new_expr()?
    } else {
      self.primary_expr()?
    };
    while self.consume_if(TT::Dot).is_match() {
      let property = self.member_name()?;
      callee = self.finish(cstart, MemberExpr {
        object: callee,
        optional: false,
        property,
      });
    }
    let args = if self.peek().typ == TT::ParenthesisOpen {
      self.args()?
    } else {
      Vec::new()
    };
    Ok(self.finish(start, NewExpr { callee, args }))
  }

  fn primary_expr(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.peek_with_mode(LexMode::SlashIsRegex);
    match t.typ {
      TT::Identifier => {
        if self.is_word(&t, "async") && self.peek_nth(1).typ == TT::KeywordFunction {
          return self.opaque_function_or_class();
        }
        self.consume_with_mode(LexMode::SlashIsRegex);
        let name = self.string(t.loc);
        Ok(self.alloc(t.loc, Ident { name }))
      }
      TT::KeywordSuper => {
        self.consume_with_mode(LexMode::SlashIsRegex);
        Ok(self.alloc(t.loc, Ident {
          name: "super".into(),
        }))
      }
      TT::KeywordThis => {
        self.consume_with_mode(LexMode::SlashIsRegex);
        Ok(self.alloc(t.loc, ThisExpr {}))
      }
      TT::LiteralNumber
      | TT::LiteralBigInt
      | TT::LiteralString
      | TT::LiteralRegex
      | TT::LiteralTemplate
      | TT::LiteralTrue
      | TT::LiteralFalse
      | TT::LiteralNull => {
        self.consume_with_mode(LexMode::SlashIsRegex);
        let raw = self.string(t.loc);
        Ok(self.alloc(t.loc, LitExpr { raw }))
      }
      TT::TemplateHead => self.opaque_template(),
      TT::KeywordFunction | TT::KeywordClass => self.opaque_function_or_class(),
      TT::ParenthesisOpen => {
        self.consume_with_mode(LexMode::SlashIsRegex);
        let expr = self.expr()?;
        self.require(TT::ParenthesisClose)?;
        Ok(self.finish(start, ParenExpr { expr }))
      }
      TT::BracketOpen => self.array_expr(),
      TT::BraceOpen => self.object_expr(),
      _ => Err(t.error(SyntaxErrorType::ExpectedSyntax("expression"))),
    }
  }

  fn array_expr(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require(TT::BracketOpen)?;
    let mut elements = Vec::new();
    loop {
      match self.peek().typ {
        TT::BracketClose => break,
        TT::Comma => {
          self.consume();
          elements.push(None);
        }
        _ => {
          elements.push(Some(self.spread_or_assignment()?));
          if !self.consume_if(TT::Comma).is_match() {
            break;
          }
        }
      };
    }
    self.require(TT::BracketClose)?;
    Ok(self.finish(start, ArrayExpr { elements }))
  }

  fn object_expr(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let props = self.list(TT::BraceOpen, TT::BraceClose, |p| p.object_prop())?;
    Ok(self.finish(start, ObjectExpr { props }))
  }

  fn object_prop(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    if self.consume_if(TT::DotDotDot).is_match() {
      let arg = self.assignment_expr()?;
      return Ok(self.finish(start, SpreadExpr { arg }));
    }
    let key_token = self.peek();
    let key = self.prop_key()?;
    if self.consume_if(TT::Colon).is_match() {
      let value = self.assignment_expr()?;
      return Ok(self.finish(start, ObjectProp {
        key,
        value: Some(value),
      }));
    }
    match (&key, self.peek().typ) {
      (PropKey::Ident(_), TT::Comma | TT::BraceClose) if key_token.typ == TT::Identifier => {
        Ok(self.finish(start, ObjectProp { key, value: None }))
      }
      _ => Err(
        Loc(start, self.prev_end()).error(
          SyntaxErrorType::ExpectedSyntax("object property"),
          Some(key_token.typ),
        ),
      ),
    }
  }

  /// An expression statement.
  pub fn expr_stmt(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let expr = self.expr()?;
    self.consume_semicolon()?;
    Ok(self.finish(start, crate::ast::stmt::ExprStmt { expr }))
  }
}
