use super::Parser;
use crate::ast::class_or_object::*;
use crate::ast::stmt::Param;
use crate::ast::NodeId;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::token::Token;
use crate::token::TT;

/// Whether `tt` can begin a property name.
fn is_prop_name_start(tt: TT) -> bool {
  tt.is_identifier_name()
    || matches!(
      tt,
      TT::LiteralString
        | TT::LiteralNumber
        | TT::LiteralBigInt
        | TT::PrivateName
        | TT::BracketOpen
    )
}

impl<'a> Parser<'a> {
  pub fn prop_key(&mut self) -> SyntaxResult<PropKey> {
    let t = self.consume();
    let raw = self.string(t.loc);
    Ok(match t.typ {
      TT::LiteralString => PropKey::String(raw),
      TT::LiteralNumber | TT::LiteralBigInt => PropKey::Number(raw),
      TT::PrivateName => PropKey::Private(raw),
      TT::BracketOpen => {
        let expr = self.expr()?;
        self.require(TT::BracketClose)?;
        PropKey::Computed(expr)
      }
      tt if tt.is_identifier_name() => PropKey::Ident(raw),
      _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("property name"))),
    })
  }

  /// Whether the modifier-like word `t` is used as a modifier, i.e. followed by a member name.
  fn is_modifier(&mut self, t: &Token) -> bool {
    if t.typ != TT::Identifier {
      return false;
    }
    let next = self.peek_nth(1);
    !next.preceded_by_line_terminator
      && (is_prop_name_start(next.typ) || matches!(next.typ, TT::Asterisk | TT::DotDotDot))
  }

  /// Parses member modifiers; `allowed` lists the words accepted in this position.
  fn modifiers(&mut self, allowed: &[&str]) -> Modifiers {
    let mut m = Modifiers::default();
    loop {
      let t = self.peek();
      let word = self.str(t.loc);
      if t.typ != TT::Identifier || !allowed.contains(&word) || !self.is_modifier(&t) {
        break;
      }
      self.consume();
      match word {
        "public" => m.accessibility = Some(Accessibility::Public),
        "protected" => m.accessibility = Some(Accessibility::Protected),
        "private" => m.accessibility = Some(Accessibility::Private),
        "static" => m.is_static = true,
        "abstract" => m.is_abstract = true,
        "override" => m.is_override = true,
        "readonly" => m.readonly = true,
        "declare" => m.declare = true,
        "accessor" => m.accessor = true,
        _ => {}
      };
    }
    m
  }

  fn skip_decorators(&mut self) -> SyntaxResult<()> {
    while self.consume_if(TT::At).is_match() {
      self.decorator_expr()?;
    }
    Ok(())
  }

  pub fn params(&mut self) -> SyntaxResult<Vec<NodeId>> {
    self.list(TT::ParenthesisOpen, TT::ParenthesisClose, |p| p.param())
  }

  fn param(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.skip_decorators()?;
    let modifiers = self.modifiers(&[
      "public",
      "protected",
      "private",
      "readonly",
      "override",
    ]);
    let rest = self.consume_if(TT::DotDotDot).is_match();
    let t = self.peek();
    let name = match t.typ {
      TT::BraceOpen | TT::BracketOpen => self.raw_balanced()?,
      TT::Identifier | TT::KeywordThis => {
        self.consume();
        self.string(t.loc)
      }
      _ => return Err(t.error(SyntaxErrorType::ExpectedSyntax("parameter name"))),
    };
    let optional = self.consume_if(TT::Question).is_match();
    let type_annotation = if self.consume_if(TT::Colon).is_match() {
      Some(self.return_type()?)
    } else {
      None
    };
    let init = if self.consume_if(TT::Equals).is_match() {
      Some(self.assignment_expr()?)
    } else {
      None
    };
    Ok(self.finish(start, Param {
      name,
      modifiers,
      optional,
      rest,
      type_annotation,
      init,
    }))
  }

  fn is_index_signature(&mut self) -> bool {
    self.peek().typ == TT::BracketOpen
      && self.peek_nth(1).typ.is_identifier_name()
      && self.peek_nth(2).typ == TT::Colon
  }

  fn index_signature(&mut self, start: usize, modifiers: Modifiers) -> SyntaxResult<NodeId> {
    self.require(TT::BracketOpen)?;
    let param_name = self.require_identifier_name()?;
    self.require(TT::Colon)?;
    let param_type = self.type_expr()?;
    self.require(TT::BracketClose)?;
    self.require(TT::Colon)?;
    let ty = self.type_expr()?;
    Ok(self.finish(start, IndexSignature {
      modifiers,
      param_name,
      param_type,
      ty,
    }))
  }

  /// `get`/`set` when followed by a property name on the same line.
  fn accessor_kind(&mut self) -> MethodKind {
    let t = self.peek();
    let kind = match self.str(t.loc) {
      "get" if t.typ == TT::Identifier => MethodKind::Getter,
      "set" if t.typ == TT::Identifier => MethodKind::Setter,
      _ => return MethodKind::Method,
    };
    let next = self.peek_nth(1);
    if is_prop_name_start(next.typ) && !next.preceded_by_line_terminator {
      self.consume();
      kind
    } else {
      MethodKind::Method
    }
  }

  /// Separator between object type members: `;`, `,`, or a line break.
  fn member_separator(&mut self) -> SyntaxResult<()> {
    if self.consume_if(TT::Semicolon).is_match() || self.consume_if(TT::Comma).is_match() {
      return Ok(());
    }
    let t = self.peek();
    if t.typ == TT::BraceClose || t.preceded_by_line_terminator {
      Ok(())
    } else {
      Err(t.error(SyntaxErrorType::ExpectedSyntax("`;`")))
    }
  }

  fn reject_eof(&mut self) -> SyntaxResult<()> {
    let t = self.peek();
    if t.typ == TT::EOF {
      return Err(t.error(SyntaxErrorType::UnexpectedEnd));
    }
    Ok(())
  }

  /// `{ member* }` of interfaces and object types.
  pub fn type_members(&mut self) -> SyntaxResult<Vec<NodeId>> {
    self.require(TT::BraceOpen)?;
    let mut members = Vec::new();
    loop {
      if self.consume_if(TT::BraceClose).is_match() {
        break;
      }
      self.reject_eof()?;
      let comments = self.take_leading_comments();
      let member = self.type_member()?;
      self.ast().node_mut(member).leading_comments = comments;
      members.push(member);
      self.member_separator()?;
    }
    Ok(members)
  }

  fn type_member(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.peek();
    if matches!(t.typ, TT::ParenthesisOpen | TT::ChevronLeft) {
      let type_params = self.type_params_opt()?;
      let params = self.params()?;
      let return_type = self.return_type_annotation()?;
      return Ok(self.finish(start, CallSignature {
        type_params,
        params,
        return_type,
      }));
    }
    if t.typ == TT::KeywordNew
      && matches!(
        self.peek_nth(1).typ,
        TT::ParenthesisOpen | TT::ChevronLeft
      )
    {
      self.consume();
      let type_params = self.type_params_opt()?;
      let params = self.params()?;
      let return_type = self.return_type_annotation()?;
      return Ok(self.finish(start, ConstructSignature {
        type_params,
        params,
        return_type,
      }));
    }
    let modifiers = self.modifiers(&["readonly"]);
    if self.is_index_signature() {
      return self.index_signature(start, modifiers);
    }
    let kind = self.accessor_kind();
    let key = self.prop_key()?;
    let optional = self.consume_if(TT::Question).is_match();
    if kind != MethodKind::Method
      || matches!(self.peek().typ, TT::ParenthesisOpen | TT::ChevronLeft)
    {
      let type_params = self.type_params_opt()?;
      let params = self.params()?;
      let return_type = self.return_type_annotation()?;
      return Ok(self.finish(start, MethodMember {
        modifiers,
        kind,
        key,
        optional,
        is_async: false,
        generator: false,
        type_params,
        params,
        return_type,
        body: None,
      }));
    }
    let ty = if self.consume_if(TT::Colon).is_match() {
      Some(self.type_expr()?)
    } else {
      None
    };
    Ok(self.finish(start, PropertyMember {
      modifiers,
      key,
      optional,
      definite: false,
      ty,
      init: None,
    }))
  }

  fn return_type_annotation(&mut self) -> SyntaxResult<Option<NodeId>> {
    if self.consume_if(TT::Colon).is_match() {
      Ok(Some(self.return_type()?))
    } else {
      Ok(None)
    }
  }

  /// `{ member* }` of a class.
  pub fn class_members(&mut self) -> SyntaxResult<Vec<NodeId>> {
    self.require(TT::BraceOpen)?;
    let mut members = Vec::new();
    loop {
      if self.consume_if(TT::Semicolon).is_match() {
        continue;
      }
      if self.consume_if(TT::BraceClose).is_match() {
        break;
      }
      self.reject_eof()?;
      let comments = self.take_leading_comments();
      let member = self.class_member()?;
      self.ast().node_mut(member).leading_comments = comments;
      members.push(member);
    }
    Ok(members)
  }

  fn class_member(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.skip_decorators()?;
    let modifiers = self.modifiers(&[
      "public",
      "protected",
      "private",
      "static",
      "abstract",
      "override",
      "readonly",
      "declare",
      "accessor",
    ]);
    let t = self.peek();
    if t.typ == TT::BraceOpen && modifiers.is_static {
      return Err(t.error(SyntaxErrorType::ExpectedSyntax("class member")));
    }
    let is_constructor = (self.is_word(&t, "constructor")
      || (t.typ == TT::LiteralString && crate::literal::unquote(self.str(t.loc)) == "constructor"))
      && self.peek_nth(1).typ == TT::ParenthesisOpen;
    if is_constructor {
      self.consume();
      let params = self.params()?;
      let body = self.method_body()?;
      return Ok(self.finish(start, ConstructorMember {
        modifiers,
        params,
        body,
      }));
    }
    if self.is_index_signature() {
      let sig = self.index_signature(start, modifiers)?;
      self.consume_semicolon()?;
      return Ok(sig);
    }
    let mut is_async = false;
    let t = self.peek();
    if self.is_word(&t, "async") {
      let next = self.peek_nth(1);
      if !next.preceded_by_line_terminator
        && (is_prop_name_start(next.typ) || next.typ == TT::Asterisk)
      {
        self.consume();
        is_async = true;
      }
    }
    let generator = self.consume_if(TT::Asterisk).is_match();
    let kind = if is_async || generator {
      MethodKind::Method
    } else {
      self.accessor_kind()
    };
    let key = self.prop_key()?;
    let optional = self.consume_if(TT::Question).is_match();
    let definite = !optional && self.consume_if(TT::Exclamation).is_match();
    let t = self.peek();
    if kind != MethodKind::Method
      || is_async
      || generator
      || matches!(t.typ, TT::ParenthesisOpen | TT::ChevronLeft)
    {
      let type_params = self.type_params_opt()?;
      let params = self.params()?;
      let return_type = self.return_type_annotation()?;
      let body = self.method_body()?;
      return Ok(self.finish(start, MethodMember {
        modifiers,
        kind,
        key,
        optional,
        is_async,
        generator,
        type_params,
        params,
        return_type,
        body,
      }));
    }
    let ty = if self.consume_if(TT::Colon).is_match() {
      Some(self.type_expr()?)
    } else {
      None
    };
    let init = if self.consume_if(TT::Equals).is_match() {
      Some(self.assignment_expr()?)
    } else {
      None
    };
    self.consume_semicolon()?;
    Ok(self.finish(start, PropertyMember {
      modifiers,
      key,
      optional,
      definite,
      ty,
      init,
    }))
  }

  /// A method body, or `;` for signatures.
  fn method_body(&mut self) -> SyntaxResult<Option<String>> {
    if self.peek().typ == TT::BraceOpen {
      Ok(Some(self.opaque_block()?))
    } else {
      self.consume_semicolon()?;
      Ok(None)
    }
  }
}
