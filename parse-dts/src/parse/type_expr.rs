use super::Parser;
use crate::ast::stmt::Heritage;
use crate::ast::stmt::TypeParam;
use crate::ast::stmt::Variance;
use crate::ast::type_expr::*;
use crate::ast::Ident;
use crate::ast::NodeId;
use crate::ast::QualifiedName;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::LexMode;
use crate::literal::unquote;
use crate::token::TT;

impl<'a> Parser<'a> {
  fn with_conditional<T>(
    &mut self,
    disallow: bool,
    f: impl FnOnce(&mut Self) -> SyntaxResult<T>,
  ) -> SyntaxResult<T> {
    let prev = self.disallow_conditional;
    self.disallow_conditional = disallow;
    let res = f(self);
    self.disallow_conditional = prev;
    res
  }

  pub fn type_expr(&mut self) -> SyntaxResult<NodeId> {
    self.with_conditional(false, |p| p.type_expr_inner())
  }

  fn type_expr_inner(&mut self) -> SyntaxResult<NodeId> {
    let t = self.peek();
    match t.typ {
      TT::ChevronLeft => return self.function_type(),
      TT::KeywordNew => return self.constructor_type(),
      TT::Identifier
        if self.is_word(&t, "abstract") && self.peek_nth(1).typ == TT::KeywordNew =>
      {
        return self.constructor_type()
      }
      TT::ParenthesisOpen if self.is_start_of_function_type() => return self.function_type(),
      _ => {}
    };
    self.conditional_type()
  }

  fn is_start_of_function_type(&mut self) -> bool {
    let cp = self.checkpoint();
    let res = self.scan_function_type_start();
    self.restore_checkpoint(cp);
    res
  }

  fn scan_function_type_start(&mut self) -> bool {
    self.consume();
    let t = self.peek();
    match t.typ {
      TT::ParenthesisClose | TT::DotDotDot => return true,
      TT::BraceOpen | TT::BracketOpen => {
        if self.raw_balanced().is_err() {
          return false;
        }
      }
      TT::KeywordThis => {
        self.consume();
      }
      tt if tt.is_identifier_name() => {
        self.consume();
        // Parameter modifiers: `(public x: T)`.
        if self.peek().typ == TT::Identifier
          && matches!(
            self.str(t.loc),
            "public" | "private" | "protected" | "readonly"
          )
        {
          self.consume();
        }
      }
      _ => return false,
    };
    let n = self.consume();
    match n.typ {
      TT::Colon | TT::Comma | TT::Question | TT::Equals => true,
      TT::ParenthesisClose => self.peek().typ == TT::EqualsChevronRight,
      _ => false,
    }
  }

  fn function_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let type_params = self.type_params_opt()?;
    let params = self.params()?;
    self.require(TT::EqualsChevronRight)?;
    let return_type = self.return_type()?;
    Ok(self.finish(start, TypeFunction {
      type_params,
      params,
      return_type,
    }))
  }

  fn constructor_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let is_abstract = self.consume_if_word("abstract");
    self.require(TT::KeywordNew)?;
    let type_params = self.type_params_opt()?;
    let params = self.params()?;
    self.require(TT::EqualsChevronRight)?;
    let return_type = self.return_type()?;
    Ok(self.finish(start, TypeConstructor {
      is_abstract,
      type_params,
      params,
      return_type,
    }))
  }

  fn conditional_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let check = self.union_type()?;
    let t = self.peek();
    if self.disallow_conditional
      || t.typ != TT::KeywordExtends
      || t.preceded_by_line_terminator
    {
      return Ok(check);
    }
    self.consume();
    let extends = self.with_conditional(true, |p| p.type_expr_inner())?;
    self.require(TT::Question)?;
    let true_type = self.type_expr()?;
    self.require(TT::Colon)?;
    let false_type = self.type_expr()?;
    Ok(self.finish(start, TypeConditional {
      check,
      extends,
      true_type,
      false_type,
    }))
  }

  fn union_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.consume_if(TT::Bar);
    let first = self.intersection_type()?;
    if self.peek().typ != TT::Bar {
      return Ok(first);
    }
    let mut types = vec![first];
    while self.consume_if(TT::Bar).is_match() {
      types.push(self.intersection_type()?);
    }
    Ok(self.finish(start, TypeUnion { types }))
  }

  fn intersection_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.consume_if(TT::Ampersand);
    let first = self.type_operator()?;
    if self.peek().typ != TT::Ampersand {
      return Ok(first);
    }
    let mut types = vec![first];
    while self.consume_if(TT::Ampersand).is_match() {
      types.push(self.type_operator()?);
    }
    Ok(self.finish(start, TypeIntersection { types }))
  }

  fn type_operator(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.peek();
    if t.typ == TT::Identifier {
      let op = match self.str(t.loc) {
        "keyof" => Some(TypeOperatorKind::Keyof),
        "unique" => Some(TypeOperatorKind::Unique),
        "readonly" => Some(TypeOperatorKind::Readonly),
        "infer" => return self.infer_type(),
        _ => None,
      };
      // `keyof` and friends may also be plain type names, e.g. a property type `readonly`.
      let next = self.peek_nth(1).typ;
      if let Some(op) = op.filter(|_| is_start_of_type(next)) {
        self.consume();
        let ty = self.type_operator()?;
        return Ok(self.finish(start, TypeOperator { op, ty }));
      }
    }
    self.postfix_type()
  }

  fn infer_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require_word("infer")?;
    let name = self.binding_ident()?;
    let mut constraint = None;
    let t = self.peek();
    if t.typ == TT::KeywordExtends && !t.preceded_by_line_terminator {
      let cp = self.checkpoint();
      self.consume();
      let c = self.with_conditional(true, |p| p.type_expr_inner())?;
      // In `infer U extends C ? X : Y` the `extends` belongs to a conditional type instead.
      if self.disallow_conditional || self.peek().typ != TT::Question {
        constraint = Some(c);
      } else {
        self.restore_checkpoint(cp);
      }
    }
    let param = self.finish(start, TypeParam {
      name,
      is_const: false,
      variance: None,
      constraint,
      default: None,
    });
    Ok(self.finish(start, TypeInfer { param }))
  }

  fn postfix_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let mut ty = self.primary_type()?;
    loop {
      let t = self.peek();
      if t.typ != TT::BracketOpen || t.preceded_by_line_terminator {
        break;
      }
      self.consume();
      ty = if self.consume_if(TT::BracketClose).is_match() {
        self.finish(start, TypeArray { elem: ty })
      } else {
        let index = self.type_expr()?;
        self.require(TT::BracketClose)?;
        self.finish(start, TypeIndexedAccess { object: ty, index })
      };
    }
    Ok(ty)
  }

  fn primary_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.peek();
    match t.typ {
      TT::Identifier => {
        let name = self.str(t.loc);
        let next = self.peek_nth(1);
        let keyword = TypeKeywordKind::from_name(name).filter(|kind| match kind {
          // Only the sole body of an alias: `type Uppercase<S extends string> = intrinsic;`
          TypeKeywordKind::Intrinsic => {
            matches!(next.typ, TT::Semicolon | TT::EOF | TT::BraceClose)
              || next.preceded_by_line_terminator
          }
          _ => next.typ != TT::Dot,
        });
        match keyword {
          Some(kind) => {
            self.consume();
            Ok(self.finish(start, TypeKeyword { kind }))
          }
          None => self.type_ref(),
        }
      }
      TT::KeywordVoid => {
        self.consume();
        Ok(self.finish(start, TypeKeyword {
          kind: TypeKeywordKind::Void,
        }))
      }
      TT::LiteralNull => {
        self.consume();
        Ok(self.finish(start, TypeKeyword {
          kind: TypeKeywordKind::Null,
        }))
      }
      TT::KeywordThis => {
        self.consume();
        Ok(self.finish(start, TypeThis {}))
      }
      TT::KeywordTypeof => self.type_query(),
      TT::KeywordImport => self.import_type(false),
      TT::LiteralString
      | TT::LiteralNumber
      | TT::LiteralBigInt
      | TT::LiteralTrue
      | TT::LiteralFalse
      | TT::LiteralTemplate => {
        self.consume();
        let raw = self.string(t.loc);
        Ok(self.finish(start, TypeLiteral { raw }))
      }
      TT::Hyphen => {
        self.consume();
        let num = self.consume();
        if !matches!(num.typ, TT::LiteralNumber | TT::LiteralBigInt) {
          return Err(num.error(SyntaxErrorType::ExpectedSyntax("number literal")));
        }
        let raw = format!("-{}", self.str(num.loc));
        Ok(self.finish(start, TypeLiteral { raw }))
      }
      TT::TemplateHead => self.template_type(),
      TT::BraceOpen => {
        if self.is_start_of_mapped_type() {
          self.mapped_type()
        } else {
          let members = self.type_members()?;
          Ok(self.finish(start, TypeObject { members }))
        }
      }
      TT::BracketOpen => {
        let elems = self.list(TT::BracketOpen, TT::BracketClose, |p| p.tuple_element())?;
        Ok(self.finish(start, TypeTuple { elems }))
      }
      TT::ParenthesisOpen => {
        self.consume();
        let ty = self.type_expr()?;
        self.require(TT::ParenthesisClose)?;
        Ok(self.finish(start, TypeParen { ty }))
      }
      _ => Err(t.error(SyntaxErrorType::ExpectedSyntax("type"))),
    }
  }

  /// `a`, `a.b.c`; the first segment may be `this` inside `typeof`.
  pub fn entity_name(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.consume();
    if t.typ != TT::Identifier && t.typ != TT::KeywordThis {
      return Err(t.error(SyntaxErrorType::ExpectedSyntax("identifier")));
    }
    let name = self.string(t.loc);
    let mut entity = self.alloc(t.loc, Ident { name });
    while self.peek().typ == TT::Dot {
      self.consume();
      let right = self.require_identifier_name()?;
      entity = self.finish(start, QualifiedName {
        left: entity,
        right,
      });
    }
    Ok(entity)
  }

  fn type_args_opt(&mut self) -> SyntaxResult<Option<Vec<NodeId>>> {
    let t = self.peek();
    if t.typ == TT::ChevronLeft && !t.preceded_by_line_terminator {
      Ok(Some(self.type_args()?))
    } else {
      Ok(None)
    }
  }

  pub fn type_args(&mut self) -> SyntaxResult<Vec<NodeId>> {
    self.list(TT::ChevronLeft, TT::ChevronRight, |p| p.type_expr())
  }

  fn type_ref(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let name = self.entity_name()?;
    let type_args = self.type_args_opt()?;
    Ok(self.finish(start, TypeRef { name, type_args }))
  }

  fn type_query(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require(TT::KeywordTypeof)?;
    if self.peek().typ == TT::KeywordImport {
      return self.import_type(true);
    }
    let expr_name = self.entity_name()?;
    let type_args = self.type_args_opt()?;
    Ok(self.finish(start, TypeQuery {
      expr_name,
      type_args,
    }))
  }

  fn import_type(&mut self, is_typeof: bool) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require(TT::KeywordImport)?;
    self.require(TT::ParenthesisOpen)?;
    let source = self.string_literal()?;
    if self.consume_if(TT::Comma).is_match() && self.peek().typ == TT::BraceOpen {
      // Import attributes: `import("m", { with: { "resolution-mode": "import" } })`.
      self.raw_balanced()?;
      self.consume_if(TT::Comma);
    }
    self.require(TT::ParenthesisClose)?;
    let qualifier = if self.consume_if(TT::Dot).is_match() {
      let qstart = self.start();
      let first = self.require_identifier_name()?;
      let mut q = self.finish(qstart, Ident { name: first });
      while self.consume_if(TT::Dot).is_match() {
        let right = self.require_identifier_name()?;
        q = self.finish(qstart, QualifiedName { left: q, right });
      }
      Some(q)
    } else {
      None
    };
    let type_args = self.type_args_opt()?;
    Ok(self.finish(start, TypeImport {
      is_typeof,
      source,
      qualifier,
      type_args,
    }))
  }

  fn template_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let head = self.require(TT::TemplateHead)?;
    let raw = self.str(head.loc);
    let mut quasis = vec![raw[1..raw.len() - 2].to_string()];
    let mut types = Vec::new();
    loop {
      types.push(self.type_expr()?);
      let t = self.consume_with_mode(LexMode::TemplateContinue);
      let raw = self.str(t.loc);
      match t.typ {
        TT::TemplateMiddle => quasis.push(raw[1..raw.len() - 2].to_string()),
        TT::TemplateTail => {
          quasis.push(raw[1..raw.len() - 1].to_string());
          break;
        }
        _ => return Err(t.error(SyntaxErrorType::UnterminatedBlock)),
      };
    }
    Ok(self.finish(start, TypeTemplate { quasis, types }))
  }

  fn is_start_of_mapped_type(&mut self) -> bool {
    let mut i = 1;
    let t = self.peek_nth(i);
    if matches!(t.typ, TT::Plus | TT::Hyphen) {
      let word = self.peek_nth(i + 1);
      if !self.is_word(&word, "readonly") {
        return false;
      }
      i += 2;
    } else if self.is_word(&t, "readonly") {
      i += 1;
    }
    self.peek_nth(i).typ == TT::BracketOpen
      && self.peek_nth(i + 1).typ.is_identifier_name()
      && self.peek_nth(i + 2).typ == TT::KeywordIn
  }

  fn mapped_modifier(&mut self, word: &'static str) -> SyntaxResult<Option<MappedModifier>> {
    let t = self.peek();
    let modifier = match t.typ {
      TT::Plus => MappedModifier::Plus,
      TT::Hyphen => MappedModifier::Minus,
      _ if word == "?" && t.typ == TT::Question => {
        self.consume();
        return Ok(Some(MappedModifier::Present));
      }
      _ if self.is_word(&t, word) => {
        self.consume();
        return Ok(Some(MappedModifier::Present));
      }
      _ => return Ok(None),
    };
    self.consume();
    if word == "?" {
      self.require(TT::Question)?;
    } else {
      self.require_word(word)?;
    }
    Ok(Some(modifier))
  }

  fn mapped_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require(TT::BraceOpen)?;
    let readonly = self.mapped_modifier("readonly")?;
    self.require(TT::BracketOpen)?;
    let pstart = self.start();
    let name = self.binding_ident()?;
    self.require(TT::KeywordIn)?;
    let constraint = self.type_expr()?;
    let param = self.finish(pstart, TypeParam {
      name,
      is_const: false,
      variance: None,
      constraint: Some(constraint),
      default: None,
    });
    let name_type = if self.consume_if_word("as") {
      Some(self.type_expr()?)
    } else {
      None
    };
    self.require(TT::BracketClose)?;
    let optional = self.mapped_modifier("?")?;
    let ty = if self.consume_if(TT::Colon).is_match() {
      Some(self.type_expr()?)
    } else {
      None
    };
    if !self.consume_if(TT::Semicolon).is_match() {
      self.consume_if(TT::Comma);
    }
    self.require(TT::BraceClose)?;
    Ok(self.finish(start, TypeMapped {
      readonly,
      param,
      name_type,
      optional,
      ty,
    }))
  }

  fn tuple_element(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let rest = self.consume_if(TT::DotDotDot).is_match();
    let t = self.peek();
    let labelled = t.typ.is_identifier_name() && {
      let n1 = self.peek_nth(1).typ;
      n1 == TT::Colon || (n1 == TT::Question && self.peek_nth(2).typ == TT::Colon)
    };
    if labelled {
      let label = self.require_identifier_name()?;
      let optional = self.consume_if(TT::Question).is_match();
      self.require(TT::Colon)?;
      let ty = self.type_expr()?;
      return Ok(self.finish(start, TypeTupleElement {
        label: Some(label),
        optional,
        rest,
        ty,
      }));
    }
    let ty = self.type_expr()?;
    let optional = self.consume_if(TT::Question).is_match();
    Ok(self.finish(start, TypeTupleElement {
      label: None,
      optional,
      rest,
      ty,
    }))
  }

  /// A return type annotation, which may be a type predicate.
  pub fn return_type(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.peek();
    let n1 = self.peek_nth(1);
    if self.is_word(&t, "asserts")
      && matches!(n1.typ, TT::Identifier | TT::KeywordThis)
      && !n1.preceded_by_line_terminator
    {
      self.consume();
      let param_loc = self.consume().loc;
      let param = self.string(param_loc);
      let n = self.peek();
      let ty = if self.is_word(&n, "is") && !n.preceded_by_line_terminator {
        self.consume();
        Some(self.type_expr()?)
      } else {
        None
      };
      return Ok(self.finish(start, TypePredicate {
        asserts: true,
        param,
        ty,
      }));
    }
    if matches!(t.typ, TT::Identifier | TT::KeywordThis)
      && self.is_word(&n1, "is")
      && !n1.preceded_by_line_terminator
    {
      let param_loc = self.consume().loc;
      let param = self.string(param_loc);
      self.consume();
      let ty = self.type_expr()?;
      return Ok(self.finish(start, TypePredicate {
        asserts: false,
        param,
        ty: Some(ty),
      }));
    }
    self.type_expr()
  }

  pub fn type_params_opt(&mut self) -> SyntaxResult<Option<Vec<NodeId>>> {
    if self.peek().typ != TT::ChevronLeft {
      return Ok(None);
    }
    Ok(Some(self.list(TT::ChevronLeft, TT::ChevronRight, |p| {
      p.type_param()
    })?))
  }

  fn type_param(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let is_const = self.consume_if(TT::KeywordConst).is_match();
    let mut variance = None;
    if self.peek().typ == TT::KeywordIn && self.peek_nth(1).typ == TT::Identifier {
      self.consume();
      variance = Some(Variance::In);
    }
    if self.peek_word("out") && self.peek_nth(1).typ == TT::Identifier {
      self.consume();
      variance = Some(match variance {
        Some(_) => Variance::InOut,
        None => Variance::Out,
      });
    }
    let name = self.binding_ident()?;
    let constraint = if self.consume_if(TT::KeywordExtends).is_match() {
      Some(self.type_expr()?)
    } else {
      None
    };
    let default = if self.consume_if(TT::Equals).is_match() {
      Some(self.type_expr()?)
    } else {
      None
    };
    Ok(self.finish(start, TypeParam {
      name,
      is_const,
      variance,
      constraint,
      default,
    }))
  }

  /// A class or interface heritage clause entry: `Base<T>`.
  pub fn heritage(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let expr = self.entity_name()?;
    let type_args = self.type_args_opt()?;
    Ok(self.finish(start, Heritage { expr, type_args }))
  }

  /// Requires a string literal and returns its value.
  pub fn string_literal(&mut self) -> SyntaxResult<String> {
    let t = self.require(TT::LiteralString)?;
    Ok(unquote(self.str(t.loc)))
  }
}

fn is_start_of_type(tt: TT) -> bool {
  matches!(
    tt,
    TT::Identifier
      | TT::KeywordThis
      | TT::KeywordTypeof
      | TT::KeywordImport
      | TT::KeywordVoid
      | TT::LiteralNull
      | TT::LiteralString
      | TT::LiteralNumber
      | TT::LiteralBigInt
      | TT::LiteralTrue
      | TT::LiteralFalse
      | TT::LiteralTemplate
      | TT::TemplateHead
      | TT::Hyphen
      | TT::BraceOpen
      | TT::BracketOpen
      | TT::ParenthesisOpen
  )
}
