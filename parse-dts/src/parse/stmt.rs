use super::Parser;
use crate::ast::class_or_object::PropKey;
use crate::ast::stmt::*;
use crate::ast::NodeId;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::literal::unquote;
use crate::token::TT;

impl<'a> Parser<'a> {
  pub fn stmt(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let t = self.peek();
    match t.typ {
      TT::KeywordExport => self.export_stmt(),
      TT::KeywordImport => match self.peek_nth(1).typ {
        // `import("m")` and `import.meta` are expressions.
        TT::ParenthesisOpen | TT::Dot => self.expr_stmt(),
        _ => self.import_stmt(),
      },
      TT::Semicolon => {
        self.consume();
        Ok(self.finish(start, EmptyStmt {}))
      }
      _ if self.is_decl_start(0) => self.decl(start, DeclFlags::default()),
      _ => self.expr_stmt(),
    }
  }

  /// Whether the token `offset` ahead starts a declaration, possibly prefixed by `declare`.
  pub fn is_decl_start(&mut self, offset: usize) -> bool {
    let t = self.peek_nth(offset);
    match t.typ {
      TT::KeywordVar | TT::KeywordConst | TT::KeywordFunction | TT::KeywordClass | TT::KeywordEnum => {
        true
      }
      TT::Identifier => {
        let next = self.peek_nth(offset + 1);
        if next.preceded_by_line_terminator {
          return false;
        }
        match self.str(t.loc) {
          "let" => matches!(
            next.typ,
            TT::Identifier | TT::BraceOpen | TT::BracketOpen
          ),
          "async" => next.typ == TT::KeywordFunction,
          "abstract" => next.typ == TT::KeywordClass,
          "interface" | "type" | "namespace" => next.typ == TT::Identifier,
          "module" => matches!(next.typ, TT::Identifier | TT::LiteralString),
          "global" => next.typ == TT::BraceOpen,
          "declare" => self.is_decl_start(offset + 1),
          _ => false,
        }
      }
      _ => false,
    }
  }

  /// A declaration whose leading `export` / `export default` (if any) has been consumed.
  pub fn decl(&mut self, start: usize, mut flags: DeclFlags) -> SyntaxResult<NodeId> {
    if self.peek_word("declare") {
      self.consume();
      flags.declare = true;
    }
    let t = self.peek();
    match t.typ {
      TT::KeywordVar => self.var_decl(start, flags),
      TT::KeywordConst if self.peek_nth(1).typ == TT::KeywordEnum => self.enum_decl(start, flags),
      TT::KeywordConst => self.var_decl(start, flags),
      TT::KeywordFunction => self.func_decl(start, flags),
      TT::KeywordClass => self.class_decl(start, flags),
      TT::KeywordEnum => self.enum_decl(start, flags),
      TT::Identifier => match self.str(t.loc) {
        "let" => self.var_decl(start, flags),
        "async" => self.func_decl(start, flags),
        "abstract" => self.class_decl(start, flags),
        "interface" => self.interface_decl(start, flags),
        "type" => self.type_alias_decl(start, flags),
        "namespace" | "module" | "global" => self.module_decl(start, flags),
        _ => Err(t.error(SyntaxErrorType::ExpectedSyntax("declaration"))),
      },
      _ => Err(t.error(SyntaxErrorType::ExpectedSyntax("declaration"))),
    }
  }

  fn var_decl(&mut self, start: usize, flags: DeclFlags) -> SyntaxResult<NodeId> {
    let t = self.consume();
    let kind = match t.typ {
      TT::KeywordVar => VarKind::Var,
      TT::KeywordConst => VarKind::Const,
      _ => VarKind::Let,
    };
    let mut declarators = Vec::new();
    loop {
      let dstart = self.start();
      let name = self.binding_ident()?;
      let definite = self.consume_if(TT::Exclamation).is_match();
      let type_annotation = if self.consume_if(TT::Colon).is_match() {
        Some(self.type_expr()?)
      } else {
        None
      };
      let init = if self.consume_if(TT::Equals).is_match() {
        Some(self.assignment_expr()?)
      } else {
        None
      };
      declarators.push(self.finish(dstart, VarDeclarator {
        name,
        definite,
        type_annotation,
        init,
      }));
      if !self.consume_if(TT::Comma).is_match() {
        break;
      }
    }
    self.consume_semicolon()?;
    Ok(self.finish(start, VarDecl {
      flags,
      kind,
      declarators,
    }))
  }

  fn func_decl(&mut self, start: usize, flags: DeclFlags) -> SyntaxResult<NodeId> {
    let is_async = self.consume_if_word("async");
    self.require(TT::KeywordFunction)?;
    let generator = self.consume_if(TT::Asterisk).is_match();
    let name = if self.peek().typ == TT::Identifier {
      Some(self.binding_ident()?)
    } else {
      None
    };
    let type_params = self.type_params_opt()?;
    let params = self.params()?;
    let return_type = if self.consume_if(TT::Colon).is_match() {
      Some(self.return_type()?)
    } else {
      None
    };
    let body = if self.peek().typ == TT::BraceOpen {
      Some(self.opaque_block()?)
    } else {
      self.consume_semicolon()?;
      None
    };
    Ok(self.finish(start, FuncDecl {
      flags,
      is_async,
      generator,
      name,
      type_params,
      params,
      return_type,
      body,
    }))
  }

  fn class_decl(&mut self, start: usize, flags: DeclFlags) -> SyntaxResult<NodeId> {
    let is_abstract = self.consume_if_word("abstract");
    self.require(TT::KeywordClass)?;
    let name = if self.peek().typ == TT::Identifier && !self.peek_word("implements") {
      Some(self.binding_ident()?)
    } else {
      None
    };
    let type_params = self.type_params_opt()?;
    let extends = if self.consume_if(TT::KeywordExtends).is_match() {
      Some(self.heritage()?)
    } else {
      None
    };
    let mut implements = Vec::new();
    if self.consume_if_word("implements") {
      loop {
        implements.push(self.heritage()?);
        if !self.consume_if(TT::Comma).is_match() {
          break;
        }
      }
    }
    let members = self.class_members()?;
    Ok(self.finish(start, ClassDecl {
      flags,
      is_abstract,
      name,
      type_params,
      extends,
      implements,
      members,
    }))
  }

  fn interface_decl(&mut self, start: usize, flags: DeclFlags) -> SyntaxResult<NodeId> {
    self.require_word("interface")?;
    let name = self.binding_ident()?;
    let type_params = self.type_params_opt()?;
    let mut extends = Vec::new();
    if self.consume_if(TT::KeywordExtends).is_match() {
      loop {
        extends.push(self.heritage()?);
        if !self.consume_if(TT::Comma).is_match() {
          break;
        }
      }
    }
    let members = self.type_members()?;
    Ok(self.finish(start, InterfaceDecl {
      flags,
      name,
      type_params,
      extends,
      members,
    }))
  }

  fn type_alias_decl(&mut self, start: usize, flags: DeclFlags) -> SyntaxResult<NodeId> {
    self.require_word("type")?;
    let name = self.binding_ident()?;
    let type_params = self.type_params_opt()?;
    self.require(TT::Equals)?;
    let ty = self.type_expr()?;
    self.consume_semicolon()?;
    Ok(self.finish(start, TypeAliasDecl {
      flags,
      name,
      type_params,
      ty,
    }))
  }

  fn enum_decl(&mut self, start: usize, flags: DeclFlags) -> SyntaxResult<NodeId> {
    let is_const = self.consume_if(TT::KeywordConst).is_match();
    self.require(TT::KeywordEnum)?;
    let name = self.binding_ident()?;
    self.require(TT::BraceOpen)?;
    let mut members = Vec::new();
    while self.peek().typ != TT::BraceClose {
      let comments = self.take_leading_comments();
      let mstart = self.start();
      let key = self.prop_key()?;
      if matches!(key, PropKey::Computed(_) | PropKey::Private(_)) {
        return Err(self.peek().error(SyntaxErrorType::ExpectedSyntax("enum member name")));
      }
      let init = if self.consume_if(TT::Equals).is_match() {
        Some(self.assignment_expr()?)
      } else {
        None
      };
      let member = self.finish(mstart, EnumMember { key, init });
      self.ast().node_mut(member).leading_comments = comments;
      members.push(member);
      if !self.consume_if(TT::Comma).is_match() {
        break;
      }
    }
    self.require(TT::BraceClose)?;
    Ok(self.finish(start, EnumDecl {
      flags,
      is_const,
      name,
      members,
    }))
  }

  fn module_body(&mut self) -> SyntaxResult<Vec<NodeId>> {
    self.require(TT::BraceOpen)?;
    let body = self.stmt_list(TT::BraceClose)?;
    self.require(TT::BraceClose)?;
    Ok(body)
  }

  fn module_decl(&mut self, start: usize, flags: DeclFlags) -> SyntaxResult<NodeId> {
    if self.consume_if_word("global") {
      let body = self.module_body()?;
      return Ok(self.finish(start, ModuleDecl {
        flags,
        keyword: ModuleKeyword::Global,
        name: ModuleName::Global,
        body: Some(body),
        dotted: false,
      }));
    }
    let keyword = if self.consume_if_word("namespace") {
      ModuleKeyword::Namespace
    } else {
      self.require_word("module")?;
      ModuleKeyword::Module
    };

    let t = self.peek();
    if t.typ == TT::LiteralString {
      self.consume();
      let name = ModuleName::String(unquote(self.str(t.loc)));
      let body = if self.peek().typ == TT::BraceOpen {
        Some(self.module_body()?)
      } else {
        self.consume_semicolon()?;
        None
      };
      return Ok(self.finish(start, ModuleDecl {
        flags,
        keyword,
        name,
        body,
        dotted: false,
      }));
    }

    let mut names = vec![self.binding_ident()?];
    while self.consume_if(TT::Dot).is_match() {
      names.push(self.binding_ident()?);
    }
    let mut body = self.module_body()?;
    // `namespace A.B.C {}` nests one exported declaration per segment after the first.
    let outer = names.remove(0);
    while let Some(name) = names.pop() {
      let inner = self.finish(start, ModuleDecl {
        flags: DeclFlags {
          export: true,
          default: false,
          declare: false,
        },
        keyword,
        name: ModuleName::Ident(name),
        body: Some(body),
        dotted: true,
      });
      body = vec![inner];
    }
    Ok(self.finish(start, ModuleDecl {
      flags,
      keyword,
      name: ModuleName::Ident(outer),
      body: Some(body),
      dotted: false,
    }))
  }
}
