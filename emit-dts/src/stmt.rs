use crate::EmitError;
use crate::EmitResult;
use crate::Printer;
use parse_dts::ast::class_or_object::*;
use parse_dts::ast::stmt::*;
use parse_dts::ast::NodeId;
use parse_dts::ast::Syntax;
use parse_dts::char::is_valid_identifier;
use parse_dts::lex::Comment;
use parse_dts::lex::CommentKind;
use parse_dts::quote;

impl<'a> Printer<'a> {
  /// Prints each statement on its own line.
  pub fn emit_stmts(&mut self, stmts: &[NodeId]) -> EmitResult {
    for &stmt in stmts {
      if matches!(self.ast[stmt], Syntax::EmptyStmt(_)) {
        continue;
      }
      self.emit_stmt(stmt)?;
      self.em.newline();
    }
    Ok(())
  }

  pub fn emit_stmt(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    self.emit_comments(&ast.node(id).leading_comments);
    self
      .emit_stmt_inner(id)
      .map_err(|e| e.with_loc(self.ast.node(id).loc))
  }

  fn emit_comments(&mut self, comments: &[Comment]) {
    for comment in comments {
      match comment.kind {
        CommentKind::Line => self.write(comment.text.trim_end()),
        CommentKind::Block => {
          for (i, line) in comment.text.lines().enumerate() {
            if i == 0 {
              self.write(line.trim_end());
              continue;
            }
            self.em.newline();
            let line = line.trim();
            if line.starts_with('*') {
              self.write(" ");
            }
            self.write(line);
          }
        }
      };
      self.em.newline();
    }
  }

  fn emit_decl_flags(&mut self, flags: DeclFlags, declare_allowed: bool) {
    if flags.export {
      self.write("export ");
    }
    if flags.default {
      self.write("default ");
    } else if flags.declare && declare_allowed && self.ambient_depth == 0 {
      self.write("declare ");
    }
  }

  fn emit_binding(&mut self, id: NodeId) -> EmitResult {
    match self.ast.ident_name(id) {
      Some(name) => {
        self.write(name);
        Ok(())
      }
      None => Err(EmitError::unsupported("binding name")),
    }
  }

  /// A name in an import or export clause, quoted when it is not an identifier.
  fn emit_module_export_name(&mut self, name: &str) {
    if is_valid_identifier(name) {
      self.write(name);
    } else {
      self.write(&quote(name));
    }
  }

  fn emit_block_body(&mut self, body: &str) {
    self.write(" ");
    self.em.write_multiline(body);
  }

  fn emit_stmt_inner(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    match &ast[id] {
      Syntax::EmptyStmt(_) => {}
      Syntax::OpaqueStmt(s) => self.em.write_multiline(&s.text),
      Syntax::ExprStmt(s) => {
        self.emit_expr_stmt_start(s.expr)?;
        self.write(";");
      }
      Syntax::VarDecl(v) => {
        self.emit_decl_flags(v.flags, true);
        self.write(match v.kind {
          VarKind::Var => "var ",
          VarKind::Let => "let ",
          VarKind::Const => "const ",
        });
        self.comma_separated(&v.declarators, |p, d| p.emit_var_declarator(d))?;
        self.write(";");
      }
      Syntax::FuncDecl(f) => {
        self.emit_decl_flags(f.flags, true);
        if f.is_async {
          self.write("async ");
        }
        self.write("function");
        if f.generator {
          self.write("*");
        }
        if let Some(name) = f.name {
          self.write(" ");
          self.emit_binding(name)?;
        }
        self.emit_type_params(&f.type_params)?;
        self.emit_params(&f.params)?;
        if let Some(ret) = f.return_type {
          self.write(": ");
          self.emit_type(ret)?;
        }
        match &f.body {
          Some(body) => self.emit_block_body(body),
          None => self.write(";"),
        };
      }
      Syntax::ClassDecl(c) => {
        self.emit_decl_flags(c.flags, true);
        if c.is_abstract {
          self.write("abstract ");
        }
        self.write("class");
        if let Some(name) = c.name {
          self.write(" ");
          self.emit_binding(name)?;
        }
        self.emit_type_params(&c.type_params)?;
        if let Some(extends) = c.extends {
          self.write(" extends ");
          self.emit_heritage(extends)?;
        }
        if !c.implements.is_empty() {
          self.write(" implements ");
          self.comma_separated(&c.implements, |p, h| p.emit_heritage(h))?;
        }
        self.write(" {");
        self.emit_members(&c.members, true)?;
        self.write("}");
      }
      Syntax::InterfaceDecl(i) => {
        self.emit_decl_flags(i.flags, false);
        self.write("interface ");
        self.emit_binding(i.name)?;
        self.emit_type_params(&i.type_params)?;
        if !i.extends.is_empty() {
          self.write(" extends ");
          self.comma_separated(&i.extends, |p, h| p.emit_heritage(h))?;
        }
        self.write(" {");
        self.emit_members(&i.members, false)?;
        self.write("}");
      }
      Syntax::TypeAliasDecl(t) => {
        self.emit_decl_flags(t.flags, false);
        self.write("type ");
        self.emit_binding(t.name)?;
        self.emit_type_params(&t.type_params)?;
        self.write(" = ");
        self.emit_type(t.ty)?;
        self.write(";");
      }
      Syntax::EnumDecl(e) => {
        self.emit_decl_flags(e.flags, true);
        if e.is_const {
          self.write("const ");
        }
        self.write("enum ");
        self.emit_binding(e.name)?;
        self.write(" {");
        self.em.indent();
        self.em.newline();
        for &member in &e.members {
          self.emit_comments(&ast.node(member).leading_comments);
          let Syntax::EnumMember(m) = &ast[member] else {
            return Err(EmitError::unsupported("enum member"));
          };
          self.emit_prop_key(&m.key)?;
          if let Some(init) = m.init {
            self.write(" = ");
            self.emit_expr_min(init, crate::expr::ASSIGN_PREC)?;
          }
          self.write(",");
          self.em.newline();
        }
        self.em.dedent();
        self.write("}");
      }
      Syntax::ModuleDecl(m) => self.emit_module_decl(m)?,
      Syntax::ImportDecl(i) => {
        self.write("import ");
        if i.type_only {
          self.write("type ");
        }
        if !i.is_side_effect_only() {
          let mut clauses = 0;
          if let Some(default) = i.default {
            self.emit_binding(default)?;
            clauses += 1;
          }
          if let Some(ns) = i.namespace {
            if clauses > 0 {
              self.write(", ");
            }
            self.write("* as ");
            self.emit_binding(ns)?;
            clauses += 1;
          }
          if let Some(named) = &i.named {
            if clauses > 0 {
              self.write(", ");
            }
            if named.is_empty() {
              self.write("{}");
            } else {
              self.write("{ ");
              self.comma_separated(named, |p, s| p.emit_import_specifier(s))?;
              self.write(" }");
            }
          }
          self.write(" from ");
        }
        self.write(&quote(&i.source));
        self.write(";");
      }
      Syntax::ImportEquals(i) => {
        if i.export {
          self.write("export ");
        }
        self.write("import ");
        if i.type_only {
          self.write("type ");
        }
        self.emit_binding(i.name)?;
        self.write(" = ");
        match &i.target {
          ImportEqualsTarget::Require(source) => {
            self.write("require(");
            self.write(&quote(source));
            self.write(")");
          }
          ImportEqualsTarget::Entity(entity) => self.emit_entity(*entity)?,
        };
        self.write(";");
      }
      Syntax::ExportNamed(e) => {
        self.write("export ");
        if e.type_only {
          self.write("type ");
        }
        if e.specifiers.is_empty() {
          self.write("{}");
        } else {
          self.write("{ ");
          self.comma_separated(&e.specifiers, |p, s| p.emit_export_specifier(s))?;
          self.write(" }");
        }
        if let Some(source) = &e.source {
          self.write(" from ");
          self.write(&quote(source));
        }
        self.write(";");
      }
      Syntax::ExportAll(e) => {
        self.write("export ");
        if e.type_only {
          self.write("type ");
        }
        self.write("*");
        if let Some(alias) = &e.alias {
          self.write(" as ");
          self.emit_module_export_name(alias);
        }
        self.write(" from ");
        self.write(&quote(&e.source));
        self.write(";");
      }
      Syntax::ExportAsNamespace(e) => {
        self.write("export as namespace ");
        self.write(&e.name);
        self.write(";");
      }
      Syntax::ExportAssign(e) => {
        self.write("export = ");
        self.emit_expr_min(e.expr, crate::expr::ASSIGN_PREC)?;
        self.write(";");
      }
      Syntax::ExportDefaultExpr(e) => {
        self.write("export default ");
        self.emit_expr_min(e.expr, crate::expr::ASSIGN_PREC)?;
        self.write(";");
      }
      _ => return Err(EmitError::unsupported("statement")),
    };
    Ok(())
  }

  fn emit_module_decl(&mut self, m: &ModuleDecl) -> EmitResult {
    let ast = self.ast;
    if m.keyword == ModuleKeyword::Global {
      self.emit_decl_flags(m.flags, true);
      self.write("global");
    } else {
      self.emit_decl_flags(m.flags, true);
      self.write(match m.keyword {
        ModuleKeyword::Namespace => "namespace ",
        _ => "module ",
      });
      match &m.name {
        ModuleName::Ident(name) => self.emit_binding(*name)?,
        ModuleName::String(source) => self.write(&quote(source)),
        ModuleName::Global => self.write("global"),
      };
    }
    let Some(mut body) = m.body.as_deref() else {
      self.write(";");
      return Ok(());
    };
    // `namespace A.B {}` is stored as nested declarations; print it back as one.
    while let [only] = body {
      match &ast[*only] {
        Syntax::ModuleDecl(inner) if inner.dotted => {
          if let ModuleName::Ident(name) = &inner.name {
            self.write(".");
            self.emit_binding(*name)?;
          }
          match inner.body.as_deref() {
            Some(inner_body) => body = inner_body,
            None => break,
          }
        }
        _ => break,
      }
    }
    self.write(" {");
    self.em.indent();
    self.em.newline();
    self.ambient_depth += 1;
    let result = self.emit_stmts(body);
    self.ambient_depth -= 1;
    result?;
    self.em.dedent();
    self.write("}");
    Ok(())
  }

  fn emit_var_declarator(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    let Syntax::VarDeclarator(d) = &ast[id] else {
      return Err(EmitError::unsupported("variable declarator"));
    };
    self.emit_binding(d.name)?;
    if d.definite {
      self.write("!");
    }
    if let Some(ty) = d.type_annotation {
      self.write(": ");
      self.emit_type(ty)?;
    }
    if let Some(init) = d.init {
      self.write(" = ");
      self.emit_expr_min(init, crate::expr::ASSIGN_PREC)?;
    }
    Ok(())
  }

  fn emit_import_specifier(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    let Syntax::ImportSpecifier(s) = &ast[id] else {
      return Err(EmitError::unsupported("import specifier"));
    };
    if s.type_only {
      self.write("type ");
    }
    let local = ast
      .ident_name(s.local)
      .ok_or_else(|| EmitError::unsupported("import binding"))?;
    if s.imported != local {
      self.emit_module_export_name(&s.imported);
      self.write(" as ");
    }
    self.write(local);
    Ok(())
  }

  fn emit_export_specifier(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    let Syntax::ExportSpecifier(s) = &ast[id] else {
      return Err(EmitError::unsupported("export specifier"));
    };
    if s.type_only {
      self.write("type ");
    }
    let local = ast
      .ident_name(s.local)
      .ok_or_else(|| EmitError::unsupported("export binding"))?;
    self.emit_module_export_name(local);
    if s.exported != local {
      self.write(" as ");
      self.emit_module_export_name(&s.exported);
    }
    Ok(())
  }

  fn emit_heritage(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    let Syntax::Heritage(h) = &ast[id] else {
      return Err(EmitError::unsupported("heritage clause"));
    };
    match &ast[h.expr] {
      Syntax::Ident(_) | Syntax::QualifiedName(_) => self.emit_entity(h.expr)?,
      _ => self.emit_expr_min(h.expr, crate::expr::CALL_PREC)?,
    };
    if let Some(args) = &h.type_args {
      self.write("<");
      self.comma_separated(args, |p, a| p.emit_type(a))?;
      self.write(">");
    }
    Ok(())
  }

  pub(crate) fn emit_params(&mut self, params: &[NodeId]) -> EmitResult {
    self.write("(");
    self.comma_separated(params, |p, param| p.emit_param(param))?;
    self.write(")");
    Ok(())
  }

  fn emit_param(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    let Syntax::Param(param) = &ast[id] else {
      return Err(EmitError::unsupported("parameter"));
    };
    self.emit_modifiers(&param.modifiers);
    if param.rest {
      self.write("...");
    }
    self.em.write_multiline(&param.name);
    if param.optional {
      self.write("?");
    }
    if let Some(ty) = param.type_annotation {
      self.write(": ");
      self.emit_type(ty)?;
    }
    if let Some(init) = param.init {
      self.write(" = ");
      self.emit_expr_min(init, crate::expr::ASSIGN_PREC)?;
    }
    Ok(())
  }

  fn emit_modifiers(&mut self, m: &Modifiers) {
    if m.declare {
      self.write("declare ");
    }
    match m.accessibility {
      Some(Accessibility::Public) => self.write("public "),
      Some(Accessibility::Protected) => self.write("protected "),
      Some(Accessibility::Private) => self.write("private "),
      None => {}
    };
    if m.is_static {
      self.write("static ");
    }
    if m.is_abstract {
      self.write("abstract ");
    }
    if m.is_override {
      self.write("override ");
    }
    if m.readonly {
      self.write("readonly ");
    }
    if m.accessor {
      self.write("accessor ");
    }
  }

  pub(crate) fn emit_prop_key(&mut self, key: &PropKey) -> EmitResult {
    match key {
      PropKey::Ident(name) | PropKey::String(name) | PropKey::Number(name) => self.write(name),
      PropKey::Private(name) => self.write(name),
      PropKey::Computed(expr) => {
        self.write("[");
        self.emit_expr_min(*expr, crate::expr::ASSIGN_PREC)?;
        self.write("]");
      }
    };
    Ok(())
  }

  fn emit_signature(
    &mut self,
    type_params: &Option<Vec<NodeId>>,
    params: &[NodeId],
    return_type: Option<NodeId>,
  ) -> EmitResult {
    self.emit_type_params(type_params)?;
    self.emit_params(params)?;
    if let Some(ret) = return_type {
      self.write(": ");
      self.emit_type(ret)?;
    }
    Ok(())
  }

  /// Prints the members of a class or object type, one per line, after an opening brace
  /// already written by the caller. Leaves the cursor at the start of the closing line.
  pub(crate) fn emit_members(&mut self, members: &[NodeId], is_class: bool) -> EmitResult {
    let ast = self.ast;
    self.em.indent();
    self.em.newline();
    for &member in members {
      self.emit_comments(&ast.node(member).leading_comments);
      self
        .emit_member(member, is_class)
        .map_err(|e| e.with_loc(self.ast.node(member).loc))?;
      self.em.newline();
    }
    self.em.dedent();
    Ok(())
  }

  fn emit_member(&mut self, id: NodeId, is_class: bool) -> EmitResult {
    let ast = self.ast;
    let body = match &ast[id] {
      Syntax::PropertyMember(p) => {
        self.emit_modifiers(&p.modifiers);
        self.emit_prop_key(&p.key)?;
        if p.optional {
          self.write("?");
        }
        if p.definite {
          self.write("!");
        }
        if let Some(ty) = p.ty {
          self.write(": ");
          self.emit_type(ty)?;
        }
        if let Some(init) = p.init {
          self.write(" = ");
          self.emit_expr_min(init, crate::expr::ASSIGN_PREC)?;
        }
        None
      }
      Syntax::MethodMember(m) => {
        self.emit_modifiers(&m.modifiers);
        if m.is_async {
          self.write("async ");
        }
        match m.kind {
          MethodKind::Getter => self.write("get "),
          MethodKind::Setter => self.write("set "),
          MethodKind::Method => {}
        };
        if m.generator {
          self.write("*");
        }
        self.emit_prop_key(&m.key)?;
        if m.optional {
          self.write("?");
        }
        self.emit_signature(&m.type_params, &m.params, m.return_type)?;
        m.body.as_deref()
      }
      Syntax::ConstructorMember(c) => {
        self.emit_modifiers(&c.modifiers);
        self.write("constructor");
        self.emit_params(&c.params)?;
        c.body.as_deref()
      }
      Syntax::CallSignature(c) => {
        self.emit_signature(&c.type_params, &c.params, c.return_type)?;
        None
      }
      Syntax::ConstructSignature(c) => {
        self.write("new ");
        self.emit_signature(&c.type_params, &c.params, c.return_type)?;
        None
      }
      Syntax::IndexSignature(s) => {
        self.emit_modifiers(&s.modifiers);
        self.write("[");
        self.write(&s.param_name);
        self.write(": ");
        self.emit_type(s.param_type)?;
        self.write("]: ");
        self.emit_type(s.ty)?;
        None
      }
      _ => return Err(EmitError::unsupported("member")),
    };
    match body {
      Some(body) if is_class => self.emit_block_body(body),
      _ => self.write(";"),
    };
    Ok(())
  }
}
