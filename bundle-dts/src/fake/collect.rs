//! Finds what a declaration refers to outside itself, and the type parameters it introduces.

use super::symbol::TypeParamGroup;
use parse_dts::ast::class_or_object::PropKey;
use parse_dts::ast::stmt::ImportEqualsTarget;
use parse_dts::ast::stmt::ModuleName;
use parse_dts::ast::Ast;
use parse_dts::ast::NodeId;
use parse_dts::ast::Syntax;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Found {
  /// An identifier, qualified name or member chain whose root is not bound locally. `value` is
  /// set for references in expression position.
  Entity { node: NodeId, value: bool },
  /// An `import("m")` type.
  Import(NodeId),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RefKind {
  Type,
  Query,
  Value,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Binding {
  TypeParam,
  Local,
}

pub struct Collected {
  pub refs: Vec<Found>,
  pub groups: Vec<TypeParamGroup>,
}

struct Collector<'a> {
  ast: &'a Ast,
  scopes: Vec<Vec<(String, Binding)>>,
  refs: Vec<Found>,
  groups: Vec<TypeParamGroup>,
}

/// Walks the declaration `decl` in source order.
pub fn collect(ast: &Ast, decl: NodeId) -> Collected {
  let mut collector = Collector {
    ast,
    scopes: Vec::new(),
    refs: Vec::new(),
    groups: Vec::new(),
  };
  collector.visit(decl);
  Collected {
    refs: collector.refs,
    groups: collector.groups,
  }
}

/// Identifiers naming the bindings a statement introduces at its own level.
pub fn binding_idents(ast: &Ast, stmt: NodeId) -> Vec<NodeId> {
  match &ast[stmt] {
    Syntax::FuncDecl(f) => f.name.into_iter().collect(),
    Syntax::ClassDecl(c) => c.name.into_iter().collect(),
    Syntax::InterfaceDecl(i) => vec![i.name],
    Syntax::TypeAliasDecl(t) => vec![t.name],
    Syntax::EnumDecl(e) => vec![e.name],
    Syntax::VarDecl(v) => v
      .declarators
      .iter()
      .filter_map(|&d| match &ast[d] {
        Syntax::VarDeclarator(d) => Some(d.name),
        _ => None,
      })
      .collect(),
    Syntax::ModuleDecl(m) => match m.name {
      ModuleName::Ident(name) => vec![name],
      _ => Vec::new(),
    },
    Syntax::ImportEquals(i) => vec![i.name],
    Syntax::ImportDecl(i) => {
      let mut out = Vec::new();
      out.extend(i.default);
      out.extend(i.namespace);
      for &spec in i.named.iter().flatten() {
        if let Syntax::ImportSpecifier(spec) = &ast[spec] {
          out.push(spec.local);
        }
      }
      out
    }
    _ => Vec::new(),
  }
}

fn names(ast: &Ast, ids: impl IntoIterator<Item = NodeId>) -> Vec<String> {
  ids
    .into_iter()
    .filter_map(|id| ast.ident_name(id).map(str::to_string))
    .collect()
}

fn param_names(ast: &Ast, params: &[NodeId]) -> Vec<String> {
  params
    .iter()
    .filter_map(|&p| match &ast[p] {
      Syntax::Param(p) if parse_dts::char::is_valid_identifier(&p.name) => Some(p.name.clone()),
      _ => None,
    })
    .collect()
}

impl<'a> Collector<'a> {
  fn lookup(&self, name: &str) -> Option<Binding> {
    self
      .scopes
      .iter()
      .rev()
      .find_map(|scope| scope.iter().find(|(n, _)| n == name).map(|(_, b)| *b))
  }

  fn with_scope(&mut self, scope: Vec<(String, Binding)>, f: impl FnOnce(&mut Self)) {
    self.scopes.push(scope);
    f(self);
    self.scopes.pop();
  }

  /// Scope for a signature: its type parameters, then its value parameters.
  fn signature_scope(&self, type_params: &Option<Vec<NodeId>>, params: &[NodeId]) -> Vec<(String, Binding)> {
    let mut scope = Vec::new();
    for &tp in type_params.iter().flatten() {
      if let Syntax::TypeParam(tp) = &self.ast[tp] {
        if let Some(name) = self.ast.ident_name(tp.name) {
          scope.push((name.to_string(), Binding::TypeParam));
        }
      }
    }
    for name in param_names(self.ast, params) {
      scope.push((name, Binding::Local));
    }
    scope
  }

  fn group_ident(&mut self, name: &str, ident: NodeId) {
    match self.groups.iter_mut().find(|g| g.name == name) {
      Some(group) => group.idents.push(ident),
      None => self.groups.push(TypeParamGroup {
        name: name.to_string(),
        idents: vec![ident],
      }),
    }
  }

  /// An entity in reference position.
  fn reference(&mut self, entity: NodeId, kind: RefKind) {
    let ast = self.ast;
    let Some(root) = ast.root_ident(entity) else {
      return;
    };
    let Some(name) = ast.ident_name(root).filter(|name| *name != "this") else {
      return;
    };
    match self.lookup(name) {
      Some(Binding::TypeParam) => {
        if kind == RefKind::Type && root == entity {
          self.group_ident(name, root);
        }
      }
      Some(Binding::Local) => {}
      None => self.refs.push(Found::Entity {
        node: entity,
        value: kind == RefKind::Value,
      }),
    }
  }

  fn visit_all(&mut self, ids: &[NodeId]) {
    for &id in ids {
      self.visit(id);
    }
  }

  fn visit_opt(&mut self, id: Option<NodeId>) {
    if let Some(id) = id {
      self.visit(id);
    }
  }

  fn visit_key(&mut self, key: &PropKey) {
    if let PropKey::Computed(expr) = key {
      self.visit_expr(*expr);
    }
  }

  fn visit_expr(&mut self, id: NodeId) {
    let ast = self.ast;
    match &ast[id] {
      Syntax::ThisExpr(_) => {}
      Syntax::Ident(_) | Syntax::MemberExpr(_) if ast.entity_text(id).is_some() => {
        self.reference(id, RefKind::Value);
      }
      Syntax::ObjectProp(prop) => {
        self.visit_key(&prop.key);
        if let Some(value) = prop.value {
          self.visit_expr(value);
        }
      }
      _ => {
        for child in ast.children(id) {
          self.visit_expr(child);
        }
      }
    }
  }

  fn visit(&mut self, id: NodeId) {
    let ast = self.ast;
    match &ast[id] {
      // Bindings and the insides of names are never references on their own.
      Syntax::Ident(_) | Syntax::QualifiedName(_) => {}

      Syntax::TypeRef(r) => {
        self.reference(r.name, RefKind::Type);
        if let Some(args) = &r.type_args {
          self.visit_all(args);
        }
      }
      Syntax::TypeQuery(q) => {
        if matches!(ast[q.expr_name], Syntax::TypeImport(_)) {
          self.visit(q.expr_name);
        } else {
          self.reference(q.expr_name, RefKind::Query);
        }
        if let Some(args) = &q.type_args {
          self.visit_all(args);
        }
      }
      Syntax::TypeImport(i) => {
        self.refs.push(Found::Import(id));
        if let Some(args) = &i.type_args {
          self.visit_all(args);
        }
      }
      Syntax::Heritage(h) => {
        self.reference(h.expr, RefKind::Type);
        if let Some(args) = &h.type_args {
          self.visit_all(args);
        }
      }
      Syntax::TypeParam(tp) => {
        if let Some(name) = ast.ident_name(tp.name) {
          self.group_ident(name, tp.name);
        }
        self.visit_opt(tp.constraint);
        self.visit_opt(tp.default);
      }

      Syntax::FuncDecl(f) => {
        let scope = self.signature_scope(&f.type_params, &f.params);
        self.with_scope(scope, |c| {
          c.visit_all(f.type_params.as_deref().unwrap_or_default());
          c.visit_all(&f.params);
          c.visit_opt(f.return_type);
        });
      }
      Syntax::MethodMember(m) => {
        self.visit_key(&m.key);
        let scope = self.signature_scope(&m.type_params, &m.params);
        self.with_scope(scope, |c| {
          c.visit_all(m.type_params.as_deref().unwrap_or_default());
          c.visit_all(&m.params);
          c.visit_opt(m.return_type);
        });
      }
      Syntax::CallSignature(s) => {
        let scope = self.signature_scope(&s.type_params, &s.params);
        self.with_scope(scope, |c| {
          c.visit_all(s.type_params.as_deref().unwrap_or_default());
          c.visit_all(&s.params);
          c.visit_opt(s.return_type);
        });
      }
      Syntax::ConstructSignature(s) => {
        let scope = self.signature_scope(&s.type_params, &s.params);
        self.with_scope(scope, |c| {
          c.visit_all(s.type_params.as_deref().unwrap_or_default());
          c.visit_all(&s.params);
          c.visit_opt(s.return_type);
        });
      }
      Syntax::TypeFunction(f) => {
        let scope = self.signature_scope(&f.type_params, &f.params);
        self.with_scope(scope, |c| {
          c.visit_all(f.type_params.as_deref().unwrap_or_default());
          c.visit_all(&f.params);
          c.visit(f.return_type);
        });
      }
      Syntax::TypeConstructor(f) => {
        let scope = self.signature_scope(&f.type_params, &f.params);
        self.with_scope(scope, |c| {
          c.visit_all(f.type_params.as_deref().unwrap_or_default());
          c.visit_all(&f.params);
          c.visit(f.return_type);
        });
      }
      Syntax::ConstructorMember(m) => {
        let scope = self.signature_scope(&None, &m.params);
        self.with_scope(scope, |c| c.visit_all(&m.params));
      }
      Syntax::ClassDecl(c) => {
        let scope = self.signature_scope(&c.type_params, &[]);
        self.with_scope(scope, |v| {
          v.visit_all(c.type_params.as_deref().unwrap_or_default());
          v.visit_opt(c.extends);
          v.visit_all(&c.implements);
          v.visit_all(&c.members);
        });
      }
      Syntax::InterfaceDecl(i) => {
        let scope = self.signature_scope(&i.type_params, &[]);
        self.with_scope(scope, |v| {
          v.visit_all(i.type_params.as_deref().unwrap_or_default());
          v.visit_all(&i.extends);
          v.visit_all(&i.members);
        });
      }
      Syntax::TypeAliasDecl(t) => {
        let scope = self.signature_scope(&t.type_params, &[]);
        self.with_scope(scope, |v| {
          v.visit_all(t.type_params.as_deref().unwrap_or_default());
          v.visit(t.ty);
        });
      }
      Syntax::TypeConditional(c) => {
        let mut inferred = Vec::new();
        ast.walk(c.extends, &mut |ast, node| {
          if let Syntax::TypeInfer(infer) = &ast[node] {
            if let Syntax::TypeParam(tp) = &ast[infer.param] {
              if let Some(name) = ast.ident_name(tp.name) {
                inferred.push((name.to_string(), Binding::TypeParam));
              }
            }
          }
          true
        });
        self.visit(c.check);
        self.with_scope(inferred, |v| {
          v.visit(c.extends);
          v.visit(c.true_type);
        });
        self.visit(c.false_type);
      }
      Syntax::TypeMapped(m) => {
        let mut scope = Vec::new();
        if let Syntax::TypeParam(tp) = &ast[m.param] {
          if let Some(name) = ast.ident_name(tp.name) {
            scope.push((name.to_string(), Binding::TypeParam));
          }
          // The constraint is evaluated outside the key's scope.
          self.visit_opt(tp.constraint);
          if let Some(name) = ast.ident_name(tp.name) {
            self.group_ident(name, tp.name);
          }
        }
        self.with_scope(scope, |v| {
          v.visit_opt(m.name_type);
          v.visit_opt(m.ty);
        });
      }
      Syntax::ModuleDecl(m) => {
        if let Some(body) = &m.body {
          let mut scope = Vec::new();
          for &stmt in body {
            for name in names(ast, binding_idents(ast, stmt)) {
              scope.push((name, Binding::Local));
            }
          }
          self.with_scope(scope, |v| v.visit_all(body));
        }
      }
      Syntax::EnumDecl(e) => {
        let scope = e
          .members
          .iter()
          .filter_map(|&m| match &ast[m] {
            Syntax::EnumMember(m) => match &m.key {
              PropKey::Ident(name) => Some((name.clone(), Binding::Local)),
              PropKey::String(raw) => Some((parse_dts::unquote(raw), Binding::Local)),
              _ => None,
            },
            _ => None,
          })
          .collect();
        self.with_scope(scope, |v| v.visit_all(&e.members));
      }
      Syntax::EnumMember(m) => {
        self.visit_key(&m.key);
        if let Some(init) = m.init {
          self.visit_expr(init);
        }
      }
      Syntax::PropertyMember(p) => {
        self.visit_key(&p.key);
        self.visit_opt(p.ty);
        if let Some(init) = p.init {
          self.visit_expr(init);
        }
      }
      Syntax::Param(p) => {
        self.visit_opt(p.type_annotation);
        if let Some(init) = p.init {
          self.visit_expr(init);
        }
      }
      Syntax::VarDeclarator(d) => {
        self.visit_opt(d.type_annotation);
        if let Some(init) = d.init {
          self.visit_expr(init);
        }
      }
      Syntax::ImportEquals(i) => {
        if let ImportEqualsTarget::Entity(entity) = i.target {
          self.reference(entity, RefKind::Type);
        }
      }
      Syntax::ExportNamed(e) => {
        if e.source.is_none() {
          for &spec in &e.specifiers {
            if let Syntax::ExportSpecifier(spec) = &ast[spec] {
              self.reference(spec.local, RefKind::Type);
            }
          }
        }
      }
      Syntax::ExprStmt(s) => self.visit_expr(s.expr),
      Syntax::ExportAssign(e) => self.visit_expr(e.expr),
      Syntax::ExportDefaultExpr(e) => self.visit_expr(e.expr),
      Syntax::ImportDecl(_) | Syntax::ExportAll(_) | Syntax::OpaqueStmt(_) => {}

      _ => {
        for child in ast.children(id) {
          self.visit(child);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn texts(ast: &Ast, found: &[Found]) -> Vec<String> {
    found
      .iter()
      .map(|f| match f {
        Found::Entity { node, .. } => ast.entity_text(*node).unwrap(),
        Found::Import(_) => "import()".to_string(),
      })
      .collect()
  }

  fn collect_first(source: &str) -> (Ast, Collected) {
    let mut ast = Ast::new();
    let program = parse_dts::parse(&mut ast, source).unwrap();
    let collected = collect(&ast, program.body[0]);
    (ast, collected)
  }

  #[test]
  fn skips_type_parameters_and_keeps_outer_names() {
    let (ast, c) = collect_first(
      "interface A<T extends Base> extends Parent<T> { x: T; y: ns.Other<T>; f<U>(u: U): typeof value; }",
    );
    assert_eq!(texts(&ast, &c.refs), vec!["Base", "Parent", "ns.Other", "value"]);
    let groups: Vec<_> = c.groups.iter().map(|g| (g.name.as_str(), g.idents.len())).collect();
    assert_eq!(groups, vec![("T", 4), ("U", 2)]);
  }

  #[test]
  fn infer_and_mapped_keys_are_local() {
    let (ast, c) = collect_first(
      "type A<T> = T extends Array<infer U> ? U : { [K in keyof T as Rename<K>]: Value };",
    );
    assert_eq!(texts(&ast, &c.refs), vec!["Array", "Rename", "Value"]);
  }

  #[test]
  fn namespace_members_shadow_outer_names() {
    let (ast, c) = collect_first(
      "declare namespace N { interface X {} const y: X; const z: Outer; export { y }; }",
    );
    assert_eq!(texts(&ast, &c.refs), vec!["Outer"]);
  }

  #[test]
  fn finds_import_types_and_computed_keys() {
    let (ast, c) = collect_first(
      "interface A { [Symbol.iterator](): Iterator<import('./m').B>; x: typeof this.y; }",
    );
    assert_eq!(texts(&ast, &c.refs), vec!["Symbol.iterator", "Iterator", "import()"]);
  }
}
