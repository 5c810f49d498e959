use super::collect::binding_idents;
use super::collect::collect;
use super::collect::Found;
use super::entity_name;
use super::segments;
use super::symbol::DepEdit;
use super::symbol::Dependency;
use super::symbol::Symbol;
use super::BuildRegistry;
use super::SIDE_EFFECT_MARKER;
use crate::error::DtsError;
use crate::error::DtsResult;
use ahash::HashMap;
use ahash::HashSet;
use emit_dts::emit_program;
use emit_dts::EmitOptions;
use parse_dts::ast::expr::ArrayExpr;
use parse_dts::ast::expr::ArrowBody;
use parse_dts::ast::expr::ArrowFunc;
use parse_dts::ast::expr::CallExpr;
use parse_dts::ast::expr::LitExpr;
use parse_dts::ast::stmt::DeclFlags;
use parse_dts::ast::stmt::ExportNamed;
use parse_dts::ast::stmt::ExportSpecifier;
use parse_dts::ast::stmt::ExprStmt;
use parse_dts::ast::stmt::ImportDecl;
use parse_dts::ast::stmt::ImportEqualsTarget;
use parse_dts::ast::stmt::VarDecl;
use parse_dts::ast::stmt::VarDeclarator;
use parse_dts::ast::stmt::VarKind;
use parse_dts::ast::type_expr::TypeQuery;
use parse_dts::ast::NodeId;
use parse_dts::ast::Program;
use parse_dts::ast::Syntax;
use parse_dts::lex::Comment;
use parse_dts::lex::CommentKind;
use tracing::debug;
use tracing::trace;

#[derive(Clone, Copy, Debug, Default)]
pub struct SynthesizeOptions {
  /// Append a module-level call so the host never drops the module.
  pub side_effects: bool,
}

#[derive(Default)]
struct ModuleOut {
  /// `import * as alias from "m"` statements standing in for `import("m")` types.
  imports: Vec<NodeId>,
  import_aliases: HashMap<String, String>,
  stmts: Vec<NodeId>,
  /// `(local, exported)` pairs for the trailing export clause.
  exports: Vec<(String, String)>,
}

impl ModuleOut {
  fn export(&mut self, local: &str, exported: &str) {
    if !self
      .exports
      .iter()
      .any(|(l, e)| l == local && e == exported)
    {
      self.exports.push((local.to_string(), exported.to_string()));
    }
  }
}

/// The directive inside a `/// <reference ... />` comment.
fn reference_directive(comment: &Comment) -> Option<&str> {
  if comment.kind != CommentKind::Line {
    return None;
  }
  let body = comment.text.strip_prefix("///")?.trim();
  body.starts_with("<reference").then_some(body)
}

fn decl_flags(stx: &mut Syntax) -> Option<&mut DeclFlags> {
  match stx {
    Syntax::ClassDecl(d) => Some(&mut d.flags),
    Syntax::EnumDecl(d) => Some(&mut d.flags),
    Syntax::FuncDecl(d) => Some(&mut d.flags),
    Syntax::InterfaceDecl(d) => Some(&mut d.flags),
    Syntax::ModuleDecl(d) => Some(&mut d.flags),
    Syntax::TypeAliasDecl(d) => Some(&mut d.flags),
    Syntax::VarDecl(d) => Some(&mut d.flags),
    _ => None,
  }
}

impl BuildRegistry {
  /// Parses the declaration module `module` and returns its synthetic value code.
  pub fn synthesize(
    &mut self,
    module: &str,
    code: &str,
    options: SynthesizeOptions,
  ) -> DtsResult<String> {
    self.reset_module(module);
    let program = parse_dts::parse(&mut self.ast, code).map_err(|e| DtsError::syntax(module, e))?;
    self.take_directives(module, &program);

    let mut out = ModuleOut::default();
    for &stmt in &program.body {
      self.synthesize_stmt(module, stmt, &mut out)?;
    }
    if options.side_effects {
      let callee = self.ast.ident(SIDE_EFFECT_MARKER);
      let call = self.ast.synthetic(CallExpr {
        callee,
        optional: false,
        args: Vec::new(),
      });
      let stmt = self.ast.synthetic(ExprStmt { expr: call });
      out.stmts.push(stmt);
    }

    let mut body = std::mem::take(&mut out.imports);
    body.append(&mut out.stmts);
    if !out.exports.is_empty() {
      let specifiers = out
        .exports
        .iter()
        .map(|(local, exported)| {
          let local = self.ast.ident(local.clone());
          self.ast.synthetic(ExportSpecifier {
            type_only: false,
            local,
            exported: exported.clone(),
          })
        })
        .collect();
      body.push(self.ast.synthetic(ExportNamed {
        type_only: false,
        specifiers,
        source: None,
      }));
    }
    let code = emit_program(&self.ast, &body, EmitOptions::default())
      .map_err(|e| DtsError::emit(module, e))?;
    trace!(module, %code, "synthesized");
    Ok(code)
  }

  /// Records the leading triple-slash directives of `program` and removes every directive
  /// comment from the statements that carry one. `path` references name files that will not
  /// exist next to the bundle, so they are dropped.
  fn take_directives(&mut self, module: &str, program: &Program) {
    let header_end = program
      .body
      .first()
      .map_or(usize::MAX, |&stmt| self.ast.node(stmt).loc.0);
    let mut directives = Vec::new();
    for comment in &program.comments {
      if comment.loc.1 > header_end {
        break;
      }
      if let Some(directive) = reference_directive(comment) {
        if !directive.contains("path=") {
          directives.push(format!("/// {directive}"));
        }
      }
    }
    for &stmt in &program.body {
      self
        .ast
        .node_mut(stmt)
        .leading_comments
        .retain(|c| reference_directive(c).is_none());
    }
    self.set_references(module, directives);
  }

  fn synthesize_stmt(&mut self, module: &str, stmt: NodeId, out: &mut ModuleOut) -> DtsResult<()> {
    match self.ast[stmt].clone() {
      Syntax::ImportDecl(mut import) => {
        import.type_only = false;
        for &spec in import.named.iter().flatten() {
          if let Syntax::ImportSpecifier(spec) = &mut self.ast[spec] {
            spec.type_only = false;
          }
        }
        self.ast.replace(stmt, import);
        out.stmts.push(stmt);
      }
      Syntax::ImportEquals(import) => match import.target {
        ImportEqualsTarget::Require(source) => {
          let name = self.ast.ident_name(import.name).unwrap_or_default().to_string();
          let replacement = self.ast.synthetic(ImportDecl {
            type_only: false,
            default: Some(import.name),
            namespace: None,
            named: None,
            source,
          });
          out.stmts.push(replacement);
          if import.export {
            out.export(&name, &name);
          }
        }
        ImportEqualsTarget::Entity(_) => {
          if let Syntax::ImportEquals(i) = &mut self.ast[stmt] {
            i.export = false;
            i.type_only = false;
          }
          let bindings = self.declare(module, stmt, false, out)?;
          if import.export {
            for name in bindings {
              out.export(&name, &name);
            }
          }
        }
      },
      Syntax::ExportNamed(mut export) => {
        for &spec in &export.specifiers {
          if let Syntax::ExportSpecifier(spec) = &mut self.ast[spec] {
            if export.type_only || spec.type_only {
              let exported = spec.exported.clone();
              spec.type_only = false;
              self.add_type_only(module, &exported);
            }
          }
        }
        export.type_only = false;
        self.ast.replace(stmt, export);
        out.stmts.push(stmt);
      }
      Syntax::ExportAll(mut export) => {
        export.type_only = false;
        self.ast.replace(stmt, export);
        out.stmts.push(stmt);
      }
      Syntax::ExportAssign(e) => self.export_default_expr(module, stmt, e.expr, out)?,
      Syntax::ExportDefaultExpr(e) => self.export_default_expr(module, stmt, e.expr, out)?,
      Syntax::ExportAsNamespace(_) => {
        self.declare(module, stmt, true, out)?;
      }
      Syntax::ModuleDecl(m) => {
        let side_effect = m.is_augmentation();
        let (exported, default) = (m.flags.export, m.flags.default);
        let bindings = self.declare(module, stmt, side_effect, out)?;
        self.export_bindings(&bindings, exported, default, out);
      }
      Syntax::ClassDecl(_)
      | Syntax::EnumDecl(_)
      | Syntax::FuncDecl(_)
      | Syntax::InterfaceDecl(_)
      | Syntax::TypeAliasDecl(_)
      | Syntax::VarDecl(_) => {
        let flags = decl_flags(&mut self.ast[stmt]).map(|f| *f).unwrap_or_default();
        self.name_anonymous_default(stmt);
        let bindings = self.declare(module, stmt, false, out)?;
        self.export_bindings(&bindings, flags.export, flags.default, out);
      }
      Syntax::EmptyStmt(_) => {}
      other => {
        debug!(module, statement = ?other, "dropping statement outside the declaration grammar");
      }
    }
    Ok(())
  }

  fn export_bindings(&mut self, bindings: &[String], export: bool, default: bool, out: &mut ModuleOut) {
    if !export {
      return;
    }
    if default {
      if let Some(first) = bindings.first() {
        out.export(first, "default");
      }
    } else {
      for name in bindings {
        out.export(name, name);
      }
    }
  }

  /// `export default function () {}` and `export default class {}` get a name to bind.
  fn name_anonymous_default(&mut self, stmt: NodeId) {
    let needs_name = match &self.ast[stmt] {
      Syntax::FuncDecl(f) => f.name.is_none(),
      Syntax::ClassDecl(c) => c.name.is_none(),
      _ => false,
    };
    if !needs_name {
      return;
    }
    let name = self.fresh_name("default");
    let name = self.ast.ident(&name);
    match &mut self.ast[stmt] {
      Syntax::FuncDecl(f) => f.name = Some(name),
      Syntax::ClassDecl(c) => c.name = Some(name),
      _ => {}
    }
  }

  /// `export default x` and `export = x`. A plain identifier becomes a default export of that
  /// binding; any other entity gets a fresh `declare const` typed `typeof a.b` to export.
  fn export_default_expr(
    &mut self,
    module: &str,
    stmt: NodeId,
    expr: NodeId,
    out: &mut ModuleOut,
  ) -> DtsResult<()> {
    if let Some(name) = self.ast.ident_name(expr) {
      let name = name.to_string();
      out.export(&name, "default");
      return Ok(());
    }
    let Some(text) = self.ast.entity_text(expr) else {
      debug!(module, "keeping default export of a non-entity expression");
      out.stmts.push(stmt);
      return Ok(());
    };
    let Some(expr_name) = entity_name(&mut self.ast, &segments(&text)) else {
      return Ok(());
    };
    let query = self.ast.synthetic(TypeQuery {
      expr_name,
      type_args: None,
    });
    let binding = self.fresh_name("default");
    let name = self.ast.ident(&binding);
    let declarator = self.ast.synthetic(VarDeclarator {
      name,
      definite: false,
      type_annotation: Some(query),
      init: None,
    });
    let decl = self.ast.synthetic(VarDecl {
      flags: DeclFlags::default(),
      kind: VarKind::Const,
      declarators: vec![declarator],
    });
    let leading = self.ast.node(stmt).leading_comments.clone();
    self.ast.node_mut(decl).leading_comments = leading;
    self.declare(module, decl, false, out)?;
    out.export(&binding, "default");
    Ok(())
  }

  /// Registers `stmt` as a symbol and appends its tuple variable. Returns the binding names.
  fn declare(
    &mut self,
    module: &str,
    stmt: NodeId,
    side_effect: bool,
    out: &mut ModuleOut,
  ) -> DtsResult<Vec<String>> {
    if let Some(flags) = decl_flags(&mut self.ast[stmt]) {
      flags.export = false;
      flags.default = false;
      flags.declare = true;
    }
    self.strip_bodies(stmt);

    let bindings = binding_idents(&self.ast, stmt);
    let names: Vec<String> = bindings
      .iter()
      .filter_map(|&b| self.ast.ident_name(b).map(str::to_string))
      .collect();

    let collected = collect(&self.ast, stmt);
    let mut deps = Vec::with_capacity(collected.refs.len());
    for found in collected.refs {
      deps.push(self.dependency(found, out));
    }
    let dep_roots: HashSet<&str> = deps
      .iter()
      .filter_map(|d| d.entity.first().map(String::as_str))
      .collect();
    // A parameter sharing a name with an outside reference would capture it.
    let type_params: Vec<_> = collected
      .groups
      .into_iter()
      .filter(|g| !dep_roots.contains(g.name.as_str()))
      .collect();

    let mut dep_exprs = Vec::with_capacity(deps.len());
    for dep in &deps {
      let segments: Vec<&str> = dep.entity.iter().map(String::as_str).collect();
      dep_exprs.push(self.ast.member_chain(&segments));
    }
    let params = type_params
      .iter()
      .map(|g| self.ast.ident(g.name.clone()))
      .collect();

    let id = self.add_symbol(Symbol {
      decl: stmt,
      bindings,
      deps,
      type_params,
      module: module.to_string(),
    });

    let primary = match names.first() {
      Some(name) => name.clone(),
      None => self.fresh_name("side_effect"),
    };
    let id_lit = self.ast.synthetic(LitExpr { raw: id.to_string() });
    let deps_array = self.ast.synthetic(ArrayExpr { elements: dep_exprs });
    let arrow = self.ast.synthetic(ArrowFunc {
      params,
      body: ArrowBody::Expr(deps_array),
    });
    let mut elements = vec![Some(id_lit), Some(arrow)];
    if side_effect {
      let callee = self.ast.ident(SIDE_EFFECT_MARKER);
      elements.push(Some(self.ast.synthetic(CallExpr {
        callee,
        optional: false,
        args: Vec::new(),
      })));
    }
    let mut declarators = vec![self.tuple_declarator(&primary, elements)];
    // Further names of a multi-name declaration point back at the first one, so keeping any of
    // them keeps the declaration.
    for (index, name) in names.iter().enumerate().skip(1) {
      let id_lit = self.ast.synthetic(LitExpr { raw: id.to_string() });
      let index_lit = self.ast.synthetic(LitExpr {
        raw: index.to_string(),
      });
      let primary_ref = self.ast.ident(primary.clone());
      declarators.push(self.tuple_declarator(name, vec![Some(id_lit), Some(index_lit), Some(primary_ref)]));
    }
    let var = self.ast.synthetic(VarDecl {
      flags: DeclFlags::default(),
      kind: VarKind::Var,
      declarators,
    });
    out.stmts.push(var);
    Ok(names)
  }

  fn tuple_declarator(&mut self, name: &str, elements: Vec<Option<NodeId>>) -> NodeId {
    let name = self.ast.ident(name);
    let init = self.ast.synthetic(ArrayExpr { elements });
    self.ast.synthetic(VarDeclarator {
      name,
      definite: false,
      type_annotation: None,
      init: Some(init),
    })
  }

  fn dependency(&mut self, found: Found, out: &mut ModuleOut) -> Dependency {
    match found {
      Found::Entity { node, value } => Dependency {
        node,
        edit: DepEdit::Replace,
        entity: segments(&self.ast.entity_text(node).unwrap_or_default()),
        in_expression: value,
      },
      Found::Import(node) => {
        let Syntax::TypeImport(import) = self.ast[node].clone() else {
          return Dependency {
            node,
            edit: DepEdit::Replace,
            entity: Vec::new(),
            in_expression: false,
          };
        };
        let alias = match out.import_aliases.get(&import.source) {
          Some(alias) => alias.clone(),
          None => {
            let alias = self.fresh_name("import");
            let namespace = self.ast.ident(alias.clone());
            out.imports.push(self.ast.synthetic(ImportDecl {
              type_only: false,
              default: None,
              namespace: Some(namespace),
              named: None,
              source: import.source.clone(),
            }));
            out.import_aliases.insert(import.source.clone(), alias.clone());
            alias
          }
        };
        let mut entity = vec![alias];
        if let Some(qualifier) = import.qualifier {
          entity.extend(segments(&self.ast.entity_text(qualifier).unwrap_or_default()));
        }
        Dependency {
          node,
          edit: DepEdit::ImportType {
            is_typeof: import.is_typeof,
            type_args: import.type_args,
          },
          entity,
          in_expression: false,
        }
      }
    }
  }

  /// Implementation bodies never belong in declarations.
  fn strip_bodies(&mut self, stmt: NodeId) {
    let mut with_bodies = Vec::new();
    self.ast.walk(stmt, &mut |ast, id| {
      if matches!(
        &ast[id],
        Syntax::FuncDecl(_) | Syntax::MethodMember(_) | Syntax::ConstructorMember(_)
      ) {
        with_bodies.push(id);
      }
      true
    });
    for id in with_bodies {
      match &mut self.ast[id] {
        Syntax::FuncDecl(f) => f.body = None,
        Syntax::MethodMember(m) => m.body = None,
        Syntax::ConstructorMember(c) => c.body = None,
        _ => {}
      }
    }
  }
}
