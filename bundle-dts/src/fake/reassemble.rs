use super::entity_name;
use super::namespace::export_call;
use super::namespace::is_empty_object;
use super::namespace::is_runtime_helper;
use super::namespace::namespace_decl;
use super::namespace::namespace_object;
use super::namespace::NamespaceMember;
use super::segments;
use super::symbol::DepEdit;
use super::symbol::Dependency;
use super::BuildRegistry;
use super::SIDE_EFFECT_MARKER;
use crate::error::DtsError;
use crate::error::DtsResult;
use crate::naming::runtime_specifier;
use ahash::HashMap;
use ahash::HashMapExt;
use ahash::HashSet;
use ahash::HashSetExt;
use emit_dts::emit_stmt;
use emit_dts::EmitOptions;
use parse_dts::ast::expr::ArrowBody;
use parse_dts::ast::stmt::ExportAssign;
use parse_dts::ast::stmt::ImportEqualsTarget;
use parse_dts::ast::stmt::VarDecl;
use parse_dts::ast::type_expr::TypeQuery;
use parse_dts::ast::type_expr::TypeRef;
use parse_dts::ast::Ast;
use parse_dts::ast::NodeId;
use parse_dts::ast::Syntax;
use parse_dts::lex::Comment;
use parse_dts::parse_lenient;
use tracing::debug;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default)]
pub struct ReassembleOptions {
  /// Write a chunk whose only export is a default export as `export = x`.
  pub cjs_default: bool,
}

/// A tuple variable as the host rendered it.
struct RenderedTuple {
  id: u32,
  params: Vec<Option<String>>,
  deps: Vec<Option<NodeId>>,
}

enum Item {
  /// A chunk statement printed as it is.
  Keep(NodeId),
  Decl(u32),
  /// A namespace object, filled from `__export` calls anywhere in the chunk.
  Namespace(String),
}

struct Classified {
  items: Vec<(Vec<Comment>, Item)>,
  tuples: Vec<RenderedTuple>,
  /// `(symbol, binding index, rendered name)`.
  renames: Vec<(u32, usize, String)>,
  namespaces: HashMap<String, Vec<NamespaceMember>>,
}

fn lit_u32(ast: &Ast, id: NodeId) -> Option<u32> {
  match &ast[id] {
    Syntax::LitExpr(lit) => lit.raw.parse().ok(),
    _ => None,
  }
}

fn is_module_syntax(ast: &Ast, stmt: NodeId) -> bool {
  match &ast[stmt] {
    Syntax::ImportDecl(_)
    | Syntax::ExportAll(_)
    | Syntax::ExportAsNamespace(_)
    | Syntax::ExportAssign(_)
    | Syntax::ExportDefaultExpr(_)
    | Syntax::ExportNamed(_) => true,
    Syntax::ImportEquals(import) => {
      import.export || matches!(import.target, ImportEqualsTarget::Require(_))
    }
    _ => false,
  }
}

fn is_marker_call(ast: &Ast, expr: NodeId) -> bool {
  matches!(&ast[expr], Syntax::CallExpr(call) if ast.ident_name(call.callee) == Some(SIDE_EFFECT_MARKER))
}

impl BuildRegistry {
  /// Turns the host's rendering of a declaration chunk back into declarations.
  ///
  /// `modules` lists the declaration modules in the chunk; their reference directives and
  /// type-only export names apply to the whole chunk.
  pub fn reassemble(
    &mut self,
    chunk: &str,
    code: &str,
    modules: &[String],
    options: ReassembleOptions,
  ) -> DtsResult<String> {
    let mut cast = Ast::new();
    let program = parse_lenient(&mut cast, code).map_err(|e| DtsError::syntax(chunk, e))?;

    let mut type_only = HashSet::new();
    for module in modules {
      if let Some(names) = self.type_only_names(module) {
        type_only.extend(names.iter().cloned());
      }
    }

    let mut classified = Classified {
      items: Vec::new(),
      tuples: Vec::new(),
      renames: Vec::new(),
      namespaces: HashMap::new(),
    };
    let mut pending_regions: Vec<Comment> = Vec::new();
    for &stmt in &program.body {
      let regions: Vec<Comment> = cast
        .node(stmt)
        .leading_comments
        .iter()
        .filter(|c| c.is_region_marker())
        .cloned()
        .collect();
      let before = classified.items.len();
      self.classify(&mut cast, stmt, &type_only, &mut classified);
      if classified.items.len() == before {
        pending_regions.extend(regions);
        continue;
      }
      // Kept statements print their own comments.
      let (comments, item) = &mut classified.items[before];
      let mut carried = std::mem::take(&mut pending_regions);
      if !matches!(item, Item::Keep(id) if *id == stmt) {
        carried.extend(regions);
      }
      *comments = carried;
    }
    let last_end = program.body.last().map_or(0, |&s| cast.node(s).loc.1);
    pending_regions.extend(
      program
        .comments
        .iter()
        .filter(|c| c.loc.0 >= last_end && c.is_region_marker())
        .cloned(),
    );

    for (id, index, name) in &classified.renames {
      let binding = self.symbol(*id)?.bindings.get(*index).copied();
      if let Some(binding) = binding {
        self.ast.rename_ident(binding, name);
      }
    }
    for tuple in &classified.tuples {
      self.apply_tuple(chunk, &cast, tuple)?;
    }

    let mut items = Vec::with_capacity(classified.items.len());
    for (comments, item) in classified.items {
      let item = match item {
        Item::Namespace(name) => {
          let members = classified.namespaces.remove(&name).unwrap_or_default();
          Item::Keep(namespace_decl(&mut cast, &name, &members))
        }
        other => other,
      };
      items.push((comments, item));
    }
    if options.cjs_default {
      rewrite_cjs_default(&mut cast, &items);
    }

    let mut out = String::new();
    let mut seen = HashSet::new();
    for module in modules {
      for directive in self.references(module) {
        if seen.insert(directive.clone()) {
          out.push_str(directive);
          out.push('\n');
        }
      }
    }
    let opts = EmitOptions::default();
    for (comments, item) in &items {
      for comment in comments {
        out.push_str(comment.text.trim_end());
        out.push('\n');
      }
      let text = match item {
        Item::Keep(id) => emit_stmt(&cast, *id, opts),
        Item::Decl(id) => emit_stmt(&self.ast, self.symbol(*id)?.decl, opts),
        Item::Namespace(_) => continue,
      }
      .map_err(|e| DtsError::emit(chunk, e))?;
      out.push_str(&text);
      out.push('\n');
    }
    for comment in &pending_regions {
      out.push_str(comment.text.trim_end());
      out.push('\n');
    }
    // Without module syntax the file would be a script, and augmentations would turn ambient.
    let is_module = items.iter().any(|(_, item)| match item {
      Item::Keep(id) => is_module_syntax(&cast, *id),
      Item::Decl(id) => self
        .symbol(*id)
        .is_ok_and(|symbol| is_module_syntax(&self.ast, symbol.decl)),
      Item::Namespace(_) => false,
    });
    if !is_module {
      out.push_str("export {};\n");
    }
    Ok(out)
  }

  fn classify(&self, cast: &mut Ast, stmt: NodeId, type_only: &HashSet<String>, out: &mut Classified) {
    match cast[stmt].clone() {
      Syntax::ExprStmt(s) => {
        if is_marker_call(cast, s.expr) {
          return;
        }
        if let Some((name, members)) = export_call(cast, s.expr) {
          out.namespaces.entry(name).or_default().extend(members);
          return;
        }
        let helper_call = matches!(
          &cast[s.expr],
          Syntax::CallExpr(call) if cast.ident_name(call.callee).is_some_and(is_runtime_helper)
        );
        let directive = matches!(&cast[s.expr], Syntax::LitExpr(_));
        if !helper_call && !directive {
          out.items.push((Vec::new(), Item::Keep(stmt)));
        }
      }
      Syntax::VarDecl(var) => {
        let mut rest = Vec::new();
        for &declarator in &var.declarators {
          if !self.classify_declarator(cast, declarator, out) {
            rest.push(declarator);
          }
        }
        if rest.len() == var.declarators.len() {
          out.items.push((Vec::new(), Item::Keep(stmt)));
        } else if !rest.is_empty() {
          let remaining = cast.synthetic(VarDecl {
            flags: var.flags,
            kind: var.kind,
            declarators: rest,
          });
          out.items.push((Vec::new(), Item::Keep(remaining)));
        }
      }
      Syntax::ImportDecl(mut import) => {
        if let Some(source) = runtime_specifier(&import.source) {
          import.source = source;
          cast.replace(stmt, import);
        }
        out.items.push((Vec::new(), Item::Keep(stmt)));
      }
      Syntax::ExportNamed(mut export) => {
        if export.specifiers.is_empty() && export.source.is_none() {
          return;
        }
        for &spec in &export.specifiers {
          if let Syntax::ExportSpecifier(spec) = &mut cast[spec] {
            if type_only.contains(&spec.exported) {
              spec.type_only = true;
            }
          }
        }
        if let Some(source) = export.source.as_deref().and_then(runtime_specifier) {
          export.source = Some(source);
        }
        cast.replace(stmt, export);
        out.items.push((Vec::new(), Item::Keep(stmt)));
      }
      Syntax::ExportAll(mut export) => {
        if let Some(source) = runtime_specifier(&export.source) {
          export.source = source;
          cast.replace(stmt, export);
        }
        out.items.push((Vec::new(), Item::Keep(stmt)));
      }
      Syntax::EmptyStmt(_) => {}
      _ => out.items.push((Vec::new(), Item::Keep(stmt))),
    }
  }

  /// Handles one declarator; returns false when it is ordinary code to keep.
  fn classify_declarator(&self, cast: &Ast, declarator: NodeId, out: &mut Classified) -> bool {
    let Syntax::VarDeclarator(d) = &cast[declarator] else {
      return false;
    };
    let Some(name) = cast.ident_name(d.name).map(str::to_string) else {
      return false;
    };
    if is_runtime_helper(&name) {
      return true;
    }
    let Some(init) = d.init else {
      return false;
    };
    if is_empty_object(cast, init) {
      out.items.push((Vec::new(), Item::Namespace(name)));
      return true;
    }
    if let Some(members) = namespace_object(cast, init) {
      out.namespaces.entry(name.clone()).or_default().extend(members);
      out.items.push((Vec::new(), Item::Namespace(name)));
      return true;
    }
    let Syntax::ArrayExpr(array) = &cast[init] else {
      return false;
    };
    let elements: Vec<Option<NodeId>> = array.elements.clone();
    let (Some(Some(first)), Some(Some(second))) = (elements.first(), elements.get(1)) else {
      return false;
    };
    let Some(id) = lit_u32(cast, *first) else {
      return false;
    };
    match &cast[*second] {
      Syntax::ArrowFunc(arrow) => {
        let params = arrow
          .params
          .iter()
          .map(|&p| cast.ident_name(p).map(str::to_string))
          .collect();
        let deps = match arrow.body {
          ArrowBody::Expr(body) => match &cast[body] {
            Syntax::ArrayExpr(deps) => deps.elements.clone(),
            _ => Vec::new(),
          },
          ArrowBody::Block(_) => Vec::new(),
        };
        out.renames.push((id, 0, name));
        out.tuples.push(RenderedTuple { id, params, deps });
        out.items.push((Vec::new(), Item::Decl(id)));
        true
      }
      Syntax::LitExpr(_) => match lit_u32(cast, *second) {
        Some(index) => {
          out.renames.push((id, index as usize, name));
          true
        }
        None => false,
      },
      _ => false,
    }
  }

  /// Writes the host's names for a symbol's type parameters and dependencies into it.
  ///
  /// Symbols are only read: a module the host copies into several chunks is reassembled once per
  /// chunk, each time overwriting the names the previous chunk wrote.
  fn apply_tuple(&mut self, chunk: &str, cast: &Ast, tuple: &RenderedTuple) -> DtsResult<()> {
    let symbol = self
      .symbols
      .get(tuple.id as usize)
      .ok_or(DtsError::UnknownSymbol(tuple.id))?;
    if tuple.params.len() != symbol.type_params.len() || tuple.deps.len() != symbol.deps.len() {
      warn!(
        chunk,
        symbol = tuple.id,
        "rendered declaration tuple does not match its symbol"
      );
    }
    for (group, param) in symbol.type_params.iter().zip(&tuple.params) {
      let Some(param) = param else {
        continue;
      };
      for &ident in &group.idents {
        self.ast.rename_ident(ident, param);
      }
    }
    for (dep, rendered) in symbol.deps.iter().zip(&tuple.deps) {
      apply_dependency(&mut self.ast, chunk, cast, dep, *rendered);
    }
    Ok(())
  }
}

fn apply_dependency(ast: &mut Ast, chunk: &str, cast: &Ast, dep: &Dependency, rendered: Option<NodeId>) {
  let text = rendered.and_then(|r| match &cast[r] {
    Syntax::UnaryExpr(u) if u.op == "void" => None,
    _ => cast.entity_text(r),
  });
  let Some(text) = text else {
    warn!(
      chunk,
      dependency = %dep.entity.join("."),
      "host did not keep a declaration dependency; leaving its original name"
    );
    return;
  };
  let segs = segments(&text);
  match &dep.edit {
    DepEdit::Replace => {
      if ast.entity_text(dep.node).as_deref() == Some(text.as_str()) {
        return;
      }
      let replacement = if dep.in_expression {
        let parts: Vec<&str> = segs.iter().map(String::as_str).collect();
        ast.member_chain(&parts)
      } else {
        entity_name(ast, &segs)
      };
      if let Some(replacement) = replacement {
        let stx = ast[replacement].clone();
        ast.replace(dep.node, stx);
        debug!(chunk, from = %dep.entity.join("."), to = %text, "renamed dependency");
      }
    }
    DepEdit::ImportType {
      is_typeof,
      type_args,
    } => {
      let Some(name) = entity_name(ast, &segs) else {
        return;
      };
      if *is_typeof {
        ast.replace(dep.node, TypeQuery {
          expr_name: name,
          type_args: type_args.clone(),
        });
      } else {
        ast.replace(dep.node, TypeRef {
          name,
          type_args: type_args.clone(),
        });
      }
    }
  }
}

/// `export { x as default }` as the chunk's only export becomes `export = x`.
fn rewrite_cjs_default(cast: &mut Ast, items: &[(Vec<Comment>, Item)]) {
  let mut exports = items.iter().filter_map(|(_, item)| match item {
    Item::Keep(id) if matches!(cast[*id], Syntax::ExportNamed(_) | Syntax::ExportAll(_)) => Some(*id),
    _ => None,
  });
  let (Some(only), None) = (exports.next(), exports.next()) else {
    return;
  };
  let local = match &cast[only] {
    Syntax::ExportNamed(export) if export.source.is_none() => match export.specifiers.as_slice() {
      [spec] => match &cast[*spec] {
        Syntax::ExportSpecifier(spec) if spec.exported == "default" && !spec.type_only => {
          Some(spec.local)
        }
        _ => None,
      },
      _ => None,
    },
    _ => None,
  };
  if let Some(local) = local {
    cast.replace(only, ExportAssign { expr: local });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fake::synthesize::SynthesizeOptions;

  fn registry_with(module: &str, source: &str) -> (BuildRegistry, String) {
    let mut registry = BuildRegistry::new();
    let code = registry
      .synthesize(module, source, SynthesizeOptions::default())
      .unwrap();
    (registry, code)
  }

  #[test]
  fn renames_flow_into_declarations() {
    let (mut registry, code) = registry_with(
      "/a.d.ts",
      "import { Bar } from './bar';\nexport interface Foo<T> { bar: Bar; t: T }\n",
    );
    assert_eq!(
      code,
      "import { Bar } from \"./bar\";\nvar Foo = [0, (T) => [Bar]];\nexport { Foo };\n"
    );
    let rendered = "var Foo$1 = [0, (T$1) => [Bar$2]];\nexport { Foo$1 as Foo };\n";
    let out = registry
      .reassemble("a.d.ts", rendered, &["/a.d.ts".to_string()], ReassembleOptions::default())
      .unwrap();
    assert_eq!(
      out,
      "interface Foo$1<T$1> {\n  bar: Bar$2;\n  t: T$1;\n}\nexport { Foo$1 as Foo };\n"
    );
  }

  #[test]
  fn a_module_copied_into_two_chunks_renders_in_each() {
    let (mut registry, _) = registry_with("/a.d.ts", "export interface Foo<T> { t: T }\n");
    let modules = ["/a.d.ts".to_string()];
    let first = registry
      .reassemble(
        "one.d.ts",
        "var Foo$1 = [0, (T$1) => []];\nexport { Foo$1 as Foo };\n",
        &modules,
        ReassembleOptions::default(),
      )
      .unwrap();
    assert_eq!(first, "interface Foo$1<T$1> {\n  t: T$1;\n}\nexport { Foo$1 as Foo };\n");
    let second = registry
      .reassemble(
        "two.d.ts",
        "var Foo = [0, (T) => []];\nexport { Foo };\n",
        &modules,
        ReassembleOptions::default(),
      )
      .unwrap();
    assert_eq!(second, "interface Foo<T> {\n  t: T;\n}\nexport { Foo };\n");
  }

  #[test]
  fn renamed_type_params_leave_other_declarations_alone() {
    let (mut registry, _) = registry_with(
      "/a.d.ts",
      "export interface Box<T> { value: T }\nexport interface Pair<T> { left: T }\n",
    );
    let rendered = "var Box = [0, (T$1) => []];\nvar Pair = [1, (T) => []];\nexport { Box, Pair };\n";
    let out = registry
      .reassemble("a.d.ts", rendered, &["/a.d.ts".to_string()], ReassembleOptions::default())
      .unwrap();
    assert_eq!(
      out,
      "interface Box<T$1> {\n  value: T$1;\n}\ninterface Pair<T> {\n  left: T;\n}\nexport { Box, Pair };\n"
    );
  }

  #[test]
  fn namespace_helpers_become_namespaces() {
    let mut registry = BuildRegistry::new();
    registry
      .synthesize("/m.d.ts", "export interface A {}\n", SynthesizeOptions::default())
      .unwrap();
    registry
      .synthesize(
        "/a.d.ts",
        "import * as m from './m';\nexport declare const x: m.A;\n",
        SynthesizeOptions::default(),
      )
      .unwrap();
    let rendered = "\
var __defProp = Object.defineProperty;
var __export = (target, all) => { for (var name in all) __defProp(target, name, { get: all[name], enumerable: true }); };
//#region m.d.ts
var A = [0, () => []];
//#endregion
var m_exports = {};
__export(m_exports, { A: () => A });
//#region a.d.ts
var x = [1, () => [m_exports.A]];
//#endregion
export { x };
";
    let modules = ["/m.d.ts".to_string(), "/a.d.ts".to_string()];
    let out = registry
      .reassemble("a.d.ts", rendered, &modules, ReassembleOptions::default())
      .unwrap();
    assert_eq!(
      out,
      "//#region m.d.ts\ninterface A {\n}\n//#endregion\ndeclare namespace m_exports {\n  export { A };\n}\n//#region a.d.ts\ndeclare const x: m_exports.A;\n//#endregion\nexport { x };\n"
    );
  }

  #[test]
  fn unknown_tuples_are_errors() {
    let mut registry = BuildRegistry::new();
    let err = registry
      .reassemble(
        "a.d.ts",
        "var A = [99, () => []];\nexport { A };\n",
        &[],
        ReassembleOptions::default(),
      )
      .unwrap_err();
    assert!(matches!(err, DtsError::UnknownSymbol(99)), "{err}");
  }

  #[test]
  fn dropped_dependencies_keep_their_names() {
    let (mut registry, _) = registry_with("/a.d.ts", "export declare const x: Missing;\n");
    let out = registry
      .reassemble(
        "a.d.ts",
        "var x = [0, () => [void 0]];\nexport { x };\n",
        &["/a.d.ts".to_string()],
        ReassembleOptions::default(),
      )
      .unwrap();
    assert_eq!(out, "declare const x: Missing;\nexport { x };\n");
  }

  #[test]
  fn empty_chunks_stay_modules() {
    let mut registry = BuildRegistry::new();
    let out = registry
      .reassemble("a.d.ts", "//#region a.d.ts\n__dtsSideEffect();\nexport {};\n//#endregion\n", &[], ReassembleOptions::default())
      .unwrap();
    assert_eq!(out, "//#region a.d.ts\n//#endregion\nexport {};\n");
  }

  #[test]
  fn augmentation_only_chunks_stay_modules() {
    let (mut registry, code) = registry_with(
      "/a.d.ts",
      "declare module \"foo\" {\n  interface Options {\n    debug: boolean;\n  }\n}\nexport {};\n",
    );
    let out = registry
      .reassemble("a.d.ts", &code, &["/a.d.ts".to_string()], ReassembleOptions::default())
      .unwrap();
    assert!(out.starts_with("declare module \"foo\" {"), "{out}");
    assert!(out.contains("debug: boolean;"), "{out}");
    assert!(out.ends_with("}\nexport {};\n"), "{out}");
  }

  #[test]
  fn module_syntax_suppresses_the_empty_export() {
    let (mut registry, code) = registry_with(
      "/a.d.ts",
      "import { X } from './x';\ndeclare global {\n  var x: X;\n}\n",
    );
    let out = registry
      .reassemble("a.d.ts", &code, &["/a.d.ts".to_string()], ReassembleOptions::default())
      .unwrap();
    assert!(out.starts_with("import { X } from \"./x\";\n"), "{out}");
    assert!(!out.contains("export {}"), "{out}");
  }

  #[test]
  fn cjs_default_rewrites_a_lone_default_export() {
    let (mut registry, code) = registry_with("/a.d.ts", "declare function f(): void;\nexport = f;\n");
    let out = registry
      .reassemble("a.d.ts", &code, &["/a.d.ts".to_string()], ReassembleOptions { cjs_default: true })
      .unwrap();
    assert_eq!(out, "declare function f(): void;\nexport = f;\n");
  }

  #[test]
  fn type_only_exports_and_declaration_sources_are_restored() {
    let (mut registry, code) = registry_with(
      "/a.d.ts",
      "import { X } from './x.d.ts';\nexport type { X };\nexport * from './y.d.mts';\n",
    );
    let out = registry
      .reassemble("a.d.ts", &code, &["/a.d.ts".to_string()], ReassembleOptions::default())
      .unwrap();
    assert_eq!(
      out,
      "import { X } from \"./x.js\";\nexport { type X };\nexport * from \"./y.mjs\";\n"
    );
  }
}
