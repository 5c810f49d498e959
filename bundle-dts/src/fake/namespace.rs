//! Namespace objects a host materializes for `import * as ns` of a bundled module, and the
//! runtime helpers it declares for them.

use super::entity_name;
use super::segments;
use ahash::HashSet;
use once_cell::sync::Lazy;
use parse_dts::ast::class_or_object::PropKey;
use parse_dts::ast::expr::ArrowBody;
use parse_dts::ast::stmt::DeclFlags;
use parse_dts::ast::stmt::ExportNamed;
use parse_dts::ast::stmt::ExportSpecifier;
use parse_dts::ast::stmt::ImportEquals;
use parse_dts::ast::stmt::ImportEqualsTarget;
use parse_dts::ast::stmt::ModuleDecl;
use parse_dts::ast::stmt::ModuleKeyword;
use parse_dts::ast::stmt::ModuleName;
use parse_dts::ast::Ast;
use parse_dts::ast::NodeId;
use parse_dts::ast::Syntax;
use parse_dts::char::is_valid_identifier;

static RUNTIME_HELPERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  [
    "__create",
    "__defProp",
    "__export",
    "__exportAll",
    "__getOwnPropDesc",
    "__getOwnPropNames",
    "__getProtoOf",
    "__hasOwnProp",
    "__copyProps",
    "__reExport",
    "__toESM",
    "__toCommonJS",
    "__name",
  ]
  .into_iter()
  .collect()
});

pub fn is_runtime_helper(name: &str) -> bool {
  RUNTIME_HELPERS.contains(name)
}

/// Member of a namespace object: exported key and the dotted name it reads.
pub type NamespaceMember = (String, String);

fn key_name(key: &PropKey) -> Option<String> {
  match key {
    PropKey::Ident(name) => Some(name.clone()),
    PropKey::String(raw) => Some(parse_dts::unquote(raw)),
    _ => None,
  }
}

/// Entries of an object literal whose values are getters (`k: () => v`) or plain names.
fn object_members(ast: &Ast, object: NodeId) -> Option<Vec<NamespaceMember>> {
  let Syntax::ObjectExpr(object) = &ast[object] else {
    return None;
  };
  let mut members = Vec::new();
  for &prop in &object.props {
    let Syntax::ObjectProp(prop) = &ast[prop] else {
      return None;
    };
    let key = key_name(&prop.key)?;
    if key == "__proto__" {
      continue;
    }
    let value = match prop.value {
      None => key.clone(),
      Some(value) => {
        let value = match &ast[value] {
          Syntax::ArrowFunc(arrow) if arrow.params.is_empty() => match arrow.body {
            ArrowBody::Expr(body) => body,
            ArrowBody::Block(_) => return None,
          },
          _ => value,
        };
        ast.entity_text(value)?
      }
    };
    members.push((key, value));
  }
  Some(members)
}

/// `__export(ns, { a: () => a })`: the namespace name and its members.
pub fn export_call(ast: &Ast, expr: NodeId) -> Option<(String, Vec<NamespaceMember>)> {
  let Syntax::CallExpr(call) = &ast[expr] else {
    return None;
  };
  if ast.ident_name(call.callee) != Some("__export") {
    return None;
  }
  let [target, object] = call.args.as_slice() else {
    return None;
  };
  let name = ast.ident_name(*target)?.to_string();
  Some((name, object_members(ast, *object)?))
}

/// `Object.freeze({ __proto__: null, a: a })` or `__exportAll({ a: () => a })` as a variable
/// initializer.
pub fn namespace_object(ast: &Ast, init: NodeId) -> Option<Vec<NamespaceMember>> {
  let Syntax::CallExpr(call) = &ast[init] else {
    return None;
  };
  let callee = ast.entity_text(call.callee)?;
  if callee != "Object.freeze" && callee != "__exportAll" {
    return None;
  }
  let [object] = call.args.as_slice() else {
    return None;
  };
  object_members(ast, *object)
}

pub fn is_empty_object(ast: &Ast, init: NodeId) -> bool {
  matches!(&ast[init], Syntax::ObjectExpr(o) if o.props.is_empty())
}

/// `declare namespace name { export { a, b as c }; export import d = x.y; }`.
pub fn namespace_decl(ast: &mut Ast, name: &str, members: &[NamespaceMember]) -> NodeId {
  let mut body = Vec::new();
  let mut specifiers = Vec::new();
  for (key, value) in members {
    if is_valid_identifier(value) {
      let local = ast.ident(value.clone());
      specifiers.push(ast.synthetic(ExportSpecifier {
        type_only: false,
        local,
        exported: key.clone(),
      }));
    } else if let Some(entity) = entity_name(ast, &segments(value)) {
      let alias = ast.ident(key.clone());
      body.push(ast.synthetic(ImportEquals {
        export: true,
        type_only: false,
        name: alias,
        target: ImportEqualsTarget::Entity(entity),
      }));
    }
  }
  if !specifiers.is_empty() {
    let export = ast.synthetic(ExportNamed {
      type_only: false,
      specifiers,
      source: None,
    });
    body.insert(0, export);
  }
  let name = ast.ident(name);
  ast.synthetic(ModuleDecl {
    flags: DeclFlags {
      export: false,
      default: false,
      declare: true,
    },
    keyword: ModuleKeyword::Namespace,
    name: ModuleName::Ident(name),
    body: Some(body),
    dotted: false,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use emit_dts::emit_stmt;
  use emit_dts::EmitOptions;

  fn first_expr(ast: &mut Ast, source: &str) -> NodeId {
    let program = parse_dts::parse_lenient(ast, source).unwrap();
    match &ast[program.body[0]] {
      Syntax::ExprStmt(s) => s.expr,
      Syntax::VarDecl(v) => match &ast[v.declarators[0]] {
        Syntax::VarDeclarator(d) => d.init.unwrap(),
        _ => unreachable!(),
      },
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn reads_export_helper_calls() {
    let mut ast = Ast::new();
    let expr = first_expr(&mut ast, "__export(ns, { a: () => a, b: () => c.d, \"e-f\": () => e });");
    let (name, members) = export_call(&ast, expr).unwrap();
    assert_eq!(name, "ns");
    assert_eq!(
      members,
      vec![
        ("a".to_string(), "a".to_string()),
        ("b".to_string(), "c.d".to_string()),
        ("e-f".to_string(), "e".to_string()),
      ]
    );
  }

  #[test]
  fn reads_frozen_objects() {
    let mut ast = Ast::new();
    let init = first_expr(&mut ast, "var ns = Object.freeze({ __proto__: null, a: a, b });");
    assert_eq!(
      namespace_object(&ast, init).unwrap(),
      vec![("a".to_string(), "a".to_string()), ("b".to_string(), "b".to_string())]
    );
  }

  #[test]
  fn prints_namespace_declarations() {
    let mut ast = Ast::new();
    let decl = namespace_decl(
      &mut ast,
      "ns",
      &[
        ("a".to_string(), "a".to_string()),
        ("default".to_string(), "x".to_string()),
        ("c".to_string(), "m.c".to_string()),
      ],
    );
    assert_eq!(
      emit_stmt(&ast, decl, EmitOptions::default()).unwrap(),
      "declare namespace ns {\n  export { a, x as default };\n  export import c = m.c;\n}"
    );
  }

  #[test]
  fn knows_runtime_helpers() {
    assert!(is_runtime_helper("__defProp"));
    assert!(!is_runtime_helper("__dts_import_0"));
  }
}
