use super::ParseOptions;
use super::Parser;
use crate::ast::class_or_object::MethodKind;
use crate::ast::class_or_object::PropKey;
use crate::ast::stmt::ImportEqualsTarget;
use crate::ast::stmt::ModuleName;
use crate::ast::type_expr::TypeKeywordKind;
use crate::ast::Ast;
use crate::ast::NodeId;
use crate::ast::Syntax;
use crate::lex::LexMode;
use crate::lex::Lexer;
use crate::parse;
use crate::parse_lenient;
use crate::token::TT;

fn parse_one(source: &str) -> (Ast, NodeId) {
  let mut ast = Ast::new();
  let program = parse(&mut ast, source).unwrap();
  assert_eq!(program.body.len(), 1, "expected one statement in {source:?}");
  let stmt = program.body[0];
  (ast, stmt)
}

fn alias_type(source: &str) -> (Ast, NodeId) {
  let (ast, stmt) = parse_one(source);
  let Syntax::TypeAliasDecl(alias) = &ast[stmt] else {
    panic!("expected type alias, got {:?}", ast[stmt]);
  };
  let ty = alias.ty;
  (ast, ty)
}

#[test]
fn checkpoint_discards_nodes_and_relexes() {
  let mut ast = Ast::new();
  let mut p = Parser::new(Lexer::new("a / b"), &mut ast, ParseOptions::default());
  let cp = p.checkpoint();
  p.binding_ident().unwrap();
  assert_eq!(p.ast().len(), 1);
  p.restore_checkpoint(cp);
  assert_eq!(p.ast().len(), 0);

  p.consume();
  assert_eq!(p.peek().typ, TT::Slash);
  // The same position re-lexed as a regex once the mode changes.
  assert_eq!(p.peek_with_mode(LexMode::SlashIsRegex).typ, TT::Invalid);
  assert_eq!(p.peek().typ, TT::Slash);
}

#[test]
fn nested_type_arguments_close_with_single_chevrons() {
  let (ast, ty) = alias_type("type A = Map<string, Array<Set<number>>>;");
  let Syntax::TypeRef(r) = &ast[ty] else {
    panic!("expected reference");
  };
  assert_eq!(ast.entity_text(r.name).as_deref(), Some("Map"));
  assert_eq!(r.type_args.as_ref().map(|a| a.len()), Some(2));
}

#[test]
fn function_type_versus_parenthesized_type() {
  let (ast, ty) = alias_type("type F = (a: string, ...rest: number[]) => void;");
  assert!(matches!(ast[ty], Syntax::TypeFunction(_)));
  let (ast, ty) = alias_type("type P = (string | number)[];");
  let Syntax::TypeArray(arr) = &ast[ty] else {
    panic!("expected array");
  };
  assert!(matches!(ast[arr.elem], Syntax::TypeParen(_)));
  let (ast, ty) = alias_type("type E = () => void;");
  assert!(matches!(ast[ty], Syntax::TypeFunction(_)));
}

#[test]
fn conditional_with_infer_constraint() {
  let (ast, ty) =
    alias_type("type X<T> = T extends [infer H extends string, ...infer R] ? H : never;");
  let Syntax::TypeConditional(cond) = &ast[ty] else {
    panic!("expected conditional");
  };
  let mut infers = Vec::new();
  ast.walk(cond.extends, &mut |ast, id| {
    if let Syntax::TypeInfer(infer) = &ast[id] {
      if let Syntax::TypeParam(param) = &ast[infer.param] {
        infers.push((
          ast.ident_name(param.name).unwrap().to_string(),
          param.constraint.is_some(),
        ));
      }
    }
    true
  });
  assert_eq!(infers, vec![("H".to_string(), true), ("R".to_string(), false)]);
}

#[test]
fn infer_extends_inside_conditional_check() {
  // The `extends` after `infer U` starts a nested conditional, not a constraint.
  let (ast, ty) = alias_type("type X<T> = T extends (infer U extends string ? 1 : 2) ? U : 0;");
  assert!(matches!(ast[ty], Syntax::TypeConditional(_)));
}

#[test]
fn mapped_and_object_types() {
  let (ast, ty) = alias_type("type M<T> = { -readonly [K in keyof T as `get${K & string}`]+?: T[K] };");
  let Syntax::TypeMapped(mapped) = &ast[ty] else {
    panic!("expected mapped type, got {:?}", ast[ty]);
  };
  assert!(mapped.name_type.is_some());
  assert!(mapped.optional.is_some());

  let (ast, ty) = alias_type("type O = { readonly a: string; b?(): void, get c(): number; [k: string]: any };");
  let Syntax::TypeObject(obj) = &ast[ty] else {
    panic!("expected object type");
  };
  assert_eq!(obj.members.len(), 4);
  let Syntax::MethodMember(getter) = &ast[obj.members[2]] else {
    panic!("expected getter");
  };
  assert_eq!(getter.kind, MethodKind::Getter);
  assert!(matches!(ast[obj.members[3]], Syntax::IndexSignature(_)));
}

#[test]
fn type_predicates() {
  let (ast, stmt) = parse_one("declare function isString(x: unknown): x is string;");
  let Syntax::FuncDecl(func) = &ast[stmt] else {
    panic!("expected function");
  };
  let Some(ret) = func.return_type else {
    panic!("expected return type");
  };
  let Syntax::TypePredicate(pred) = &ast[ret] else {
    panic!("expected predicate");
  };
  assert_eq!(pred.param, "x");
  assert!(!pred.asserts);

  let (ast, stmt) = parse_one("declare function check(this: Foo): asserts this;");
  let Syntax::FuncDecl(func) = &ast[stmt] else {
    panic!("expected function");
  };
  let Some(Syntax::TypePredicate(pred)) = func.return_type.map(|r| &ast[r]) else {
    panic!("expected predicate");
  };
  assert!(pred.asserts && pred.ty.is_none());
}

#[test]
fn keyword_types_and_names() {
  let (ast, ty) = alias_type("type U = string | undefined | null | void;");
  let Syntax::TypeUnion(union) = &ast[ty] else {
    panic!("expected union");
  };
  let kinds: Vec<_> = union
    .types
    .iter()
    .map(|t| match &ast[*t] {
      Syntax::TypeKeyword(k) => k.kind,
      other => panic!("unexpected {other:?}"),
    })
    .collect();
  assert_eq!(kinds, vec![
    TypeKeywordKind::String,
    TypeKeywordKind::Undefined,
    TypeKeywordKind::Null,
    TypeKeywordKind::Void
  ]);
}

#[test]
fn import_type_with_qualifier() {
  let (ast, ty) = alias_type("type I = import('./mod').Foo.Bar<string>;");
  let Syntax::TypeImport(import) = &ast[ty] else {
    panic!("expected import type");
  };
  assert_eq!(import.source, "./mod");
  assert_eq!(
    import.qualifier.and_then(|q| ast.entity_text(q)).as_deref(),
    Some("Foo.Bar")
  );
  assert!(import.type_args.is_some());
}

#[test]
fn dotted_namespace_nests() {
  let (ast, stmt) = parse_one("declare namespace A.B.C { const x: number; }");
  let Syntax::ModuleDecl(outer) = &ast[stmt] else {
    panic!("expected namespace");
  };
  assert!(!outer.dotted);
  let body = outer.body.as_ref().unwrap();
  let Syntax::ModuleDecl(b) = &ast[body[0]] else {
    panic!("expected nested namespace");
  };
  assert!(b.dotted && b.flags.export);
  let ModuleName::Ident(name) = &b.name else {
    panic!("expected identifier name");
  };
  assert_eq!(ast.ident_name(*name), Some("B"));
}

#[test]
fn imports_and_exports() {
  let mut ast = Ast::new();
  let program = parse(
    &mut ast,
    r#"
      import type from "a";
      import type { A, type B as C } from "b";
      import D, * as E from "e";
      import F = require("f");
      import G = F.G;
      export type { H } from "h";
      export * as I from "i";
      export { J as default, "k" as K };
      export = L;
      export as namespace Lib;
    "#,
  )
  .unwrap();
  let body = program.body;
  assert_eq!(body.len(), 10);
  let Syntax::ImportDecl(import) = &ast[body[0]] else {
    panic!()
  };
  assert!(!import.type_only);
  assert_eq!(import.default.and_then(|d| ast.ident_name(d)), Some("type"));
  let Syntax::ImportDecl(import) = &ast[body[1]] else {
    panic!()
  };
  assert!(import.type_only);
  let named = import.named.as_ref().unwrap();
  let Syntax::ImportSpecifier(spec) = &ast[named[1]] else {
    panic!()
  };
  assert!(spec.type_only);
  assert_eq!(spec.imported, "B");
  assert_eq!(ast.ident_name(spec.local), Some("C"));
  let Syntax::ImportEquals(eq) = &ast[body[3]] else {
    panic!()
  };
  assert!(matches!(&eq.target, ImportEqualsTarget::Require(s) if s == "f"));
  let Syntax::ImportEquals(eq) = &ast[body[4]] else {
    panic!()
  };
  assert!(matches!(eq.target, ImportEqualsTarget::Entity(_)));
  let Syntax::ExportNamed(named) = &ast[body[5]] else {
    panic!()
  };
  assert!(named.type_only);
  assert!(matches!(&ast[body[6]], Syntax::ExportAll(all) if all.alias.as_deref() == Some("I")));
  let Syntax::ExportNamed(named) = &ast[body[7]] else {
    panic!()
  };
  let Syntax::ExportSpecifier(spec) = &ast[named.specifiers[1]] else {
    panic!()
  };
  assert_eq!(ast.ident_name(spec.local), Some("k"));
  assert_eq!(spec.exported, "K");
  assert!(matches!(ast[body[8]], Syntax::ExportAssign(_)));
  assert!(matches!(&ast[body[9]], Syntax::ExportAsNamespace(ns) if ns.name == "Lib"));
}

#[test]
fn class_members() {
  let (ast, stmt) = parse_one(
    r#"export declare abstract class A<T> extends B<T> implements C, D {
      private constructor(readonly x: number);
      static readonly y?: string;
      protected abstract get z(): number;
      ["computed"]: boolean;
      #secret;
      m<U>(this: A<T>, u?: U): void;
    }"#,
  );
  let Syntax::ClassDecl(class) = &ast[stmt] else {
    panic!("expected class");
  };
  assert!(class.is_abstract && class.flags.export && class.flags.declare);
  assert_eq!(class.implements.len(), 2);
  assert_eq!(class.members.len(), 6);
  let Syntax::PropertyMember(y) = &ast[class.members[1]] else {
    panic!()
  };
  assert!(y.modifiers.is_static && y.modifiers.readonly && y.optional);
  let Syntax::PropertyMember(secret) = &ast[class.members[4]] else {
    panic!()
  };
  assert!(matches!(&secret.key, PropKey::Private(name) if name == "#secret"));
}

#[test]
fn enum_initializers() {
  let (ast, stmt) = parse_one("declare const enum E { A = 1 << 2, B = A | 4, C = \"c\", D = 8 >> 1 }");
  let Syntax::EnumDecl(e) = &ast[stmt] else {
    panic!("expected enum");
  };
  assert!(e.is_const);
  assert_eq!(e.members.len(), 4);
  let Syntax::EnumMember(d) = &ast[e.members[3]] else {
    panic!()
  };
  let Some(Syntax::BinaryExpr(bin)) = d.init.map(|i| &ast[i]) else {
    panic!("expected binary initializer");
  };
  assert_eq!(bin.op, ">>");
}

#[test]
fn leading_comments_attach_to_statements() {
  let mut ast = Ast::new();
  let program = parse(
    &mut ast,
    "/** Docs. */\nexport declare function f(): void;\n// plain\ninterface I {\n  /** member */\n  a: string;\n}\n",
  )
  .unwrap();
  let first = ast.node(program.body[0]);
  assert_eq!(first.leading_comments.len(), 1);
  assert!(first.leading_comments[0].is_jsdoc());
  let Syntax::InterfaceDecl(iface) = &ast[program.body[1]] else {
    panic!()
  };
  assert_eq!(ast.node(iface.members[0]).leading_comments.len(), 1);
  assert_eq!(program.comments.len(), 3);
}

#[test]
fn strict_mode_rejects_runtime_statements() {
  let mut ast = Ast::new();
  assert!(parse(&mut ast, "if (a) { b(); }").is_err());
}

#[test]
fn lenient_mode_keeps_runtime_statements_opaque() {
  let mut ast = Ast::new();
  let source = r#"var __defProp = Object.defineProperty;
var __export = (target, all) => {
  for (var name in all) __defProp(target, name, { get: all[name], enumerable: true });
};
if (x) { y(); } else { z(/re}/g); }
const s = `a${b}c`;
var a = [1, (T) => [T, Foo], __dtsSideEffect()];
"#;
  let program = parse_lenient(&mut ast, source).unwrap();
  let kinds: Vec<_> = program
    .body
    .iter()
    .map(|id| match &ast[*id] {
      Syntax::VarDecl(_) => "var",
      Syntax::OpaqueStmt(_) => "opaque",
      other => panic!("unexpected {other:?}"),
    })
    .collect();
  assert_eq!(kinds, vec!["var", "var", "opaque", "var", "var"]);
  let Syntax::OpaqueStmt(stmt) = &ast[program.body[2]] else {
    panic!()
  };
  assert_eq!(stmt.text, "if (x) { y(); } else { z(/re}/g); }");
}
