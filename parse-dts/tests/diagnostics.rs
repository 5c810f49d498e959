use parse_dts::ast::Ast;
use parse_dts::ast::Syntax;
use parse_dts::error::SyntaxErrorType;
use parse_dts::parse;
use parse_dts::parse_lenient;

#[test]
fn unexpected_end_reports_position() {
  let source = "export interface A {\n  a: string;\n";
  let mut ast = Ast::new();
  let err = parse(&mut ast, source).unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::UnexpectedEnd);
  assert_eq!(err.typ.code(), "DS0004");
  assert_eq!(err.position(source), (3, 1));
}

#[test]
fn missing_token_names_expected_and_found() {
  let source = "declare const x: ;";
  let mut ast = Ast::new();
  let err = parse(&mut ast, source).unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::ExpectedSyntax("type"));
  assert_eq!(err.position(source), (1, 18));
  assert!(err.to_string().contains("expected type"));
  assert!(err.to_string().contains("DS0002"));
}

#[test]
fn lenient_parse_still_rejects_unbalanced_code() {
  let mut ast = Ast::new();
  let err = parse_lenient(&mut ast, "foo(() => { bar(;\n").unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::UnterminatedBlock);
}

#[test]
fn lenient_parse_handles_asi_and_regex() {
  let mut ast = Ast::new();
  let program = parse_lenient(
    &mut ast,
    "let a = b\n/x/g.test(c) && d()\nexport { a }\n",
  )
  .unwrap();
  // `b / x / g.test(c)` is a division across the line break.
  assert_eq!(program.body.len(), 2);
  assert!(matches!(ast[program.body[1]], Syntax::ExportNamed(_)));
}
