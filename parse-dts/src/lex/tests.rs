use super::lex_next;
use super::CommentKind;
use super::LexMode;
use super::Lexer;
use crate::token::TT;

fn lex_all(code: &str) -> Vec<(TT, String)> {
  let mut lexer = Lexer::new(code);
  let mut out = Vec::new();
  loop {
    let t = lex_next(&mut lexer, LexMode::Standard);
    if t.typ == TT::EOF {
      break;
    }
    out.push((t.typ, lexer[t.loc].to_string()));
  }
  out
}

fn types(code: &str) -> Vec<TT> {
  lex_all(code).into_iter().map(|(t, _)| t).collect()
}

#[test]
fn contextual_keywords_are_identifiers() {
  assert_eq!(
    types("declare interface type namespace keyof"),
    vec![TT::Identifier; 5]
  );
  assert_eq!(types("export default class"), vec![
    TT::KeywordExport,
    TT::KeywordDefault,
    TT::KeywordClass
  ]);
}

#[test]
fn closing_chevrons_are_never_joined() {
  assert_eq!(types("A<B<C>>"), vec![
    TT::Identifier,
    TT::ChevronLeft,
    TT::Identifier,
    TT::ChevronLeft,
    TT::Identifier,
    TT::ChevronRight,
    TT::ChevronRight,
  ]);
}

#[test]
fn literals() {
  assert_eq!(types("1 0x1F 1_000n .5 1e10 'a\\'b' \"c\""), vec![
    TT::LiteralNumber,
    TT::LiteralNumber,
    TT::LiteralBigInt,
    TT::LiteralNumber,
    TT::LiteralNumber,
    TT::LiteralString,
    TT::LiteralString,
  ]);
  assert_eq!(types("'unterminated\n'"), vec![TT::Invalid, TT::Invalid]);
}

#[test]
fn template_parts() {
  let mut lexer = Lexer::new("`a${T}b${U}c`");
  assert_eq!(lex_next(&mut lexer, LexMode::Standard).typ, TT::TemplateHead);
  assert_eq!(lex_next(&mut lexer, LexMode::Standard).typ, TT::Identifier);
  assert_eq!(lex_next(&mut lexer, LexMode::TemplateContinue).typ, TT::TemplateMiddle);
  assert_eq!(lex_next(&mut lexer, LexMode::Standard).typ, TT::Identifier);
  assert_eq!(lex_next(&mut lexer, LexMode::TemplateContinue).typ, TT::TemplateTail);
  assert_eq!(types("`plain`"), vec![TT::LiteralTemplate]);
}

#[test]
fn regex_only_in_regex_mode() {
  let mut lexer = Lexer::new("/a[/]b/g");
  let t = lex_next(&mut lexer, LexMode::SlashIsRegex);
  assert_eq!(t.typ, TT::LiteralRegex);
  assert_eq!(&lexer[t.loc], "/a[/]b/g");
  assert_eq!(types("a / b"), vec![TT::Identifier, TT::Slash, TT::Identifier]);
}

#[test]
fn comments_are_recorded_once() {
  let mut lexer = Lexer::new("/** doc */\n// line\nfoo");
  let t = lex_next(&mut lexer, LexMode::Standard);
  assert!(t.preceded_by_line_terminator);
  lexer.set_next(0);
  lex_next(&mut lexer, LexMode::Standard);
  let comments = lexer.into_comments();
  assert_eq!(comments.len(), 2);
  assert!(comments[0].is_jsdoc());
  assert_eq!(comments[1].kind, CommentKind::Line);
  assert_eq!(comments[1].text, "// line");
}

#[test]
fn private_names_and_operators() {
  assert_eq!(types("#x ?. ?.5 ??= =>"), vec![
    TT::PrivateName,
    TT::QuestionDot,
    TT::Question,
    TT::LiteralNumber,
    TT::AssignmentOperator,
    TT::EqualsChevronRight,
  ]);
}
