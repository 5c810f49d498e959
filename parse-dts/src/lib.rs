//! Parser for TypeScript declaration files and the JavaScript subset bundlers emit around them.
//!
//! Declarations are parsed into an arena [`Ast`](ast::Ast). Function bodies, class method bodies
//! and (in lenient mode) statements outside the declaration grammar are kept as raw text.

use ast::Ast;
use ast::Program;
use error::SyntaxResult;
use lex::Lexer;
use parse::ParseOptions;
use parse::Parser;

pub mod ast;
pub mod char;
pub mod error;
pub mod lex;
pub mod literal;
pub mod loc;
pub mod parse;
pub mod token;

pub use literal::quote;
pub use literal::unquote;

pub fn parse_with_options(
  ast: &mut Ast,
  source: &str,
  options: ParseOptions,
) -> SyntaxResult<Program> {
  let lexer = Lexer::new(source);
  let mut parser = Parser::new(lexer, ast, options);
  let body = parser.parse_top_level()?;
  Ok(Program {
    body,
    comments: parser.into_comments(),
  })
}

/// Parses `source` as declaration-file syntax. Any statement outside the grammar is an error.
pub fn parse(ast: &mut Ast, source: &str) -> SyntaxResult<Program> {
  parse_with_options(ast, source, ParseOptions { lenient: false })
}

/// Parses `source`, keeping statements outside the grammar as opaque text.
pub fn parse_lenient(ast: &mut Ast, source: &str) -> SyntaxResult<Program> {
  parse_with_options(ast, source, ParseOptions { lenient: true })
}
