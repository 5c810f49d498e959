//! Printer for [`parse_dts`] syntax trees.
//!
//! Output is formatted declaration text: one statement per line, members indented, and
//! parentheses inserted wherever a rewritten tree would otherwise change meaning.

use parse_dts::ast::Ast;
use parse_dts::ast::NodeId;

mod emitter;
mod expr;
mod stmt;
mod ts_type;

pub use emitter::EmitError;
pub use emitter::EmitErrorKind;
pub use emitter::EmitOptions;
pub use emitter::EmitResult;
pub use emitter::Emitter;
pub use emitter::Indent;

/// Walks an [`Ast`] and writes it into an [`Emitter`].
pub struct Printer<'a> {
  ast: &'a Ast,
  em: &'a mut Emitter,
  // Inside `declare namespace` / `declare module` bodies, where `declare` is implied.
  ambient_depth: usize,
}

impl<'a> Printer<'a> {
  pub fn new(ast: &'a Ast, em: &'a mut Emitter) -> Printer<'a> {
    Printer {
      ast,
      em,
      ambient_depth: 0,
    }
  }

  fn write(&mut self, s: &str) {
    self.em.write_str(s);
  }

  fn comma_separated(
    &mut self,
    ids: &[NodeId],
    mut f: impl FnMut(&mut Self, NodeId) -> EmitResult,
  ) -> EmitResult {
    for (i, id) in ids.iter().enumerate() {
      if i > 0 {
        self.write(", ");
      }
      f(self, *id)?;
    }
    Ok(())
  }
}

fn with_printer(
  ast: &Ast,
  opts: EmitOptions,
  f: impl FnOnce(&mut Printer<'_>) -> EmitResult,
) -> Result<String, EmitError> {
  let mut em = Emitter::new(opts);
  {
    let mut printer = Printer::new(ast, &mut em);
    f(&mut printer)?;
  }
  Ok(em.into_string())
}

/// Prints top-level statements, each followed by a newline.
pub fn emit_program(ast: &Ast, body: &[NodeId], opts: EmitOptions) -> Result<String, EmitError> {
  with_printer(ast, opts, |p| p.emit_stmts(body))
}

pub fn emit_stmt(ast: &Ast, stmt: NodeId, opts: EmitOptions) -> Result<String, EmitError> {
  with_printer(ast, opts, |p| p.emit_stmt(stmt))
}

pub fn type_to_string(ast: &Ast, ty: NodeId) -> Result<String, EmitError> {
  with_printer(ast, EmitOptions::default(), |p| p.emit_type(ty))
}

pub fn expr_to_string(ast: &Ast, expr: NodeId) -> Result<String, EmitError> {
  with_printer(ast, EmitOptions::default(), |p| p.emit_expr(expr))
}
