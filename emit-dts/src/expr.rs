use crate::EmitError;
use crate::EmitResult;
use crate::Printer;
use parse_dts::ast::expr::*;
use parse_dts::ast::NodeId;
use parse_dts::ast::Syntax;

pub(crate) const ASSIGN_PREC: u8 = 1;
const CONDITIONAL_PREC: u8 = 2;
const UNARY_PREC: u8 = 15;
pub(crate) const CALL_PREC: u8 = 16;
const PRIMARY_PREC: u8 = 17;

fn binary_prec(op: &str) -> u8 {
  let p = match op {
    "??" => 1,
    "||" => 2,
    "&&" => 3,
    "|" => 4,
    "^" => 5,
    "&" => 6,
    "==" | "!=" | "===" | "!==" => 7,
    "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 8,
    "<<" | ">>" | ">>>" => 9,
    "+" | "-" => 10,
    "*" | "/" | "%" => 11,
    _ => 12,
  };
  p + CONDITIONAL_PREC
}

fn is_logical(op: &str) -> bool {
  matches!(op, "??" | "||" | "&&")
}

impl<'a> Printer<'a> {
  fn expr_prec(&self, id: NodeId) -> u8 {
    match &self.ast[id] {
      Syntax::ArrowFunc(_) | Syntax::AssignExpr(_) | Syntax::SpreadExpr(_) => ASSIGN_PREC,
      Syntax::CondExpr(_) => CONDITIONAL_PREC,
      Syntax::BinaryExpr(b) => binary_prec(&b.op),
      Syntax::UnaryExpr(_) => UNARY_PREC,
      Syntax::CallExpr(_)
      | Syntax::MemberExpr(_)
      | Syntax::ComputedMemberExpr(_)
      | Syntax::NewExpr(_) => CALL_PREC,
      _ => PRIMARY_PREC,
    }
  }

  /// The node printed first when `id` is printed without parentheses.
  fn leftmost(&self, id: NodeId) -> NodeId {
    match &self.ast[id] {
      Syntax::CallExpr(c) => self.leftmost(c.callee),
      Syntax::MemberExpr(m) => self.leftmost(m.object),
      Syntax::ComputedMemberExpr(m) => self.leftmost(m.object),
      Syntax::BinaryExpr(b) => self.leftmost(b.left),
      Syntax::CondExpr(c) => self.leftmost(c.test),
      Syntax::AssignExpr(a) => self.leftmost(a.target),
      _ => id,
    }
  }

  fn starts_with_brace(&self, id: NodeId) -> bool {
    matches!(self.ast[self.leftmost(id)], Syntax::ObjectExpr(_))
  }

  pub fn emit_expr(&mut self, id: NodeId) -> EmitResult {
    self
      .emit_expr_inner(id)
      .map_err(|e| e.with_loc(self.ast.node(id).loc))
  }

  pub(crate) fn emit_expr_min(&mut self, id: NodeId, min: u8) -> EmitResult {
    if self.expr_prec(id) < min {
      self.write("(");
      self.emit_expr(id)?;
      self.write(")");
      Ok(())
    } else {
      self.emit_expr(id)
    }
  }

  /// An expression in statement position, where a leading `{`, `function` or `class` would be
  /// read as the start of a declaration.
  pub(crate) fn emit_expr_stmt_start(&mut self, id: NodeId) -> EmitResult {
    let ambiguous = match &self.ast[self.leftmost(id)] {
      Syntax::ObjectExpr(_) => true,
      Syntax::OpaqueExpr(o) => {
        let text = o.text.trim_start();
        text.starts_with("function") || text.starts_with("class") || text.starts_with("async")
      }
      _ => false,
    };
    if ambiguous {
      self.write("(");
      self.emit_expr(id)?;
      self.write(")");
      Ok(())
    } else {
      self.emit_expr(id)
    }
  }

  fn emit_args(&mut self, args: &[NodeId]) -> EmitResult {
    self.write("(");
    self.comma_separated(args, |p, a| p.emit_expr_min(a, ASSIGN_PREC))?;
    self.write(")");
    Ok(())
  }

  fn emit_binary_operand(&mut self, parent: &str, operand: NodeId, min: u8) -> EmitResult {
    // `??` cannot be mixed with `||` or `&&` without parentheses.
    let mixes_nullish = match &self.ast[operand] {
      Syntax::BinaryExpr(b) => {
        is_logical(parent) && is_logical(&b.op) && ((parent == "??") != (b.op == "??"))
      }
      _ => false,
    };
    if mixes_nullish {
      self.write("(");
      self.emit_expr(operand)?;
      self.write(")");
      Ok(())
    } else {
      self.emit_expr_min(operand, min)
    }
  }

  fn has_call_in_chain(&self, id: NodeId) -> bool {
    match &self.ast[id] {
      Syntax::CallExpr(_) => true,
      Syntax::MemberExpr(m) => self.has_call_in_chain(m.object),
      Syntax::ComputedMemberExpr(m) => self.has_call_in_chain(m.object),
      _ => false,
    }
  }

  fn emit_member_object(&mut self, object: NodeId) -> EmitResult {
    let numeric = match &self.ast[object] {
      Syntax::LitExpr(l) => l.raw.starts_with(|c: char| c.is_ascii_digit()),
      _ => false,
    };
    if numeric {
      self.write("(");
      self.emit_expr(object)?;
      self.write(")");
      Ok(())
    } else {
      self.emit_expr_min(object, CALL_PREC)
    }
  }

  fn emit_expr_inner(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    match &ast[id] {
      Syntax::Ident(ident) => self.write(&ident.name),
      Syntax::QualifiedName(_) => self.emit_entity(id)?,
      Syntax::ThisExpr(_) => self.write("this"),
      Syntax::LitExpr(l) => self.em.write_multiline(&l.raw),
      Syntax::OpaqueExpr(o) => self.em.write_multiline(&o.text),
      Syntax::ParenExpr(p) => {
        self.write("(");
        self.emit_expr(p.expr)?;
        self.write(")");
      }
      Syntax::SpreadExpr(s) => {
        self.write("...");
        self.emit_expr_min(s.arg, ASSIGN_PREC)?;
      }
      Syntax::ArrayExpr(a) => {
        self.write("[");
        for (i, elem) in a.elements.iter().enumerate() {
          if i > 0 {
            self.write(", ");
          }
          if let Some(elem) = elem {
            self.emit_expr_min(*elem, ASSIGN_PREC)?;
          }
        }
        if matches!(a.elements.last(), Some(None)) {
          self.write(",");
        }
        self.write("]");
      }
      Syntax::ObjectExpr(o) => {
        if o.props.is_empty() {
          self.write("{}");
        } else {
          self.write("{ ");
          self.comma_separated(&o.props, |p, prop| p.emit_expr(prop))?;
          self.write(" }");
        }
      }
      Syntax::ObjectProp(prop) => {
        self.emit_prop_key(&prop.key)?;
        if let Some(value) = prop.value {
          self.write(": ");
          self.emit_expr_min(value, ASSIGN_PREC)?;
        }
      }
      Syntax::ArrowFunc(f) => {
        self.write("(");
        self.comma_separated(&f.params, |p, param| p.emit_expr(param))?;
        self.write(") => ");
        match &f.body {
          ArrowBody::Block(block) => self.em.write_multiline(block),
          ArrowBody::Expr(body) if self.starts_with_brace(*body) => {
            self.write("(");
            self.emit_expr(*body)?;
            self.write(")");
          }
          ArrowBody::Expr(body) => self.emit_expr_min(*body, ASSIGN_PREC)?,
        };
      }
      Syntax::AssignExpr(a) => {
        self.emit_expr_min(a.target, CALL_PREC)?;
        self.write(" ");
        self.write(&a.op);
        self.write(" ");
        self.emit_expr_min(a.value, ASSIGN_PREC)?;
      }
      Syntax::CondExpr(c) => {
        self.emit_expr_min(c.test, CONDITIONAL_PREC + 1)?;
        self.write(" ? ");
        self.emit_expr_min(c.consequent, ASSIGN_PREC)?;
        self.write(" : ");
        self.emit_expr_min(c.alternate, ASSIGN_PREC)?;
      }
      Syntax::BinaryExpr(b) => {
        let prec = binary_prec(&b.op);
        let (left_min, right_min) = if b.op == "**" {
          // `-a ** b` is a syntax error, so the base must bind tighter than unary.
          (CALL_PREC, prec)
        } else {
          (prec, prec + 1)
        };
        self.emit_binary_operand(&b.op, b.left, left_min)?;
        self.write(" ");
        self.write(&b.op);
        self.write(" ");
        self.emit_binary_operand(&b.op, b.right, right_min)?;
      }
      Syntax::UnaryExpr(u) => {
        self.write(&u.op);
        let word = u.op.starts_with(|c: char| c.is_ascii_alphabetic());
        let repeats = match &ast[u.arg] {
          Syntax::UnaryExpr(inner) => inner.op.starts_with(u.op.as_str()),
          Syntax::LitExpr(l) => l.raw.starts_with(u.op.as_str()),
          _ => false,
        };
        if word || repeats {
          self.write(" ");
        }
        self.emit_expr_min(u.arg, UNARY_PREC)?;
      }
      Syntax::CallExpr(c) => {
        self.emit_expr_min(c.callee, CALL_PREC)?;
        if c.optional {
          self.write("?.");
        }
        self.emit_args(&c.args)?;
      }
      Syntax::NewExpr(n) => {
        self.write("new ");
        if self.has_call_in_chain(n.callee) || self.expr_prec(n.callee) < CALL_PREC {
          self.write("(");
          self.emit_expr(n.callee)?;
          self.write(")");
        } else {
          self.emit_expr(n.callee)?;
        }
        self.emit_args(&n.args)?;
      }
      Syntax::MemberExpr(m) => {
        self.emit_member_object(m.object)?;
        self.write(if m.optional { "?." } else { "." });
        self.write(&m.property);
      }
      Syntax::ComputedMemberExpr(m) => {
        self.emit_member_object(m.object)?;
        if m.optional {
          self.write("?.");
        }
        self.write("[");
        self.emit_expr(m.member)?;
        self.write("]");
      }
      _ => return Err(EmitError::unsupported("expression")),
    };
    Ok(())
  }
}
