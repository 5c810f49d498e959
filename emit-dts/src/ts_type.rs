use crate::EmitError;
use crate::EmitResult;
use crate::Printer;
use parse_dts::ast::stmt::TypeParam;
use parse_dts::ast::stmt::Variance;
use parse_dts::ast::type_expr::*;
use parse_dts::ast::NodeId;
use parse_dts::ast::Syntax;
use parse_dts::quote;

/// Precedence levels for type expressions. Higher variants bind more tightly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum TypePrec {
  ArrowOrConditional,
  Union,
  Intersection,
  Unary,
  Postfix,
  Primary,
}

impl<'a> Printer<'a> {
  fn type_prec(&self, id: NodeId) -> TypePrec {
    match &self.ast[id] {
      Syntax::TypeFunction(_) | Syntax::TypeConstructor(_) | Syntax::TypeConditional(_) => {
        TypePrec::ArrowOrConditional
      }
      Syntax::TypeUnion(_) => TypePrec::Union,
      Syntax::TypeIntersection(_) => TypePrec::Intersection,
      Syntax::TypeOperator(_) | Syntax::TypeInfer(_) | Syntax::TypePredicate(_) => TypePrec::Unary,
      Syntax::TypeQuery(q) if q.type_args.is_none() => TypePrec::Primary,
      Syntax::TypeQuery(_) => TypePrec::Unary,
      Syntax::TypeArray(_) | Syntax::TypeIndexedAccess(_) => TypePrec::Postfix,
      _ => TypePrec::Primary,
    }
  }

  pub fn emit_type(&mut self, id: NodeId) -> EmitResult {
    self.emit_type_inner(id).map_err(|e| e.with_loc(self.ast.node(id).loc))
  }

  fn emit_type_min(&mut self, id: NodeId, min: TypePrec) -> EmitResult {
    if self.type_prec(id) < min {
      self.write("(");
      self.emit_type(id)?;
      self.write(")");
      Ok(())
    } else {
      self.emit_type(id)
    }
  }

  fn emit_type_args(&mut self, args: &Option<Vec<NodeId>>) -> EmitResult {
    if let Some(args) = args {
      self.write("<");
      self.comma_separated(args, |p, a| p.emit_type(a))?;
      self.write(">");
    }
    Ok(())
  }

  pub(crate) fn emit_type_params(&mut self, params: &Option<Vec<NodeId>>) -> EmitResult {
    if let Some(params) = params {
      self.write("<");
      self.comma_separated(params, |p, a| p.emit_type_param(a))?;
      self.write(">");
    }
    Ok(())
  }

  fn emit_type_param(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    let Syntax::TypeParam(TypeParam {
      name,
      is_const,
      variance,
      constraint,
      default,
    }) = &ast[id]
    else {
      return Err(EmitError::unsupported("type parameter"));
    };
    if *is_const {
      self.write("const ");
    }
    match variance {
      Some(Variance::In) => self.write("in "),
      Some(Variance::Out) => self.write("out "),
      Some(Variance::InOut) => self.write("in out "),
      None => {}
    };
    self.emit_expr(*name)?;
    if let Some(c) = constraint {
      self.write(" extends ");
      self.emit_type(*c)?;
    }
    if let Some(d) = default {
      self.write(" = ");
      self.emit_type(*d)?;
    }
    Ok(())
  }

  /// An entity name (`a.b.c`) in type position.
  pub(crate) fn emit_entity(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    match &ast[id] {
      Syntax::Ident(ident) => {
        self.write(&ident.name);
        Ok(())
      }
      Syntax::QualifiedName(q) => {
        self.emit_entity(q.left)?;
        self.write(".");
        self.write(&q.right);
        Ok(())
      }
      Syntax::ThisExpr(_) => {
        self.write("this");
        Ok(())
      }
      Syntax::MemberExpr(_) => self.emit_expr(id),
      _ => Err(EmitError::unsupported("entity name")),
    }
  }

  fn emit_type_inner(&mut self, id: NodeId) -> EmitResult {
    let ast = self.ast;
    match &ast[id] {
      Syntax::TypeKeyword(k) => self.write(k.kind.as_str()),
      Syntax::TypeLiteral(l) => self.write(&l.raw),
      Syntax::TypeThis(_) => self.write("this"),
      Syntax::TypeRef(r) => {
        self.emit_entity(r.name)?;
        self.emit_type_args(&r.type_args)?;
      }
      Syntax::TypeArray(a) => {
        self.emit_type_min(a.elem, TypePrec::Postfix)?;
        self.write("[]");
      }
      Syntax::TypeIndexedAccess(a) => {
        self.emit_type_min(a.object, TypePrec::Postfix)?;
        self.write("[");
        self.emit_type(a.index)?;
        self.write("]");
      }
      Syntax::TypeUnion(u) => {
        for (i, t) in u.types.iter().enumerate() {
          if i > 0 {
            self.write(" | ");
          }
          self.emit_type_min(*t, TypePrec::Intersection)?;
        }
      }
      Syntax::TypeIntersection(u) => {
        for (i, t) in u.types.iter().enumerate() {
          if i > 0 {
            self.write(" & ");
          }
          self.emit_type_min(*t, TypePrec::Unary)?;
        }
      }
      Syntax::TypeOperator(o) => {
        self.write(match o.op {
          TypeOperatorKind::Keyof => "keyof ",
          TypeOperatorKind::Readonly => "readonly ",
          TypeOperatorKind::Unique => "unique ",
        });
        self.emit_type_min(o.ty, TypePrec::Unary)?;
      }
      Syntax::TypeInfer(i) => {
        self.write("infer ");
        self.emit_type_param(i.param)?;
      }
      Syntax::TypeParen(p) => {
        self.write("(");
        self.emit_type(p.ty)?;
        self.write(")");
      }
      Syntax::TypeConditional(c) => {
        self.emit_type_min(c.check, TypePrec::Union)?;
        self.write(" extends ");
        self.emit_type_min(c.extends, TypePrec::Union)?;
        self.write(" ? ");
        self.emit_type(c.true_type)?;
        self.write(" : ");
        self.emit_type(c.false_type)?;
      }
      Syntax::TypeFunction(f) => {
        self.emit_type_params(&f.type_params)?;
        self.emit_params(&f.params)?;
        self.write(" => ");
        self.emit_type(f.return_type)?;
      }
      Syntax::TypeConstructor(f) => {
        if f.is_abstract {
          self.write("abstract ");
        }
        self.write("new ");
        self.emit_type_params(&f.type_params)?;
        self.emit_params(&f.params)?;
        self.write(" => ");
        self.emit_type(f.return_type)?;
      }
      Syntax::TypePredicate(p) => {
        if p.asserts {
          self.write("asserts ");
        }
        self.write(&p.param);
        if let Some(ty) = p.ty {
          self.write(" is ");
          self.emit_type(ty)?;
        }
      }
      Syntax::TypeQuery(q) => {
        self.write("typeof ");
        self.emit_entity(q.expr_name)?;
        self.emit_type_args(&q.type_args)?;
      }
      Syntax::TypeImport(i) => {
        if i.is_typeof {
          self.write("typeof ");
        }
        self.write("import(");
        self.write(&quote(&i.source));
        self.write(")");
        if let Some(q) = i.qualifier {
          self.write(".");
          self.emit_entity(q)?;
        }
        self.emit_type_args(&i.type_args)?;
      }
      Syntax::TypeTemplate(t) => {
        self.write("`");
        for (i, quasi) in t.quasis.iter().enumerate() {
          // Template text is written verbatim, line breaks included.
          self.write(quasi);
          if let Some(ty) = t.types.get(i) {
            self.write("${");
            self.emit_type(*ty)?;
            self.write("}");
          }
        }
        self.write("`");
      }
      Syntax::TypeTuple(t) => {
        self.write("[");
        self.comma_separated(&t.elems, |p, e| p.emit_type(e))?;
        self.write("]");
      }
      Syntax::TypeTupleElement(e) => {
        if e.rest {
          self.write("...");
        }
        match &e.label {
          Some(label) => {
            self.write(label);
            if e.optional {
              self.write("?");
            }
            self.write(": ");
            self.emit_type(e.ty)?;
          }
          None => {
            // `(A | B)?` and `(() => void)[]` need their operand parenthesized.
            let min = if e.optional {
              TypePrec::Postfix
            } else {
              TypePrec::ArrowOrConditional
            };
            self.emit_type_min(e.ty, min)?;
            if e.optional {
              self.write("?");
            }
          }
        };
      }
      Syntax::TypeObject(o) => {
        if o.members.is_empty() {
          self.write("{}");
        } else {
          self.write("{");
          self.emit_members(&o.members, false)?;
          self.write("}");
        }
      }
      Syntax::TypeMapped(m) => {
        self.write("{ ");
        self.write(modifier_prefix(m.readonly));
        if m.readonly.is_some() {
          self.write("readonly ");
        }
        self.write("[");
        let Syntax::TypeParam(param) = &ast[m.param] else {
          return Err(EmitError::unsupported("mapped type parameter"));
        };
        self.emit_expr(param.name)?;
        self.write(" in ");
        if let Some(c) = param.constraint {
          self.emit_type(c)?;
        }
        if let Some(n) = m.name_type {
          self.write(" as ");
          self.emit_type(n)?;
        }
        self.write("]");
        if m.optional.is_some() {
          self.write(modifier_prefix(m.optional));
          self.write("?");
        }
        if let Some(ty) = m.ty {
          self.write(": ");
          self.emit_type(ty)?;
        }
        self.write("; }");
      }
      _ => return Err(EmitError::unsupported("type")),
    };
    Ok(())
  }
}

fn modifier_prefix(m: Option<MappedModifier>) -> &'static str {
  match m {
    Some(MappedModifier::Plus) => "+",
    Some(MappedModifier::Minus) => "-",
    _ => "",
  }
}
