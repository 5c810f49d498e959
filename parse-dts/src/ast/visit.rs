use super::class_or_object::PropKey;
use super::expr::ArrowBody;
use super::stmt::ImportEqualsTarget;
use super::stmt::ModuleName;
use super::Ast;
use super::NodeId;
use super::Syntax;

fn push_opt(out: &mut Vec<NodeId>, id: Option<NodeId>) {
  out.extend(id);
}

fn push_list(out: &mut Vec<NodeId>, ids: &Option<Vec<NodeId>>) {
  if let Some(ids) = ids {
    out.extend(ids.iter().copied());
  }
}

fn push_key(out: &mut Vec<NodeId>, key: &PropKey) {
  if let PropKey::Computed(expr) = key {
    out.push(*expr);
  }
}

impl Ast {
  /// Direct children of `id` in source order.
  pub fn children(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let o = &mut out;
    match &self[id] {
      Syntax::Ident(_)
      | Syntax::EmptyStmt(_)
      | Syntax::ExportAll(_)
      | Syntax::ExportAsNamespace(_)
      | Syntax::OpaqueStmt(_)
      | Syntax::TypeKeyword(_)
      | Syntax::TypeLiteral(_)
      | Syntax::TypeThis(_)
      | Syntax::LitExpr(_)
      | Syntax::OpaqueExpr(_)
      | Syntax::ThisExpr(_) => {}
      Syntax::QualifiedName(n) => o.push(n.left),

      Syntax::ClassDecl(n) => {
        push_opt(o, n.name);
        push_list(o, &n.type_params);
        push_opt(o, n.extends);
        o.extend(n.implements.iter().copied());
        o.extend(n.members.iter().copied());
      }
      Syntax::EnumDecl(n) => {
        o.push(n.name);
        o.extend(n.members.iter().copied());
      }
      Syntax::ExportAssign(n) => o.push(n.expr),
      Syntax::ExportDefaultExpr(n) => o.push(n.expr),
      Syntax::ExportNamed(n) => o.extend(n.specifiers.iter().copied()),
      Syntax::ExprStmt(n) => o.push(n.expr),
      Syntax::FuncDecl(n) => {
        push_opt(o, n.name);
        push_list(o, &n.type_params);
        o.extend(n.params.iter().copied());
        push_opt(o, n.return_type);
      }
      Syntax::ImportDecl(n) => {
        push_opt(o, n.default);
        push_opt(o, n.namespace);
        push_list(o, &n.named);
      }
      Syntax::ImportEquals(n) => {
        o.push(n.name);
        if let ImportEqualsTarget::Entity(entity) = &n.target {
          o.push(*entity);
        }
      }
      Syntax::InterfaceDecl(n) => {
        o.push(n.name);
        push_list(o, &n.type_params);
        o.extend(n.extends.iter().copied());
        o.extend(n.members.iter().copied());
      }
      Syntax::ModuleDecl(n) => {
        if let ModuleName::Ident(name) = &n.name {
          o.push(*name);
        }
        push_list(o, &n.body);
      }
      Syntax::TypeAliasDecl(n) => {
        o.push(n.name);
        push_list(o, &n.type_params);
        o.push(n.ty);
      }
      Syntax::VarDecl(n) => o.extend(n.declarators.iter().copied()),

      Syntax::EnumMember(n) => {
        push_key(o, &n.key);
        push_opt(o, n.init);
      }
      Syntax::ExportSpecifier(n) => o.push(n.local),
      Syntax::Heritage(n) => {
        o.push(n.expr);
        push_list(o, &n.type_args);
      }
      Syntax::ImportSpecifier(n) => o.push(n.local),
      Syntax::Param(n) => {
        push_opt(o, n.type_annotation);
        push_opt(o, n.init);
      }
      Syntax::TypeParam(n) => {
        o.push(n.name);
        push_opt(o, n.constraint);
        push_opt(o, n.default);
      }
      Syntax::VarDeclarator(n) => {
        o.push(n.name);
        push_opt(o, n.type_annotation);
        push_opt(o, n.init);
      }

      Syntax::CallSignature(n) => {
        push_list(o, &n.type_params);
        o.extend(n.params.iter().copied());
        push_opt(o, n.return_type);
      }
      Syntax::ConstructSignature(n) => {
        push_list(o, &n.type_params);
        o.extend(n.params.iter().copied());
        push_opt(o, n.return_type);
      }
      Syntax::ConstructorMember(n) => o.extend(n.params.iter().copied()),
      Syntax::IndexSignature(n) => {
        o.push(n.param_type);
        o.push(n.ty);
      }
      Syntax::MethodMember(n) => {
        push_key(o, &n.key);
        push_list(o, &n.type_params);
        o.extend(n.params.iter().copied());
        push_opt(o, n.return_type);
      }
      Syntax::PropertyMember(n) => {
        push_key(o, &n.key);
        push_opt(o, n.ty);
        push_opt(o, n.init);
      }

      Syntax::TypeArray(n) => o.push(n.elem),
      Syntax::TypeConditional(n) => {
        o.extend([n.check, n.extends, n.true_type, n.false_type]);
      }
      Syntax::TypeConstructor(n) => {
        push_list(o, &n.type_params);
        o.extend(n.params.iter().copied());
        o.push(n.return_type);
      }
      Syntax::TypeFunction(n) => {
        push_list(o, &n.type_params);
        o.extend(n.params.iter().copied());
        o.push(n.return_type);
      }
      Syntax::TypeImport(n) => {
        push_opt(o, n.qualifier);
        push_list(o, &n.type_args);
      }
      Syntax::TypeIndexedAccess(n) => o.extend([n.object, n.index]),
      Syntax::TypeInfer(n) => o.push(n.param),
      Syntax::TypeIntersection(n) => o.extend(n.types.iter().copied()),
      Syntax::TypeMapped(n) => {
        o.push(n.param);
        push_opt(o, n.name_type);
        push_opt(o, n.ty);
      }
      Syntax::TypeObject(n) => o.extend(n.members.iter().copied()),
      Syntax::TypeOperator(n) => o.push(n.ty),
      Syntax::TypeParen(n) => o.push(n.ty),
      Syntax::TypePredicate(n) => push_opt(o, n.ty),
      Syntax::TypeQuery(n) => {
        o.push(n.expr_name);
        push_list(o, &n.type_args);
      }
      Syntax::TypeRef(n) => {
        o.push(n.name);
        push_list(o, &n.type_args);
      }
      Syntax::TypeTemplate(n) => o.extend(n.types.iter().copied()),
      Syntax::TypeTuple(n) => o.extend(n.elems.iter().copied()),
      Syntax::TypeTupleElement(n) => o.push(n.ty),
      Syntax::TypeUnion(n) => o.extend(n.types.iter().copied()),

      Syntax::ArrayExpr(n) => o.extend(n.elements.iter().flatten().copied()),
      Syntax::ArrowFunc(n) => {
        o.extend(n.params.iter().copied());
        if let ArrowBody::Expr(body) = &n.body {
          o.push(*body);
        }
      }
      Syntax::AssignExpr(n) => o.extend([n.target, n.value]),
      Syntax::BinaryExpr(n) => o.extend([n.left, n.right]),
      Syntax::CallExpr(n) => {
        o.push(n.callee);
        o.extend(n.args.iter().copied());
      }
      Syntax::ComputedMemberExpr(n) => o.extend([n.object, n.member]),
      Syntax::CondExpr(n) => o.extend([n.test, n.consequent, n.alternate]),
      Syntax::MemberExpr(n) => o.push(n.object),
      Syntax::NewExpr(n) => {
        o.push(n.callee);
        o.extend(n.args.iter().copied());
      }
      Syntax::ObjectExpr(n) => o.extend(n.props.iter().copied()),
      Syntax::ObjectProp(n) => {
        push_key(o, &n.key);
        push_opt(o, n.value);
      }
      Syntax::ParenExpr(n) => o.push(n.expr),
      Syntax::SpreadExpr(n) => o.push(n.arg),
      Syntax::UnaryExpr(n) => o.push(n.arg),
    };
    out
  }

  /// Pre-order walk of `id` and its descendants. Returning `false` from `f` skips the
  /// children of that node.
  pub fn walk(&self, id: NodeId, f: &mut impl FnMut(&Ast, NodeId) -> bool) {
    if f(self, id) {
      for child in self.children(id) {
        self.walk(child, f);
      }
    }
  }
}
