//! Arena-allocated syntax tree.
//!
//! Every node lives in an [`Ast`] and is addressed by a [`NodeId`]. Nodes reference their
//! children by handle, never by pointer, so a node can be rewritten in place with
//! [`Ast::replace`] and every holder of its handle observes the new syntax.

use crate::lex::Comment;
use crate::loc::Loc;
use core::fmt;
use core::ops::Index;
use core::ops::IndexMut;
use derive_more::From;

pub mod class_or_object;
pub mod expr;
pub mod stmt;
pub mod type_expr;
pub mod visit;

use class_or_object::*;
use expr::*;
use stmt::*;
use type_expr::*;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Debug for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Clone, Debug)]
pub struct Node {
  pub loc: Loc,
  pub stx: Syntax,
  // Only statements and members carry comments; they are printed before the node.
  pub leading_comments: Vec<Comment>,
}

#[derive(Clone, Debug, From)]
pub enum Syntax {
  // Names.
  Ident(Ident),
  QualifiedName(QualifiedName),

  // Statements.
  ClassDecl(ClassDecl),
  EmptyStmt(EmptyStmt),
  EnumDecl(EnumDecl),
  ExportAll(ExportAll),
  ExportAsNamespace(ExportAsNamespace),
  ExportAssign(ExportAssign),
  ExportDefaultExpr(ExportDefaultExpr),
  ExportNamed(ExportNamed),
  ExprStmt(ExprStmt),
  FuncDecl(FuncDecl),
  ImportDecl(ImportDecl),
  ImportEquals(ImportEquals),
  InterfaceDecl(InterfaceDecl),
  ModuleDecl(ModuleDecl),
  OpaqueStmt(OpaqueStmt),
  TypeAliasDecl(TypeAliasDecl),
  VarDecl(VarDecl),

  // Parts of declarations.
  EnumMember(EnumMember),
  ExportSpecifier(ExportSpecifier),
  Heritage(Heritage),
  ImportSpecifier(ImportSpecifier),
  Param(Param),
  TypeParam(TypeParam),
  VarDeclarator(VarDeclarator),

  // Class and object type members.
  CallSignature(CallSignature),
  ConstructSignature(ConstructSignature),
  ConstructorMember(ConstructorMember),
  IndexSignature(IndexSignature),
  MethodMember(MethodMember),
  PropertyMember(PropertyMember),

  // Types.
  TypeArray(TypeArray),
  TypeConditional(TypeConditional),
  TypeConstructor(TypeConstructor),
  TypeFunction(TypeFunction),
  TypeImport(TypeImport),
  TypeIndexedAccess(TypeIndexedAccess),
  TypeInfer(TypeInfer),
  TypeIntersection(TypeIntersection),
  TypeKeyword(TypeKeyword),
  TypeLiteral(TypeLiteral),
  TypeMapped(TypeMapped),
  TypeObject(TypeObject),
  TypeOperator(TypeOperator),
  TypeParen(TypeParen),
  TypePredicate(TypePredicate),
  TypeQuery(TypeQuery),
  TypeRef(TypeRef),
  TypeTemplate(TypeTemplate),
  TypeThis(TypeThis),
  TypeTuple(TypeTuple),
  TypeTupleElement(TypeTupleElement),
  TypeUnion(TypeUnion),

  // Expressions.
  ArrayExpr(ArrayExpr),
  ArrowFunc(ArrowFunc),
  AssignExpr(AssignExpr),
  BinaryExpr(BinaryExpr),
  CallExpr(CallExpr),
  ComputedMemberExpr(ComputedMemberExpr),
  CondExpr(CondExpr),
  LitExpr(LitExpr),
  MemberExpr(MemberExpr),
  NewExpr(NewExpr),
  ObjectExpr(ObjectExpr),
  ObjectProp(ObjectProp),
  OpaqueExpr(OpaqueExpr),
  ParenExpr(ParenExpr),
  SpreadExpr(SpreadExpr),
  ThisExpr(ThisExpr),
  UnaryExpr(UnaryExpr),
}

/// Identifier in any position: binding, reference, or the head of an entity name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
  pub name: String,
}

/// `left.right` in type positions (`ns.Foo`, `typeof a.b`).
#[derive(Clone, Debug)]
pub struct QualifiedName {
  pub left: NodeId,
  pub right: String,
}

/// The top level of one parsed source text.
#[derive(Clone, Debug, Default)]
pub struct Program {
  pub body: Vec<NodeId>,
  /// Every comment in the source, in order, including those attached to nodes.
  pub comments: Vec<Comment>,
}

#[derive(Default, Debug, Clone)]
pub struct Ast {
  nodes: Vec<Node>,
}

impl Ast {
  pub fn new() -> Ast {
    Ast::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub(crate) fn truncate(&mut self, len: usize) {
    self.nodes.truncate(len);
  }

  pub fn alloc(&mut self, loc: Loc, stx: impl Into<Syntax>) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.nodes.push(Node {
      loc,
      stx: stx.into(),
      leading_comments: Vec::new(),
    });
    id
  }

  /// Allocates a node with no source position.
  pub fn synthetic(&mut self, stx: impl Into<Syntax>) -> NodeId {
    self.alloc(Loc::SYNTHETIC, stx)
  }

  pub fn ident(&mut self, name: impl Into<String>) -> NodeId {
    self.synthetic(Ident { name: name.into() })
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.index()]
  }

  pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
    &mut self.nodes[id.index()]
  }

  /// Overwrites the syntax stored in `id`'s slot, keeping its location and comments.
  pub fn replace(&mut self, id: NodeId, stx: impl Into<Syntax>) -> Syntax {
    core::mem::replace(&mut self.nodes[id.index()].stx, stx.into())
  }

  pub fn ident_name(&self, id: NodeId) -> Option<&str> {
    match &self[id] {
      Syntax::Ident(ident) => Some(&ident.name),
      _ => None,
    }
  }

  /// Sets the name of an identifier node; other nodes are left untouched.
  pub fn rename_ident(&mut self, id: NodeId, name: &str) -> bool {
    match &mut self[id] {
      Syntax::Ident(ident) => {
        if ident.name != name {
          ident.name = name.to_string();
        }
        true
      }
      _ => false,
    }
  }

  /// Leftmost identifier of an entity name or member chain (`a` in `a.b.c`).
  pub fn root_ident(&self, id: NodeId) -> Option<NodeId> {
    match &self[id] {
      Syntax::Ident(_) => Some(id),
      Syntax::QualifiedName(q) => self.root_ident(q.left),
      Syntax::MemberExpr(m) => self.root_ident(m.object),
      _ => None,
    }
  }

  /// Dotted text of an entity name or member chain, if it is one.
  pub fn entity_text(&self, id: NodeId) -> Option<String> {
    match &self[id] {
      Syntax::Ident(ident) => Some(ident.name.clone()),
      Syntax::ThisExpr(_) => Some("this".into()),
      Syntax::QualifiedName(q) => Some(format!("{}.{}", self.entity_text(q.left)?, q.right)),
      Syntax::MemberExpr(m) if !m.optional => {
        Some(format!("{}.{}", self.entity_text(m.object)?, m.property))
      }
      _ => None,
    }
  }

  /// Copies a member-expression chain (`a.b.c`) from `from` into this arena as a type entity
  /// name. Returns `None` for any other expression shape.
  pub fn import_entity(&mut self, from: &Ast, expr: NodeId) -> Option<NodeId> {
    match &from[expr] {
      Syntax::Ident(ident) => Some(self.ident(ident.name.clone())),
      Syntax::MemberExpr(m) if !m.optional => {
        let left = self.import_entity(from, m.object)?;
        Some(self.synthetic(QualifiedName {
          left,
          right: m.property.clone(),
        }))
      }
      Syntax::ParenExpr(p) => self.import_entity(from, p.expr),
      _ => None,
    }
  }

  /// Builds `a.b.c` as a member expression chain from dotted `segments`.
  pub fn member_chain(&mut self, segments: &[&str]) -> Option<NodeId> {
    let (first, rest) = segments.split_first()?;
    let mut object = self.ident(*first);
    for segment in rest {
      object = self.synthetic(MemberExpr {
        object,
        property: segment.to_string(),
        optional: false,
      });
    }
    Some(object)
  }
}

impl Index<NodeId> for Ast {
  type Output = Syntax;

  fn index(&self, id: NodeId) -> &Self::Output {
    &self.nodes[id.index()].stx
  }
}

impl IndexMut<NodeId> for Ast {
  fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
    &mut self.nodes[id.index()].stx
  }
}
