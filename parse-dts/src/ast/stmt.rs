use super::NodeId;

/// Flags shared by every declaration statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeclFlags {
  pub export: bool,
  /// `export default <declaration>`.
  pub default: bool,
  pub declare: bool,
}

#[derive(Clone, Debug)]
pub struct ClassDecl {
  pub flags: DeclFlags,
  pub is_abstract: bool,
  pub name: Option<NodeId>,
  pub type_params: Option<Vec<NodeId>>,
  pub extends: Option<NodeId>,
  pub implements: Vec<NodeId>,
  pub members: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct EmptyStmt {}

#[derive(Clone, Debug)]
pub struct EnumDecl {
  pub flags: DeclFlags,
  pub is_const: bool,
  pub name: NodeId,
  pub members: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct EnumMember {
  pub key: super::class_or_object::PropKey,
  pub init: Option<NodeId>,
}

/// `export * from "m"` or `export * as ns from "m"`.
#[derive(Clone, Debug)]
pub struct ExportAll {
  pub type_only: bool,
  pub alias: Option<String>,
  pub source: String,
}

/// `export as namespace Lib;`
#[derive(Clone, Debug)]
pub struct ExportAsNamespace {
  pub name: String,
}

/// `export = expr;`
#[derive(Clone, Debug)]
pub struct ExportAssign {
  pub expr: NodeId,
}

/// `export default expr;` where `expr` is not a declaration.
#[derive(Clone, Debug)]
pub struct ExportDefaultExpr {
  pub expr: NodeId,
}

/// `export { a, b as c } [from "m"];`
#[derive(Clone, Debug)]
pub struct ExportNamed {
  pub type_only: bool,
  pub specifiers: Vec<NodeId>,
  pub source: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ExportSpecifier {
  pub type_only: bool,
  /// An [`Ident`](super::Ident); for re-exports this names the other module's export.
  pub local: NodeId,
  pub exported: String,
}

#[derive(Clone, Debug)]
pub struct ExprStmt {
  pub expr: NodeId,
}

#[derive(Clone, Debug)]
pub struct FuncDecl {
  pub flags: DeclFlags,
  pub is_async: bool,
  pub generator: bool,
  pub name: Option<NodeId>,
  pub type_params: Option<Vec<NodeId>>,
  pub params: Vec<NodeId>,
  pub return_type: Option<NodeId>,
  /// Raw body text including braces; declarations never have one after normalization.
  pub body: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Heritage {
  /// An entity name ([`Ident`](super::Ident) or [`QualifiedName`](super::QualifiedName)).
  pub expr: NodeId,
  pub type_args: Option<Vec<NodeId>>,
}

#[derive(Clone, Debug)]
pub struct ImportDecl {
  pub type_only: bool,
  pub default: Option<NodeId>,
  pub namespace: Option<NodeId>,
  /// `None` when there is no `{ }` clause; `import "m"` has every clause empty.
  pub named: Option<Vec<NodeId>>,
  pub source: String,
}

impl ImportDecl {
  pub fn is_side_effect_only(&self) -> bool {
    self.default.is_none() && self.namespace.is_none() && self.named.is_none()
  }
}

#[derive(Clone, Debug)]
pub struct ImportSpecifier {
  pub type_only: bool,
  pub imported: String,
  pub local: NodeId,
}

#[derive(Clone, Debug)]
pub enum ImportEqualsTarget {
  Require(String),
  /// An entity name.
  Entity(NodeId),
}

/// `[export] import x = require("m")` or `import x = a.b`.
#[derive(Clone, Debug)]
pub struct ImportEquals {
  pub export: bool,
  pub type_only: bool,
  pub name: NodeId,
  pub target: ImportEqualsTarget,
}

#[derive(Clone, Debug)]
pub struct InterfaceDecl {
  pub flags: DeclFlags,
  pub name: NodeId,
  pub type_params: Option<Vec<NodeId>>,
  pub extends: Vec<NodeId>,
  pub members: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub enum ModuleName {
  Ident(NodeId),
  /// `declare module "m"`; holds the unquoted specifier.
  String(String),
  Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKeyword {
  Namespace,
  Module,
  Global,
}

#[derive(Clone, Debug)]
pub struct ModuleDecl {
  pub flags: DeclFlags,
  pub keyword: ModuleKeyword,
  pub name: ModuleName,
  /// `None` for shorthand ambient modules (`declare module "m";`).
  pub body: Option<Vec<NodeId>>,
  /// Set on the inner declaration of `namespace A.B {}` so it prints as part of its parent's name.
  pub dotted: bool,
}

impl ModuleDecl {
  /// Namespaces bind a name; string-named modules and `global` augment instead.
  pub fn is_augmentation(&self) -> bool {
    !matches!(self.name, ModuleName::Ident(_))
  }
}

/// A statement kept as raw source text because only its presence matters.
#[derive(Clone, Debug)]
pub struct OpaqueStmt {
  pub text: String,
}

#[derive(Clone, Debug)]
pub struct Param {
  /// Raw binding text: an identifier, `this`, or a destructuring pattern.
  pub name: String,
  pub modifiers: super::class_or_object::Modifiers,
  pub optional: bool,
  pub rest: bool,
  pub type_annotation: Option<NodeId>,
  pub init: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub struct TypeAliasDecl {
  pub flags: DeclFlags,
  pub name: NodeId,
  pub type_params: Option<Vec<NodeId>>,
  pub ty: NodeId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variance {
  In,
  Out,
  InOut,
}

#[derive(Clone, Debug)]
pub struct TypeParam {
  pub name: NodeId,
  pub is_const: bool,
  pub variance: Option<Variance>,
  pub constraint: Option<NodeId>,
  pub default: Option<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
  Var,
  Let,
  Const,
}

#[derive(Clone, Debug)]
pub struct VarDecl {
  pub flags: DeclFlags,
  pub kind: VarKind,
  pub declarators: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct VarDeclarator {
  pub name: NodeId,
  pub definite: bool,
  pub type_annotation: Option<NodeId>,
  pub init: Option<NodeId>,
}
