use super::NodeId;

/// `T[]`
#[derive(Clone, Debug)]
pub struct TypeArray {
  pub elem: NodeId,
}

/// `C extends E ? T : F`
#[derive(Clone, Debug)]
pub struct TypeConditional {
  pub check: NodeId,
  pub extends: NodeId,
  pub true_type: NodeId,
  pub false_type: NodeId,
}

/// `[abstract] new <T>(a: A) => R`
#[derive(Clone, Debug)]
pub struct TypeConstructor {
  pub is_abstract: bool,
  pub type_params: Option<Vec<NodeId>>,
  pub params: Vec<NodeId>,
  pub return_type: NodeId,
}

/// `<T>(a: A) => R`
#[derive(Clone, Debug)]
pub struct TypeFunction {
  pub type_params: Option<Vec<NodeId>>,
  pub params: Vec<NodeId>,
  pub return_type: NodeId,
}

/// `[typeof] import("m").Qualifier<Args>`
#[derive(Clone, Debug)]
pub struct TypeImport {
  pub is_typeof: bool,
  /// Unquoted module specifier.
  pub source: String,
  pub qualifier: Option<NodeId>,
  pub type_args: Option<Vec<NodeId>>,
}

/// `T[K]`
#[derive(Clone, Debug)]
pub struct TypeIndexedAccess {
  pub object: NodeId,
  pub index: NodeId,
}

/// `infer U [extends C]`; `param` is a [`TypeParam`](super::stmt::TypeParam).
#[derive(Clone, Debug)]
pub struct TypeInfer {
  pub param: NodeId,
}

#[derive(Clone, Debug)]
pub struct TypeIntersection {
  pub types: Vec<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKeywordKind {
  Any,
  Bigint,
  Boolean,
  Intrinsic,
  Never,
  Null,
  Number,
  Object,
  String,
  Symbol,
  Undefined,
  Unknown,
  Void,
}

impl TypeKeywordKind {
  pub fn from_name(name: &str) -> Option<TypeKeywordKind> {
    Some(match name {
      "any" => TypeKeywordKind::Any,
      "bigint" => TypeKeywordKind::Bigint,
      "boolean" => TypeKeywordKind::Boolean,
      "intrinsic" => TypeKeywordKind::Intrinsic,
      "never" => TypeKeywordKind::Never,
      "null" => TypeKeywordKind::Null,
      "number" => TypeKeywordKind::Number,
      "object" => TypeKeywordKind::Object,
      "string" => TypeKeywordKind::String,
      "symbol" => TypeKeywordKind::Symbol,
      "undefined" => TypeKeywordKind::Undefined,
      "unknown" => TypeKeywordKind::Unknown,
      "void" => TypeKeywordKind::Void,
      _ => return None,
    })
  }

  pub fn as_str(self) -> &'static str {
    match self {
      TypeKeywordKind::Any => "any",
      TypeKeywordKind::Bigint => "bigint",
      TypeKeywordKind::Boolean => "boolean",
      TypeKeywordKind::Intrinsic => "intrinsic",
      TypeKeywordKind::Never => "never",
      TypeKeywordKind::Null => "null",
      TypeKeywordKind::Number => "number",
      TypeKeywordKind::Object => "object",
      TypeKeywordKind::String => "string",
      TypeKeywordKind::Symbol => "symbol",
      TypeKeywordKind::Undefined => "undefined",
      TypeKeywordKind::Unknown => "unknown",
      TypeKeywordKind::Void => "void",
    }
  }
}

#[derive(Clone, Debug)]
pub struct TypeKeyword {
  pub kind: TypeKeywordKind,
}

/// Literal types; `raw` is the source text (`"a"`, `-1`, `10n`, `true`, `` `x` ``).
#[derive(Clone, Debug)]
pub struct TypeLiteral {
  pub raw: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappedModifier {
  /// `readonly` / `?`
  Present,
  Plus,
  Minus,
}

/// `{ [readonly] [K in C as N][?]: T }`; `param` is a [`TypeParam`](super::stmt::TypeParam)
/// whose constraint is `C`.
#[derive(Clone, Debug)]
pub struct TypeMapped {
  pub readonly: Option<MappedModifier>,
  pub param: NodeId,
  pub name_type: Option<NodeId>,
  pub optional: Option<MappedModifier>,
  pub ty: Option<NodeId>,
}

/// `{ ... }`
#[derive(Clone, Debug)]
pub struct TypeObject {
  pub members: Vec<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeOperatorKind {
  Keyof,
  Readonly,
  Unique,
}

#[derive(Clone, Debug)]
pub struct TypeOperator {
  pub op: TypeOperatorKind,
  pub ty: NodeId,
}

#[derive(Clone, Debug)]
pub struct TypeParen {
  pub ty: NodeId,
}

/// `x is T`, `asserts x`, `asserts this is T`
#[derive(Clone, Debug)]
pub struct TypePredicate {
  pub asserts: bool,
  pub param: String,
  pub ty: Option<NodeId>,
}

/// `typeof a.b<T>`
#[derive(Clone, Debug)]
pub struct TypeQuery {
  pub expr_name: NodeId,
  pub type_args: Option<Vec<NodeId>>,
}

/// `A.B<T>`
#[derive(Clone, Debug)]
pub struct TypeRef {
  pub name: NodeId,
  pub type_args: Option<Vec<NodeId>>,
}

/// `` `a${T}b` ``; `quasis` holds the raw text between substitutions and has one more element
/// than `types`.
#[derive(Clone, Debug)]
pub struct TypeTemplate {
  pub quasis: Vec<String>,
  pub types: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct TypeThis {}

#[derive(Clone, Debug)]
pub struct TypeTuple {
  pub elems: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct TypeTupleElement {
  pub label: Option<String>,
  pub optional: bool,
  pub rest: bool,
  pub ty: NodeId,
}

#[derive(Clone, Debug)]
pub struct TypeUnion {
  pub types: Vec<NodeId>,
}
