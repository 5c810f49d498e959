use super::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accessibility {
  Public,
  Protected,
  Private,
}

/// Modifier keywords that may precede a class member or constructor parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
  pub accessibility: Option<Accessibility>,
  pub is_static: bool,
  pub is_abstract: bool,
  pub is_override: bool,
  pub readonly: bool,
  pub declare: bool,
  pub accessor: bool,
}

#[derive(Clone, Debug)]
pub enum PropKey {
  Ident(String),
  /// Raw literal text including quotes.
  String(String),
  /// Raw numeric literal text.
  Number(String),
  Private(String),
  /// `[expr]`
  Computed(NodeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
  Method,
  Getter,
  Setter,
}

/// `(a: A): R` inside an object type.
#[derive(Clone, Debug)]
pub struct CallSignature {
  pub type_params: Option<Vec<NodeId>>,
  pub params: Vec<NodeId>,
  pub return_type: Option<NodeId>,
}

/// `new (a: A): R` inside an object type.
#[derive(Clone, Debug)]
pub struct ConstructSignature {
  pub type_params: Option<Vec<NodeId>>,
  pub params: Vec<NodeId>,
  pub return_type: Option<NodeId>,
}

/// `constructor(a: A)` inside a class.
#[derive(Clone, Debug)]
pub struct ConstructorMember {
  pub modifiers: Modifiers,
  pub params: Vec<NodeId>,
  pub body: Option<String>,
}

/// `[key: string]: T`
#[derive(Clone, Debug)]
pub struct IndexSignature {
  pub modifiers: Modifiers,
  pub param_name: String,
  pub param_type: NodeId,
  pub ty: NodeId,
}

/// Methods, getters and setters of classes and object types.
#[derive(Clone, Debug)]
pub struct MethodMember {
  pub modifiers: Modifiers,
  pub kind: MethodKind,
  pub key: PropKey,
  pub optional: bool,
  pub is_async: bool,
  pub generator: bool,
  pub type_params: Option<Vec<NodeId>>,
  pub params: Vec<NodeId>,
  pub return_type: Option<NodeId>,
  pub body: Option<String>,
}

/// Properties of classes and object types.
#[derive(Clone, Debug)]
pub struct PropertyMember {
  pub modifiers: Modifiers,
  pub key: PropKey,
  pub optional: bool,
  pub definite: bool,
  pub ty: Option<NodeId>,
  pub init: Option<NodeId>,
}
