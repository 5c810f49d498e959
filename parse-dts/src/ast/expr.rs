use super::class_or_object::PropKey;
use super::NodeId;

/// `[a, , ...b]`; `None` is a hole.
#[derive(Clone, Debug)]
pub struct ArrayExpr {
  pub elements: Vec<Option<NodeId>>,
}

#[derive(Clone, Debug)]
pub enum ArrowBody {
  Expr(NodeId),
  /// Raw block text including braces.
  Block(String),
}

/// `(a, b) => body`; parameters are plain [`Ident`](super::Ident)s.
#[derive(Clone, Debug)]
pub struct ArrowFunc {
  pub params: Vec<NodeId>,
  pub body: ArrowBody,
}

#[derive(Clone, Debug)]
pub struct AssignExpr {
  pub op: String,
  pub target: NodeId,
  pub value: NodeId,
}

#[derive(Clone, Debug)]
pub struct BinaryExpr {
  pub op: String,
  pub left: NodeId,
  pub right: NodeId,
}

#[derive(Clone, Debug)]
pub struct CallExpr {
  pub callee: NodeId,
  pub optional: bool,
  pub args: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ComputedMemberExpr {
  pub object: NodeId,
  pub optional: bool,
  pub member: NodeId,
}

#[derive(Clone, Debug)]
pub struct CondExpr {
  pub test: NodeId,
  pub consequent: NodeId,
  pub alternate: NodeId,
}

/// Number, string, bigint, regex, template, boolean and `null` literals, kept as raw text.
#[derive(Clone, Debug)]
pub struct LitExpr {
  pub raw: String,
}

impl LitExpr {
  pub fn as_number(&self) -> Option<f64> {
    self.raw.replace('_', "").parse().ok()
  }
}

#[derive(Clone, Debug)]
pub struct MemberExpr {
  pub object: NodeId,
  pub optional: bool,
  pub property: String,
}

#[derive(Clone, Debug)]
pub struct NewExpr {
  pub callee: NodeId,
  pub args: Vec<NodeId>,
}

/// `props` holds [`ObjectProp`] and [`SpreadExpr`] nodes.
#[derive(Clone, Debug)]
pub struct ObjectExpr {
  pub props: Vec<NodeId>,
}

/// `key: value`, or shorthand `key` when `value` is `None`.
#[derive(Clone, Debug)]
pub struct ObjectProp {
  pub key: PropKey,
  pub value: Option<NodeId>,
}

/// Function and class expressions, and templates with substitutions, kept as raw text.
#[derive(Clone, Debug)]
pub struct OpaqueExpr {
  pub text: String,
}

#[derive(Clone, Debug)]
pub struct ParenExpr {
  pub expr: NodeId,
}

#[derive(Clone, Debug)]
pub struct SpreadExpr {
  pub arg: NodeId,
}

#[derive(Clone, Debug)]
pub struct ThisExpr {}

#[derive(Clone, Debug)]
pub struct UnaryExpr {
  pub op: String,
  pub arg: NodeId,
}
