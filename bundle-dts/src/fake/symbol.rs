use parse_dts::ast::NodeId;

/// How a dependency's rendered reference is written back into the declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepEdit {
  /// Overwrite the reference node with the rendered entity name.
  Replace,
  /// The reference was an `import("m").A` type, rewritten to a namespace import. The node is
  /// swapped for a type reference (or `typeof` query) to the rendered entity.
  ImportType {
    is_typeof: bool,
    type_args: Option<Vec<NodeId>>,
  },
}

#[derive(Clone, Debug)]
pub struct Dependency {
  /// Reference node in the declaration arena.
  pub node: NodeId,
  pub edit: DepEdit,
  /// Dotted entity name written into the synthetic code.
  pub entity: Vec<String>,
  /// The reference sits in an expression (a computed key or an initializer), so a rendered
  /// dotted name is written back as a member chain rather than a qualified name.
  pub in_expression: bool,
}

/// Type parameters of one declaration that share a name, renamed together.
#[derive(Clone, Debug)]
pub struct TypeParamGroup {
  pub name: String,
  /// Every identifier naming or referencing the parameter.
  pub idents: Vec<NodeId>,
}

/// One top-level declaration, represented in the synthetic code by a tuple variable.
#[derive(Clone, Debug)]
pub struct Symbol {
  pub decl: NodeId,
  /// Identifier nodes of the names the declaration introduces, in order. Empty for
  /// declarations kept only for their side effects.
  pub bindings: Vec<NodeId>,
  pub deps: Vec<Dependency>,
  pub type_params: Vec<TypeParamGroup>,
  /// Declaration module the symbol came from.
  pub module: String,
}
