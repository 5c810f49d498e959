//! Declaration modules as synthetic value code.
//!
//! A host bundler only links, renames and tree-shakes values. Every top-level declaration of a
//! declaration module is therefore replaced by a tuple variable
//!
//! ```text
//! var Foo = [3, (T) => [Bar, ns.Baz], __dtsSideEffect()];
//! ```
//!
//! holding the symbol's id in the [`BuildRegistry`], a function whose parameters are the
//! declaration's type parameters and whose result lists every outside name it mentions, and an
//! optional call that keeps the tuple alive. The host treats the listed names as ordinary
//! references, so reachability and renames follow the declarations. After rendering, each tuple
//! is turned back into its declaration with the host's names written into it.

use crate::error::DtsError;
use crate::error::DtsResult;
use ahash::HashMap;
use ahash::HashMapExt;
use ahash::HashSet;
use parse_dts::ast::Ast;
use parse_dts::ast::NodeId;
use parse_dts::ast::QualifiedName;

pub mod collect;
pub mod namespace;
pub mod reassemble;
pub mod symbol;
pub mod synthesize;

pub use symbol::DepEdit;
pub use symbol::Dependency;
pub use symbol::Symbol;
pub use symbol::TypeParamGroup;

/// Call keeping a tuple, or a whole module, from being tree-shaken.
pub const SIDE_EFFECT_MARKER: &str = "__dtsSideEffect";

/// A declaration module known to the build.
#[derive(Clone, Debug)]
pub struct DeclModule {
  pub dts_id: String,
  /// The source the declarations are generated from; equal to `dts_id` for `.d.ts` inputs.
  pub source_id: String,
  pub source: String,
  pub is_entry: bool,
}

/// Build-scoped state shared by synthesis and reassembly.
#[derive(Default)]
pub struct BuildRegistry {
  pub(crate) ast: Ast,
  symbols: Vec<Symbol>,
  next_ident: usize,
  references: HashMap<String, Vec<String>>,
  type_only: HashMap<String, HashSet<String>>,
  modules: HashMap<String, DeclModule>,
  by_source: HashMap<String, String>,
}

impl BuildRegistry {
  pub fn new() -> BuildRegistry {
    BuildRegistry {
      ast: Ast::new(),
      symbols: Vec::new(),
      next_ident: 0,
      references: HashMap::new(),
      type_only: HashMap::new(),
      modules: HashMap::new(),
      by_source: HashMap::new(),
    }
  }

  pub fn register(&mut self, module: DeclModule) {
    self
      .by_source
      .insert(module.source_id.clone(), module.dts_id.clone());
    self.modules.insert(module.dts_id.clone(), module);
  }

  pub fn module(&self, dts_id: &str) -> Option<&DeclModule> {
    self.modules.get(dts_id)
  }

  pub fn is_registered(&self, dts_id: &str) -> bool {
    self.modules.contains_key(dts_id)
  }

  pub fn dts_id_of(&self, source_id: &str) -> Option<&str> {
    self.by_source.get(source_id).map(String::as_str)
  }

  /// Number of symbols created during this build.
  pub fn symbol_count(&self) -> usize {
    self.symbols.len()
  }

  pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> u32 {
    self.symbols.push(symbol);
    (self.symbols.len() - 1) as u32
  }

  pub(crate) fn symbol(&self, id: u32) -> DtsResult<&Symbol> {
    self
      .symbols
      .get(id as usize)
      .ok_or(DtsError::UnknownSymbol(id))
  }

  /// A name no declaration module can contain, for synthesized bindings.
  pub(crate) fn fresh_name(&mut self, base: &str) -> String {
    let name = format!("__dts_{base}_{}", self.next_ident);
    self.next_ident += 1;
    name
  }

  /// Triple-slash directives kept from `module`, in source order.
  pub fn references(&self, module: &str) -> &[String] {
    self.references.get(module).map_or(&[], Vec::as_slice)
  }

  pub(crate) fn set_references(&mut self, module: &str, directives: Vec<String>) {
    if directives.is_empty() {
      self.references.remove(module);
    } else {
      self.references.insert(module.to_string(), directives);
    }
  }

  /// Names `module` exported with a `type` modifier.
  pub fn type_only_names(&self, module: &str) -> Option<&HashSet<String>> {
    self.type_only.get(module)
  }

  pub(crate) fn add_type_only(&mut self, module: &str, name: &str) {
    self
      .type_only
      .entry(module.to_string())
      .or_default()
      .insert(name.to_string());
  }

  /// Forgets what an earlier synthesis of `module` recorded.
  pub(crate) fn reset_module(&mut self, module: &str) {
    self.references.remove(module);
    self.type_only.remove(module);
  }
}

/// Builds `a.b.c` as a type entity name.
pub(crate) fn entity_name(ast: &mut Ast, segments: &[String]) -> Option<NodeId> {
  let (first, rest) = segments.split_first()?;
  let mut entity = ast.ident(first.clone());
  for segment in rest {
    entity = ast.synthetic(QualifiedName {
      left: entity,
      right: segment.clone(),
    });
  }
  Some(entity)
}

pub(crate) fn segments(text: &str) -> Vec<String> {
  text.split('.').map(str::to_string).collect()
}
