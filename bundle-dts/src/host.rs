//! The contract between this crate and the module bundler hosting it.
//!
//! The host owns graph walking, chunking, tree-shaking and renaming. It calls the [`Plugin`]
//! hooks at the usual points of a build and exposes a [`HostContext`] back to them.

use crate::error::DtsResult;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedId {
  pub id: String,
  pub external: bool,
}

impl ResolvedId {
  pub fn internal(id: impl Into<String>) -> ResolvedId {
    ResolvedId {
      id: id.into(),
      external: false,
    }
  }

  pub fn external(id: impl Into<String>) -> ResolvedId {
    ResolvedId {
      id: id.into(),
      external: true,
    }
  }
}

/// Module text returned by `load` and `transform`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadOutput {
  pub code: String,
  pub map: Option<String>,
}

/// A chunk the plugin asks the host to create, rooted at module `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedChunk {
  pub id: String,
  pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct ChunkInfo {
  pub file_name: String,
  pub name: String,
  pub is_entry: bool,
  pub facade_module_id: Option<String>,
  pub module_ids: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
  Chunk,
  Asset,
}

#[derive(Clone, Debug)]
pub struct OutputFile {
  pub kind: OutputKind,
  pub code: String,
}

/// Generated files keyed by file name.
pub type OutputBundle = BTreeMap<String, OutputFile>;

/// Services the host offers to hooks while a build runs.
pub trait HostContext {
  /// Resolves `specifier` with the host's own resolver and every other plugin, skipping this
  /// one.
  fn resolve(&self, specifier: &str, importer: &str) -> Option<ResolvedId>;
  /// Loads and transforms `id`, returning once its `load` and `transform` hooks have run.
  fn load(&self, id: &str) -> DtsResult<()>;
  fn emit_chunk(&self, chunk: EmittedChunk);
  fn is_entry(&self, id: &str) -> bool;
  /// The name the host gave the entry chunk for `id`.
  fn entry_name(&self, id: &str) -> Option<String>;
  fn warn(&self, message: &str);
}

/// Build hooks, called by the host. Hooks take `&self` so a hook may re-enter the plugin
/// through [`HostContext::load`].
pub trait Plugin {
  fn name(&self) -> &'static str;

  fn build_start(&self, _ctx: &dyn HostContext) -> DtsResult<()> {
    Ok(())
  }

  fn resolve_id(
    &self,
    _ctx: &dyn HostContext,
    _specifier: &str,
    _importer: Option<&str>,
  ) -> DtsResult<Option<ResolvedId>> {
    Ok(None)
  }

  fn load(&self, _ctx: &dyn HostContext, _id: &str) -> DtsResult<Option<LoadOutput>> {
    Ok(None)
  }

  fn transform(
    &self,
    _ctx: &dyn HostContext,
    _code: &str,
    _id: &str,
  ) -> DtsResult<Option<LoadOutput>> {
    Ok(None)
  }

  fn render_chunk(
    &self,
    _ctx: &dyn HostContext,
    _code: &str,
    _chunk: &ChunkInfo,
  ) -> DtsResult<Option<String>> {
    Ok(None)
  }

  fn generate_bundle(&self, _ctx: &dyn HostContext, _bundle: &mut OutputBundle) -> DtsResult<()> {
    Ok(())
  }

  fn build_end(&self, _ctx: &dyn HostContext) -> DtsResult<()> {
    Ok(())
  }

  fn watch_change(&self, _id: &str) {}

  /// Rewrites the host's entry file-name pattern for `chunk`; `None` keeps the pattern.
  fn entry_file_name(&self, _chunk: &ChunkInfo, _pattern: &str) -> Option<String> {
    None
  }

  fn chunk_file_name(&self, _chunk: &ChunkInfo, _pattern: &str) -> Option<String> {
    None
  }
}
