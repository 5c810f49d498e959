//! Build configuration, deserialized from the host's plugin options.

use crate::error::DtsError;
use crate::error::DtsResult;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use std::path::PathBuf;

/// Which backend turns a source file into declaration text.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OracleMode {
  /// Full type checker over a program.
  #[default]
  Checker,
  /// Fast single-file declaration emit; no type information.
  Isolated,
  /// One project-wide build with a native compiler binary.
  Native,
}

/// Component-file dialects whose script blocks are checked as TypeScript.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DialectKind {
  ScriptBlock,
}

/// Which third-party declarations are bundled instead of left as imports.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum InlinePolicy {
  All(bool),
  /// Package names or glob patterns (`@scope/*`).
  Packages(Vec<String>),
}

impl Default for InlinePolicy {
  fn default() -> Self {
    InlinePolicy::All(false)
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DtsOptions {
  pub cwd: PathBuf,
  /// Project file; defaults to the nearest `tsconfig.json` above each source file.
  pub tsconfig: Option<PathBuf>,
  /// Overrides applied on top of the project's `compilerOptions`.
  pub compiler_options: Map<String, Value>,
  pub mode: OracleMode,
  pub native_binary: Option<PathBuf>,
  pub dialect: Option<DialectKind>,
  pub parallel: bool,
  pub workers: Option<usize>,
  /// Follow project references and build one program over every sub-project.
  pub build: bool,
  pub incremental: bool,
  pub resolve: InlinePolicy,
  pub strict_resolve: bool,
  pub side_effects: bool,
  pub cjs_default: bool,
  pub emit_dts_only: bool,
  pub sourcemap: bool,
  pub banner: Option<String>,
  pub footer: Option<String>,
  pub node_path: PathBuf,
}

impl Default for DtsOptions {
  fn default() -> Self {
    DtsOptions {
      cwd: PathBuf::from("."),
      tsconfig: None,
      compiler_options: Map::new(),
      mode: OracleMode::default(),
      native_binary: None,
      dialect: None,
      parallel: false,
      workers: None,
      build: false,
      incremental: false,
      resolve: InlinePolicy::default(),
      strict_resolve: false,
      side_effects: false,
      cjs_default: false,
      emit_dts_only: false,
      sourcemap: false,
      banner: None,
      footer: None,
      node_path: PathBuf::from("node"),
    }
  }
}

impl DtsOptions {
  /// Parses options from JSON or JSON5 text, then validates them.
  pub fn from_json5(text: &str) -> DtsResult<DtsOptions> {
    let options: DtsOptions = json5::from_str(text)
      .map_err(|err| DtsError::Config(format!("failed to parse plugin options: {err}")))?;
    options.validate()?;
    Ok(options)
  }

  /// Rejects backend combinations that cannot work together. Runs before any file is
  /// processed so a bad configuration aborts the build up front.
  pub fn validate(&self) -> DtsResult<()> {
    if self.dialect.is_some() && self.mode == OracleMode::Isolated {
      return Err(DtsError::UnsupportedConfiguration(
        "component dialects need the checker backend; isolated declaration emit cannot see \
         their script blocks"
          .into(),
      ));
    }
    if self.dialect.is_some() && self.mode == OracleMode::Native {
      return Err(DtsError::UnsupportedConfiguration(
        "the native compiler backend does not support component dialects".into(),
      ));
    }
    if self.parallel && self.mode != OracleMode::Checker {
      return Err(DtsError::UnsupportedConfiguration(
        "parallel checking requires the checker backend".into(),
      ));
    }
    if self.workers == Some(0) {
      return Err(DtsError::UnsupportedConfiguration(
        "workers must be at least 1".into(),
      ));
    }
    Ok(())
  }

  pub fn worker_count(&self) -> usize {
    self.workers.unwrap_or_else(|| {
      std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
    })
  }

  /// The configured project file, relative to `cwd`.
  pub fn tsconfig_path(&self) -> Option<PathBuf> {
    self.tsconfig.as_ref().map(|path| self.cwd.join(path))
  }

  pub fn native_binary(&self) -> PathBuf {
    self
      .native_binary
      .clone()
      .unwrap_or_else(|| PathBuf::from("tsgo"))
  }
}
