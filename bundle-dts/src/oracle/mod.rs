//! Backends turning one source file into declaration text.

pub mod checker;
pub mod dialect;
pub mod isolated;
pub mod native;
pub mod node;
pub mod pool;

use crate::context::ContextOptions;
use crate::error::DtsResult;
use crate::options::DialectKind;
use crate::options::DtsOptions;
use crate::options::OracleMode;
use checker::CheckerOracle;
use dialect::Dialect;
use dialect::ScriptBlockDialect;
use isolated::IsolatedOracle;
use native::NativeOracle;
use node::NodeWorker;
use pool::CheckerPool;
use pool::PooledOracle;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateRequest {
  /// Source module id.
  pub id: String,
  /// Source text as the host loaded it.
  pub source: String,
}

impl GenerateRequest {
  pub fn new(id: impl Into<String>, source: impl Into<String>) -> GenerateRequest {
    GenerateRequest {
      id: id.into(),
      source: source.into(),
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateOutput {
  pub code: String,
  pub map: Option<String>,
}

impl GenerateOutput {
  pub fn verbatim(code: &str) -> GenerateOutput {
    GenerateOutput {
      code: code.to_string(),
      map: None,
    }
  }
}

pub trait DeclarationOracle: Send {
  fn build_start(&mut self) -> DtsResult<()> {
    Ok(())
  }

  fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput>;

  /// Hints that `request` will be generated soon. Backends that can work ahead start now.
  fn prefetch(&mut self, _request: &GenerateRequest) {}

  /// `file` changed on disk.
  fn invalidate(&mut self, _file: &str) {}

  fn build_end(&mut self) -> DtsResult<()> {
    Ok(())
  }
}

impl<O: DeclarationOracle + ?Sized> DeclarationOracle for Box<O> {
  fn build_start(&mut self) -> DtsResult<()> {
    (**self).build_start()
  }

  fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput> {
    (**self).generate(request)
  }

  fn prefetch(&mut self, request: &GenerateRequest) {
    (**self).prefetch(request)
  }

  fn invalidate(&mut self, file: &str) {
    (**self).invalidate(file)
  }

  fn build_end(&mut self) -> DtsResult<()> {
    (**self).build_end()
  }
}

pub fn context_options(options: &DtsOptions) -> ContextOptions {
  ContextOptions {
    tsconfig: options.tsconfig_path(),
    compiler_options: options.compiler_options.clone(),
    build: options.build,
    incremental: options.incremental,
    sourcemap: options.sourcemap,
  }
}

pub fn dialect_for(kind: Option<DialectKind>) -> Option<Box<dyn Dialect>> {
  match kind {
    Some(DialectKind::ScriptBlock) => Some(Box::new(ScriptBlockDialect)),
    None => None,
  }
}

fn checker_oracle(options: &DtsOptions) -> CheckerOracle<NodeWorker> {
  CheckerOracle::new(
    NodeWorker::new(options.node_path.clone()),
    context_options(options),
    dialect_for(options.dialect),
  )
}

/// Builds the backend `options` select. Fails before any file is touched when the options
/// combine backends that cannot work together.
pub fn create_oracle(options: &DtsOptions) -> DtsResult<Box<dyn DeclarationOracle>> {
  options.validate()?;
  Ok(match options.mode {
    OracleMode::Checker if options.parallel => {
      let factory_options = options.clone();
      let pool = CheckerPool::spawn(
        options.worker_count(),
        options.tsconfig_path(),
        options.incremental,
        move |_| Ok(Box::new(checker_oracle(&factory_options)) as Box<dyn DeclarationOracle>),
      )?;
      Box::new(PooledOracle::new(Arc::new(pool)))
    }
    OracleMode::Checker => Box::new(checker_oracle(options)),
    OracleMode::Isolated => Box::new(IsolatedOracle::new(
      NodeWorker::new(options.node_path.clone()),
      options.sourcemap,
    )),
    OracleMode::Native => Box::new(NativeOracle::new(options)?),
  })
}
