use super::DeclarationOracle;
use super::GenerateOutput;
use super::GenerateRequest;
use crate::error::CheckerError;
use crate::error::DtsError;
use crate::error::DtsResult;
use crate::naming::is_dts_id;
use tracing::debug_span;

/// Output of a single-file declaration transpile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transpiled {
  pub code: String,
  pub map: Option<String>,
  pub errors: Vec<String>,
}

/// Emits declarations for one file from its syntax alone.
pub trait IsolatedEmitter {
  fn transpile_declaration(
    &mut self,
    file: &str,
    source: &str,
    sourcemap: bool,
  ) -> Result<Transpiled, CheckerError>;
}

pub struct IsolatedOracle<E> {
  emitter: E,
  sourcemap: bool,
}

impl<E: IsolatedEmitter> IsolatedOracle<E> {
  pub fn new(emitter: E, sourcemap: bool) -> IsolatedOracle<E> {
    IsolatedOracle { emitter, sourcemap }
  }
}

impl<E: IsolatedEmitter + Send> DeclarationOracle for IsolatedOracle<E> {
  fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput> {
    if is_dts_id(&request.id) {
      return Ok(GenerateOutput::verbatim(&request.source));
    }
    let _guard = debug_span!("isolated_declaration", file = request.id.as_str()).entered();
    let transpiled =
      self
        .emitter
        .transpile_declaration(&request.id, &request.source, self.sourcemap)?;
    if !transpiled.errors.is_empty() {
      return Err(DtsError::OracleDiagnostic {
        file: request.id.clone(),
        diagnostics: transpiled.errors.join("\n"),
      });
    }
    Ok(GenerateOutput {
      code: transpiled.code,
      map: transpiled.map.filter(|_| self.sourcemap),
    })
  }
}
