use super::dialect::Dialect;
use super::DeclarationOracle;
use super::GenerateOutput;
use super::GenerateRequest;
use crate::context::Checker;
use crate::context::ContextOptions;
use crate::context::ProgramContext;
use crate::error::DtsError;
use crate::error::DtsResult;
use crate::error::MissingReason;
use crate::naming::is_dts_id;
use std::path::Path;
use tracing::debug;
use tracing::debug_span;

/// Declarations from a full type checker, one program per project.
pub struct CheckerOracle<C> {
  context: ProgramContext<C>,
  dialect: Option<Box<dyn Dialect>>,
}

impl<C: Checker> CheckerOracle<C> {
  pub fn new(
    checker: C,
    options: ContextOptions,
    dialect: Option<Box<dyn Dialect>>,
  ) -> CheckerOracle<C> {
    CheckerOracle {
      context: ProgramContext::new(checker, options),
      dialect,
    }
  }

  pub fn context(&self) -> &ProgramContext<C> {
    &self.context
  }

  fn view_for(&self, id: &str) -> Option<String> {
    self
      .dialect
      .as_ref()
      .filter(|dialect| dialect.matches(id))
      .map(|_| format!("{id}.ts"))
  }
}

impl<C: Checker + Send> DeclarationOracle for CheckerOracle<C> {
  fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput> {
    let _guard = debug_span!("checker_declaration", file = request.id.as_str()).entered();
    let file = match (&self.dialect, self.view_for(&request.id)) {
      (Some(dialect), Some(view)) => {
        let source = dialect.virtual_source(&request.source);
        self.context.set_virtual_file(&view, source)?;
        view
      }
      _ => request.id.clone(),
    };

    let emitted = self.context.emit(&file)?;
    if !emitted.outcome.source_found {
      let reason = if Path::new(&request.id).exists() {
        MissingReason::FailedToLoad
      } else {
        MissingReason::NotOnDisk
      };
      return Err(DtsError::MissingSourceFile {
        file: request.id.clone(),
        reason,
      });
    }

    let mut code = None;
    let mut map = None;
    for (name, text) in emitted.outputs {
      if name.ends_with(".map") {
        map = Some(text);
      } else if is_dts_id(&name) {
        code = Some(text);
      }
    }

    match code {
      Some(code) => {
        if !emitted.outcome.diagnostics.is_empty() {
          debug!(
            file = request.id.as_str(),
            diagnostics = emitted.outcome.diagnostics.len(),
            "declarations emitted despite diagnostics"
          );
        }
        Ok(GenerateOutput { code, map })
      }
      // Declaration inputs have nothing to emit; their text already is the declaration.
      None if emitted.outcome.emit_skipped && is_dts_id(&request.id) => {
        Ok(GenerateOutput::verbatim(&request.source))
      }
      None => {
        let diagnostics = if emitted.outcome.diagnostics.is_empty() {
          "no declaration output was produced".to_string()
        } else {
          emitted.outcome.diagnostics.join("\n")
        };
        Err(DtsError::OracleDiagnostic {
          file: request.id.clone(),
          diagnostics,
        })
      }
    }
  }

  fn invalidate(&mut self, file: &str) {
    self.context.invalidate(file);
    if let Some(view) = self.view_for(file) {
      self.context.invalidate(&view);
    }
  }

  fn build_end(&mut self) -> DtsResult<()> {
    self.context.build_end()
  }
}
