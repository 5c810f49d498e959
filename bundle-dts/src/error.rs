use emit_dts::EmitError;
use parse_dts::error::SyntaxError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a root file is absent from a constructed program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingReason {
  /// The file exists on disk but the checker did not load it (excluded by the project, or
  /// an unsupported extension).
  FailedToLoad,
  NotOnDisk,
}

impl fmt::Display for MissingReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MissingReason::FailedToLoad => write!(f, "the file exists but failed to load"),
      MissingReason::NotOnDisk => write!(f, "the file does not exist"),
    }
  }
}

/// Failures talking to an external declaration emitter.
#[derive(Debug, Error)]
pub enum CheckerError {
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("missing worker script at {0}")]
  MissingScript(PathBuf),
  #[error("declaration worker exited unexpectedly")]
  Exited,
  #[error("declaration worker crashed: {0}")]
  Crashed(String),
  #[error("unexpected worker response: {0}")]
  Protocol(String),
  #[error("{binary} exited with {status}:\n{output}")]
  NativeFailed {
    binary: PathBuf,
    status: String,
    output: String,
  },
  #[error("checker pool is shut down")]
  PoolClosed,
  #[error(transparent)]
  Io(#[from] io::Error),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DtsError {
  /// The checker produced no declaration output and reported diagnostics.
  #[error("failed to emit declarations for {file}:\n{diagnostics}")]
  OracleDiagnostic { file: String, diagnostics: String },
  #[error("{file} is not part of the program: {reason}")]
  MissingSourceFile { file: String, reason: MissingReason },
  #[error("unsupported configuration: {0}")]
  UnsupportedConfiguration(String),
  #[error("cannot resolve {specifier:?} from {importer}")]
  UnresolvedImport { specifier: String, importer: String },
  #[error("failed to parse {file}: {error}")]
  Syntax { file: String, error: SyntaxError },
  #[error("failed to print {file}: {error}")]
  Emit { file: String, error: EmitError },
  #[error("chunk references unknown declaration symbol {0}")]
  UnknownSymbol(u32),
  #[error("invalid project configuration: {0}")]
  Config(String),
  #[error(transparent)]
  Checker(#[from] CheckerError),
  #[error(transparent)]
  Io(#[from] io::Error),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl DtsError {
  pub(crate) fn syntax(file: &str, error: SyntaxError) -> DtsError {
    DtsError::Syntax {
      file: file.to_string(),
      error,
    }
  }

  pub(crate) fn emit(file: &str, error: EmitError) -> DtsError {
    DtsError::Emit {
      file: file.to_string(),
      error,
    }
  }
}

pub type DtsResult<T> = Result<T, DtsError>;
