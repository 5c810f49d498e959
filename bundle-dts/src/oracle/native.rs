use super::DeclarationOracle;
use super::GenerateOutput;
use super::GenerateRequest;
use crate::error::CheckerError;
use crate::error::DtsError;
use crate::error::DtsResult;
use crate::error::MissingReason;
use crate::naming::dts_id_for;
use crate::naming::is_dts_id;
use crate::options::DtsOptions;
use crate::resolve::path::normalize_path;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;
use tracing::debug_span;

struct NativeBuild {
  out_dir: TempDir,
  /// Failure of the compiler run, reported for files it did not produce.
  failure: Option<(String, String)>,
}

/// Declarations from one project-wide run of a native compiler binary, read back per file.
pub struct NativeOracle {
  binary: PathBuf,
  project: PathBuf,
  root_dir: String,
  sourcemap: bool,
  build: Option<NativeBuild>,
}

impl NativeOracle {
  pub fn new(options: &DtsOptions) -> DtsResult<NativeOracle> {
    let cwd = if options.cwd.is_absolute() {
      options.cwd.clone()
    } else {
      std::env::current_dir()?.join(&options.cwd)
    };
    Ok(NativeOracle {
      binary: options.native_binary(),
      project: options
        .tsconfig
        .as_ref()
        .map(|tsconfig| cwd.join(tsconfig))
        .unwrap_or_else(|| cwd.clone()),
      root_dir: normalize_path(&cwd),
      sourcemap: options.sourcemap,
      build: None,
    })
  }

  fn ensure_built(&mut self) -> DtsResult<&NativeBuild> {
    if self.build.is_none() {
      let _guard = debug_span!("native_build", binary = %self.binary.display()).entered();
      let out_dir = tempfile::Builder::new().prefix("bundle-dts-").tempdir()?;
      let mut command = Command::new(&self.binary);
      command
        .arg("-p")
        .arg(&self.project)
        .arg("--declaration")
        .arg("--emitDeclarationOnly")
        .arg("--noEmit")
        .arg("false")
        .arg("--rootDir")
        .arg(&self.root_dir)
        .arg("--outDir")
        .arg(out_dir.path());
      if self.sourcemap {
        command.arg("--declarationMap");
      }
      let output = command.output().map_err(|source| CheckerError::Spawn {
        program: self.binary.clone(),
        source,
      })?;
      // Type errors give a failing status but still produce declarations.
      let failure = (!output.status.success()).then(|| {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        (output.status.to_string(), text)
      });
      debug!(failed = failure.is_some(), "native compiler finished");
      self.build = Some(NativeBuild { out_dir, failure });
    }
    self
      .build
      .as_ref()
      .ok_or_else(|| DtsError::Config("native build missing".into()))
  }
}

impl DeclarationOracle for NativeOracle {
  fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput> {
    if is_dts_id(&request.id) {
      return Ok(GenerateOutput::verbatim(&request.source));
    }
    let root_dir = self.root_dir.clone();
    let binary = self.binary.clone();
    let sourcemap = self.sourcemap;
    let build = self.ensure_built()?;

    let Some(relative) = request
      .id
      .strip_prefix(root_dir.as_str())
      .map(|rest| rest.trim_start_matches('/'))
    else {
      return Err(DtsError::MissingSourceFile {
        file: request.id.clone(),
        reason: missing_reason(&request.id),
      });
    };
    let declaration = build.out_dir.path().join(dts_id_for(relative));
    let code = match fs::read_to_string(&declaration) {
      Ok(code) => code,
      Err(_) => {
        return Err(match &build.failure {
          Some((status, output)) => CheckerError::NativeFailed {
            binary,
            status: status.clone(),
            output: output.clone(),
          }
          .into(),
          None => DtsError::MissingSourceFile {
            file: request.id.clone(),
            reason: missing_reason(&request.id),
          },
        });
      }
    };
    let map = if sourcemap {
      let mut map_path = declaration.into_os_string();
      map_path.push(".map");
      fs::read_to_string(PathBuf::from(map_path)).ok()
    } else {
      None
    };
    Ok(GenerateOutput { code, map })
  }

  fn invalidate(&mut self, _file: &str) {
    self.build = None;
  }

  fn build_end(&mut self) -> DtsResult<()> {
    self.build = None;
    Ok(())
  }
}

fn missing_reason(id: &str) -> MissingReason {
  if Path::new(id).exists() {
    MissingReason::FailedToLoad
  } else {
    MissingReason::NotOnDisk
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reports_a_missing_binary() {
    let dir = tempfile::tempdir().unwrap();
    let options = DtsOptions {
      cwd: dir.path().to_path_buf(),
      native_binary: Some(PathBuf::from("/nonexistent/native-tsc")),
      ..DtsOptions::default()
    };
    let mut oracle = NativeOracle::new(&options).unwrap();
    let id = format!("{}/src/a.ts", normalize_path(dir.path()));
    let err = oracle
      .generate(&GenerateRequest::new(id, "export const a = 1;"))
      .unwrap_err();
    assert!(matches!(err, DtsError::Checker(CheckerError::Spawn { .. })), "{err}");
  }

  #[cfg(unix)]
  #[test]
  fn reads_declarations_back_from_the_scratch_directory() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("fake-tsc");
    fs::write(
      &binary,
      r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --outDir) out="$2"; shift ;;
  esac
  shift
done
mkdir -p "$out/src"
echo 'export declare const a: 1;' > "$out/src/a.d.ts"
"#,
    )
    .unwrap();
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();

    let options = DtsOptions {
      cwd: dir.path().to_path_buf(),
      native_binary: Some(binary),
      ..DtsOptions::default()
    };
    let mut oracle = NativeOracle::new(&options).unwrap();
    let root = normalize_path(dir.path());
    let out = oracle
      .generate(&GenerateRequest::new(format!("{root}/src/a.ts"), "export const a = 1 as const;"))
      .unwrap();
    assert_eq!(out.code, "export declare const a: 1;\n");

    let err = oracle
      .generate(&GenerateRequest::new(format!("{root}/src/b.ts"), ""))
      .unwrap_err();
    assert!(
      matches!(err, DtsError::MissingSourceFile { reason: MissingReason::NotOnDisk, .. }),
      "{err}"
    );
  }
}
