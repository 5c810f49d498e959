//! A long-lived `node` child process running the TypeScript compiler API.
//!
//! Requests and responses are single JSON lines on the child's stdin and stdout.

use super::isolated::IsolatedEmitter;
use super::isolated::Transpiled;
use crate::context::Checker;
use crate::context::EmitOutcome;
use crate::context::ProgramId;
use crate::context::ProgramInfo;
use crate::context::ProgramRequest;
use crate::error::CheckerError;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::ChildStdin;
use std::process::ChildStdout;
use std::process::Command;
use std::process::Stdio;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(
  tag = "kind",
  rename_all = "camelCase",
  rename_all_fields = "camelCase"
)]
enum WorkerRequest<'a> {
  CreateProgram {
    root_names: &'a [String],
    options: &'a Map<String, Value>,
    files: &'a BTreeMap<String, String>,
    build_info: Option<&'a str>,
    force: bool,
  },
  Emit {
    program: u32,
    file: &'a str,
  },
  Release {
    program: u32,
  },
  SaveBuildInfo {
    program: u32,
  },
  Transpile {
    file: &'a str,
    source: &'a str,
    sourcemap: bool,
  },
}

#[derive(Debug, Deserialize)]
struct OutputFile {
  name: String,
  text: String,
}

#[derive(Debug, Deserialize)]
#[serde(
  tag = "kind",
  rename_all = "camelCase",
  rename_all_fields = "camelCase"
)]
enum WorkerResponse {
  Program {
    id: u32,
    #[serde(default)]
    files: Vec<String>,
  },
  Emitted {
    #[serde(default)]
    outputs: Vec<OutputFile>,
    #[serde(default)]
    diagnostics: Vec<String>,
    emit_skipped: bool,
    source_found: bool,
  },
  Released,
  BuildInfoSaved {
    #[serde(default)]
    file: Option<String>,
  },
  Transpiled {
    code: String,
    #[serde(default)]
    map: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
  },
  Crash {
    message: String,
    #[serde(default)]
    stack: Option<String>,
  },
}

#[derive(Debug)]
struct WorkerProcess {
  child: Child,
  stdin: BufWriter<ChildStdin>,
  stdout: BufReader<ChildStdout>,
}

#[derive(Debug)]
pub struct NodeWorker {
  node_path: PathBuf,
  script: PathBuf,
  process: Option<WorkerProcess>,
}

impl NodeWorker {
  /// The child is spawned on first use.
  pub fn new(node_path: PathBuf) -> NodeWorker {
    NodeWorker {
      node_path,
      script: default_script(),
      process: None,
    }
  }

  pub fn with_script(node_path: PathBuf, script: PathBuf) -> NodeWorker {
    NodeWorker {
      node_path,
      script,
      process: None,
    }
  }

  fn request(&mut self, request: &WorkerRequest<'_>) -> Result<WorkerResponse, CheckerError> {
    self.ensure_running()?;

    let mut attempts = 0;
    loop {
      attempts += 1;
      match self.send(request) {
        Ok(WorkerResponse::Crash { message, stack }) => {
          let mut message = message;
          if let Some(stack) = stack {
            message.push('\n');
            message.push_str(&stack);
          }
          return Err(CheckerError::Crashed(message));
        }
        Ok(response) => return Ok(response),
        // Only the transport is retried: the child died, so start a fresh one.
        Err(err @ (CheckerError::Exited | CheckerError::Io(_))) => {
          if attempts >= 2 {
            return Err(err);
          }
          debug!(error = %err, "restarting declaration worker");
          self.spawn()?;
        }
        Err(err) => return Err(err),
      }
    }
  }

  fn ensure_running(&mut self) -> Result<(), CheckerError> {
    if let Some(process) = self.process.as_mut() {
      if process.child.try_wait()?.is_none() {
        return Ok(());
      }
    }
    self.spawn()
  }

  fn kill(&mut self) {
    if let Some(mut process) = self.process.take() {
      if process.child.try_wait().ok().flatten().is_none() {
        let _ = process.child.kill();
      }
      let _ = process.child.wait();
    }
  }

  fn spawn(&mut self) -> Result<(), CheckerError> {
    self.kill();

    if !self.script.exists() {
      return Err(CheckerError::MissingScript(self.script.clone()));
    }

    let mut command = Command::new(&self.node_path);
    command.arg(&self.script);
    command.stdin(Stdio::piped());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::inherit());

    let mut spawned = command.spawn().map_err(|source| CheckerError::Spawn {
      program: self.node_path.clone(),
      source,
    })?;
    let stdin = spawned
      .stdin
      .take()
      .ok_or_else(|| CheckerError::Protocol("failed to open worker stdin".into()))?;
    let stdout = spawned
      .stdout
      .take()
      .ok_or_else(|| CheckerError::Protocol("failed to open worker stdout".into()))?;
    debug!(pid = spawned.id(), "spawned declaration worker");

    self.process = Some(WorkerProcess {
      child: spawned,
      stdin: BufWriter::new(stdin),
      stdout: BufReader::new(stdout),
    });
    Ok(())
  }

  fn send(&mut self, request: &WorkerRequest<'_>) -> Result<WorkerResponse, CheckerError> {
    let worker = self.process.as_mut().ok_or(CheckerError::Exited)?;

    let line = serde_json::to_string(request)?;
    worker.stdin.write_all(line.as_bytes())?;
    worker.stdin.write_all(b"\n")?;
    worker.stdin.flush()?;

    let mut response = String::new();
    let bytes = worker.stdout.read_line(&mut response)?;
    if bytes == 0 {
      return Err(CheckerError::Exited);
    }
    Ok(serde_json::from_str(response.trim_end())?)
  }
}

impl Checker for NodeWorker {
  fn create_program(&mut self, request: ProgramRequest) -> Result<ProgramInfo, CheckerError> {
    let response = self.request(&WorkerRequest::CreateProgram {
      root_names: &request.root_names,
      options: &request.options,
      files: &request.files,
      build_info: request.build_info.as_deref(),
      force: request.force,
    })?;
    match response {
      WorkerResponse::Program { id, files } => Ok(ProgramInfo {
        id: ProgramId(id),
        files,
      }),
      other => Err(unexpected("program", &other)),
    }
  }

  fn emit(
    &mut self,
    program: ProgramId,
    file: &str,
    write: &mut dyn FnMut(&str, &str),
  ) -> Result<EmitOutcome, CheckerError> {
    let response = self.request(&WorkerRequest::Emit {
      program: program.0,
      file,
    })?;
    match response {
      WorkerResponse::Emitted {
        outputs,
        diagnostics,
        emit_skipped,
        source_found,
      } => {
        for output in &outputs {
          write(&output.name, &output.text);
        }
        Ok(EmitOutcome {
          diagnostics,
          emit_skipped,
          source_found,
        })
      }
      other => Err(unexpected("emitted", &other)),
    }
  }

  fn release(&mut self, program: ProgramId) -> Result<(), CheckerError> {
    if self.process.is_none() {
      return Ok(());
    }
    match self.request(&WorkerRequest::Release { program: program.0 })? {
      WorkerResponse::Released => Ok(()),
      other => Err(unexpected("released", &other)),
    }
  }

  fn save_build_info(&mut self, program: ProgramId) -> Result<(), CheckerError> {
    match self.request(&WorkerRequest::SaveBuildInfo { program: program.0 })? {
      WorkerResponse::BuildInfoSaved { file } => {
        debug!(program = program.0, file = ?file, "worker saved build info");
        Ok(())
      }
      other => Err(unexpected("buildInfoSaved", &other)),
    }
  }

  fn close(&mut self) {
    self.kill();
  }
}

impl IsolatedEmitter for NodeWorker {
  fn transpile_declaration(
    &mut self,
    file: &str,
    source: &str,
    sourcemap: bool,
  ) -> Result<Transpiled, CheckerError> {
    let response = self.request(&WorkerRequest::Transpile {
      file,
      source,
      sourcemap,
    })?;
    match response {
      WorkerResponse::Transpiled { code, map, errors } => Ok(Transpiled { code, map, errors }),
      other => Err(unexpected("transpiled", &other)),
    }
  }
}

impl Drop for NodeWorker {
  fn drop(&mut self) {
    self.kill();
  }
}

fn unexpected(expected: &str, got: &WorkerResponse) -> CheckerError {
  CheckerError::Protocol(format!("expected {expected} response, got {got:?}"))
}

fn default_script() -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR"))
    .join("scripts")
    .join("dts_worker.js")
}

/// Whether `node_path` runs at all.
pub fn node_available(node_path: &Path) -> bool {
  let output = Command::new(node_path).arg("--version").output();
  matches!(output, Ok(out) if out.status.success())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn requests_are_tagged_json_lines() {
    let options = Map::new();
    let files = BTreeMap::from([("/a.vue.ts".to_string(), "export {}".to_string())]);
    let roots = vec!["/a.ts".to_string()];
    let request = WorkerRequest::CreateProgram {
      root_names: &roots,
      options: &options,
      files: &files,
      build_info: None,
      force: true,
    };
    assert_eq!(
      serde_json::to_value(&request).unwrap(),
      json!({
        "kind": "createProgram",
        "rootNames": ["/a.ts"],
        "options": {},
        "files": { "/a.vue.ts": "export {}" },
        "buildInfo": null,
        "force": true,
      })
    );
  }

  #[test]
  fn parses_responses() {
    let response: WorkerResponse = serde_json::from_str(
      r#"{"kind":"emitted","outputs":[{"name":"/a.d.ts","text":"x"}],"emitSkipped":false,"sourceFound":true}"#,
    )
    .unwrap();
    assert!(matches!(
      response,
      WorkerResponse::Emitted { ref outputs, emit_skipped: false, source_found: true, .. }
        if outputs.len() == 1
    ));
    let crash: WorkerResponse =
      serde_json::from_str(r#"{"kind":"crash","message":"boom"}"#).unwrap();
    assert!(matches!(crash, WorkerResponse::Crash { .. }));
    let saved: WorkerResponse =
      serde_json::from_str(r#"{"kind":"buildInfoSaved","file":"/p/tsconfig.tsbuildinfo"}"#).unwrap();
    assert!(matches!(
      saved,
      WorkerResponse::BuildInfoSaved { file: Some(ref file) } if file == "/p/tsconfig.tsbuildinfo"
    ));
    assert_eq!(
      serde_json::to_value(WorkerRequest::SaveBuildInfo { program: 3 }).unwrap(),
      json!({ "kind": "saveBuildInfo", "program": 3 })
    );
  }

  #[test]
  fn missing_script_is_reported() {
    let mut worker = NodeWorker::with_script(PathBuf::from("node"), PathBuf::from("/nonexistent/dts_worker.js"));
    let err = worker.transpile_declaration("/a.ts", "export {}", false).unwrap_err();
    assert!(matches!(err, CheckerError::MissingScript(_)), "{err}");
  }
}
