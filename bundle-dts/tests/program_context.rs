use bundle_dts::context::Checker;
use bundle_dts::context::ContextOptions;
use bundle_dts::context::ContextState;
use bundle_dts::context::EmitOutcome;
use bundle_dts::context::ProgramContext;
use bundle_dts::context::ProgramId;
use bundle_dts::context::ProgramInfo;
use bundle_dts::context::ProgramRequest;
use bundle_dts::error::CheckerError;
use bundle_dts::oracle::checker::CheckerOracle;
use bundle_dts::oracle::dialect::ScriptBlockDialect;
use bundle_dts::oracle::DeclarationOracle;
use bundle_dts::oracle::GenerateRequest;
use bundle_dts::resolve::path::normalize_path;
use bundle_dts::DtsError;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Records every request and emits `export declare const <stem>: string;` for any file.
#[derive(Default)]
struct RecordingChecker {
  requests: Vec<ProgramRequest>,
  released: Vec<ProgramId>,
  saved: Vec<ProgramId>,
  closed: usize,
  missing: Vec<String>,
}

impl Checker for RecordingChecker {
  fn create_program(&mut self, request: ProgramRequest) -> Result<ProgramInfo, CheckerError> {
    let id = ProgramId(self.requests.len() as u32);
    let mut files = request.root_names.clone();
    files.extend(request.files.keys().cloned());
    self.requests.push(request);
    Ok(ProgramInfo { id, files })
  }

  fn emit(
    &mut self,
    _program: ProgramId,
    file: &str,
    write: &mut dyn FnMut(&str, &str),
  ) -> Result<EmitOutcome, CheckerError> {
    if self.missing.iter().any(|missing| missing == file) {
      return Ok(EmitOutcome {
        source_found: false,
        emit_skipped: true,
        ..EmitOutcome::default()
      });
    }
    let stem = file.trim_end_matches(".ts");
    let name = stem.rsplit('/').next().unwrap_or(stem).replace('.', "_");
    write(
      &format!("{stem}.d.ts"),
      &format!("export declare const {name}: string;\n"),
    );
    Ok(EmitOutcome {
      source_found: true,
      ..EmitOutcome::default()
    })
  }

  fn release(&mut self, program: ProgramId) -> Result<(), CheckerError> {
    self.released.push(program);
    Ok(())
  }

  fn save_build_info(&mut self, program: ProgramId) -> Result<(), CheckerError> {
    if let Some(path) = &self.requests[program.0 as usize].build_info {
      fs::write(path, "{}").unwrap();
    }
    self.saved.push(program);
    Ok(())
  }

  fn close(&mut self) {
    self.closed += 1;
  }
}

struct Project {
  _dir: TempDir,
  root: PathBuf,
}

impl Project {
  fn new(files: &[(&str, &str)]) -> Project {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for (name, text) in files {
      let path = root.join(name);
      fs::create_dir_all(path.parent().unwrap()).unwrap();
      fs::write(path, text).unwrap();
    }
    Project { _dir: dir, root }
  }

  fn file(&self, name: &str) -> String {
    normalize_path(&self.root.join(name))
  }
}

fn sample_project() -> Project {
  Project::new(&[
    (
      "tsconfig.json",
      r#"{ "compilerOptions": { "strict": true }, "include": ["src"] }"#,
    ),
    ("src/a.ts", "export const a = 'a';"),
    ("src/b.ts", "export const b = 'b';"),
  ])
}

#[test]
fn files_of_one_project_share_a_program() {
  let project = sample_project();
  let mut context = ProgramContext::new(RecordingChecker::default(), ContextOptions::default());
  assert_eq!(context.state(), ContextState::Uninitialized);

  let a = context.emit(&project.file("src/a.ts")).unwrap();
  assert_eq!(a.outputs.len(), 1);
  assert_eq!(a.outputs[0].1, "export declare const a: string;\n");
  context.emit(&project.file("src/b.ts")).unwrap();

  assert_eq!(context.programs_built(), 1);
  assert_eq!(context.cache_hits(), 1);
  assert_eq!(context.state(), ContextState::Ready);

  let request = &context.checker_mut().requests[0];
  assert_eq!(
    request.root_names,
    vec![project.file("src/a.ts"), project.file("src/b.ts")]
  );
  assert_eq!(request.options.get("strict"), Some(&Value::Bool(true)));
  assert_eq!(request.options.get("emitDeclarationOnly"), Some(&Value::Bool(true)));
  assert!(request.force);
  assert!(request.build_info.is_none());
}

#[test]
fn invalidated_programs_are_rebuilt_and_released() {
  let project = sample_project();
  let mut context = ProgramContext::new(RecordingChecker::default(), ContextOptions::default());
  let a = project.file("src/a.ts");
  let first = context.program_for(&a).unwrap();

  assert_eq!(context.invalidate(&a), vec![first]);
  assert_eq!(context.state(), ContextState::Invalidated);
  assert!(context.invalidate(&project.file("src/other.ts")).is_empty());

  let second = context.program_for(&a).unwrap();
  assert_ne!(first, second);
  assert_eq!(context.programs_built(), 2);
  assert_eq!(context.checker_mut().released, vec![first]);
}

#[test]
fn build_end_closes_the_checker_unless_incremental() {
  let project = sample_project();
  let a = project.file("src/a.ts");

  let mut context = ProgramContext::new(RecordingChecker::default(), ContextOptions::default());
  context.program_for(&a).unwrap();
  context.build_end().unwrap();
  assert_eq!(context.checker_mut().closed, 1);
  assert_eq!(context.state(), ContextState::Uninitialized);

  let mut incremental = ProgramContext::new(
    RecordingChecker::default(),
    ContextOptions {
      incremental: true,
      ..ContextOptions::default()
    },
  );
  incremental.program_for(&a).unwrap();
  incremental.build_end().unwrap();
  assert_eq!(incremental.checker_mut().closed, 0);
  incremental.program_for(&a).unwrap();
  assert_eq!(incremental.programs_built(), 1);
  let request = &incremental.checker_mut().requests[0];
  assert!(!request.force);
  assert_eq!(
    request.build_info.as_deref(),
    Some(project.file("tsconfig.tsbuildinfo").as_str())
  );
}

#[test]
fn incremental_builds_write_their_build_info() {
  let project = sample_project();
  let a = project.file("src/a.ts");
  let build_info = project.root.join("tsconfig.tsbuildinfo");

  let mut context = ProgramContext::new(RecordingChecker::default(), ContextOptions::default());
  context.program_for(&a).unwrap();
  context.build_end().unwrap();
  assert!(context.checker_mut().saved.is_empty());
  assert!(!build_info.exists());

  let mut incremental = ProgramContext::new(
    RecordingChecker::default(),
    ContextOptions {
      incremental: true,
      ..ContextOptions::default()
    },
  );
  let program = incremental.program_for(&a).unwrap();
  incremental.build_end().unwrap();
  assert_eq!(incremental.checker_mut().saved, vec![program]);
  assert!(build_info.exists());
}

fn composite_project() -> Project {
  Project::new(&[
    (
      "tsconfig.json",
      r#"{ "compilerOptions": { "outDir": "dist" }, "include": ["src"], "references": [{ "path": "./lib" }] }"#,
    ),
    ("src/a.ts", "export const a = 1;"),
    ("lib/tsconfig.json", r#"{ "compilerOptions": { "composite": true }, "include": ["."] }"#),
    ("lib/l.ts", "export const l = 1;"),
  ])
}

#[test]
fn incremental_composite_rebuilds_reuse_the_merged_program() {
  let project = composite_project();
  let a = project.file("src/a.ts");
  let l = project.file("lib/l.ts");

  let mut incremental = ProgramContext::new(
    RecordingChecker::default(),
    ContextOptions {
      build: true,
      incremental: true,
      ..ContextOptions::default()
    },
  );
  incremental.program_for(&a).unwrap();
  incremental.build_end().unwrap();
  incremental.program_for(&a).unwrap();
  incremental.program_for(&l).unwrap();
  assert_eq!(incremental.programs_built(), 1);
  assert_eq!(incremental.cache_hits(), 2);

  let mut scratch = ProgramContext::new(
    RecordingChecker::default(),
    ContextOptions {
      build: true,
      ..ContextOptions::default()
    },
  );
  scratch.program_for(&a).unwrap();
  scratch.build_end().unwrap();
  scratch.program_for(&a).unwrap();
  assert_eq!(scratch.programs_built(), 2);
  assert_eq!(scratch.cache_hits(), 0);
  assert!(scratch.checker_mut().requests.iter().all(|request| request.force));
}

#[test]
fn incremental_rebuilds_keep_one_program_per_project() {
  let project = composite_project();
  let a = project.file("src/a.ts");
  let l = project.file("lib/l.ts");
  let mut context = ProgramContext::new(
    RecordingChecker::default(),
    ContextOptions {
      incremental: true,
      ..ContextOptions::default()
    },
  );
  context.program_for(&a).unwrap();
  context.program_for(&l).unwrap();
  assert_eq!(context.programs_built(), 2);
  context.build_end().unwrap();

  context.program_for(&l).unwrap();
  context.program_for(&a).unwrap();
  assert_eq!(context.programs_built(), 2);
  assert_eq!(context.cache_hits(), 2);
  assert_eq!(context.checker_mut().closed, 0);
}

#[test]
fn build_mode_merges_referenced_projects() {
  let project = Project::new(&[
    (
      "tsconfig.json",
      r#"{ "compilerOptions": { "outDir": "dist" }, "include": ["src"], "references": [{ "path": "./lib" }] }"#,
    ),
    ("src/a.ts", "export const a = 1;"),
    ("lib/tsconfig.json", r#"{ "compilerOptions": { "composite": true }, "include": ["."] }"#),
    ("lib/l.ts", "export const l = 1;"),
  ]);
  let mut context = ProgramContext::new(
    RecordingChecker::default(),
    ContextOptions {
      build: true,
      ..ContextOptions::default()
    },
  );
  context.program_for(&project.file("src/a.ts")).unwrap();
  let request = &context.checker_mut().requests[0];
  assert!(request.root_names.contains(&project.file("lib/l.ts")));
  assert!(request.options.get("outDir").is_none());
}

#[test]
fn component_files_are_checked_through_a_virtual_view() {
  let project = sample_project();
  let component = project.file("src/App.vue");
  fs::write(&component, "").unwrap();
  let mut oracle = CheckerOracle::new(
    RecordingChecker::default(),
    ContextOptions::default(),
    Some(Box::new(ScriptBlockDialect)),
  );
  let output = oracle
    .generate(&GenerateRequest::new(
      component.as_str(),
      "<template></template>\n<script lang=\"ts\">\nexport const msg = 'hi';\n</script>\n",
    ))
    .unwrap();
  assert_eq!(output.code, "export declare const App_vue: string;\n");
  assert_eq!(oracle.context().programs_built(), 1);
}

#[test]
fn files_missing_from_the_program_are_reported() {
  let project = sample_project();
  let a = project.file("src/a.ts");
  let gone = project.file("src/gone.ts");
  let mut checker = RecordingChecker::default();
  checker.missing = vec![a.clone(), gone.clone()];
  let mut oracle = CheckerOracle::new(checker, ContextOptions::default(), None);

  let err = oracle.generate(&GenerateRequest::new(a.as_str(), "")).unwrap_err();
  assert!(matches!(err, DtsError::MissingSourceFile { ref file, .. } if *file == a));
  assert!(err.to_string().contains("the file exists but failed to load"));
  let err = oracle.generate(&GenerateRequest::new(gone.as_str(), "")).unwrap_err();
  assert!(err.to_string().contains("the file does not exist"));
}
