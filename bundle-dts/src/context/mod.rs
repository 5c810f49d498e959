//! Long-lived checker programs and the virtual files they see.
//!
//! A [`ProgramContext`] builds checker programs on demand, one per project, and keeps them
//! warm across files and (in incremental mode) across builds. Programs are evicted when a file
//! they contain changes.

pub mod tsconfig;

use crate::error::CheckerError;
use crate::error::DtsResult;
use crate::resolve::path::normalize_path;
use crate::resolve::path::parent_dir;
use ahash::HashMap;
use ahash::HashMapExt;
use ahash::HashSet;
use ahash::HashSetExt;
use serde_json::Map;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing::debug_span;
use tsconfig::find_tsconfig;
use tsconfig::load_project_config;
use tsconfig::ProjectConfig;

/// Options that only make sense for one sub-project and would break path computations once
/// several projects are merged into one program.
const PROJECT_LOCAL_OPTIONS: [&str; 6] = [
  "outDir",
  "rootDir",
  "declarationDir",
  "outFile",
  "composite",
  "tsBuildInfoFile",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgramRequest {
  pub root_names: Vec<String>,
  pub options: Map<String, Value>,
  /// Files the checker must read from here instead of the disk.
  pub files: BTreeMap<String, String>,
  pub build_info: Option<String>,
  /// Ignore any previous build info and check from scratch.
  pub force: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramInfo {
  pub id: ProgramId,
  /// Every source file the program loaded.
  pub files: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitOutcome {
  pub diagnostics: Vec<String>,
  pub emit_skipped: bool,
  /// Whether the requested file was part of the program at all.
  pub source_found: bool,
}

/// A type checker able to build programs and emit declarations for their files.
pub trait Checker {
  fn create_program(&mut self, request: ProgramRequest) -> Result<ProgramInfo, CheckerError>;

  /// Emits declarations for `file`, handing every written output to `write` as
  /// `(file name, text)`.
  fn emit(
    &mut self,
    program: ProgramId,
    file: &str,
    write: &mut dyn FnMut(&str, &str),
  ) -> Result<EmitOutcome, CheckerError>;

  fn release(&mut self, program: ProgramId) -> Result<(), CheckerError>;

  /// Writes the incremental state of a program built with
  /// [`build_info`](ProgramRequest::build_info) to that file.
  fn save_build_info(&mut self, _program: ProgramId) -> Result<(), CheckerError> {
    Ok(())
  }

  /// Shuts down whatever backs the checker. It starts again on next use.
  fn close(&mut self) {}
}

impl<C: Checker + ?Sized> Checker for Box<C> {
  fn create_program(&mut self, request: ProgramRequest) -> Result<ProgramInfo, CheckerError> {
    (**self).create_program(request)
  }

  fn emit(
    &mut self,
    program: ProgramId,
    file: &str,
    write: &mut dyn FnMut(&str, &str),
  ) -> Result<EmitOutcome, CheckerError> {
    (**self).emit(program, file, write)
  }

  fn release(&mut self, program: ProgramId) -> Result<(), CheckerError> {
    (**self).release(program)
  }

  fn save_build_info(&mut self, program: ProgramId) -> Result<(), CheckerError> {
    (**self).save_build_info(program)
  }

  fn close(&mut self) {
    (**self).close()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
  Uninitialized,
  Building,
  Ready,
  Invalidated,
}

#[derive(Clone, Debug, Default)]
pub struct ContextOptions {
  /// Explicit project file; otherwise the nearest `tsconfig.json` above each file.
  pub tsconfig: Option<PathBuf>,
  pub compiler_options: Map<String, Value>,
  /// Composite mode: merge referenced projects into one program.
  pub build: bool,
  pub incremental: bool,
  pub sourcemap: bool,
}

#[derive(Debug)]
struct LiveProgram {
  id: ProgramId,
  project: String,
  roots: Vec<String>,
  files: HashSet<String>,
  build_info: Option<String>,
  invalidated: bool,
}

/// Files emitted for one source file.
#[derive(Debug, Default)]
pub struct EmittedFiles {
  pub outcome: EmitOutcome,
  pub outputs: Vec<(String, String)>,
}

pub struct ProgramContext<C> {
  checker: C,
  options: ContextOptions,
  state: ContextState,
  virtual_files: HashMap<String, BTreeMap<String, String>>,
  programs: Vec<LiveProgram>,
  projects: HashMap<PathBuf, Arc<ProjectConfig>>,
  cache_hits: usize,
  programs_built: usize,
}

impl<C: Checker> ProgramContext<C> {
  pub fn new(checker: C, options: ContextOptions) -> ProgramContext<C> {
    ProgramContext {
      checker,
      options,
      state: ContextState::Uninitialized,
      virtual_files: HashMap::new(),
      programs: Vec::new(),
      projects: HashMap::new(),
      cache_hits: 0,
      programs_built: 0,
    }
  }

  pub fn state(&self) -> ContextState {
    self.state
  }

  pub fn cache_hits(&self) -> usize {
    self.cache_hits
  }

  pub fn programs_built(&self) -> usize {
    self.programs_built
  }

  pub fn checker_mut(&mut self) -> &mut C {
    &mut self.checker
  }

  /// Serves `contents` in place of `file` to every program of the file's project.
  pub fn set_virtual_file(&mut self, file: &str, contents: String) -> DtsResult<()> {
    let project = self.project_key(file)?;
    self
      .virtual_files
      .entry(project)
      .or_default()
      .insert(file.to_string(), contents);
    Ok(())
  }

  /// The program containing `file`, building one if no live program has it.
  pub fn program_for(&mut self, file: &str) -> DtsResult<ProgramId> {
    let project = self.project_key(file)?;
    // Composite programs also serve the files of the projects they merged.
    let build = self.options.build;
    if let Some(program) = self.programs.iter().find(|program| {
      !program.invalidated && (build || program.project == project) && program.files.contains(file)
    }) {
      self.cache_hits += 1;
      debug!(file, program = program.id.0, "program cache hit");
      return Ok(program.id);
    }
    self.build_program(file, project)
  }

  fn build_program(&mut self, file: &str, project: String) -> DtsResult<ProgramId> {
    let span = debug_span!("build_program", file, project = project.as_str());
    let _guard = span.enter();
    self.state = ContextState::Building;

    let config = self.project_config(file)?;
    let mut roots: Vec<String> = Vec::new();
    let mut options = Map::new();
    let mut build_info = None;
    if let Some(config) = &config {
      options = config.compiler_options.clone();
      roots.extend(config.root_files.iter().map(|path| normalize_path(path)));
      if self.options.build {
        let mut visited = HashSet::new();
        visited.insert(config.tsconfig_path.clone());
        self.collect_references(config, &mut roots, &mut visited)?;
        for key in PROJECT_LOCAL_OPTIONS {
          options.remove(key);
        }
      }
      if self.options.incremental {
        build_info = Some(build_info_path(&config.tsconfig_path));
      }
    }
    if !roots.iter().any(|root| root == file) {
      roots.push(file.to_string());
    }
    roots.sort();
    roots.dedup();

    for (key, value) in &self.options.compiler_options {
      options.insert(key.clone(), value.clone());
    }
    options.insert("declaration".into(), Value::Bool(true));
    options.insert("emitDeclarationOnly".into(), Value::Bool(true));
    options.insert("noEmit".into(), Value::Bool(false));
    options.insert("declarationMap".into(), Value::Bool(self.options.sourcemap));
    if self.options.incremental {
      options.insert("incremental".into(), Value::Bool(true));
    }

    let files = if self.options.incremental || self.options.build {
      self
        .virtual_files
        .values()
        .flat_map(|files| files.iter().map(|(k, v)| (k.clone(), v.clone())))
        .collect()
    } else {
      self.virtual_files.get(&project).cloned().unwrap_or_default()
    };

    let request = ProgramRequest {
      root_names: roots.clone(),
      options,
      files,
      build_info: build_info.clone(),
      force: !self.options.incremental,
    };
    let info = self.checker.create_program(request)?;
    self.programs_built += 1;
    debug!(program = info.id.0, roots = roots.len(), files = info.files.len(), "built program");

    // A rebuilt project replaces its invalidated programs.
    let mut stale = Vec::new();
    self.programs.retain(|program| {
      let keep = !(program.invalidated && program.project == project);
      if !keep {
        stale.push(program.id);
      }
      keep
    });
    for id in stale {
      self.checker.release(id)?;
    }

    let mut files: HashSet<String> = info.files.into_iter().collect();
    files.extend(roots.iter().cloned());
    self.programs.push(LiveProgram {
      id: info.id,
      project,
      roots,
      files,
      build_info,
      invalidated: false,
    });
    self.state = ContextState::Ready;
    Ok(info.id)
  }

  fn collect_references(
    &mut self,
    config: &ProjectConfig,
    roots: &mut Vec<String>,
    visited: &mut HashSet<PathBuf>,
  ) -> DtsResult<()> {
    for reference in &config.references {
      let referenced = self.load_config(reference)?;
      if !visited.insert(referenced.tsconfig_path.clone()) {
        continue;
      }
      roots.extend(referenced.root_files.iter().map(|path| normalize_path(path)));
      self.collect_references(&referenced, roots, visited)?;
    }
    Ok(())
  }

  /// Emits declarations for `file` from its program.
  pub fn emit(&mut self, file: &str) -> DtsResult<EmittedFiles> {
    let program = self.program_for(file)?;
    let mut outputs = Vec::new();
    let outcome = self.checker.emit(program, file, &mut |name, text| {
      outputs.push((name.to_string(), text.to_string()));
    })?;
    Ok(EmittedFiles { outcome, outputs })
  }

  /// Evicts every program built over `file`; returns the evicted programs.
  pub fn invalidate(&mut self, file: &str) -> Vec<ProgramId> {
    let mut evicted = Vec::new();
    for program in &mut self.programs {
      if !program.invalidated
        && (program.roots.iter().any(|root| root == file) || program.files.contains(file))
      {
        program.invalidated = true;
        evicted.push(program.id);
      }
    }
    if !evicted.is_empty() {
      debug!(file, programs = evicted.len(), "invalidated programs");
      self.state = ContextState::Invalidated;
    }
    // Configs may have changed too.
    if file.ends_with(".json") {
      self.projects.clear();
    }
    evicted
  }

  /// Called when a build finishes. In incremental mode every live program writes its build
  /// info and stays warm; otherwise nothing survives into the next build, including the
  /// checker's process.
  pub fn build_end(&mut self) -> DtsResult<()> {
    if self.options.incremental {
      for program in &self.programs {
        if program.invalidated {
          continue;
        }
        if let Some(build_info) = &program.build_info {
          debug!(program = program.id.0, build_info = build_info.as_str(), "saving build info");
          self.checker.save_build_info(program.id)?;
        }
      }
      return Ok(());
    }
    self.clear()?;
    self.checker.close();
    Ok(())
  }

  pub fn clear(&mut self) -> DtsResult<()> {
    for program in self.programs.drain(..) {
      self.checker.release(program.id)?;
    }
    self.virtual_files.clear();
    self.projects.clear();
    self.state = ContextState::Uninitialized;
    Ok(())
  }

  fn project_config(&mut self, file: &str) -> DtsResult<Option<Arc<ProjectConfig>>> {
    match self.tsconfig_for(file) {
      Some(path) => Ok(Some(self.load_config(&path)?)),
      None => Ok(None),
    }
  }

  fn load_config(&mut self, path: &Path) -> DtsResult<Arc<ProjectConfig>> {
    if let Some(config) = self.projects.get(path) {
      return Ok(config.clone());
    }
    let config = Arc::new(load_project_config(path)?);
    self.projects.insert(path.to_path_buf(), config.clone());
    Ok(config)
  }

  fn tsconfig_for(&self, file: &str) -> Option<PathBuf> {
    match &self.options.tsconfig {
      Some(path) => Some(path.clone()),
      None => find_tsconfig(Path::new(parent_dir(file))),
    }
  }

  /// Files without a project are grouped by their directory.
  fn project_key(&self, file: &str) -> DtsResult<String> {
    Ok(match self.tsconfig_for(file) {
      Some(path) => normalize_path(&path),
      None => parent_dir(file).to_string(),
    })
  }
}

/// Where the checker keeps incremental state for the project at `tsconfig`:
/// `<dir>/<stem>.tsbuildinfo`.
pub fn build_info_path(tsconfig: &Path) -> String {
  let stem = tsconfig
    .file_stem()
    .and_then(|stem| stem.to_str())
    .unwrap_or("tsconfig");
  let dir = tsconfig.parent().unwrap_or(Path::new("."));
  normalize_path(&dir.join(format!("{stem}.tsbuildinfo")))
}

#[cfg(test)]
mod tests {
  use super::build_info_path;
  use std::path::Path;

  #[test]
  fn build_info_sits_beside_the_config() {
    assert_eq!(
      build_info_path(Path::new("/repo/packages/a/tsconfig.build.json")),
      "/repo/packages/a/tsconfig.build.tsbuildinfo"
    );
  }
}
