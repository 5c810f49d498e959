use crate::error::DtsError;
use crate::error::DtsResult;
use crate::resolve::path::normalize_path;
use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Compiler options whose values are paths relative to the config file declaring them.
const PATH_OPTIONS: [&str; 6] = [
  "baseUrl",
  "rootDir",
  "outDir",
  "declarationDir",
  "outFile",
  "tsBuildInfoFile",
];

#[derive(Debug, Clone)]
pub struct ProjectConfig {
  pub tsconfig_path: PathBuf,
  pub root_dir: PathBuf,
  /// Merged `compilerOptions` of the whole `extends` chain, path options made absolute.
  pub compiler_options: Map<String, Value>,
  pub base_url: Option<PathBuf>,
  pub paths: Vec<(String, Vec<String>)>,
  pub root_files: Vec<PathBuf>,
  /// Config files of referenced projects.
  pub references: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Extends {
  One(String),
  Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
struct RawReference {
  path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
  #[serde(default)]
  extends: Option<Extends>,
  #[serde(default)]
  compiler_options: Map<String, Value>,
  #[serde(default)]
  files: Option<Vec<String>>,
  #[serde(default)]
  include: Option<Vec<String>>,
  #[serde(default)]
  exclude: Option<Vec<String>>,
  #[serde(default)]
  references: Vec<RawReference>,
}

/// Finds the nearest `tsconfig.json` at or above `dir`.
pub fn find_tsconfig(dir: &Path) -> Option<PathBuf> {
  dir
    .ancestors()
    .map(|ancestor| ancestor.join("tsconfig.json"))
    .find(|candidate| candidate.is_file())
}

pub fn load_project_config(project: &Path) -> DtsResult<ProjectConfig> {
  let tsconfig_path = resolve_tsconfig_path(project)?;
  let root_dir = tsconfig_path
    .parent()
    .ok_or_else(|| config_error(format!("invalid tsconfig path {}", tsconfig_path.display())))?
    .to_path_buf();
  let mut visited = HashSet::new();
  let raw = load_raw_config(&tsconfig_path, &mut visited)?;

  let base_url = raw
    .compiler_options
    .get("baseUrl")
    .and_then(Value::as_str)
    .map(PathBuf::from);
  let paths = match raw.compiler_options.get("paths") {
    Some(Value::Object(map)) => map
      .iter()
      .map(|(pattern, targets)| {
        let targets = match targets {
          Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
          _ => Vec::new(),
        };
        (pattern.clone(), targets)
      })
      .collect(),
    _ => Vec::new(),
  };

  let root_files = discover_root_files(&root_dir, &raw)?;
  let references = raw
    .references
    .iter()
    .map(|reference| {
      let path = resolve_path_relative_to(&root_dir, Path::new(&reference.path));
      if path.is_dir() {
        path.join("tsconfig.json")
      } else {
        path
      }
    })
    .collect();

  Ok(ProjectConfig {
    tsconfig_path,
    root_dir,
    compiler_options: raw.compiler_options,
    base_url,
    paths,
    root_files,
    references,
  })
}

fn config_error(message: String) -> DtsError {
  DtsError::Config(message)
}

fn resolve_tsconfig_path(project: &Path) -> DtsResult<PathBuf> {
  let candidate = if project.is_dir() {
    project.join("tsconfig.json")
  } else {
    project.to_path_buf()
  };
  let absolute = if candidate.is_absolute() {
    candidate
  } else {
    std::env::current_dir()?.join(candidate)
  };
  absolute
    .canonicalize()
    .map_err(|err| config_error(format!("failed to read tsconfig {}: {err}", absolute.display())))
}

fn load_raw_config(path: &Path, visited: &mut HashSet<PathBuf>) -> DtsResult<RawTsConfig> {
  let canonical = path
    .canonicalize()
    .map_err(|err| config_error(format!("failed to read tsconfig {}: {err}", path.display())))?;
  if !visited.insert(canonical.clone()) {
    return Err(config_error(format!(
      "cycle detected while resolving tsconfig extends: {}",
      canonical.display()
    )));
  }

  let text = fs::read_to_string(&canonical)?;
  let mut current: RawTsConfig = json5::from_str(&text)
    .map_err(|err| config_error(format!("failed to parse {}: {err}", canonical.display())))?;
  let config_dir = canonical
    .parent()
    .ok_or_else(|| config_error(format!("invalid tsconfig path {}", canonical.display())))?
    .to_path_buf();
  absolutize_path_options(&mut current.compiler_options, &config_dir);

  let extends = match current.extends.take() {
    None => return Ok(current),
    Some(Extends::One(one)) => vec![one],
    Some(Extends::Many(many)) => many,
  };

  // Later entries of an `extends` array override earlier ones.
  let mut base: Option<RawTsConfig> = None;
  for extends in extends {
    let extends_path = resolve_extends_path(&config_dir, &extends)?;
    let loaded = load_raw_config(&extends_path, visited)?;
    base = Some(match base {
      None => loaded,
      Some(base) => merge_raw_configs(base, loaded),
    });
  }
  Ok(match base {
    Some(base) => merge_raw_configs(base, current),
    None => current,
  })
}

fn absolutize_path_options(options: &mut Map<String, Value>, config_dir: &Path) {
  for key in PATH_OPTIONS {
    if let Some(Value::String(raw)) = options.get(key) {
      let absolute = resolve_path_relative_to(config_dir, Path::new(raw));
      options.insert(key.to_string(), Value::String(normalize_path(&absolute)));
    }
  }
  // `paths` without `baseUrl` is relative to the config that declares it.
  if options.contains_key("paths") && !options.contains_key("baseUrl") {
    options.insert(
      "baseUrl".to_string(),
      Value::String(normalize_path(config_dir)),
    );
  }
}

fn resolve_extends_path(config_dir: &Path, extends: &str) -> DtsResult<PathBuf> {
  if extends.starts_with('.') || Path::new(extends).is_absolute() {
    return resolve_extends_file(&resolve_path_relative_to(config_dir, Path::new(extends)));
  }

  for ancestor in config_dir.ancestors() {
    let base = ancestor.join("node_modules").join(extends);
    if let Ok(resolved) = resolve_extends_file(&base) {
      return Ok(resolved);
    }
  }

  Err(config_error(format!(
    "failed to resolve tsconfig extends '{extends}' from {}",
    config_dir.display()
  )))
}

fn resolve_extends_file(candidate: &Path) -> DtsResult<PathBuf> {
  let mut attempts = vec![candidate.to_path_buf()];
  if candidate.extension().is_none() {
    attempts.push(candidate.with_extension("json"));
  }
  if candidate.is_dir() {
    attempts.push(candidate.join("tsconfig.json"));
  }

  for attempt in attempts {
    if attempt.is_file() {
      return Ok(attempt.canonicalize()?);
    }
  }

  Err(config_error(format!(
    "extended tsconfig {} does not exist",
    candidate.display()
  )))
}

fn merge_raw_configs(base: RawTsConfig, overlay: RawTsConfig) -> RawTsConfig {
  let mut compiler_options = base.compiler_options;
  compiler_options.extend(overlay.compiler_options);
  RawTsConfig {
    extends: None,
    compiler_options,
    files: overlay.files.or(base.files),
    include: overlay.include.or(base.include),
    exclude: overlay.exclude.or(base.exclude),
    // References are never inherited.
    references: overlay.references,
  }
}

fn discover_root_files(root_dir: &Path, raw: &RawTsConfig) -> DtsResult<Vec<PathBuf>> {
  if let Some(files) = raw.files.as_ref() {
    let mut resolved = Vec::new();
    for file in files {
      let path = resolve_path_relative_to(root_dir, Path::new(file));
      resolved.push(path.canonicalize().map_err(|err| {
        config_error(format!("failed to read project file {}: {err}", path.display()))
      })?);
    }
    resolved.sort();
    resolved.dedup();
    return Ok(resolved);
  }

  let include = raw
    .include
    .clone()
    .unwrap_or_else(|| vec!["**/*".to_string()]);
  let exclude = match raw.exclude.clone() {
    Some(patterns) => patterns,
    None => vec![
      "node_modules".to_string(),
      "bower_components".to_string(),
      "jspm_packages".to_string(),
    ],
  };

  let include_set = build_globset(&include)?;
  let exclude_set = build_globset(&exclude)?;

  let mut files = Vec::new();
  for entry in WalkDir::new(root_dir)
    .follow_links(false)
    .into_iter()
    .filter_entry(|entry| {
      // Never descend into dependency directories, whatever `exclude` says.
      entry.depth() == 0 || entry.file_name() != "node_modules"
    })
    .filter_map(|entry| entry.ok())
  {
    if !entry.file_type().is_file() || !is_supported_source_file(entry.path()) {
      continue;
    }
    let Ok(rel) = entry.path().strip_prefix(root_dir) else {
      continue;
    };
    if !include_set.is_match(rel) || exclude_set.is_match(rel) {
      continue;
    }
    files.push(
      entry
        .path()
        .canonicalize()
        .unwrap_or_else(|_| entry.path().to_path_buf()),
    );
  }

  files.sort();
  files.dedup();
  Ok(files)
}

fn build_globset(patterns: &[String]) -> DtsResult<GlobSet> {
  let mut builder = GlobSetBuilder::new();
  for pat in patterns {
    let normalized = expand_directory_pattern(pat.trim().trim_start_matches("./"));
    if normalized.is_empty() {
      continue;
    }
    let glob = Glob::new(&normalized)
      .map_err(|err| config_error(format!("invalid glob pattern '{pat}': {err}")))?;
    builder.add(glob);
  }
  builder
    .build()
    .map_err(|err| config_error(format!("failed to build glob matcher: {err}")))
}

fn expand_directory_pattern(pattern: &str) -> String {
  if pattern.is_empty() || contains_glob_magic(pattern) {
    return pattern.to_string();
  }
  let trimmed = pattern.trim_end_matches('/');
  if trimmed.is_empty() {
    return "**/*".to_string();
  }
  match Path::new(trimmed).extension() {
    Some(_) => trimmed.to_string(),
    None => format!("{trimmed}/**/*"),
  }
}

fn contains_glob_magic(pattern: &str) -> bool {
  pattern
    .chars()
    .any(|ch| matches!(ch, '*' | '?' | '[' | ']'))
}

fn is_supported_source_file(path: &Path) -> bool {
  let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
  [".ts", ".tsx", ".mts", ".cts"]
    .iter()
    .any(|ext| name.ends_with(ext))
}

fn resolve_path_relative_to(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}
