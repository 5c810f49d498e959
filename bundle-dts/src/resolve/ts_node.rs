//! Declaration-aware module resolution, following TypeScript's `bundler` resolution mode.
//!
//! Lookups go through a [`ResolveFs`] so the same resolver runs against the real file system
//! and against in-memory trees in tests. Every path in and out is a normalized module id (see
//! [`super::path`]).

use super::path::is_absolute_specifier;
use super::path::is_relative_specifier;
use super::path::join;
use super::path::normalize_path;
use super::path::normalize_path_str;
use super::path::parent_dir;
use ahash::HashMap;
use ahash::HashMapExt;
use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

const EXPORT_CONDITIONS: [&str; 4] = ["types", "import", "require", "default"];

/// Extension probing order for an extensionless candidate.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
  "ts", "tsx", "d.ts", "mts", "d.mts", "cts", "d.cts", "js", "jsx", "mjs", "cjs",
];

const INDEX_FILES: [&str; 7] = [
  "index.ts",
  "index.tsx",
  "index.d.ts",
  "index.mts",
  "index.d.mts",
  "index.cts",
  "index.d.cts",
];

// Guards against `types` fields and `exports` targets that point back at each other.
const MAX_DEPTH: usize = 16;

#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
  /// `compilerOptions.baseUrl`, as an absolute module id.
  pub base_url: Option<String>,
  /// `compilerOptions.paths`, in declaration order.
  pub paths: Vec<(String, Vec<String>)>,
  /// Directory `paths` targets are relative to when there is no `baseUrl`.
  pub paths_base: Option<String>,
}

pub trait ResolveFs: Clone {
  fn is_file(&self, path: &Path) -> bool;
  fn is_dir(&self, path: &Path) -> bool;
  fn read_to_string(&self, _path: &Path) -> Option<String> {
    None
  }
  fn canonicalize(&self, path: &Path) -> Option<PathBuf>;
}

#[derive(Clone, Debug, Default)]
pub struct RealFs;

impl ResolveFs for RealFs {
  fn is_file(&self, path: &Path) -> bool {
    std::fs::metadata(path)
      .map(|m| m.is_file())
      .unwrap_or(false)
  }

  fn is_dir(&self, path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
  }

  fn read_to_string(&self, path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
  }

  fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
    path.canonicalize().ok()
  }
}

#[derive(Clone, Debug)]
pub struct Resolver<F = RealFs> {
  fs: F,
  options: ResolveOptions,
  package_json_cache: Arc<Mutex<HashMap<String, Option<Arc<Value>>>>>,
}

impl Resolver<RealFs> {
  pub fn new(options: ResolveOptions) -> Self {
    Resolver::with_fs(RealFs, options)
  }
}

impl<F: ResolveFs> Resolver<F> {
  pub fn with_fs(fs: F, options: ResolveOptions) -> Self {
    Self {
      fs,
      options,
      package_json_cache: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn fs(&self) -> &F {
    &self.fs
  }

  /// Resolves `specifier` imported from module `from` to a file, preferring declaration and
  /// TypeScript sources over JavaScript.
  pub fn resolve(&self, from: &str, specifier: &str) -> Option<String> {
    let from = normalize_path_str(from);
    if is_relative_specifier(specifier) {
      return self.resolve_file_or_dir(&join(parent_dir(&from), specifier), 0);
    }
    if is_absolute_specifier(specifier) {
      return self.resolve_file_or_dir(&normalize_path_str(specifier), 0);
    }
    if let Some(found) = self.resolve_paths(specifier) {
      return Some(found);
    }
    if let Some(base_url) = &self.options.base_url {
      if let Some(found) = self.resolve_file_or_dir(&join(base_url, specifier), 0) {
        return Some(found);
      }
    }
    self.resolve_node_modules(&from, specifier)
  }

  fn resolve_paths(&self, specifier: &str) -> Option<String> {
    let base = self
      .options
      .base_url
      .as_deref()
      .or(self.options.paths_base.as_deref())?;
    let mut best: Option<(&str, &[String], &str)> = None;
    for (pattern, targets) in &self.options.paths {
      let star = match pattern.split_once('*') {
        None if pattern == specifier => "",
        None => continue,
        Some((prefix, suffix)) => {
          if specifier.len() < prefix.len() + suffix.len()
            || !specifier.starts_with(prefix)
            || !specifier.ends_with(suffix)
          {
            continue;
          }
          &specifier[prefix.len()..specifier.len() - suffix.len()]
        }
      };
      // An exact match wins; otherwise the pattern with the longest prefix.
      let prefix_len = pattern.find('*').unwrap_or(usize::MAX);
      let better = match best {
        None => true,
        Some((current, _, _)) => prefix_len > current.find('*').unwrap_or(usize::MAX),
      };
      if better {
        best = Some((pattern, targets, star));
      }
    }
    let (_, targets, star) = best?;
    targets.iter().find_map(|target| {
      let substituted = target.replace('*', star);
      self.resolve_file_or_dir(&join(base, &substituted), 0)
    })
  }

  fn resolve_node_modules(&self, from: &str, specifier: &str) -> Option<String> {
    let (package, rest) = split_package_name(specifier)?;
    let subpath = rest.trim_start_matches('/');
    let exports_key = if subpath.is_empty() {
      ".".to_string()
    } else {
      format!("./{subpath}")
    };
    let types_name = types_fallback_name(specifier);

    let mut dir = parent_dir(from).to_string();
    loop {
      let package_dir = join(&join(&dir, "node_modules"), package);
      if let Some(found) = self.resolve_in_package(&package_dir, subpath, &exports_key) {
        return Some(found);
      }
      if let Some(types_name) = &types_name {
        let types_dir = join(&dir, "node_modules/@types");
        if let Some(found) = self.resolve_file_or_dir(&join(&types_dir, types_name), 0) {
          return Some(found);
        }
      }
      let parent = parent_dir(&dir);
      if parent == dir {
        return None;
      }
      dir = parent.to_string();
    }
  }

  fn resolve_in_package(&self, package_dir: &str, subpath: &str, exports_key: &str) -> Option<String> {
    if let Some(manifest) = self.package_json(&join(package_dir, "package.json")) {
      if let Some(exports) = manifest.get("exports") {
        // A package with `exports` hides every path it does not list.
        return select_exports_target(exports, exports_key).and_then(|(target, star)| {
          self.resolve_json_target(package_dir, target, star, 0)
        });
      }
    }
    if subpath.is_empty() {
      self.resolve_file_or_dir(package_dir, 0)
    } else {
      self.resolve_file_or_dir(&join(package_dir, subpath), 0)
    }
  }

  fn resolve_file_or_dir(&self, candidate: &str, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
      return None;
    }
    if is_source_file_name(candidate) {
      if let Some(found) = self.try_file(candidate) {
        return Some(found);
      }
    }

    // `./a.js` in an import means `./a.ts` (or its declaration) at check time.
    for (js, substitutes) in [
      (".js", &["ts", "tsx", "d.ts"][..]),
      (".jsx", &["tsx", "d.ts"][..]),
      (".mjs", &["mts", "d.mts"][..]),
      (".cjs", &["cts", "d.cts"][..]),
    ] {
      if let Some(stem) = candidate.strip_suffix(js) {
        for ext in substitutes {
          if let Some(found) = self.try_file(&format!("{stem}.{ext}")) {
            return Some(found);
          }
        }
      }
    }

    if !is_source_file_name(candidate) {
      for ext in DEFAULT_EXTENSIONS {
        if let Some(found) = self.try_file(&format!("{candidate}.{ext}")) {
          return Some(found);
        }
      }
      if let Some(found) = self.resolve_package_dir(candidate, depth) {
        return Some(found);
      }
    }

    INDEX_FILES
      .iter()
      .find_map(|index| self.try_file(&join(candidate, index)))
  }

  fn resolve_package_dir(&self, dir: &str, depth: usize) -> Option<String> {
    let manifest = self.package_json(&join(dir, "package.json"))?;
    for field in ["types", "typings"] {
      if let Some(entry) = manifest.get(field).and_then(Value::as_str) {
        if let Some(found) = self.resolve_json_string(dir, entry, depth + 1) {
          return Some(found);
        }
      }
    }
    if let Some(exports) = manifest.get("exports") {
      if let Some((target, star)) = select_exports_target(exports, ".") {
        if let Some(found) = self.resolve_json_target(dir, target, star, depth + 1) {
          return Some(found);
        }
      }
    }
    let main = manifest.get("main").and_then(Value::as_str)?;
    self.resolve_json_string(dir, main, depth + 1)
  }

  fn resolve_json_target(
    &self,
    base_dir: &str,
    value: &Value,
    star: Option<&str>,
    depth: usize,
  ) -> Option<String> {
    if depth > MAX_DEPTH {
      return None;
    }
    match value {
      Value::String(entry) => match star {
        Some(star) => self.resolve_json_string(base_dir, &entry.replace('*', star), depth + 1),
        None => self.resolve_json_string(base_dir, entry, depth + 1),
      },
      Value::Array(items) => items
        .iter()
        .find_map(|item| self.resolve_json_target(base_dir, item, star, depth + 1)),
      Value::Object(map) => EXPORT_CONDITIONS.iter().find_map(|condition| {
        map
          .get(*condition)
          .and_then(|next| self.resolve_json_target(base_dir, next, star, depth + 1))
      }),
      _ => None,
    }
  }

  fn resolve_json_string(&self, base_dir: &str, entry: &str, depth: usize) -> Option<String> {
    if entry.is_empty() {
      return None;
    }
    let target = if is_absolute_specifier(entry) {
      normalize_path_str(entry)
    } else {
      join(base_dir, entry)
    };
    self.resolve_file_or_dir(&target, depth)
  }

  fn try_file(&self, candidate: &str) -> Option<String> {
    let path = Path::new(candidate);
    if !self.fs.is_file(path) {
      return None;
    }
    Some(match self.fs.canonicalize(path) {
      Some(canonical) => normalize_path(&canonical),
      None => candidate.to_string(),
    })
  }

  fn package_json(&self, path: &str) -> Option<Arc<Value>> {
    if let Some(cached) = self.package_json_cache.lock().get(path) {
      return cached.clone();
    }
    let parsed = self
      .fs
      .read_to_string(Path::new(path))
      .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
      .map(Arc::new);
    self
      .package_json_cache
      .lock()
      .insert(path.to_string(), parsed.clone());
    parsed
  }
}

fn is_source_file_name(name: &str) -> bool {
  [
    ".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs",
  ]
  .iter()
  .any(|ext| name.ends_with(ext))
}

fn select_exports_target<'a, 'b>(
  exports: &'a Value,
  subpath: &'b str,
) -> Option<(&'a Value, Option<&'b str>)> {
  match exports {
    Value::Object(map) if map.keys().next().is_some_and(|k| k.starts_with('.')) => {
      if let Some(target) = map.get(subpath) {
        return Some((target, None));
      }
      let (pattern, star) = best_exports_subpath_pattern(map, subpath)?;
      Some((map.get(pattern)?, Some(star)))
    }
    _ => (subpath == ".").then_some((exports, None)),
  }
}

fn best_exports_subpath_pattern<'a, 'b>(
  map: &'a Map<String, Value>,
  subpath: &'b str,
) -> Option<(&'a str, &'b str)> {
  let mut best: Option<(&'a str, &'b str)> = None;
  for key in map.keys() {
    let Some((prefix, suffix)) = key.split_once('*') else {
      continue;
    };
    if suffix.contains('*')
      || subpath.len() < prefix.len() + suffix.len()
      || !subpath.starts_with(prefix)
      || !subpath.ends_with(suffix)
    {
      continue;
    }
    let star = &subpath[prefix.len()..subpath.len() - suffix.len()];
    let replace = match best {
      None => true,
      Some((existing, _)) => {
        key.len() > existing.len() || (key.len() == existing.len() && key.as_str() < existing)
      }
    };
    if replace {
      best = Some((key, star));
    }
  }
  best
}

/// The `@types/` directory name for a package specifier: `@scope/pkg/sub` maps to
/// `scope__pkg/sub`.
fn types_fallback_name(specifier: &str) -> Option<String> {
  let (package, rest) = split_package_name(specifier)?;
  if package.starts_with("@types/") {
    return None;
  }
  match package.strip_prefix('@') {
    Some(scoped) => {
      let (scope, name) = scoped.split_once('/')?;
      Some(format!("{scope}__{name}{rest}"))
    }
    None => Some(specifier.to_string()),
  }
}

/// Splits a bare specifier into its package name and the remaining subpath (with its leading
/// `/`).
pub fn split_package_name(specifier: &str) -> Option<(&str, &str)> {
  if specifier.is_empty() {
    return None;
  }
  let package_len = match specifier.strip_prefix('@') {
    Some(scoped) => {
      let (scope, rest) = scoped.split_once('/')?;
      let name_len = rest.find('/').unwrap_or(rest.len());
      1 + scope.len() + 1 + name_len
    }
    None => specifier.find('/').unwrap_or(specifier.len()),
  };
  Some(specifier.split_at(package_len))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  #[derive(Clone, Default)]
  struct FakeFs {
    files: BTreeMap<PathBuf, String>,
  }

  impl FakeFs {
    fn insert(&mut self, path: &str, contents: &str) {
      self.files.insert(PathBuf::from(path), contents.to_string());
    }
  }

  impl ResolveFs for FakeFs {
    fn is_file(&self, path: &Path) -> bool {
      self.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
      self.files.keys().any(|p| p.starts_with(path) && p != path)
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
      self.files.get(path).cloned()
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
      Some(path.to_path_buf())
    }
  }

  fn resolver(fs: FakeFs) -> Resolver<FakeFs> {
    Resolver::with_fs(fs, ResolveOptions::default())
  }

  #[test]
  fn substitutes_js_extensions_with_sources() {
    let mut fs = FakeFs::default();
    fs.insert("/src/a.ts", "");
    fs.insert("/src/b.d.mts", "");
    fs.insert("/src/dir/index.d.ts", "");
    let resolver = resolver(fs);
    assert_eq!(resolver.resolve("/src/main.ts", "./a.js").as_deref(), Some("/src/a.ts"));
    assert_eq!(resolver.resolve("/src/main.ts", "./a").as_deref(), Some("/src/a.ts"));
    assert_eq!(resolver.resolve("/src/main.ts", "./b.mjs").as_deref(), Some("/src/b.d.mts"));
    assert_eq!(resolver.resolve("/src/main.ts", "./dir").as_deref(), Some("/src/dir/index.d.ts"));
    assert_eq!(resolver.resolve("/src/main.ts", "./missing"), None);
  }

  #[test]
  fn prefers_types_conditions_in_exports() {
    let mut fs = FakeFs::default();
    fs.insert(
      "/node_modules/pkg/package.json",
      r#"{ "exports": { ".": { "types": "./dist/index.d.ts", "default": "./dist/index.js" }, "./sub/*": { "types": "./dist/sub/*.d.ts" } } }"#,
    );
    fs.insert("/node_modules/pkg/dist/index.d.ts", "");
    fs.insert("/node_modules/pkg/dist/index.js", "");
    fs.insert("/node_modules/pkg/dist/sub/x.d.ts", "");
    let resolver = resolver(fs);
    assert_eq!(
      resolver.resolve("/src/main.ts", "pkg").as_deref(),
      Some("/node_modules/pkg/dist/index.d.ts")
    );
    assert_eq!(
      resolver.resolve("/src/main.ts", "pkg/sub/x").as_deref(),
      Some("/node_modules/pkg/dist/sub/x.d.ts")
    );
    assert_eq!(resolver.resolve("/src/main.ts", "pkg/dist/index.js"), None);
  }

  #[test]
  fn reads_types_field_and_falls_back_to_at_types() {
    let mut fs = FakeFs::default();
    fs.insert("/node_modules/a/package.json", r#"{ "types": "./lib/a.d.ts" }"#);
    fs.insert("/node_modules/a/lib/a.d.ts", "");
    fs.insert("/node_modules/@types/b/index.d.ts", "");
    fs.insert("/node_modules/@types/scope__c/index.d.ts", "");
    let resolver = resolver(fs);
    assert_eq!(
      resolver.resolve("/src/deep/main.ts", "a").as_deref(),
      Some("/node_modules/a/lib/a.d.ts")
    );
    assert_eq!(
      resolver.resolve("/src/main.ts", "b").as_deref(),
      Some("/node_modules/@types/b/index.d.ts")
    );
    assert_eq!(
      resolver.resolve("/src/main.ts", "@scope/c").as_deref(),
      Some("/node_modules/@types/scope__c/index.d.ts")
    );
  }

  #[test]
  fn maps_paths_against_base_url() {
    let mut fs = FakeFs::default();
    fs.insert("/repo/src/lib/util.ts", "");
    fs.insert("/repo/src/env.d.ts", "");
    let resolver = Resolver::with_fs(fs, ResolveOptions {
      base_url: Some("/repo".into()),
      paths: vec![
        ("@lib/*".into(), vec!["src/lib/*".into()]),
        ("env".into(), vec!["src/env.d.ts".into()]),
      ],
      paths_base: None,
    });
    assert_eq!(
      resolver.resolve("/repo/src/main.ts", "@lib/util").as_deref(),
      Some("/repo/src/lib/util.ts")
    );
    assert_eq!(
      resolver.resolve("/repo/src/main.ts", "env").as_deref(),
      Some("/repo/src/env.d.ts")
    );
    assert_eq!(
      resolver.resolve("/repo/src/main.ts", "src/lib/util").as_deref(),
      Some("/repo/src/lib/util.ts")
    );
  }

  #[test]
  fn splits_scoped_package_names() {
    assert_eq!(split_package_name("@a/b/c"), Some(("@a/b", "/c")));
    assert_eq!(split_package_name("@a/b"), Some(("@a/b", "")));
    assert_eq!(split_package_name("pkg/x/y"), Some(("pkg", "/x/y")));
    assert_eq!(split_package_name("@a"), None);
  }
}
