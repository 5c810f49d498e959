//! Import resolution for declaration modules.
//!
//! Decides, for every import a declaration module makes, whether the target is bundled (and
//! under which declaration id) or left as an external import.

pub mod path;
pub mod ts_node;

use crate::error::DtsError;
use crate::error::DtsResult;
use crate::host::HostContext;
use crate::host::ResolvedId;
use crate::naming::dts_id_for;
use crate::naming::is_dts_id;
use crate::naming::is_non_code;
use crate::naming::is_ts_source;
use crate::options::InlinePolicy;
use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use path::is_absolute_specifier;
use path::is_in_node_modules;
use path::is_relative_specifier;
use path::node_modules_package;
use path::normalize_path_str;
use tracing::debug;
use ts_node::split_package_name;
use ts_node::ResolveFs;
use ts_node::Resolver;

/// Which `node_modules` packages get bundled.
#[derive(Clone, Debug)]
pub struct InlineMatcher {
  all: bool,
  names: Vec<String>,
  globs: GlobSet,
}

impl InlineMatcher {
  pub fn new(policy: &InlinePolicy) -> DtsResult<InlineMatcher> {
    let mut names = Vec::new();
    let mut builder = GlobSetBuilder::new();
    let all = match policy {
      InlinePolicy::All(all) => *all,
      InlinePolicy::Packages(packages) => {
        for package in packages {
          if package.contains(['*', '?', '[', '{']) {
            let glob = Glob::new(package)
              .map_err(|err| DtsError::Config(format!("invalid resolve pattern {package}: {err}")))?;
            builder.add(glob);
          } else {
            names.push(package.clone());
          }
        }
        false
      }
    };
    let globs = builder
      .build()
      .map_err(|err| DtsError::Config(format!("invalid resolve patterns: {err}")))?;
    Ok(InlineMatcher { all, names, globs })
  }

  /// Whether the package a bare `specifier` names should be bundled.
  pub fn matches(&self, specifier: &str) -> bool {
    if self.all {
      return true;
    }
    let package = split_package_name(specifier)
      .map(|(package, _)| package)
      .unwrap_or(specifier);
    self.names.iter().any(|name| name == package || name == specifier)
      || self.globs.is_match(package)
      || self.globs.is_match(specifier)
  }
}

pub struct ImportResolver<F: ResolveFs> {
  resolver: Resolver<F>,
  inline: InlineMatcher,
  strict: bool,
  is_dialect_file: fn(&str) -> bool,
}

impl<F: ResolveFs> ImportResolver<F> {
  pub fn new(
    resolver: Resolver<F>,
    inline: InlineMatcher,
    strict: bool,
    is_dialect_file: fn(&str) -> bool,
  ) -> ImportResolver<F> {
    ImportResolver {
      resolver,
      inline,
      strict,
      is_dialect_file,
    }
  }

  /// Resolves an import made by declaration module `importer`.
  ///
  /// Source files found on the way are loaded through the host first, so their declaration
  /// module exists before the host asks for it.
  pub fn resolve(
    &self,
    ctx: &dyn HostContext,
    specifier: &str,
    importer: &str,
  ) -> DtsResult<Option<ResolvedId>> {
    if is_non_code(specifier) {
      return Ok(Some(ResolvedId::external(specifier)));
    }

    let from_host = ctx.resolve(specifier, importer);
    if let Some(resolved) = &from_host {
      if resolved.external {
        return Ok(Some(resolved.clone()));
      }
    }
    let from_host = from_host.map(|resolved| normalize_path_str(&resolved.id));
    let from_fs = self.resolver.resolve(importer, specifier);
    let usable = |id: &String| is_dts_id(id) || is_ts_source(id) || (self.is_dialect_file)(id);
    // The declaration-aware answer wins when both are usable.
    let target = match (from_fs, from_host) {
      (Some(fs), _) if usable(&fs) => Some(fs),
      (_, Some(host)) if usable(&host) => Some(host),
      (Some(fs), _) => Some(fs),
      (None, host) => host,
    };

    let Some(target) = target else {
      if is_relative_specifier(specifier) || is_absolute_specifier(specifier) {
        return Err(DtsError::UnresolvedImport {
          specifier: specifier.to_string(),
          importer: importer.to_string(),
        });
      }
      if self.strict {
        return Err(DtsError::UnresolvedImport {
          specifier: specifier.to_string(),
          importer: importer.to_string(),
        });
      }
      debug!(specifier, importer, "unresolved bare import left external");
      return Ok(Some(ResolvedId::external(specifier)));
    };

    if is_in_node_modules(&target) {
      // Paths inside a package are judged by the package they land in.
      let bare = !is_relative_specifier(specifier) && !is_absolute_specifier(specifier);
      let inlined = (bare && self.inline.matches(specifier))
        || node_modules_package(&target).is_some_and(|package| self.inline.matches(package));
      if !inlined {
        return Ok(Some(ResolvedId::external(specifier)));
      }
    }
    if is_dts_id(&target) {
      return Ok(Some(ResolvedId::internal(target)));
    }
    if is_ts_source(&target) || (self.is_dialect_file)(&target) {
      ctx.load(&target)?;
      return Ok(Some(ResolvedId::internal(dts_id_for(&target))));
    }
    // Plain JavaScript has no declarations to bundle.
    Ok(Some(ResolvedId::external(specifier)))
  }
}

#[cfg(test)]
mod tests {
  use super::InlineMatcher;
  use crate::options::InlinePolicy;

  #[test]
  fn matches_names_and_globs() {
    let matcher = InlineMatcher::new(&InlinePolicy::Packages(vec![
      "lodash".into(),
      "@scope/*".into(),
    ]))
    .unwrap();
    assert!(matcher.matches("lodash"));
    assert!(matcher.matches("lodash/merge"));
    assert!(matcher.matches("@scope/pkg/sub"));
    assert!(!matcher.matches("react"));
    assert!(InlineMatcher::new(&InlinePolicy::All(true)).unwrap().matches("react"));
    assert!(!InlineMatcher::new(&InlinePolicy::All(false)).unwrap().matches("react"));
  }
}
