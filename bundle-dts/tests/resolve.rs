mod common;

use bundle_dts::host::EmittedChunk;
use bundle_dts::host::HostContext;
use bundle_dts::host::ResolvedId;
use bundle_dts::options::InlinePolicy;
use bundle_dts::oracle::dialect::is_script_block_file;
use bundle_dts::resolve::ts_node::ResolveOptions;
use bundle_dts::resolve::ts_node::Resolver;
use bundle_dts::resolve::ImportResolver;
use bundle_dts::resolve::InlineMatcher;
use bundle_dts::DtsError;
use bundle_dts::DtsResult;
use common::MemFs;
use std::cell::RefCell;
use std::collections::HashMap;

const IMPORTER: &str = "/project/src/index.d.ts";

/// Answers `resolve` from a fixed table and records every `load`.
#[derive(Default)]
struct RecordingHost {
  answers: HashMap<String, ResolvedId>,
  loaded: RefCell<Vec<String>>,
}

impl HostContext for RecordingHost {
  fn resolve(&self, specifier: &str, _importer: &str) -> Option<ResolvedId> {
    self.answers.get(specifier).cloned()
  }

  fn load(&self, id: &str) -> DtsResult<()> {
    self.loaded.borrow_mut().push(id.to_string());
    Ok(())
  }

  fn emit_chunk(&self, _chunk: EmittedChunk) {}

  fn is_entry(&self, _id: &str) -> bool {
    false
  }

  fn entry_name(&self, _id: &str) -> Option<String> {
    None
  }

  fn warn(&self, _message: &str) {}
}

fn no_dialect(_id: &str) -> bool {
  false
}

fn resolver(files: &[(&str, &str)], inline: InlinePolicy, strict: bool) -> ImportResolver<MemFs> {
  resolver_with(files, inline, strict, ResolveOptions::default())
}

fn resolver_with(
  files: &[(&str, &str)],
  inline: InlinePolicy,
  strict: bool,
  options: ResolveOptions,
) -> ImportResolver<MemFs> {
  ImportResolver::new(
    Resolver::with_fs(MemFs::new(files), options),
    InlineMatcher::new(&inline).unwrap(),
    strict,
    no_dialect,
  )
}

#[test]
fn typescript_sources_are_loaded_and_mapped_to_declarations() {
  let host = RecordingHost::default();
  let resolver = resolver(&[("src/util.ts", "")], InlinePolicy::default(), false);
  let resolved = resolver.resolve(&host, "./util.js", IMPORTER).unwrap();
  assert_eq!(resolved, Some(ResolvedId::internal("/project/src/util.d.ts")));
  assert_eq!(*host.loaded.borrow(), vec!["/project/src/util.ts"]);
}

#[test]
fn declaration_files_are_bundled_directly() {
  let host = RecordingHost::default();
  let resolver = resolver(&[("src/types.d.ts", "")], InlinePolicy::default(), false);
  assert_eq!(
    resolver.resolve(&host, "./types", IMPORTER).unwrap(),
    Some(ResolvedId::internal("/project/src/types.d.ts"))
  );
  assert!(host.loaded.borrow().is_empty());
}

#[test]
fn assets_and_plain_javascript_stay_external() {
  let host = RecordingHost::default();
  let resolver = resolver(&[("src/legacy.js", "")], InlinePolicy::default(), false);
  assert_eq!(
    resolver.resolve(&host, "./style.module.css", IMPORTER).unwrap(),
    Some(ResolvedId::external("./style.module.css"))
  );
  assert_eq!(
    resolver.resolve(&host, "./legacy.js", IMPORTER).unwrap(),
    Some(ResolvedId::external("./legacy.js"))
  );
}

#[test]
fn missing_relative_imports_fail() {
  let host = RecordingHost::default();
  let resolver = resolver(&[], InlinePolicy::default(), false);
  let err = resolver.resolve(&host, "./missing", IMPORTER).unwrap_err();
  assert!(matches!(err, DtsError::UnresolvedImport { .. }));
  assert_eq!(err.to_string(), "cannot resolve \"./missing\" from /project/src/index.d.ts");
}

#[test]
fn unknown_packages_depend_on_strictness() {
  let host = RecordingHost::default();
  let lenient = resolver(&[], InlinePolicy::default(), false);
  assert_eq!(
    lenient.resolve(&host, "left-pad", IMPORTER).unwrap(),
    Some(ResolvedId::external("left-pad"))
  );
  let strict = resolver(&[], InlinePolicy::default(), true);
  assert!(strict.resolve(&host, "left-pad", IMPORTER).is_err());
}

#[test]
fn packages_are_inlined_only_when_listed() {
  let files = &[
    ("node_modules/@scope/pkg/package.json", r#"{ "types": "./lib/index.d.ts" }"#),
    ("node_modules/@scope/pkg/lib/index.d.ts", ""),
  ];
  let host = RecordingHost::default();
  assert_eq!(
    resolver(files, InlinePolicy::default(), false)
      .resolve(&host, "@scope/pkg", IMPORTER)
      .unwrap(),
    Some(ResolvedId::external("@scope/pkg"))
  );
  assert_eq!(
    resolver(files, InlinePolicy::Packages(vec!["@scope/*".into()]), false)
      .resolve(&host, "@scope/pkg", IMPORTER)
      .unwrap(),
    Some(ResolvedId::internal("/project/node_modules/@scope/pkg/lib/index.d.ts"))
  );
}

#[test]
fn relative_imports_inside_inlined_packages_are_bundled() {
  let files = &[
    ("node_modules/dep/package.json", r#"{ "types": "./index.d.ts" }"#),
    ("node_modules/dep/index.d.ts", "export * from './sub';"),
    ("node_modules/dep/sub.d.ts", ""),
    ("node_modules/other/index.d.ts", ""),
  ];
  let host = RecordingHost::default();
  let resolver = resolver(files, InlinePolicy::Packages(vec!["dep".into()]), false);
  assert_eq!(
    resolver
      .resolve(&host, "./sub", "/project/node_modules/dep/index.d.ts")
      .unwrap(),
    Some(ResolvedId::internal("/project/node_modules/dep/sub.d.ts"))
  );
  assert_eq!(
    resolver
      .resolve(&host, "../other/index.d.ts", "/project/node_modules/dep/index.d.ts")
      .unwrap(),
    Some(ResolvedId::external("../other/index.d.ts"))
  );
}

#[test]
fn host_externals_win() {
  let mut host = RecordingHost::default();
  host.answers.insert(
    "virtual:config".into(),
    ResolvedId::external("virtual:config"),
  );
  let resolver = resolver(&[], InlinePolicy::default(), true);
  assert_eq!(
    resolver.resolve(&host, "virtual:config", IMPORTER).unwrap(),
    Some(ResolvedId::external("virtual:config"))
  );
}

#[test]
fn project_paths_are_followed() {
  let host = RecordingHost::default();
  let resolver = resolver_with(
    &[("src/lib/util.ts", "")],
    InlinePolicy::default(),
    true,
    ResolveOptions {
      base_url: None,
      paths: vec![("@lib/*".into(), vec!["src/lib/*".into()])],
      paths_base: Some("/project".into()),
    },
  );
  assert_eq!(
    resolver.resolve(&host, "@lib/util", IMPORTER).unwrap(),
    Some(ResolvedId::internal("/project/src/lib/util.d.ts"))
  );
}

#[test]
fn component_files_resolve_through_their_dialect() {
  let mut host = RecordingHost::default();
  host.answers.insert(
    "./App.vue".into(),
    ResolvedId::internal("/project/src/App.vue"),
  );
  let resolver = ImportResolver::new(
    Resolver::with_fs(MemFs::new(&[("src/App.vue", "")]), ResolveOptions::default()),
    InlineMatcher::new(&InlinePolicy::default()).unwrap(),
    false,
    is_script_block_file,
  );
  assert_eq!(
    resolver.resolve(&host, "./App.vue", IMPORTER).unwrap(),
    Some(ResolvedId::internal("/project/src/App.vue.d.ts"))
  );
  assert_eq!(*host.loaded.borrow(), vec!["/project/src/App.vue"]);
}
