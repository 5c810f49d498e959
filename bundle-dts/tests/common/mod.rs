#![allow(dead_code)]

//! A small in-memory bundler driving the plugin the way a real host does: it resolves, loads
//! and transforms modules through the hooks, links imports to exports, tree-shakes at
//! declarator granularity, renames colliding top-level names and renders one chunk per entry.

use bundle_dts::error::DtsError;
use bundle_dts::host::ChunkInfo;
use bundle_dts::host::EmittedChunk;
use bundle_dts::host::HostContext;
use bundle_dts::host::OutputBundle;
use bundle_dts::host::OutputFile;
use bundle_dts::host::OutputKind;
use bundle_dts::host::ResolvedId;
use bundle_dts::oracle::DeclarationOracle;
use bundle_dts::oracle::GenerateOutput;
use bundle_dts::oracle::GenerateRequest;
use bundle_dts::resolve::path::is_relative_specifier;
use bundle_dts::resolve::path::join;
use bundle_dts::resolve::path::normalize_path;
use bundle_dts::resolve::path::parent_dir;
use bundle_dts::resolve::ts_node::ResolveFs;
use bundle_dts::DtsOptions;
use bundle_dts::DtsPlugin;
use bundle_dts::DtsResult;
use bundle_dts::Plugin;
use emit_dts::emit_stmt;
use emit_dts::EmitOptions;
use parking_lot::Mutex;
use parse_dts::ast::expr::ArrowBody;
use parse_dts::ast::Ast;
use parse_dts::ast::NodeId;
use parse_dts::ast::Syntax;
use parse_dts::char::is_valid_identifier;
use parse_dts::parse_lenient;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

pub const ROOT: &str = "/project";

const MARKER: &str = "__dtsSideEffect";

#[derive(Clone, Debug, Default)]
pub struct MemFs {
  files: Arc<BTreeMap<String, String>>,
}

impl MemFs {
  pub fn new(files: &[(&str, &str)]) -> MemFs {
    MemFs {
      files: Arc::new(
        files
          .iter()
          .map(|(name, text)| (format!("{ROOT}/{name}"), text.to_string()))
          .collect(),
      ),
    }
  }

  pub fn read(&self, id: &str) -> Option<String> {
    self.files.get(id).cloned()
  }
}

impl ResolveFs for MemFs {
  fn is_file(&self, path: &Path) -> bool {
    self.files.contains_key(&normalize_path(path))
  }

  fn is_dir(&self, path: &Path) -> bool {
    let dir = format!("{}/", normalize_path(path).trim_end_matches('/'));
    self.files.keys().any(|file| file.starts_with(&dir))
  }

  fn read_to_string(&self, path: &Path) -> Option<String> {
    self.read(&normalize_path(path))
  }

  fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
    Some(path.to_path_buf())
  }
}

#[derive(Debug, Default)]
pub struct OracleLog {
  pub builds_started: usize,
  pub builds_ended: usize,
  pub generated: Vec<String>,
  pub prefetched: Vec<String>,
  pub invalidated: Vec<String>,
}

/// Treats every source as already being declarations.
pub struct VerbatimOracle {
  log: Arc<Mutex<OracleLog>>,
}

impl DeclarationOracle for VerbatimOracle {
  fn build_start(&mut self) -> DtsResult<()> {
    self.log.lock().builds_started += 1;
    Ok(())
  }

  fn generate(&mut self, request: &GenerateRequest) -> DtsResult<GenerateOutput> {
    self.log.lock().generated.push(request.id.clone());
    Ok(GenerateOutput::verbatim(&request.source))
  }

  fn prefetch(&mut self, request: &GenerateRequest) {
    self.log.lock().prefetched.push(request.id.clone());
  }

  fn invalidate(&mut self, file: &str) {
    self.log.lock().invalidated.push(file.to_string());
  }

  fn build_end(&mut self) -> DtsResult<()> {
    self.log.lock().builds_ended += 1;
    Ok(())
  }
}

pub fn options() -> DtsOptions {
  DtsOptions {
    cwd: PathBuf::from(ROOT),
    ..DtsOptions::default()
  }
}

pub fn plugin(fs: &MemFs, options: DtsOptions) -> (DtsPlugin<MemFs>, Arc<Mutex<OracleLog>>) {
  let log = Arc::new(Mutex::new(OracleLog::default()));
  let oracle = VerbatimOracle { log: log.clone() };
  let plugin = DtsPlugin::with_oracle(options, Box::new(oracle), fs.clone()).unwrap();
  (plugin, log)
}

/// Builds `entries` (`(name, path)` pairs, paths relative to [`ROOT`]) with default options.
pub fn bundle(files: &[(&str, &str)], entries: &[(&str, &str)]) -> DtsResult<BuildOutput> {
  bundle_with(files, entries, options())
}

pub fn bundle_with(
  files: &[(&str, &str)],
  entries: &[(&str, &str)],
  options: DtsOptions,
) -> DtsResult<BuildOutput> {
  let fs = MemFs::new(files);
  let (plugin, _) = plugin(&fs, options);
  MiniHost::new(&plugin, fs, entries).build()
}

pub struct BuildOutput {
  pub bundle: OutputBundle,
  /// Chunk code as the host rendered it, before `render_chunk`.
  pub raw: BTreeMap<String, String>,
  pub warnings: Vec<String>,
}

impl BuildOutput {
  pub fn code(&self, file_name: &str) -> &str {
    match self.bundle.get(file_name) {
      Some(file) => &file.code,
      None => panic!("no {file_name} in {:?}", self.bundle.keys().collect::<Vec<_>>()),
    }
  }
}

#[derive(Default)]
struct HostState {
  codes: HashMap<String, String>,
  emitted: Vec<EmittedChunk>,
  warnings: Vec<String>,
}

pub struct MiniHost<'p> {
  plugin: &'p dyn Plugin,
  fs: MemFs,
  entries: Vec<(String, String)>,
  state: RefCell<HostState>,
}

impl<'p> MiniHost<'p> {
  pub fn new(plugin: &'p dyn Plugin, fs: MemFs, entries: &[(&str, &str)]) -> MiniHost<'p> {
    MiniHost {
      plugin,
      fs,
      entries: entries
        .iter()
        .map(|(name, path)| (name.to_string(), format!("{ROOT}/{path}")))
        .collect(),
      state: RefCell::new(HostState::default()),
    }
  }

  pub fn build(&self) -> DtsResult<BuildOutput> {
    *self.state.borrow_mut() = HostState::default();
    self.plugin.build_start(self)?;
    for (_, id) in &self.entries {
      self.load_module(id)?;
    }

    let mut bundle = OutputBundle::new();
    for (name, _) in &self.entries {
      bundle.insert(
        format!("{name}.js"),
        OutputFile {
          kind: OutputKind::Chunk,
          code: "export {};\n".to_string(),
        },
      );
    }

    let mut raw = BTreeMap::new();
    let emitted = self.state.borrow().emitted.clone();
    for chunk in emitted {
      let entry = match self.plugin.resolve_id(self, &chunk.id, None)? {
        Some(resolved) => resolved.id,
        None => chunk.id.clone(),
      };
      let mut graph = Graph::default();
      self.visit(&entry, &mut graph)?;
      let code = graph.render(&entry);

      let mut info = ChunkInfo {
        file_name: String::new(),
        name: chunk.name.clone(),
        is_entry: true,
        facade_module_id: Some(entry.clone()),
        module_ids: graph.order.clone(),
      };
      let pattern = self
        .plugin
        .entry_file_name(&info, "[name].js")
        .unwrap_or_else(|| "[name].js".to_string());
      info.file_name = pattern.replace("[name]", &info.name);
      let rendered = self
        .plugin
        .render_chunk(self, &code, &info)?
        .unwrap_or_else(|| code.clone());
      raw.insert(info.file_name.clone(), code);
      bundle.insert(
        info.file_name,
        OutputFile {
          kind: OutputKind::Chunk,
          code: rendered,
        },
      );
    }

    self.plugin.generate_bundle(self, &mut bundle)?;
    self.plugin.build_end(self)?;
    let warnings = std::mem::take(&mut self.state.borrow_mut().warnings);
    Ok(BuildOutput {
      bundle,
      raw,
      warnings,
    })
  }

  fn load_module(&self, id: &str) -> DtsResult<String> {
    if let Some(code) = self.state.borrow().codes.get(id) {
      return Ok(code.clone());
    }
    let code = match self.plugin.load(self, id)? {
      Some(loaded) => loaded.code,
      None => self
        .fs
        .read(id)
        .ok_or_else(|| DtsError::Io(io::Error::new(io::ErrorKind::NotFound, id.to_string())))?,
    };
    let code = match self.plugin.transform(self, &code, id)? {
      Some(transformed) => transformed.code,
      None => code,
    };
    self
      .state
      .borrow_mut()
      .codes
      .insert(id.to_string(), code.clone());
    Ok(code)
  }

  fn target(&self, importer: &str, specifier: &str) -> DtsResult<Target> {
    let resolved = match self.plugin.resolve_id(self, specifier, Some(importer))? {
      Some(resolved) => Some(resolved),
      None => HostContext::resolve(self, specifier, importer),
    };
    Ok(match resolved {
      Some(resolved) if !resolved.external => Target::Internal(resolved.id),
      Some(resolved) => Target::External(resolved.id),
      None => {
        self.warn(&format!("{specifier} is treated as external"));
        Target::External(specifier.to_string())
      }
    })
  }

  fn visit(&self, id: &str, graph: &mut Graph) -> DtsResult<()> {
    if !graph.visiting.insert(id.to_string()) {
      return Ok(());
    }
    let code = self.load_module(id)?;
    let program = parse_lenient(&mut graph.ast, &code).map_err(|error| DtsError::Syntax {
      file: id.to_string(),
      error,
    })?;

    let mut module = Module {
      stmts: program.body.clone(),
      ..Module::default()
    };
    let mut dependencies = Vec::new();
    for &stmt in &program.body {
      let syntax = graph.ast[stmt].clone();
      match syntax {
        Syntax::ImportDecl(import) => {
          let target = self.target(id, &import.source)?;
          dependencies.push(target.clone());
          if let Some(local) = import.default {
            module.imports.insert(
              ident(&graph.ast, local),
              Import::Named(target.clone(), "default".to_string()),
            );
          }
          if let Some(local) = import.namespace {
            module
              .imports
              .insert(ident(&graph.ast, local), Import::Namespace(target.clone()));
          }
          for spec in import.named.unwrap_or_default() {
            if let Syntax::ImportSpecifier(spec) = &graph.ast[spec] {
              module.imports.insert(
                ident(&graph.ast, spec.local),
                Import::Named(target.clone(), spec.imported.clone()),
              );
            }
          }
        }
        Syntax::ExportNamed(export) => {
          let target = match &export.source {
            Some(source) => {
              let target = self.target(id, source)?;
              dependencies.push(target.clone());
              Some(target)
            }
            None => None,
          };
          for spec in export.specifiers {
            if let Syntax::ExportSpecifier(spec) = &graph.ast[spec] {
              let local = ident(&graph.ast, spec.local);
              let export = match &target {
                Some(target) => Export::Reexport(target.clone(), local),
                None => Export::Local(local),
              };
              module.exports.push((spec.exported.clone(), export));
            }
          }
        }
        Syntax::ExportAll(all) => {
          let target = self.target(id, &all.source)?;
          dependencies.push(target.clone());
          match all.alias {
            Some(alias) => module.exports.push((alias, Export::Namespace(target))),
            None => module.stars.push(target),
          }
        }
        Syntax::VarDecl(var) => {
          for declarator in var.declarators {
            if let Syntax::VarDeclarator(d) = &graph.ast[declarator] {
              module
                .decls
                .push((ident(&graph.ast, d.name), stmt, declarator));
            }
          }
        }
        Syntax::ExprStmt(_) => module.effects.push(stmt),
        _ => {}
      }
    }

    for dependency in dependencies {
      if let Target::Internal(dependency) = dependency {
        self.visit(&dependency, graph)?;
      }
    }
    graph.order.push(id.to_string());
    graph.modules.insert(id.to_string(), module);
    Ok(())
  }
}

impl HostContext for MiniHost<'_> {
  fn resolve(&self, specifier: &str, importer: &str) -> Option<ResolvedId> {
    if !is_relative_specifier(specifier) {
      return None;
    }
    let id = join(parent_dir(importer), specifier);
    self.fs.read(&id).map(|_| ResolvedId::internal(id))
  }

  fn load(&self, id: &str) -> DtsResult<()> {
    self.load_module(id).map(|_| ())
  }

  fn emit_chunk(&self, chunk: EmittedChunk) {
    self.state.borrow_mut().emitted.push(chunk);
  }

  fn is_entry(&self, id: &str) -> bool {
    self.entries.iter().any(|(_, entry)| entry == id)
  }

  fn entry_name(&self, id: &str) -> Option<String> {
    self
      .entries
      .iter()
      .find(|(_, entry)| entry == id)
      .map(|(name, _)| name.clone())
  }

  fn warn(&self, message: &str) {
    self.state.borrow_mut().warnings.push(message.to_string());
  }
}

fn ident(ast: &Ast, id: NodeId) -> String {
  ast.ident_name(id).unwrap_or_default().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Target {
  Internal(String),
  External(String),
}

#[derive(Clone, Debug)]
enum Import {
  Named(Target, String),
  Namespace(Target),
}

#[derive(Clone, Debug)]
enum Export {
  Local(String),
  Reexport(Target, String),
  Namespace(Target),
}

/// What a name finally refers to after following imports and re-exports.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Binding {
  Decl(String, String),
  Namespace(String),
  /// `(source, imported)`; `imported` is `*` for a namespace import.
  External(String, String),
}

#[derive(Default)]
struct Module {
  stmts: Vec<NodeId>,
  imports: HashMap<String, Import>,
  exports: Vec<(String, Export)>,
  stars: Vec<Target>,
  /// `(name, statement, declarator)` in source order.
  decls: Vec<(String, NodeId, NodeId)>,
  effects: Vec<NodeId>,
}

#[derive(Default)]
struct Included {
  declarators: HashSet<NodeId>,
  namespaces: Vec<String>,
  externals: Vec<Binding>,
  hints: HashMap<Binding, String>,
  globals: HashSet<String>,
}

#[derive(Default)]
struct Graph {
  ast: Ast,
  modules: HashMap<String, Module>,
  order: Vec<String>,
  visiting: HashSet<String>,
}

/// Identifiers referenced in `id`, skipping names bound by enclosing arrow parameters.
fn free_idents(ast: &Ast, id: NodeId, bound: &mut Vec<String>, out: &mut Vec<(NodeId, String)>) {
  match &ast[id] {
    Syntax::Ident(ident) => {
      if !bound.contains(&ident.name) {
        out.push((id, ident.name.clone()));
      }
    }
    Syntax::ArrowFunc(arrow) => {
      let depth = bound.len();
      bound.extend(arrow.params.iter().map(|&param| self::ident(ast, param)));
      if let ArrowBody::Expr(body) = arrow.body {
        free_idents(ast, body, bound, out);
      }
      bound.truncate(depth);
    }
    _ => {
      for child in ast.children(id) {
        free_idents(ast, child, bound, out);
      }
    }
  }
}

fn refs(ast: &Ast, id: NodeId) -> Vec<(NodeId, String)> {
  let mut out = Vec::new();
  free_idents(ast, id, &mut Vec::new(), &mut out);
  out
}

fn init_of(ast: &Ast, declarator: NodeId) -> Option<NodeId> {
  match &ast[declarator] {
    Syntax::VarDeclarator(d) => d.init,
    _ => None,
  }
}

fn namespace_name(id: &str) -> String {
  let file = id.rsplit('/').next().unwrap_or(id);
  let stem = [".d.ts", ".d.mts", ".d.cts"]
    .iter()
    .find_map(|suffix| file.strip_suffix(suffix))
    .unwrap_or(file);
  let stem: String = stem
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
    .collect();
  format!("{stem}_exports")
}

impl Graph {
  fn module(&self, id: &str) -> &Module {
    &self.modules[id]
  }

  fn export_names(&self, id: &str, depth: usize) -> Vec<String> {
    let module = self.module(id);
    let mut names: Vec<String> = module.exports.iter().map(|(name, _)| name.clone()).collect();
    if depth > 16 {
      return names;
    }
    for star in &module.stars {
      if let Target::Internal(star) = star {
        for name in self.export_names(star, depth + 1) {
          if name != "default" && !names.contains(&name) {
            names.push(name);
          }
        }
      }
    }
    names
  }

  fn external_stars(&self, id: &str, depth: usize, out: &mut Vec<String>) {
    if depth > 16 {
      return;
    }
    for star in &self.module(id).stars {
      match star {
        Target::External(source) if !out.contains(source) => out.push(source.clone()),
        Target::Internal(star) => self.external_stars(star, depth + 1, out),
        _ => {}
      }
    }
  }

  fn resolve_export(&self, id: &str, name: &str, depth: usize) -> Option<Binding> {
    if depth > 16 {
      return None;
    }
    let module = self.module(id);
    if let Some((_, export)) = module.exports.iter().find(|(exported, _)| exported == name) {
      return match export {
        Export::Local(local) => self.resolve_local(id, local, depth + 1),
        Export::Reexport(Target::Internal(m), imported) => self.resolve_export(m, imported, depth + 1),
        Export::Reexport(Target::External(source), imported) => {
          Some(Binding::External(source.clone(), imported.clone()))
        }
        Export::Namespace(Target::Internal(m)) => Some(Binding::Namespace(m.clone())),
        Export::Namespace(Target::External(source)) => {
          Some(Binding::External(source.clone(), "*".to_string()))
        }
      };
    }
    if name == "default" {
      return None;
    }
    module.stars.iter().find_map(|star| match star {
      Target::Internal(m) => self.resolve_export(m, name, depth + 1),
      Target::External(_) => None,
    })
  }

  fn resolve_local(&self, id: &str, local: &str, depth: usize) -> Option<Binding> {
    let module = self.module(id);
    if module.decls.iter().any(|(name, _, _)| name == local) {
      return Some(Binding::Decl(id.to_string(), local.to_string()));
    }
    match module.imports.get(local)? {
      Import::Named(Target::Internal(m), imported) => self.resolve_export(m, imported, depth + 1),
      Import::Named(Target::External(source), imported) => {
        Some(Binding::External(source.clone(), imported.clone()))
      }
      Import::Namespace(Target::Internal(m)) => Some(Binding::Namespace(m.clone())),
      Import::Namespace(Target::External(source)) => {
        Some(Binding::External(source.clone(), "*".to_string()))
      }
    }
  }

  fn include(&self, binding: Binding, hint: &str, included: &mut Included) {
    included
      .hints
      .entry(binding.clone())
      .or_insert_with(|| hint.to_string());
    match binding {
      Binding::Decl(id, name) => {
        let Some(&(_, _, declarator)) = self.module(&id).decls.iter().find(|(n, _, _)| *n == name)
        else {
          return;
        };
        if included.declarators.insert(declarator) {
          if let Some(init) = init_of(&self.ast, declarator) {
            self.include_refs(&id, init, included);
          }
        }
      }
      Binding::Namespace(id) => {
        if included.namespaces.contains(&id) {
          return;
        }
        included.namespaces.push(id.clone());
        for name in self.export_names(&id, 0) {
          if let Some(binding) = self.resolve_export(&id, &name, 0) {
            self.include(binding, &name, included);
          }
        }
      }
      external @ Binding::External(..) => {
        if !included.externals.contains(&external) {
          included.externals.push(external);
        }
      }
    }
  }

  fn include_refs(&self, id: &str, node: NodeId, included: &mut Included) {
    for (_, name) in refs(&self.ast, node) {
      match self.resolve_local(id, &name, 0) {
        Some(binding) => self.include(binding, &name, included),
        None => {
          included.globals.insert(name);
        }
      }
    }
  }

  fn tree_shake(&self, entry: &str) -> Included {
    let mut included = Included::default();
    included.globals.insert("__export".to_string());
    for id in &self.order {
      let module = self.module(id);
      for &effect in &module.effects {
        self.include_refs(id, effect, &mut included);
      }
      for (name, _, declarator) in &module.decls {
        let keeps_itself = init_of(&self.ast, *declarator)
          .is_some_and(|init| refs(&self.ast, init).iter().any(|(_, n)| n == MARKER));
        if keeps_itself {
          self.include(Binding::Decl(id.clone(), name.clone()), name, &mut included);
        }
      }
    }
    for name in self.export_names(entry, 0) {
      if let Some(binding) = self.resolve_export(entry, &name, 0) {
        self.include(binding, &name, &mut included);
      }
    }
    included
  }

  fn assign_names(&self, included: &Included) -> HashMap<Binding, String> {
    let mut taken = included.globals.clone();
    let mut names = HashMap::new();
    let claim = |base: &str, taken: &mut HashSet<String>| {
      let mut name = base.to_string();
      let mut n = 1;
      while taken.contains(&name) {
        name = format!("{base}${n}");
        n += 1;
      }
      taken.insert(name.clone());
      name
    };
    for external in &included.externals {
      let hint = &included.hints[external];
      let base = match external {
        Binding::External(_, imported) if is_valid_identifier(imported) && imported != "default" => {
          imported.clone()
        }
        _ => hint.clone(),
      };
      names.insert(external.clone(), claim(&base, &mut taken));
    }
    for id in &self.order {
      if included.namespaces.contains(id) {
        let binding = Binding::Namespace(id.clone());
        names.insert(binding, claim(&namespace_name(id), &mut taken));
      }
      for (name, _, declarator) in &self.module(id).decls {
        if included.declarators.contains(declarator) {
          let binding = Binding::Decl(id.clone(), name.clone());
          names.insert(binding, claim(name, &mut taken));
        }
      }
    }
    names
  }

  fn render_imports(&self, included: &Included, names: &HashMap<Binding, String>) -> String {
    let mut sources: Vec<&str> = Vec::new();
    for external in &included.externals {
      if let Binding::External(source, _) = external {
        if !sources.contains(&source.as_str()) {
          sources.push(source);
        }
      }
    }
    let mut out = String::new();
    for source in sources {
      let mut default = None;
      let mut named = Vec::new();
      for external in &included.externals {
        let Binding::External(from, imported) = external else {
          continue;
        };
        if from != source {
          continue;
        }
        let local = &names[external];
        match imported.as_str() {
          "*" => out.push_str(&format!("import * as {local} from \"{source}\";\n")),
          "default" => default = Some(local.clone()),
          _ if local == imported => named.push(local.clone()),
          _ => named.push(format!("{imported} as {local}")),
        }
      }
      let named = (!named.is_empty()).then(|| format!("{{ {} }}", named.join(", ")));
      let clause = match (default, named) {
        (Some(default), Some(named)) => format!("{default}, {named}"),
        (Some(default), None) => default,
        (None, Some(named)) => named,
        (None, None) => continue,
      };
      out.push_str(&format!("import {clause} from \"{source}\";\n"));
    }
    out
  }

  fn render(&mut self, entry: &str) -> String {
    let included = self.tree_shake(entry);
    let names = self.assign_names(&included);
    let mut out = self.render_imports(&included, &names);

    for id in self.order.clone() {
      let mut body = Vec::new();
      if included.namespaces.contains(&id) {
        let name = &names[&Binding::Namespace(id.clone())];
        let mut members = Vec::new();
        for export in self.export_names(&id, 0) {
          if let Some(binding) = self.resolve_export(&id, &export, 0) {
            let key = if is_valid_identifier(&export) {
              export.clone()
            } else {
              format!("\"{export}\"")
            };
            members.push(format!("  {key}: () => {}", names[&binding]));
          }
        }
        body.push(format!("var {name} = {{}};"));
        body.push(format!("__export({name}, {{\n{}\n}});", members.join(",\n")));
      }

      let stmts = self.module(&id).stmts.clone();
      let effects = self.module(&id).effects.clone();
      for stmt in stmts {
        if effects.contains(&stmt) {
          self.rename_refs(&id, stmt, &names);
          body.push(self.print(stmt));
          continue;
        }
        let Syntax::VarDecl(var) = self.ast[stmt].clone() else {
          continue;
        };
        let kept: Vec<NodeId> = var
          .declarators
          .iter()
          .copied()
          .filter(|declarator| included.declarators.contains(declarator))
          .collect();
        if kept.is_empty() {
          continue;
        }
        for &declarator in &kept {
          let (name_id, init) = match &self.ast[declarator] {
            Syntax::VarDeclarator(d) => (d.name, d.init),
            _ => continue,
          };
          let name = ident(&self.ast, name_id);
          let canonical = names[&Binding::Decl(id.clone(), name)].clone();
          self.ast.rename_ident(name_id, &canonical);
          if let Some(init) = init {
            self.rename_refs(&id, init, &names);
          }
        }
        if let Syntax::VarDecl(var) = &mut self.ast[stmt] {
          var.declarators = kept;
        }
        body.push(self.print(stmt));
      }

      if !body.is_empty() {
        let region = id.strip_prefix(&format!("{ROOT}/")).unwrap_or(&id);
        out.push_str(&format!("//#region {region}\n{}\n//#endregion\n", body.join("\n")));
      }
    }

    let mut specifiers = Vec::new();
    for exported in self.export_names(entry, 0) {
      let Some(local) = self
        .resolve_export(entry, &exported, 0)
        .and_then(|binding| names.get(&binding))
      else {
        continue;
      };
      if *local == exported {
        specifiers.push(exported);
      } else {
        specifiers.push(format!("{local} as {exported}"));
      }
    }
    if !specifiers.is_empty() {
      out.push_str(&format!("export {{ {} }};\n", specifiers.join(", ")));
    }
    let mut stars = Vec::new();
    self.external_stars(entry, 0, &mut stars);
    for source in stars {
      out.push_str(&format!("export * from \"{source}\";\n"));
    }
    out
  }

  fn rename_refs(&mut self, id: &str, node: NodeId, names: &HashMap<Binding, String>) {
    for (ident_id, name) in refs(&self.ast, node) {
      let canonical = self
        .resolve_local(id, &name, 0)
        .and_then(|binding| names.get(&binding).cloned());
      if let Some(canonical) = canonical {
        self.ast.rename_ident(ident_id, &canonical);
      }
    }
  }

  fn print(&self, stmt: NodeId) -> String {
    match emit_stmt(&self.ast, stmt, EmitOptions::default()) {
      Ok(text) => text,
      Err(err) => panic!("cannot print host statement: {err:?}"),
    }
  }
}
