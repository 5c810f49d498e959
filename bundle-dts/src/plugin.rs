use crate::context::tsconfig::find_tsconfig;
use crate::context::tsconfig::load_project_config;
use crate::error::DtsResult;
use crate::fake::reassemble::ReassembleOptions;
use crate::fake::synthesize::SynthesizeOptions;
use crate::fake::BuildRegistry;
use crate::fake::DeclModule;
use crate::host::ChunkInfo;
use crate::host::EmittedChunk;
use crate::host::HostContext;
use crate::host::LoadOutput;
use crate::host::OutputBundle;
use crate::host::Plugin;
use crate::host::ResolvedId;
use crate::naming::dts_file_name;
use crate::naming::dts_id_for;
use crate::naming::is_dts_chunk;
use crate::naming::is_dts_id;
use crate::naming::is_dts_output;
use crate::naming::is_ts_source;
use crate::options::DtsOptions;
use crate::oracle::create_oracle;
use crate::oracle::dialect::is_script_block_file;
use crate::oracle::DeclarationOracle;
use crate::oracle::GenerateRequest;
use crate::resolve::path::normalize_path;
use crate::resolve::ts_node::RealFs;
use crate::resolve::ts_node::ResolveFs;
use crate::resolve::ts_node::ResolveOptions;
use crate::resolve::ts_node::Resolver;
use crate::resolve::ImportResolver;
use crate::resolve::InlineMatcher;
use parking_lot::Mutex;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tracing::info;

fn no_dialect(_id: &str) -> bool {
  false
}

/// Bundles the declarations of a build's TypeScript modules into declaration chunks.
///
/// Hooks never hold a lock while calling back into the host, so a host that loads modules
/// from inside `resolve_id` can re-enter the plugin.
pub struct DtsPlugin<F: ResolveFs = RealFs> {
  options: DtsOptions,
  registry: Mutex<BuildRegistry>,
  oracle: Mutex<Box<dyn DeclarationOracle>>,
  fs: F,
  resolver: RwLock<Arc<ImportResolver<F>>>,
  is_dialect_file: fn(&str) -> bool,
}

impl DtsPlugin<RealFs> {
  pub fn new(options: DtsOptions) -> DtsResult<DtsPlugin<RealFs>> {
    let oracle = create_oracle(&options)?;
    DtsPlugin::with_oracle(options, oracle, RealFs)
  }
}

impl<F: ResolveFs> DtsPlugin<F> {
  /// A plugin generating declarations with `oracle` and resolving imports on `fs`.
  pub fn with_oracle(
    options: DtsOptions,
    oracle: Box<dyn DeclarationOracle>,
    fs: F,
  ) -> DtsResult<DtsPlugin<F>> {
    options.validate()?;
    let is_dialect_file = match options.dialect {
      Some(_) => is_script_block_file as fn(&str) -> bool,
      None => no_dialect,
    };
    let resolver = ImportResolver::new(
      Resolver::with_fs(fs.clone(), ResolveOptions::default()),
      InlineMatcher::new(&options.resolve)?,
      options.strict_resolve,
      is_dialect_file,
    );
    Ok(DtsPlugin {
      options,
      registry: Mutex::new(BuildRegistry::new()),
      oracle: Mutex::new(oracle),
      fs,
      resolver: RwLock::new(Arc::new(resolver)),
      is_dialect_file,
    })
  }

  pub fn options(&self) -> &DtsOptions {
    &self.options
  }

  /// Number of declaration symbols created so far in this build.
  pub fn symbol_count(&self) -> usize {
    self.registry.lock().symbol_count()
  }

  fn is_source(&self, id: &str) -> bool {
    is_ts_source(id) || (self.is_dialect_file)(id)
  }

  /// `paths` and `baseUrl` of the project, when there is one.
  fn project_resolve_options(&self) -> DtsResult<ResolveOptions> {
    let tsconfig = self
      .options
      .tsconfig_path()
      .or_else(|| find_tsconfig(&self.options.cwd));
    let Some(tsconfig) = tsconfig else {
      return Ok(ResolveOptions::default());
    };
    let config = load_project_config(&tsconfig)?;
    let base_url = config
      .base_url
      .as_deref()
      .map(|base| normalize_path(&config.root_dir.join(base)));
    Ok(ResolveOptions {
      base_url,
      paths: config.paths,
      paths_base: Some(normalize_path(&config.root_dir)),
    })
  }

  fn entry_chunk_name(ctx: &dyn HostContext, id: &str) -> String {
    let name = ctx.entry_name(id).unwrap_or_else(|| {
      Path::new(id)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string())
    });
    format!("{name}.d")
  }

  fn register_source(&self, ctx: &dyn HostContext, code: &str, id: &str) {
    let dts_id = dts_id_for(id);
    let is_entry = ctx.is_entry(id);
    self.registry.lock().register(DeclModule {
      dts_id: dts_id.clone(),
      source_id: id.to_string(),
      source: code.to_string(),
      is_entry,
    });
    debug!(id, dts_id = dts_id.as_str(), is_entry, "registered declaration module");
    if is_entry {
      ctx.emit_chunk(EmittedChunk {
        id: dts_id,
        name: Self::entry_chunk_name(ctx, id),
      });
      self
        .oracle
        .lock()
        .prefetch(&GenerateRequest::new(id, code));
    }
  }

  fn synthesize(&self, code: &str, id: &str) -> DtsResult<LoadOutput> {
    let mut registry = self.registry.lock();
    if !registry.is_registered(id) {
      registry.register(DeclModule {
        dts_id: id.to_string(),
        source_id: id.to_string(),
        source: code.to_string(),
        is_entry: false,
      });
    }
    let code = registry.synthesize(
      id,
      code,
      SynthesizeOptions {
        side_effects: self.options.side_effects,
      },
    )?;
    Ok(LoadOutput { code, map: None })
  }
}

impl<F: ResolveFs> Plugin for DtsPlugin<F> {
  fn name(&self) -> &'static str {
    "bundle-dts"
  }

  fn build_start(&self, _ctx: &dyn HostContext) -> DtsResult<()> {
    *self.registry.lock() = BuildRegistry::new();
    let resolve_options = self.project_resolve_options()?;
    let resolver = ImportResolver::new(
      Resolver::with_fs(self.fs.clone(), resolve_options),
      InlineMatcher::new(&self.options.resolve)?,
      self.options.strict_resolve,
      self.is_dialect_file,
    );
    *self.resolver.write() = Arc::new(resolver);
    self.oracle.lock().build_start()
  }

  fn resolve_id(
    &self,
    ctx: &dyn HostContext,
    specifier: &str,
    importer: Option<&str>,
  ) -> DtsResult<Option<ResolvedId>> {
    if self.registry.lock().is_registered(specifier) {
      return Ok(Some(ResolvedId::internal(specifier)));
    }
    let Some(importer) = importer.filter(|importer| is_dts_id(importer)) else {
      return Ok(None);
    };
    let resolver = Arc::clone(&self.resolver.read());
    resolver.resolve(ctx, specifier, importer)
  }

  fn load(&self, _ctx: &dyn HostContext, id: &str) -> DtsResult<Option<LoadOutput>> {
    let module = match self.registry.lock().module(id) {
      Some(module) => module.clone(),
      None => return Ok(None),
    };
    if is_dts_id(&module.source_id) {
      return Ok(Some(LoadOutput {
        code: module.source,
        map: None,
      }));
    }
    info!(source = module.source_id.as_str(), "generating declarations");
    let output = self
      .oracle
      .lock()
      .generate(&GenerateRequest::new(module.source_id, module.source))?;
    Ok(Some(LoadOutput {
      code: output.code,
      map: output.map,
    }))
  }

  fn transform(
    &self,
    ctx: &dyn HostContext,
    code: &str,
    id: &str,
  ) -> DtsResult<Option<LoadOutput>> {
    if is_dts_id(id) {
      return self.synthesize(code, id).map(Some);
    }
    if self.is_source(id) {
      self.register_source(ctx, code, id);
    }
    Ok(None)
  }

  fn render_chunk(
    &self,
    _ctx: &dyn HostContext,
    code: &str,
    chunk: &ChunkInfo,
  ) -> DtsResult<Option<String>> {
    if !is_dts_chunk(chunk) {
      return Ok(None);
    }
    let mut rendered = self.registry.lock().reassemble(
      &chunk.file_name,
      code,
      &chunk.module_ids,
      ReassembleOptions {
        cjs_default: self.options.cjs_default,
      },
    )?;
    if let Some(banner) = &self.options.banner {
      rendered = format!("{banner}\n{rendered}");
    }
    if let Some(footer) = &self.options.footer {
      rendered.push_str(footer);
      rendered.push('\n');
    }
    Ok(Some(rendered))
  }

  fn generate_bundle(&self, _ctx: &dyn HostContext, bundle: &mut OutputBundle) -> DtsResult<()> {
    if self.options.emit_dts_only {
      bundle.retain(|file_name, _| is_dts_output(file_name));
    }
    Ok(())
  }

  fn build_end(&self, _ctx: &dyn HostContext) -> DtsResult<()> {
    self.oracle.lock().build_end()
  }

  fn watch_change(&self, id: &str) {
    self.oracle.lock().invalidate(id);
  }

  fn entry_file_name(&self, chunk: &ChunkInfo, pattern: &str) -> Option<String> {
    is_dts_chunk(chunk).then(|| dts_file_name(pattern, &chunk.name))
  }

  fn chunk_file_name(&self, chunk: &ChunkInfo, pattern: &str) -> Option<String> {
    is_dts_chunk(chunk).then(|| dts_file_name(pattern, &chunk.name))
  }
}
