//! Bundles TypeScript declaration files by riding on a host bundler.
//!
//! The [`DtsPlugin`] hooks into a host's build: every TypeScript module gets a declaration
//! module (generated by a [`DeclarationOracle`]), each declaration module is handed to the host
//! as synthetic value code the host can link and tree-shake (see [`fake`]), and each rendered
//! declaration chunk is turned back into declarations.
//!
//! ```no_run
//! use bundle_dts::DtsOptions;
//! use bundle_dts::DtsPlugin;
//!
//! let options = DtsOptions::from_json5(r#"{ tsconfig: "tsconfig.build.json", sideEffects: false }"#)?;
//! let plugin = DtsPlugin::new(options)?;
//! # Ok::<(), bundle_dts::DtsError>(())
//! ```

pub mod context;
pub mod error;
pub mod fake;
pub mod host;
pub mod naming;
pub mod options;
pub mod oracle;
pub mod plugin;
pub mod resolve;

pub use error::DtsError;
pub use error::DtsResult;
pub use fake::BuildRegistry;
pub use host::HostContext;
pub use host::Plugin;
pub use options::DtsOptions;
pub use oracle::create_oracle;
pub use oracle::DeclarationOracle;
pub use plugin::DtsPlugin;
