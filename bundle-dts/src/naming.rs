//! Module id classification and declaration-shaped output file names.

use crate::host::ChunkInfo;

const DTS_SUFFIXES: [&str; 3] = [".d.ts", ".d.mts", ".d.cts"];

const TS_SOURCE_SUFFIXES: [&str; 4] = [".ts", ".tsx", ".mts", ".cts"];

/// Imports of these never carry declarations and are always left external.
const NON_CODE_EXTENSIONS: [&str; 22] = [
  "css", "scss", "sass", "less", "styl", "stylus", "pcss", "postcss", "sss", "json", "json5",
  "svg", "png", "jpg", "jpeg", "gif", "webp", "avif", "ico", "wasm", "txt", "html",
];

pub fn is_dts_id(id: &str) -> bool {
  DTS_SUFFIXES.iter().any(|suffix| id.ends_with(suffix))
}

pub fn is_ts_source(id: &str) -> bool {
  !is_dts_id(id) && TS_SOURCE_SUFFIXES.iter().any(|suffix| id.ends_with(suffix))
}

/// The declaration module id standing in for source file `id`.
///
/// `a.ts` and `a.tsx` map to `a.d.ts`, `a.mts` to `a.d.mts`, `a.cts` to `a.d.cts`. Other
/// files (component dialects) get `.d.ts` appended: `App.vue` becomes `App.vue.d.ts`.
pub fn dts_id_for(id: &str) -> String {
  for (ext, dts) in [
    (".tsx", ".d.ts"),
    (".mts", ".d.mts"),
    (".cts", ".d.cts"),
    (".ts", ".d.ts"),
  ] {
    if let Some(stem) = id.strip_suffix(ext) {
      return format!("{stem}{dts}");
    }
  }
  format!("{id}.d.ts")
}

pub fn is_non_code(specifier: &str) -> bool {
  let path = specifier.split(['?', '#']).next().unwrap_or(specifier);
  let file = path.rsplit('/').next().unwrap_or(path);
  match file.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => NON_CODE_EXTENSIONS
      .iter()
      .any(|known| ext.eq_ignore_ascii_case(known)),
    _ => false,
  }
}

/// Rewrites an import source pointing at a declaration file to the runtime file it describes:
/// `./a.d.ts` becomes `./a.js`.
pub fn runtime_specifier(source: &str) -> Option<String> {
  for (dts, js) in [(".d.ts", ".js"), (".d.mts", ".mjs"), (".d.cts", ".cjs")] {
    if let Some(stem) = source.strip_suffix(dts) {
      return Some(format!("{stem}{js}"));
    }
  }
  None
}

pub fn is_dts_chunk(chunk: &ChunkInfo) -> bool {
  chunk.name.ends_with(".d")
    || chunk.facade_module_id.as_deref().is_some_and(is_dts_id)
    || (!chunk.module_ids.is_empty() && chunk.module_ids.iter().all(|id| is_dts_id(id)))
}

/// Gives a declaration chunk's file-name pattern a declaration suffix.
///
/// A trailing `.js`/`.mjs`/`.cjs` becomes `.d.ts`/`.d.mts`/`.d.cts`; when the chunk name already
/// ends in `.d` only the extension changes, so `[name].js` with name `index.d` becomes
/// `[name].ts`. Patterns without a script extension are returned unchanged.
pub fn dts_file_name(pattern: &str, chunk_name: &str) -> String {
  let Some((stem, ext)) = pattern.rsplit_once('.') else {
    return pattern.to_string();
  };
  let ts_ext = match ext {
    "js" => "ts",
    "mjs" => "mts",
    "cjs" => "cts",
    _ => return pattern.to_string(),
  };
  if chunk_name.ends_with(".d") {
    format!("{stem}.{ts_ext}")
  } else {
    format!("{stem}.d.{ts_ext}")
  }
}

/// Whether an output file is a declaration file or the source map of one.
pub fn is_dts_output(file_name: &str) -> bool {
  is_dts_id(file_name.strip_suffix(".map").unwrap_or(file_name))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_sources_to_declaration_ids() {
    assert_eq!(dts_id_for("/src/a.ts"), "/src/a.d.ts");
    assert_eq!(dts_id_for("/src/a.tsx"), "/src/a.d.ts");
    assert_eq!(dts_id_for("/src/a.mts"), "/src/a.d.mts");
    assert_eq!(dts_id_for("/src/a.cts"), "/src/a.d.cts");
    assert_eq!(dts_id_for("/src/App.vue"), "/src/App.vue.d.ts");
    assert!(is_ts_source("/src/a.tsx"));
    assert!(!is_ts_source("/src/a.d.ts"));
    assert!(is_dts_id("/src/App.vue.d.ts"));
  }

  #[test]
  fn recognizes_non_code_imports() {
    assert!(is_non_code("./style.css"));
    assert!(is_non_code("./data.json?raw"));
    assert!(is_non_code("../logo.SVG"));
    assert!(!is_non_code("lodash.merge/index"));
    assert!(!is_non_code("./a"));
    assert!(!is_non_code("./.eslintrc"));
  }

  #[test]
  fn keeps_declaration_suffixes() {
    assert_eq!(dts_file_name("[name].js", "index.d"), "[name].ts");
    assert_eq!(dts_file_name("[name].mjs", "index.d"), "[name].mts");
    assert_eq!(dts_file_name("[name]-[hash].cjs", "shared"), "[name]-[hash].d.cts");
    assert_eq!(dts_file_name("[name].js", "shared"), "[name].d.ts");
    assert_eq!(dts_file_name("[name]", "index.d"), "[name]");
    assert_eq!(runtime_specifier("./a.d.mts").as_deref(), Some("./a.mjs"));
    assert_eq!(runtime_specifier("./a"), None);
  }
}
