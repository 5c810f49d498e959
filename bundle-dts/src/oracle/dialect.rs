//! Component-file dialects: files whose TypeScript lives inside a markup container.

/// Maps a component file to the TypeScript the checker should see for it.
pub trait Dialect: Send {
  fn matches(&self, id: &str) -> bool;
  fn virtual_source(&self, code: &str) -> String;
}

const SCRIPT_BLOCK_EXTENSIONS: [&str; 2] = [".vue", ".svelte"];

pub fn is_script_block_file(id: &str) -> bool {
  let path = id.split(['?', '#']).next().unwrap_or(id);
  SCRIPT_BLOCK_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Extracts `<script lang="ts">` blocks. A `setup` block is placed after the plain block.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptBlockDialect;

impl Dialect for ScriptBlockDialect {
  fn matches(&self, id: &str) -> bool {
    is_script_block_file(id)
  }

  fn virtual_source(&self, code: &str) -> String {
    let mut plain = Vec::new();
    let mut setup = Vec::new();
    for block in script_blocks(code) {
      if !is_typescript(block.attrs) {
        continue;
      }
      if has_attr(block.attrs, "setup") {
        setup.push(block.body);
      } else {
        plain.push(block.body);
      }
    }
    let mut out = String::new();
    for body in plain.into_iter().chain(setup) {
      out.push_str(body.trim_matches('\n'));
      out.push('\n');
    }
    if out.is_empty() {
      out.push_str("export {};\n");
    }
    out
  }
}

struct ScriptBlock<'a> {
  attrs: &'a str,
  body: &'a str,
}

fn script_blocks(code: &str) -> Vec<ScriptBlock<'_>> {
  let mut blocks = Vec::new();
  let mut rest = code;
  while let Some(start) = rest.find("<script") {
    let after_tag = &rest[start + "<script".len()..];
    // `<scripts>` and friends are not script tags.
    if !after_tag.starts_with(|c: char| c.is_whitespace() || c == '>') {
      rest = after_tag;
      continue;
    }
    let Some(tag_end) = after_tag.find('>') else {
      break;
    };
    let attrs = &after_tag[..tag_end];
    let content = &after_tag[tag_end + 1..];
    let Some(close) = content.find("</script>") else {
      break;
    };
    blocks.push(ScriptBlock {
      attrs,
      body: &content[..close],
    });
    rest = &content[close + "</script>".len()..];
  }
  blocks
}

fn is_typescript(attrs: &str) -> bool {
  ["lang=\"ts\"", "lang='ts'", "lang=\"tsx\"", "lang='tsx'", "lang=ts"]
    .iter()
    .any(|lang| attrs.contains(lang))
}

fn has_attr(attrs: &str, name: &str) -> bool {
  attrs
    .split(|c: char| c.is_whitespace())
    .any(|attr| attr == name || attr.starts_with(&format!("{name}=")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_typescript_blocks_with_setup_last() {
    let sfc = r#"<template><div /></template>
<script setup lang="ts">
const count: number = 1;
</script>
<script lang="ts">
export interface Props { label: string }
</script>
<style>.a {}</style>
"#;
    let view = ScriptBlockDialect.virtual_source(sfc);
    assert_eq!(
      view,
      "export interface Props { label: string }\nconst count: number = 1;\n"
    );
  }

  #[test]
  fn ignores_plain_javascript_blocks() {
    let view = ScriptBlockDialect.virtual_source("<script>export default {}</script>");
    assert_eq!(view, "export {};\n");
    assert!(ScriptBlockDialect.matches("/src/App.vue"));
    assert!(ScriptBlockDialect.matches("/src/Button.svelte?type=script"));
    assert!(!ScriptBlockDialect.matches("/src/a.ts"));
  }
}
