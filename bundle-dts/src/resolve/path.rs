//! POSIX-style path strings used as module ids.
//!
//! Module ids handed to and from the host are normalized so the same file always has the same
//! id, whatever separators or `.`/`..` segments a specifier used to reach it.

use std::path::Path;

/// Normalizes an OS path into a module id.
pub fn normalize_path(path: &Path) -> String {
  normalize_path_str(&path.to_string_lossy())
}

/// Normalizes a path string:
///
/// - backslashes become `/`
/// - `.` segments are removed and `..` pops a segment
/// - drive letters are lowercased (`C:\src` becomes `c:/src`)
/// - relative inputs keep their relative form (`./a/../b` becomes `b`)
pub fn normalize_path_str(name: &str) -> String {
  let path = name.replace('\\', "/");
  let mut rest = path.as_str();
  let mut prefix = String::new();
  let bytes = rest.as_bytes();
  if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
    prefix.push(bytes[0].to_ascii_lowercase() as char);
    prefix.push_str(":/");
    rest = rest[2..].trim_start_matches('/');
  } else if rest.starts_with('/') {
    prefix.push('/');
    rest = rest.trim_start_matches('/');
  }

  let mut components: Vec<&str> = Vec::new();
  for part in rest.split('/') {
    match part {
      "" | "." => {}
      ".." => {
        if matches!(components.last(), Some(last) if *last != "..") {
          components.pop();
        } else if prefix.is_empty() {
          components.push("..");
        }
      }
      part => components.push(part),
    }
  }

  let joined = components.join("/");
  if prefix.is_empty() && joined.is_empty() {
    ".".to_string()
  } else {
    prefix + &joined
  }
}

fn is_drive_root(dir: &str) -> bool {
  let bytes = dir.as_bytes();
  bytes.len() == 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// The directory containing `path`; roots are their own parent.
pub fn parent_dir(path: &str) -> &str {
  if path == "/" || is_drive_root(path) {
    return path;
  }
  let trimmed = path.trim_end_matches('/');
  match trimmed.rfind('/') {
    None => ".",
    Some(0) => "/",
    Some(2) if is_drive_root(&trimmed[..3]) => &trimmed[..3],
    Some(idx) => &trimmed[..idx],
  }
}

/// Joins `segment` onto `base` and normalizes the result.
pub fn join(base: &str, segment: &str) -> String {
  if segment.starts_with('/') {
    return normalize_path_str(segment);
  }
  let mut joined = String::with_capacity(base.len() + 1 + segment.len());
  joined.push_str(base);
  if !base.ends_with('/') {
    joined.push('/');
  }
  joined.push_str(segment);
  normalize_path_str(&joined)
}

pub fn is_relative_specifier(specifier: &str) -> bool {
  specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

pub fn is_absolute_specifier(specifier: &str) -> bool {
  let bytes = specifier.as_bytes();
  specifier.starts_with('/')
    || specifier.starts_with('\\')
    || (bytes.len() >= 3
      && bytes[0].is_ascii_alphabetic()
      && bytes[1] == b':'
      && (bytes[2] == b'/' || bytes[2] == b'\\'))
}

pub fn is_in_node_modules(id: &str) -> bool {
  id.contains("/node_modules/")
}

/// Name of the package holding `id` (`pkg` or `@scope/pkg`), from its last `node_modules` entry.
pub fn node_modules_package(id: &str) -> Option<&str> {
  let (_, rest) = id.rsplit_once("/node_modules/")?;
  let mut end = rest.find('/').unwrap_or(rest.len());
  if rest.starts_with('@') {
    end = match rest[end..].get(1..).and_then(|tail| tail.find('/')) {
      Some(next) => end + 1 + next,
      None => rest.len(),
    };
  }
  let package = &rest[..end];
  (!package.is_empty()).then_some(package)
}
