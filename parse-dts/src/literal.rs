//! String literal helpers shared by the parser and printers.

/// Decodes a quoted JavaScript string literal (`"a\n"` or `'a'`) into its value.
///
/// Invalid escapes are kept verbatim rather than rejected; module specifiers and property
/// names are the only literals whose value matters here.
pub fn unquote(raw: &str) -> String {
  let inner = match raw.chars().next() {
    Some(q @ ('"' | '\'' | '`')) if raw.len() >= 2 && raw.ends_with(q) => &raw[1..raw.len() - 1],
    _ => raw,
  };
  let mut out = String::with_capacity(inner.len());
  let mut chars = inner.chars().peekable();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('r') => out.push('\r'),
      Some('t') => out.push('\t'),
      Some('b') => out.push('\u{8}'),
      Some('f') => out.push('\u{c}'),
      Some('v') => out.push('\u{b}'),
      Some('0') => out.push('\0'),
      Some('\r') => {
        if chars.peek() == Some(&'\n') {
          chars.next();
        }
      }
      Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
      Some('x') => {
        let hex: String = chars.by_ref().take(2).collect();
        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
          Some(decoded) => out.push(decoded),
          None => {
            out.push_str("\\x");
            out.push_str(&hex);
          }
        }
      }
      Some('u') => {
        let hex: String = if chars.peek() == Some(&'{') {
          chars.next();
          chars.by_ref().take_while(|&c| c != '}').collect()
        } else {
          chars.by_ref().take(4).collect()
        };
        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
          Some(decoded) => out.push(decoded),
          None => {
            out.push_str("\\u");
            out.push_str(&hex);
          }
        }
      }
      Some(other) => out.push(other),
      None => out.push('\\'),
    }
  }
  out
}

/// Encodes `value` as a double-quoted string literal.
pub fn quote(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for c in value.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\u{2028}' => out.push_str("\\u2028"),
      '\u{2029}' => out.push_str("\\u2029"),
      c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

#[cfg(test)]
mod tests {
  use super::quote;
  use super::unquote;

  #[test]
  fn unquote_escapes() {
    assert_eq!(unquote(r#""a\"b""#), "a\"b");
    assert_eq!(unquote(r"'\x41B\u{43}'"), "ABC");
    assert_eq!(unquote("'./foo'"), "./foo");
  }

  #[test]
  fn quote_round_trips() {
    for value in ["plain", "with \"quotes\"", "back\\slash", "line\nbreak"] {
      assert_eq!(unquote(&quote(value)), value);
    }
  }
}
