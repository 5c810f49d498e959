use once_cell::sync::Lazy;

pub const ECMASCRIPT_LINE_TERMINATORS: [char; 4] = ['\n', '\r', '\u{2028}', '\u{2029}'];

#[inline]
pub fn is_line_terminator(c: char) -> bool {
  ECMASCRIPT_LINE_TERMINATORS.contains(&c)
}

/// Whitespace that is not a line terminator.
#[inline]
pub fn is_whitespace(c: char) -> bool {
  matches!(
    c,
    '\x09'
      | '\x0b'
      | '\x0c'
      | '\x20'
      | '\u{00A0}'
      | '\u{1680}'
      | '\u{2000}'..='\u{200A}'
      | '\u{202F}'
      | '\u{205F}'
      | '\u{3000}'
      | '\u{FEFF}'
  )
}

// ASCII lookup tables; every non-ASCII character that is not whitespace is treated as an
// identifier character.
static ASCII_ID_START: Lazy<[bool; 128]> = Lazy::new(|| {
  let mut table = [false; 128];
  for c in ('a'..='z').chain('A'..='Z').chain(['$', '_']) {
    table[c as usize] = true;
  }
  table
});

static ASCII_ID_CONTINUE: Lazy<[bool; 128]> = Lazy::new(|| {
  let mut table = *ASCII_ID_START;
  for c in '0'..='9' {
    table[c as usize] = true;
  }
  table
});

#[inline]
pub fn is_id_start(c: char) -> bool {
  if c.is_ascii() {
    ASCII_ID_START[c as usize]
  } else {
    !is_whitespace(c) && !is_line_terminator(c)
  }
}

#[inline]
pub fn is_id_continue(c: char) -> bool {
  if c.is_ascii() {
    ASCII_ID_CONTINUE[c as usize]
  } else {
    !is_whitespace(c) && !is_line_terminator(c)
  }
}

/// Whether `name` can be written as a bare identifier.
pub fn is_valid_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if is_id_start(c) => chars.all(is_id_continue),
    _ => false,
  }
}
