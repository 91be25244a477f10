//! Legacy 8.3 names and long-name cleanup.

use alloc::string::String;

/// Rendered 8.3 name: up to 8 + '.' + 3 characters.
pub type ShortNameText = heapless::String<12>;

/// Renders an on-disk 8.3 name, e.g. `"HELLO   TXT"` → `"HELLO.TXT"`.
///
/// Trailing spaces of both parts are dropped; the dot is only added when the
/// extension is not blank. Bytes outside ASCII render as `'?'`.
pub fn render(raw: &[u8]) -> ShortNameText {
    let mut out = ShortNameText::new();
    let base = trim_padding(&raw[..8]);
    let ext = trim_padding(&raw[8..11]);
    for &b in base {
        let _ = out.push(narrow_to_char(b));
    }
    if !ext.is_empty() {
        let _ = out.push('.');
        for &b in ext {
            let _ = out.push(narrow_to_char(b));
        }
    }
    out
}

/// Splits `name` at its last '.' into the 11-byte on-disk layout.
///
/// Base is cut to 8 bytes and the extension to 3, both space-padded. Case is
/// kept as given; characters outside ASCII are stored as `'_'`.
pub fn encode(name: &str) -> [u8; 11] {
    let mut raw = [b' '; 11];
    let (base, extension) = match name.rfind('.') {
        Some(i) if i > 0 && !is_dot_entry(name) => (&name[..i], &name[i + 1..]),
        _ => (name, ""),
    };
    for (i, b) in base.chars().take(8).map(narrow).enumerate() {
        raw[i] = b;
    }
    for (i, b) in extension.chars().take(3).map(narrow).enumerate() {
        raw[8 + i] = b;
    }
    raw
}

/// [`encode`], but only for names that render back unchanged.
///
/// Empty names and names that would be cut or narrowed give `None`.
pub fn encode_exact(name: &str) -> Option<[u8; 11]> {
    let raw = encode(name);
    (!name.is_empty() && render(&raw).as_str() == name).then_some(raw)
}

/// Narrow (one byte per character) encoding of a text field, cut or
/// space-padded to fill `out`.
pub fn encode_narrow(text: &str, out: &mut [u8]) {
    out.fill(b' ');
    for (slot, b) in out.iter_mut().zip(text.chars().map(narrow)) {
        *slot = b;
    }
}

/// Applies the long-name rules: surrounding whitespace is ignored and
/// trailing periods are never significant.
///
/// A name made only of periods keeps a single '.'.
pub fn clean_long_name(name: &str) -> &str {
    let trimmed = name.trim();
    let stripped = trimmed.trim_end_matches('.');
    if stripped.is_empty() && !trimmed.is_empty() {
        &trimmed[..1]
    } else {
        stripped
    }
}

/// ASCII case-insensitive name comparison.
pub fn names_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.chars().zip(b.chars()).all(|(x, y)| x.eq_ignore_ascii_case(&y))
}

pub(crate) fn to_string(text: &ShortNameText) -> String {
    String::from(text.as_str())
}

fn is_dot_entry(name: &str) -> bool {
    name == "." || name == ".."
}

fn trim_padding(part: &[u8]) -> &[u8] {
    let end = part.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(0, |i| i + 1);
    &part[..end]
}

fn narrow(c: char) -> u8 {
    if c.is_ascii() { c as u8 } else { b'_' }
}

fn narrow_to_char(b: u8) -> char {
    if b.is_ascii() { b as char } else { '?' }
}
