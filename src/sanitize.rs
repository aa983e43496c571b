//! Text cleanup for values pasted in from rich-text sources.

/// Space-like characters that are replaced with a plain ASCII space.
const WIDE_SPACES: &[char] = &[
    '\u{00A0}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}', '\u{2006}', '\u{2007}',
    '\u{2008}', '\u{2009}', '\u{200A}', '\u{202F}', '\u{205F}', '\u{3000}',
];

/// Invisible characters that are dropped.
const ZERO_WIDTH: &[char] = &[
    '\u{00AD}', '\u{180E}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}',
];

/// Trim, turn non-breaking and typographic spaces into `' '` and strip
/// zero-width characters.
pub fn remove_nbsp(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .map(|c| if WIDE_SPACES.contains(&c) { ' ' } else { c })
        .collect()
}

/// Validate a table or column name before it is spliced into SQL text.
///
/// Accepts `name` or `schema.name` where each part is `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut parts = 0;
    for part in name.split('.') {
        parts += 1;
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
    }
    parts <= 2
}

/// Character set names are spliced into `SET` statements, so only
/// `[A-Za-z0-9_]+` is accepted.
pub fn is_valid_charset(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
