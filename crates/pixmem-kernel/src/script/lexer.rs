//! Line classification for the indentation-based script grammar.

/// What a single line is, with indentation stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Empty,
    Comment,
    /// `key: value` (value may be empty).
    Mapping { key: &'a str, value: &'a str },
    /// `- value`
    ListItem(&'a str),
    /// Anything else. Ignored by the parser.
    Other(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Leading whitespace width; a tab counts as four columns.
    pub indent: usize,
    pub kind: LineKind<'a>,
}

/// Classify every line of `text`.
pub fn lex(text: &str) -> impl Iterator<Item = Line<'_>> {
    text.lines().enumerate().map(|(i, raw)| {
        let (indent, kind) = classify(raw);
        Line {
            number: i + 1,
            indent,
            kind,
        }
    })
}

pub fn classify(raw: &str) -> (usize, LineKind<'_>) {
    let trimmed_start = raw.trim_start();
    let indent = raw[..raw.len() - trimmed_start.len()]
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    let body = trimmed_start.trim_end();

    let kind = if body.is_empty() {
        LineKind::Empty
    } else if body.starts_with('#') {
        LineKind::Comment
    } else if body == "-" {
        LineKind::ListItem("")
    } else if let Some(item) = body.strip_prefix("- ") {
        LineKind::ListItem(item.trim())
    } else if let Some((key, value)) = split_mapping(body) {
        LineKind::Mapping { key, value }
    } else {
        LineKind::Other(body)
    };
    (indent, kind)
}

/// Split `key: value` at the first colon outside brackets and quotes.
/// Keys such as `Collision(A:#FF0000, B:#00FF00)` keep their inner colons.
pub fn split_mapping(body: &str) -> Option<(&str, &str)> {
    let at = find_top_level(body, ':')?;
    let key = body[..at].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, body[at + 1..].trim()))
}

/// Byte index of the first `needle` not nested in `()`, `{}`, `[]` or quotes.
pub fn find_top_level(s: &str, needle: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            _ if c == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}
