//! Inline values: integers, `[a, b]` lists, `{key: value}` maps, quoted text.

use crate::script::ast::{ParamMap, ParamValue};
use crate::script::lexer::{find_top_level, split_mapping};

/// Strip one pair of matching quotes.
pub fn unquote(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Decimal or `0x` hex integer with optional sign.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None if digits.bytes().all(|b| b.is_ascii_digit()) => digits.parse::<i64>().ok()?,
        None => return None,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Split on `sep` outside brackets and quotes. Empty pieces are dropped.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(at) = find_top_level(rest, sep) {
        parts.push(rest[..at].trim());
        rest = &rest[at + sep.len_utf8()..];
    }
    parts.push(rest.trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Contents between a leading `open` and trailing `close`.
fn delimited(s: &str, open: char, close: char) -> Option<&str> {
    s.trim().strip_prefix(open)?.strip_suffix(close)
}

/// `[1, 2, 3]`. Fails if any element is not an integer.
pub fn parse_int_list(s: &str) -> Option<Vec<i64>> {
    let inner = delimited(s, '[', ']')?;
    split_top_level(inner, ',').into_iter().map(parse_int).collect()
}

/// `{key: value, ...}`. Entries without a colon are skipped.
pub fn parse_inline_map(s: &str) -> Option<ParamMap> {
    let inner = delimited(s, '{', '}')?;
    let mut map = ParamMap::new();
    for entry in split_top_level(inner, ',') {
        if let Some((key, value)) = split_mapping(entry) {
            map.insert(unquote(key).to_string(), parse_value(value));
        }
    }
    Some(map)
}

pub fn parse_value(s: &str) -> ParamValue {
    if let Some(n) = parse_int(s) {
        return ParamValue::Int(n);
    }
    if let Some(list) = parse_int_list(s) {
        return ParamValue::List(list);
    }
    ParamValue::Text(unquote(s).to_string())
}
