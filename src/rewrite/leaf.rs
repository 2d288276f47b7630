//! Term-like leaves: regex specialization and sensitivity push-down

use crate::pattern::{Pattern, Sensitivity};

/// Inline sensitivity markers recognized at the start of a regex
const MARKERS: [(&str, Sensitivity); 3] = [
    ("(?i)", Sensitivity::Insensitive),
    ("(?-i)", Sensitivity::Sensitive),
    ("(?c)", Sensitivity::Sensitive),
];

/// Split leading sensitivity markers off a regex body; the last marker wins
pub(super) fn strip_markers(body: &str) -> (Option<Sensitivity>, &str) {
    let mut rest = body;
    let mut found = None;
    'outer: loop {
        for (marker, sensitivity) in MARKERS {
            if let Some(after) = rest.strip_prefix(marker) {
                rest = after;
                found = Some(sensitivity);
                continue 'outer;
            }
        }
        return (found, rest);
    }
}

/// Remove a leading `^` and a trailing unescaped `$`
fn strip_anchors(body: &str) -> &str {
    let body = body.strip_prefix('^').unwrap_or(body);
    match body.strip_suffix('$') {
        Some(inner) => {
            let backslashes = inner.chars().rev().take_while(|&c| c == '\\').count();
            if backslashes % 2 == 0 {
                inner
            } else {
                body
            }
        }
        None => body,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Glob {
    Literal(char),
    /// `.*`
    Any,
    /// `.`
    One,
}

/// Parse a regex body made only of literals, `.` and `.*`
fn glob_parts(body: &str) -> Option<Vec<Glob>> {
    let mut parts = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) if escaped.is_ascii_punctuation() => parts.push(Glob::Literal(escaped)),
                _ => return None,
            },
            '.' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if matches!(chars.peek(), Some('?') | Some('+')) {
                        return None;
                    }
                    parts.push(Glob::Any);
                } else if matches!(chars.peek(), Some('+') | Some('?') | Some('{')) {
                    return None;
                } else {
                    parts.push(Glob::One);
                }
            }
            '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' => return None,
            other => parts.push(Glob::Literal(other)),
        }
    }
    Some(parts)
}

/// The simplest leaf matching the same terms as `parts`, if there is one
fn leaf_from_glob(field: &str, parts: &[Glob]) -> Option<Pattern> {
    let literal = |ps: &[Glob]| -> Option<String> {
        ps.iter()
            .map(|p| match p {
                Glob::Literal(c) => Some(*c),
                _ => None,
            })
            .collect()
    };
    if parts.is_empty() {
        return None;
    }
    if let Some(value) = literal(parts) {
        return Some(Pattern::term_in(field, &value));
    }
    if let Some((Glob::Any, head)) = parts.split_last() {
        if let Some(prefix) = literal(head) {
            return Some(Pattern::prefix_in(field, &prefix));
        }
    }
    let mut glob = String::new();
    for part in parts {
        match part {
            Glob::Literal('*') | Glob::Literal('?') => return None,
            Glob::Literal(c) => glob.push(*c),
            Glob::Any => glob.push('*'),
            Glob::One => glob.push('?'),
        }
    }
    Some(Pattern::wildcard_in(field, &glob))
}

fn with_sensitivity(leaf: Pattern, sensitivity: Sensitivity) -> Pattern {
    match leaf {
        Pattern::Term { field, value, .. } => Pattern::Term { field, value, sensitivity },
        Pattern::Regex { field, pattern, .. } => Pattern::Regex { field, pattern, sensitivity },
        Pattern::Prefix { field, prefix, .. } => Pattern::Prefix { field, prefix, sensitivity },
        Pattern::Wildcard { field, pattern, .. } => Pattern::Wildcard { field, pattern, sensitivity },
        other => other,
    }
}

/// Sensitivity marker and bare body of a regex as matched against the term dictionary
pub(crate) fn regex_body(pattern: &str) -> (Option<Sensitivity>, &str) {
    let (marker, body) = strip_markers(pattern);
    (marker, strip_anchors(body))
}

/// Replace a regex by a term, prefix or wildcard where one matches the same
/// terms; hoist leading sensitivity markers into a wrapper
pub(super) fn specialize_regex(field: String, pattern: &str, sensitivity: Sensitivity) -> Pattern {
    let (marker, body) = regex_body(pattern);
    let leaf = glob_parts(body)
        .and_then(|parts| leaf_from_glob(&field, &parts))
        .unwrap_or_else(|| Pattern::regex_in(&field, body));
    match marker {
        Some(marker) => with_sensitivity(leaf, Sensitivity::Default).sensitive(marker),
        None => with_sensitivity(leaf, sensitivity),
    }
}

/// A wildcard without `?` and at most one trailing `*` is a term or a prefix
pub(super) fn specialize_wildcard(field: String, pattern: String, sensitivity: Sensitivity) -> Pattern {
    if pattern.contains('?') {
        return Pattern::Wildcard { field, pattern, sensitivity };
    }
    match pattern.find('*') {
        None => Pattern::Term { field, value: pattern, sensitivity },
        Some(i) if i + 1 == pattern.len() && i > 0 => Pattern::Prefix {
            field,
            prefix: pattern[..i].to_string(),
            sensitivity,
        },
        Some(_) => Pattern::Wildcard { field, pattern, sensitivity },
    }
}

/// Give every leaf without an explicit sensitivity the wrapper's, then drop the wrapper
pub(super) fn push_down(sensitivity: Sensitivity, clause: Pattern) -> Pattern {
    if sensitivity == Sensitivity::Default {
        return clause;
    }
    match clause {
        Pattern::Term { sensitivity: Sensitivity::Default, .. }
        | Pattern::Regex { sensitivity: Sensitivity::Default, .. }
        | Pattern::Prefix { sensitivity: Sensitivity::Default, .. }
        | Pattern::Wildcard { sensitivity: Sensitivity::Default, .. } => with_sensitivity(clause, sensitivity),
        // an inner wrapper decides for its own subtree
        inner @ Pattern::WithSensitivity { .. } => inner,
        other => super::map_children(&other, &mut |child| push_down(sensitivity, child.clone())),
    }
}
