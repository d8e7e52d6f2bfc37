//! Legacy expression rewriting
//!
//! Pipelines reference values through dictionary paths such as
//! `Pipeline/OrderNo`, `#Basket#` or `CurrentForms.billing`. These helpers turn
//! them into JavaScript expressions and assignment targets.
//!
//! Both functions are total: anything they cannot read with confidence
//! (unterminated strings, stray `#` delimiters, targets that are not paths) is
//! returned unchanged so it stays visible in the generated code.

use once_cell::sync::Lazy;
use regex::Regex;

/// Dictionary path usable as an assignment target
static TARGET_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(?:[./][A-Za-z_$][A-Za-z0-9_$]*)*$")
        .expect("valid target path pattern")
});

/// Legacy dictionary roots and their controller equivalents
const LEGACY_ROOTS: &[(&str, &str)] = &[
    ("CurrentForms", "session.forms"),
    ("CurrentSession", "session"),
    ("CurrentRequest", "request"),
    ("CurrentCustomer", "customer"),
    ("CurrentHttpParameterMap", "request.httpParameterMap"),
    ("CurrentPageMetaData", "request.pageMetaData"),
    ("CurrentCookies", "request.httpCookies"),
];

/// Convert a legacy read-expression into a JavaScript expression
///
/// ```rust,ignore
/// assert_eq!(transform_expression("Pipeline/OrderNo"), "Pipeline.OrderNo");
/// assert_eq!(transform_expression("#CurrentForms.billing#"), "session.forms.billing");
/// assert_eq!(transform_expression("5"), "5");
/// ```
pub fn transform_expression(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }

    let Some(inner) = strip_delimiters(trimmed) else {
        return raw.to_string();
    };

    match rewrite_tokens(inner) {
        Some(rewritten) => rewritten,
        None => raw.to_string(),
    }
}

/// Convert a legacy write-target into a JavaScript assignment target
pub fn transform_variable(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(inner) = strip_delimiters(trimmed) else {
        return raw.to_string();
    };

    if !TARGET_PATH.is_match(inner) {
        return raw.to_string();
    }

    let segments: Vec<&str> = inner.split(['.', '/']).collect();
    rewrite_path(&segments, true)
}

/// Whether a rewritten target is a bare identifier that can be declared with `var`
pub fn is_plain_identifier(target: &str) -> bool {
    !target.is_empty()
        && !target.contains(['.', '/'])
        && TARGET_PATH.is_match(target)
        && !is_reserved(target)
}

fn is_reserved(word: &str) -> bool {
    matches!(
        word,
        "true"
            | "false"
            | "null"
            | "undefined"
            | "this"
            | "new"
            | "typeof"
            | "instanceof"
            | "in"
            | "var"
            | "let"
            | "const"
            | "function"
            | "return"
            | "session"
            | "request"
            | "response"
            | "customer"
    )
}

/// Remove a surrounding `#...#` pair. `None` when the delimiters are unbalanced.
fn strip_delimiters(expr: &str) -> Option<&str> {
    let starts = expr.starts_with('#');
    let ends = expr.len() > 1 && expr.ends_with('#');
    match (starts, ends) {
        (true, true) => {
            let inner = expr[1..expr.len() - 1].trim();
            if inner.is_empty() || inner.contains('#') {
                None
            } else {
                Some(inner)
            }
        }
        (false, false) if !expr.contains('#') => Some(expr),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Rewrite every dictionary path in an expression, copying everything else.
/// Returns `None` for an unterminated string literal.
fn rewrite_tokens(expr: &str) -> Option<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' {
            let start = i;
            i += 1;
            loop {
                match chars.get(i) {
                    None => return None,
                    Some('\\') => i += 2,
                    Some(&q) if q == c => {
                        i += 1;
                        break;
                    }
                    Some(_) => i += 1,
                }
            }
            out.extend(&chars[start..i.min(chars.len())]);
            continue;
        }

        if c.is_ascii_digit() {
            while i < chars.len() && (is_ident_char(chars[i]) || chars[i] == '.') {
                out.push(chars[i]);
                i += 1;
            }
            continue;
        }

        if is_ident_start(c) {
            // Members after `.`, `]` or `)` are not dictionary roots
            let is_root = !matches!(out.chars().last(), Some('.') | Some(']') | Some(')'));
            let mut segments: Vec<String> = Vec::new();
            let mut current = String::new();

            while i < chars.len() {
                let ch = chars[i];
                if is_ident_char(ch) {
                    current.push(ch);
                    i += 1;
                } else if (ch == '.' || ch == '/')
                    && chars.get(i + 1).is_some_and(|&n| is_ident_start(n))
                {
                    segments.push(std::mem::take(&mut current));
                    i += 1;
                } else {
                    break;
                }
            }
            segments.push(current);

            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            out.push_str(&rewrite_path(&refs, is_root));
            continue;
        }

        out.push(c);
        i += 1;
    }

    Some(out)
}

fn rewrite_path(segments: &[&str], is_root: bool) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(segments.len());

    let mut rest = segments;
    if is_root {
        if let Some((first, tail)) = segments.split_first() {
            if let Some((_, replacement)) = LEGACY_ROOTS.iter().find(|(legacy, _)| legacy == first)
            {
                parts.push(replacement);
                rest = tail;
            }
        }
    }

    parts.extend_from_slice(rest);
    parts.join(".")
}
