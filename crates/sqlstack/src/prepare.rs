//! Placeholder substitution.
//!
//! The builder accepts a small placeholder grammar inside SQL strings:
//!
//! - `?`: positional value, escaped as a literal
//! - `?r`: raw inlining, consumes the next param verbatim without quoting
//! - `@name`: identifier placeholder, dialect-quoted (`@t.id` works)
//! - `@[a, b]`: identifier list, each name quoted, rejoined with `, `
//!
//! Surplus `?` markers with no matching param are left untouched.

use crate::platform::Platform;
use crate::value::Value;

/// Substitute `?`, `?r`, `@name`, and `@[a, b]` placeholders.
pub fn prepare(platform: &Platform, input: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut next_param = 0usize;

    while let Some(ch) = chars.next() {
        match ch {
            '?' => {
                let raw = chars.peek() == Some(&'r');
                if raw {
                    chars.next();
                }
                if next_param < params.len() {
                    let value = &params[next_param];
                    next_param += 1;
                    if raw {
                        out.push_str(&raw_inline(value));
                    } else {
                        out.push_str(&platform.escape_value(value));
                    }
                } else {
                    out.push('?');
                    if raw {
                        out.push('r');
                    }
                }
            }
            '@' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    let mut list = String::new();
                    for c in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                        list.push(c);
                    }
                    let names = list
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(|t| platform.prepare_name(t))
                        .collect::<Vec<_>>()
                        .join(", ");
                    out.push_str(&names);
                }
                Some(c) if is_name_char(*c) => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if is_name_char(c) {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push_str(&platform.prepare_name(&name));
                }
                _ => out.push('@'),
            },
            _ => out.push(ch),
        }
    }

    out
}

/// Substitute only the `@name` / `@[a, b]` identifier placeholders.
pub fn prepare_name_refs(platform: &Platform, input: &str) -> String {
    prepare(platform, input, &[])
}

/// Quote a bare leading identifier in a condition string.
///
/// `id = ?` becomes `"id" = ?`; expressions that do not start with an
/// identifier followed by an operator (`1=1`, `count(*) > 5`, `EXISTS (…)`)
/// pass through untouched.
pub fn quote_leading_field(platform: &Platform, expr: &str) -> String {
    let trimmed = expr.trim_start();
    let lead = expr.len() - trimmed.len();

    let mut end = 0;
    for (i, c) in trimmed.char_indices() {
        if i == 0 {
            if !(c.is_ascii_alphabetic() || c == '_') {
                return expr.to_string();
            }
        } else if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            break;
        }
        end = i + c.len_utf8();
    }
    let field = &trimmed[..end];
    let rest = trimmed[end..].trim_start();

    if !starts_with_operator(rest) {
        return expr.to_string();
    }

    let mut out = String::with_capacity(expr.len() + 2);
    out.push_str(&expr[..lead]);
    out.push_str(&platform.prepare_name(field));
    out.push(' ');
    out.push_str(rest);
    out
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '*')
}

fn starts_with_operator(rest: &str) -> bool {
    if rest.starts_with(['=', '!', '<', '>']) {
        return true;
    }
    for kw in ["LIKE", "NOT", "IN", "IS", "BETWEEN"] {
        let matches_kw = match rest.get(..kw.len()) {
            Some(prefix) => prefix.eq_ignore_ascii_case(kw),
            None => false,
        };
        if matches_kw
            && rest[kw.len()..]
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || c == '(')
        {
            return true;
        }
    }
    false
}

fn raw_inline(value: &Value) -> String {
    match value {
        Value::Text(s) | Value::Raw(s) | Value::Name(s) => s.clone(),
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Timestamp(t) => t.to_rfc3339(),
        Value::Uuid(u) => u.to_string(),
        Value::Json(j) => j.to_string(),
        Value::List(items) => items.iter().map(raw_inline).collect::<Vec<_>>().join(", "),
    }
}
