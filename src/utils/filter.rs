//! Filter expressions for list endpoints.
//!
//! The platform's filter DSL:
//!
//! | Operator | Meaning |
//! |---|---|
//! | `:` | equals |
//! | `!:` | not equals |
//! | `~` | contains |
//! | `!~` | does not contain |
//! | `>:` `<:` | greater/less than or equal |
//! | `>` `<` | greater/less than |
//!
//! Clauses are joined with `,` (AND) or `||` (OR). Alerts and audit logs reject
//! `||` server-side; that is not checked here. `*` is a wildcard inside values
//! and is never escaped.
//!
//! [`format`] runs once, where a caller-supplied filter becomes the `filter`
//! query parameter. Running it twice escapes the escapes.

const SPECIAL: &[char] = &['(', ')', ':', ',', '~', '"', '\\'];

/// Longest first, so `!:` wins over `:` and `>:` over `>`.
const OPERATORS: &[&str] = &["!:", "!~", ">:", "<:", ":", "~", ">", "<"];

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        if SPECIAL.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escapes the value side of every clause, keeping field names, operators,
/// separators and caller-supplied double quotes intact.
pub fn format(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(trimmed.len() + 16);
    for (clause, separator) in split_clauses(trimmed) {
        out.push_str(&format_clause(clause));
        if let Some(separator) = separator {
            out.push_str(separator);
        }
    }
    out
}

fn format_clause(clause: &str) -> String {
    let Some((field, operator, value)) = split_operator(clause) else {
        return escape(clause);
    };
    let (inner, quoted) = match value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) if value.len() >= 2 => (inner, true),
        _ => (value, false),
    };
    if quoted {
        format!("{}{}\"{}\"", field, operator, escape(inner))
    } else {
        format!("{}{}{}", field, operator, escape(inner))
    }
}

fn split_operator(clause: &str) -> Option<(&str, &'static str, &str)> {
    let mut in_quotes = false;
    for (idx, ch) in clause.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        let rest = &clause[idx..];
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            return Some((&clause[..idx], op, &rest[op.len()..]));
        }
    }
    None
}

/// Splits on top-level `,` and `||`, ignoring separators inside double quotes.
/// Each clause is paired with the separator that follows it.
fn split_clauses(expression: &str) -> Vec<(&str, Option<&'static str>)> {
    let mut clauses = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    let bytes = expression.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        let byte = bytes[idx];
        if escaped {
            escaped = false;
            idx += 1;
            continue;
        }
        match byte {
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => {
                clauses.push((&expression[start..idx], Some(",")));
                start = idx + 1;
            }
            b'|' if !in_quotes && bytes.get(idx + 1) == Some(&b'|') => {
                clauses.push((&expression[start..idx], Some("||")));
                idx += 2;
                start = idx;
                continue;
            }
            _ => {}
        }
        idx += 1;
    }
    clauses.push((&expression[start..], None));
    clauses
}
