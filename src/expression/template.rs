//! `{{ ... }}` delimiter scanning and template splitting.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Lit(String),
    /// Trimmed body of one `{{ ... }}` segment.
    Expr(String),
}

/// Byte offset of the `}}` closing the `{{` at `open`. Nested braces and
/// quoted text inside the body are skipped.
pub fn find_close(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = open + 2;
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' && q != b'`' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'{' => depth += 1,
            b'}' if depth > 0 => depth -= 1,
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// True when the whole string (after trimming and an optional leading `=`)
/// is one `{{ ... }}` block.
pub fn is_single_block(s: &str) -> bool {
    let t = s.trim();
    let t = t.strip_prefix('=').unwrap_or(t);
    t.starts_with("{{") && find_close(t, 0) == Some(t.len().saturating_sub(2)) && t.len() >= 4
}

/// Body of a single-block expression, or `None` for anything else.
pub fn expression_body(s: &str) -> Option<&str> {
    if !is_single_block(s) {
        return None;
    }
    let t = s.trim();
    let t = t.strip_prefix('=').unwrap_or(t);
    Some(t[2..t.len() - 2].trim())
}

/// n8n expression mode: a leading `=` followed by text holding at least one
/// complete `{{ ... }}` block, as in `=Hello {{ $json.name }}!`.
pub fn is_n8n_template(s: &str) -> bool {
    s.trim_start()
        .strip_prefix('=')
        .is_some_and(contains_expression)
}

/// Strips delimiters until what is left is no longer an expression.
pub fn extract(s: &str) -> String {
    let mut current = s;
    while let Some(body) = expression_body(current) {
        current = body;
    }
    current.to_string()
}

/// Splits mixed text such as `Hello {{ $json.name }}!` into literal and
/// expression parts. An unclosed `{{` makes the rest literal.
pub fn split_template(input: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut remaining = input;

    while let Some(start) = remaining.find("{{") {
        if start > 0 {
            parts.push(TemplatePart::Lit(remaining[..start].to_string()));
        }
        match find_close(remaining, start) {
            Some(end) => {
                let inner = remaining[start + 2..end].trim();
                parts.push(TemplatePart::Expr(inner.to_string()));
                remaining = &remaining[end + 2..];
            }
            None => {
                parts.push(TemplatePart::Lit(remaining[start..].to_string()));
                return merge_literals(parts);
            }
        }
    }

    if !remaining.is_empty() {
        parts.push(TemplatePart::Lit(remaining.to_string()));
    }

    merge_literals(parts)
}

fn merge_literals(parts: Vec<TemplatePart>) -> Vec<TemplatePart> {
    let mut merged: Vec<TemplatePart> = Vec::with_capacity(parts.len());
    for part in parts {
        match (merged.last_mut(), part) {
            (Some(TemplatePart::Lit(prev)), TemplatePart::Lit(next)) => prev.push_str(&next),
            (_, part) => merged.push(part),
        }
    }
    merged
}

/// True when the string holds at least one complete `{{ ... }}` block.
pub fn contains_expression(s: &str) -> bool {
    split_template(s)
        .iter()
        .any(|p| matches!(p, TemplatePart::Expr(_)))
}
