//! Tolerant extraction of list literals from model output
//!
//! Classifier output routinely wraps the answer in prose, code fences or
//! reasoning. Rather than parse the whole response, scan for the first
//! bracket-balanced `[...]` span that parses as a list of strings.

/// First well-formed list of strings in `text`, or `None` when there is none.
///
/// Accepts JSON arrays and single-quoted (Python-style) arrays. Brackets that
/// do not enclose a list of strings (`[1]`, `[see below]`) are skipped.
pub fn extract_list_literal(text: &str) -> Option<Vec<String>> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('[') {
        let start = search_from + offset;
        if let Some(end) = matching_bracket(text, start) {
            if let Some(items) = parse_string_list(&text[start..=end]) {
                return Some(items);
            }
        }
        search_from = start + 1;
    }

    None
}

/// Byte index of the `]` closing the `[` at `start`, honouring quoted strings
fn matching_bracket(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + idx);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_string_list(candidate: &str) -> Option<Vec<String>> {
    let items: Vec<String> = serde_json::from_str(candidate)
        .ok()
        .or_else(|| serde_json::from_str(&requote(candidate)).ok())?;

    Some(
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Rewrite single-quoted strings as JSON strings
fn requote(candidate: &str) -> String {
    let mut out = String::with_capacity(candidate.len());
    let mut chars = candidate.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                let mut escaped = false;
                for inner in chars.by_ref() {
                    out.push(inner);
                    if escaped {
                        escaped = false;
                    } else if inner == '\\' {
                        escaped = true;
                    } else if inner == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                let mut value = String::new();
                let mut escaped = false;
                for inner in chars.by_ref() {
                    if escaped {
                        value.push(inner);
                        escaped = false;
                    } else if inner == '\\' {
                        escaped = true;
                    } else if inner == '\'' {
                        break;
                    } else {
                        value.push(inner);
                    }
                }
                out.push_str(&serde_json::Value::String(value).to_string());
            }
            _ => out.push(c),
        }
    }

    out
}
