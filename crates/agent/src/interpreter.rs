use serde_json::Value;

use crate::payload::{AgentPayload, ResolutionPayload};

/// Result of interpreting a raw agent reply.
///
/// `Uninterpretable` means no structured payload could be located; it is not
/// an error. The surrounding text is still usable as display content, so
/// callers degrade to plain text rather than failing the exchange.
#[derive(Clone, Debug, PartialEq)]
pub enum Interpretation {
    Payload(AgentPayload),
    Uninterpretable,
}

/// Interprets a support-agent reply: a structured object passes through
/// unchanged; a string is scanned for a single embedded JSON value.
/// Deterministic and side-effect free.
pub fn interpret(raw: &Value) -> Interpretation {
    match structured_value(raw) {
        Some(value) => Interpretation::Payload(AgentPayload::from_value(&value)),
        None => Interpretation::Uninterpretable,
    }
}

/// Interprets an approval-agent reply. `None` means the caller should fall
/// back to the operator-supplied decision and notes for every field.
pub fn interpret_resolution(raw: &Value) -> Option<ResolutionPayload> {
    structured_value(raw).map(|value| ResolutionPayload::from_value(&value))
}

fn structured_value(raw: &Value) -> Option<Value> {
    match raw {
        Value::Object(_) => Some(raw.clone()),
        Value::String(text) => extract_embedded_json(text),
        _ => None,
    }
}

/// Two-stage extraction: locate a candidate span, then strict-parse it with
/// one bounded repair retry.
fn extract_embedded_json(text: &str) -> Option<Value> {
    let scan_target = fenced_body(text).unwrap_or(text);
    let span = balanced_object_span(scan_target)?;
    parse_with_repair(span)
}

/// Body of the first fenced code block, when one is present and closed. Any
/// language tag after the opening fence is outside the braces, so the
/// balanced-span scan skips it naturally.
fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let close = after_open.find("```")?;
    Some(&after_open[..close])
}

/// First balanced `{...}` span, scanning left to right with brace-depth
/// tracking. Braces inside string literals are ignored; both quote styles
/// are treated as string delimiters because the repair pass accepts both.
fn balanced_object_span(text: &str) -> Option<&str> {
    enum Scan {
        Code,
        DoubleQuoted,
        SingleQuoted,
    }

    let start = text.find('{')?;
    let mut state = Scan::Code;
    let mut escaped = false;
    let mut depth = 0usize;

    for (offset, ch) in text[start..].char_indices() {
        match state {
            Scan::Code => match ch {
                '{' => depth += 1,
                '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(&text[start..start + offset + ch.len_utf8()]);
                    }
                }
                '"' => state = Scan::DoubleQuoted,
                '\'' => state = Scan::SingleQuoted,
                _ => {}
            },
            Scan::DoubleQuoted => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    state = Scan::Code;
                }
            }
            Scan::SingleQuoted => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '\'' {
                    state = Scan::Code;
                }
            }
        }
    }

    None
}

fn parse_with_repair(candidate: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return value.is_object().then_some(value);
    }

    let repaired = strip_trailing_commas(&normalize_quotes(candidate));
    serde_json::from_str::<Value>(&repaired).ok().filter(Value::is_object)
}

/// Rewrites single-quoted keys/values to double-quoted. Inner double quotes
/// gain an escape; escaped single quotes become plain apostrophes.
fn normalize_quotes(input: &str) -> String {
    enum Scan {
        Outside,
        DoubleQuoted,
        SingleQuoted,
    }

    let mut state = Scan::Outside;
    let mut escaped = false;
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        match state {
            Scan::Outside => match ch {
                '"' => {
                    output.push('"');
                    state = Scan::DoubleQuoted;
                }
                '\'' => {
                    output.push('"');
                    state = Scan::SingleQuoted;
                }
                _ => output.push(ch),
            },
            Scan::DoubleQuoted => {
                if escaped {
                    output.push(ch);
                    escaped = false;
                } else if ch == '\\' {
                    output.push(ch);
                    escaped = true;
                } else if ch == '"' {
                    output.push('"');
                    state = Scan::Outside;
                } else {
                    output.push(ch);
                }
            }
            Scan::SingleQuoted => {
                if escaped {
                    if ch == '\'' {
                        output.push('\'');
                    } else {
                        output.push('\\');
                        output.push(ch);
                    }
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '\'' {
                    output.push('"');
                    state = Scan::Outside;
                } else if ch == '"' {
                    output.push_str("\\\"");
                } else {
                    output.push(ch);
                }
            }
        }
    }

    output
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];

        if in_string {
            output.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            index += 1;
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                output.push(ch);
            }
            ',' => {
                let mut lookahead = index + 1;
                while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                    lookahead += 1;
                }
                let dangling =
                    lookahead < chars.len() && matches!(chars[lookahead], '}' | ']');
                if !dangling {
                    output.push(ch);
                }
            }
            _ => output.push(ch),
        }
        index += 1;
    }

    output
}
