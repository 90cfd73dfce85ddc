//! Text stages of the recovery pipeline. Each stage takes text and returns text,
//! and running a stage twice gives the same result as running it once.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("fence regex");
    static ref QUOTED_INTEGER: Regex = Regex::new(r#"(:\s*)"(0|[1-9]\d*)""#).expect("quoted int regex");
    static ref DOUBLED_QUOTES: Regex = Regex::new(r#""""(\w+)"""#).expect("doubled quotes regex");
}

/// Removes markdown code fences, with or without a language tag, anywhere in the text.
pub fn strip_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

/// Narrows the text to the span between the first `[` and the last `]`
/// that sits outside a double-quoted string.
///
/// Text without an ordered bracket pair is returned unchanged.
pub fn extract_boundaries(text: &str) -> &str {
    let Some(start) = text.find('[') else {
        return text;
    };
    match last_structural_close(&text[start..]) {
        Some(end) => &text[start..=start + end],
        None => text,
    }
}

fn last_structural_close(text: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    let mut last = None;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ']' => last = Some(i),
            _ => {}
        }
    }
    last
}

/// Rewrites the usual near-JSON mistakes outside of double-quoted strings:
/// single-quoted strings, bare object keys and trailing commas. Afterwards
/// quoted integer values are unquoted and `""word""` artifacts collapsed.
pub fn normalize_syntax(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => i = copy_double_quoted(&chars, i, &mut out),
            '\'' => i = convert_single_quoted(&chars, i, &mut out),
            ',' => {
                if !matches!(next_significant(&chars, i + 1), Some(']') | Some('}')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let opens_key = matches!(last_significant(&out), Some('{') | Some(','));
                if opens_key && next_significant(&chars, i) == Some(':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    let out = QUOTED_INTEGER.replace_all(&out, "${1}${2}");
    DOUBLED_QUOTES.replace_all(&out, "\"${1}\"").into_owned()
}

/// Closes an array that was cut off mid-stream.
///
/// Prose before the first `[` is dropped, everything after the last complete
/// object is cut and a `]` appended. Returns `None` when there is no closing
/// brace to cut at. Text that already ends with `]` is returned as is.
pub fn repair_truncation(text: &str) -> Option<String> {
    let text = text.trim();
    if text.ends_with(']') {
        return Some(text.to_string());
    }

    let (body, needs_open) = match text.find('[') {
        Some(start) => (&text[start..], false),
        None => (&text[text.find('{')?..], true),
    };
    let last_brace = body.rfind('}')?;

    let mut repaired = String::with_capacity(last_brace + 3);
    if needs_open {
        repaired.push('[');
    }
    repaired.push_str(&body[..=last_brace]);
    repaired.push(']');
    Some(repaired)
}

fn copy_double_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        match c {
            '\\' => {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                }
                i += 2;
            }
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

/// A `'` closes the string only when it is followed by a structural character
/// or the end of input, so apostrophes inside words are kept.
fn convert_single_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if chars.get(i + 1) == Some(&'\'') => {
                out.push('\'');
                i += 2;
            }
            '\\' => {
                out.push('\\');
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                }
                i += 2;
            }
            '\'' if matches!(
                next_significant(chars, i + 1),
                None | Some(',') | Some('}') | Some(']') | Some(':')
            ) =>
            {
                out.push('"');
                return i + 1;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    i
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars.iter().skip(from).copied().find(|c| !c.is_whitespace())
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}
