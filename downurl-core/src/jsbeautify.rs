//! JavaScript beautifier and heuristics (spec.md §4.11).
//!
//! The beautifier is deterministic, single-pass, and character-driven: it
//! tracks string/comment/regex state well enough to pass those characters
//! through verbatim, and otherwise re-indents on `{`, `}`, and `;`.

use regex::Regex;
use std::sync::OnceLock;

/// Truncate to the first `n` *characters* (not bytes), at a char boundary, so
/// a multibyte codepoint straddling the cutoff never causes a slicing panic.
fn char_prefix(source: &str, n: usize) -> &str {
    match source.char_indices().nth(n) {
        Some((byte_idx, _)) => &source[..byte_idx],
        None => source,
    }
}

/// Over the first 1000 characters: flag as minified when newlines < 5 or
/// average line length > 200.
pub fn looks_minified(source: &str) -> bool {
    let sample: &str = char_prefix(source, 1000);
    let lines: Vec<&str> = sample.split('\n').collect();
    let newline_count = sample.matches('\n').count();

    let avg_len = if lines.is_empty() {
        0.0
    } else {
        lines.iter().map(|l| l.len()).sum::<usize>() as f64 / lines.len() as f64
    };

    newline_count < 5 || avg_len > 200.0
}

fn obfuscation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\x[0-9a-fA-F]{2}|\\u[0-9a-fA-F]{4}|_0x[a-f0-9]+").unwrap())
}

/// Informational only (not used to reject admission). `>= 2` hits among the
/// marker set over the first 2000 characters.
pub fn looks_obfuscated(source: &str) -> bool {
    let sample: &str = char_prefix(source, 2000);
    let mut hits = 0;

    for marker in ["eval(", "Function(", "fromCharCode", "atob("] {
        if sample.contains(marker) {
            hits += 1;
        }
    }

    if obfuscation_regex().is_match(sample) {
        hits += 1;
    }

    hits >= 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    SingleQuote,
    DoubleQuote,
    Template,
    LineComment,
    BlockComment,
    Regex,
}

/// Re-indent JavaScript source with a deterministic, two-space-indent pass.
pub fn beautify(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut indent: usize = 0;
    let mut mode = Mode::Code;
    let mut i = 0;
    let mut last_was_space = false;

    let push_newline_indent = |out: &mut String, indent: usize| {
        while out.ends_with(' ') || out.ends_with('\t') {
            out.pop();
        }
        out.push('\n');
        for _ in 0..indent {
            out.push_str("  ");
        }
    };

    while i < chars.len() {
        let c = chars[i];

        match mode {
            Mode::SingleQuote | Mode::DoubleQuote | Mode::Template => {
                out.push(c);
                if c == '\\' && i + 1 < chars.len() {
                    out.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                let closing = match mode {
                    Mode::SingleQuote => '\'',
                    Mode::DoubleQuote => '"',
                    Mode::Template => '`',
                    _ => unreachable!(),
                };
                if c == closing {
                    mode = Mode::Code;
                }
                i += 1;
                continue;
            }
            Mode::LineComment => {
                out.push(c);
                if c == '\n' {
                    mode = Mode::Code;
                }
                i += 1;
                continue;
            }
            Mode::BlockComment => {
                out.push(c);
                if c == '*' && i + 1 < chars.len() && chars[i + 1] == '/' {
                    out.push('/');
                    i += 2;
                    mode = Mode::Code;
                    continue;
                }
                i += 1;
                continue;
            }
            Mode::Regex => {
                out.push(c);
                if c == '\\' && i + 1 < chars.len() {
                    out.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                if c == '/' {
                    mode = Mode::Code;
                }
                i += 1;
                continue;
            }
            Mode::Code => {}
        }

        match c {
            '\'' => {
                mode = Mode::SingleQuote;
                out.push(c);
                last_was_space = false;
            }
            '"' => {
                mode = Mode::DoubleQuote;
                out.push(c);
                last_was_space = false;
            }
            '`' => {
                mode = Mode::Template;
                out.push(c);
                last_was_space = false;
            }
            '/' if i + 1 < chars.len() && chars[i + 1] == '/' => {
                mode = Mode::LineComment;
                out.push(c);
                last_was_space = false;
            }
            '/' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                mode = Mode::BlockComment;
                out.push(c);
                last_was_space = false;
            }
            '/' if regex_allowed(&out) => {
                mode = Mode::Regex;
                out.push(c);
                last_was_space = false;
            }
            '{' => {
                out.push(c);
                indent += 1;
                push_newline_indent(&mut out, indent);
                last_was_space = true;
            }
            '}' => {
                indent = indent.saturating_sub(1);
                push_newline_indent(&mut out, indent);
                out.push(c);
                last_was_space = false;
            }
            ';' => {
                out.push(c);
                if !inside_for_header(&out) {
                    push_newline_indent(&mut out, indent);
                    last_was_space = true;
                } else {
                    out.push(' ');
                    last_was_space = true;
                }
            }
            ',' | ':' => {
                out.push(c);
                out.push(' ');
                last_was_space = true;
            }
            '\n' | '\r' => {
                // original newlines are dropped; whitespace collapses below.
            }
            ' ' | '\t' => {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            }
            other => {
                out.push(other);
                last_was_space = false;
            }
        }

        i += 1;
    }

    out
}

/// Best-effort: a `/` starts a regex literal if the preceding non-space
/// output looks like an operator/keyword position rather than a value.
fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    match trimmed.chars().last() {
        None => true,
        Some(c) if matches!(c, '(' | ',' | '=' | '{' | '[' | '!' | '&' | '|' | '?' | ':' | ';') => true,
        Some(_) => {
            for kw in ["return", "typeof", "case"] {
                if trimmed.ends_with(kw) {
                    return true;
                }
            }
            false
        }
    }
}

/// Back-scan up to 50 chars for an unclosed `for(` before this point.
fn inside_for_header(out: &str) -> bool {
    let tail_start = out.len().saturating_sub(50);
    let tail = &out[tail_start..];
    if let Some(pos) = tail.rfind("for") {
        let after = &tail[pos + 3..];
        let opens = after.matches('(').count();
        let closes = after.matches(')').count();
        return opens > closes;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_minified_single_line() {
        let src = "a".repeat(300);
        assert!(looks_minified(&src));
    }

    #[test]
    fn does_not_flag_well_formatted_source() {
        let src = "function a() {\n  return 1;\n}\n\nfunction b() {\n  return 2;\n}\n\nfunction c() {\n  return 3;\n}\n";
        assert!(!looks_minified(src));
    }

    #[test]
    fn detects_obfuscation_markers() {
        assert!(looks_obfuscated("eval(atob('abc'))"));
        assert!(!looks_obfuscated("eval(x)"));
    }

    #[test]
    fn beautify_indents_blocks() {
        let src = "function a(){if(x){y();}}";
        let out = beautify(src);
        assert!(out.contains("{\n  "));
        assert!(out.contains("y();"));
    }

    #[test]
    fn beautify_preserves_string_contents() {
        let src = "var s = 'a{b};c,d:e';";
        let out = beautify(src);
        assert!(out.contains("'a{b};c,d:e'"));
    }

    #[test]
    fn beautify_does_not_split_for_header() {
        let src = "for(var i=0;i<10;i++){x();}";
        let out = beautify(src);
        let for_line = out.lines().find(|l| l.contains("for")).unwrap();
        assert!(for_line.contains("i=0;") && for_line.contains("i<10;"));
    }
}
