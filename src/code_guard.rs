//! Keeps the speech channel free of code.
//!
//! Code reaches the editor only through structured `codeEdits`; spoken text
//! and few-shot guidance must read as prose. [`looks_like_code`] is the shared
//! detector and [`sanitize_spoken_text`] the output-side scrubber.

/// Replacement for fenced code blocks in spoken text.
pub const CODE_PLACEHOLDER: &str = "[code omitted]";

const FENCE: &str = "```";

/// Heuristic check for code in natural-language text.
///
/// Flags triple-backtick fences, inline backtick spans, declaration-shaped
/// `function`/`const`/`let` keywords (`const total =`, `function add(`), and
/// JSX/HTML-like tags (`<div>`, `</Editor>`, `<Button />`).
pub fn looks_like_code(text: &str) -> bool {
    text.contains(FENCE) || has_inline_code(text) || has_declaration(text) || has_tag(text)
}

/// Strips code out of a reply before it is spoken.
///
/// Fenced blocks become [`CODE_PLACEHOLDER`] (an unterminated fence swallows
/// the rest of the text) and inline backtick spans are unwrapped. Text that
/// does not look like code is returned trimmed but otherwise unchanged.
pub fn sanitize_spoken_text(text: &str) -> String {
    if !looks_like_code(text) {
        return text.trim().to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        out.push_str(&rest[..open]);
        out.push_str(CODE_PLACEHOLDER);
        let after_open = &rest[open + FENCE.len()..];
        rest = match after_open.find(FENCE) {
            Some(close) => &after_open[close + FENCE.len()..],
            None => "",
        };
    }
    out.push_str(rest);

    let unwrapped: String = out.chars().filter(|&c| c != '`').collect();
    collapse_blank_lines(unwrapped.trim())
}

fn has_inline_code(text: &str) -> bool {
    text.lines().any(|line| {
        // Odd-indexed segments sit between a pair of backticks, as long as a
        // closing backtick follows them.
        let segments: Vec<&str> = line.split('`').collect();
        (1..segments.len().saturating_sub(1))
            .step_by(2)
            .any(|i| !segments[i].trim().is_empty())
    })
}

fn has_declaration(text: &str) -> bool {
    word_spans(text).iter().any(|&(pos, word)| {
        let after = &text[pos + word.len()..];
        match word {
            "function" => is_function_shape(after),
            "const" | "let" => is_binding_shape(after),
            _ => false,
        }
    })
}

/// `function(`, `function name(`, `function* name(`.
fn is_function_shape(after: &str) -> bool {
    let rest = after.trim_start_matches([' ', '\t', '*']);
    let rest = rest.trim_start_matches(is_ident_char);
    rest.trim_start().starts_with('(')
}

/// `const name =`, `let name: T =`, `const { a } =`, `let [x] =`.
fn is_binding_shape(after: &str) -> bool {
    if !after.starts_with([' ', '\t']) {
        return false;
    }
    let rest = after.trim_start();
    if rest.starts_with(['{', '[']) {
        return rest.contains('=');
    }
    let ident_len = rest.len() - rest.trim_start_matches(is_ident_char).len();
    if ident_len == 0 {
        return false;
    }
    let tail = rest[ident_len..].trim_start();
    (tail.starts_with('=') && !tail.starts_with("==")) || tail.starts_with(':')
}

fn has_tag(text: &str) -> bool {
    text.match_indices('<').any(|(pos, _)| {
        let rest = &text[pos + 1..];
        let name = rest.strip_prefix('/').unwrap_or(rest);
        let Some(first) = name.chars().next() else {
            return false;
        };
        if !first.is_ascii_alphabetic() {
            return false;
        }
        let after_name = name.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-');
        let line_end = after_name.find('\n').unwrap_or(after_name.len());
        let line = &after_name[..line_end];
        line.starts_with('>')
            || line.starts_with("/>")
            || (line.starts_with(' ') && (line.contains("/>") || line.contains("=\"")) && line.contains('>'))
    })
}

fn word_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (is_ident_char(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                spans.push((s, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, &text[s..]));
    }
    spans
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out
}
