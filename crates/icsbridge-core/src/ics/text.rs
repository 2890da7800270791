//! Content-line text handling: value escaping, line folding, line endings.

/// Line terminator of every emitted line.
pub const CRLF: &str = "\r\n";

/// Longest physical line before a fold.
pub const FOLD_WIDTH: usize = 75;

/// Inserted at every fold point.
const FOLD_BREAK: &str = "\r\n\t";

/// Escapes a free-text value.
///
/// CR LF pairs become a literal `\n` and commas become `\,`. Semicolons and
/// backslashes pass through unchanged; consumers of the exported files rely
/// on this exact form.
pub fn escape_text(value: &str) -> String {
    value.replace("\r\n", "\\n").replace(',', "\\,")
}

/// Folds an assembled `NAME:VALUE` line.
///
/// A break is inserted at character offsets 75, 150, 225... of the line as it
/// grows, so the first physical line holds 75 characters and every
/// continuation holds a tab plus 72 characters. Offsets count Unicode scalar
/// values, so a character is never split.
pub fn fold_line(line: &str) -> String {
    let mut chars: Vec<char> = line.chars().collect();
    if chars.len() <= FOLD_WIDTH {
        return line.to_string();
    }

    let mut at = FOLD_WIDTH;
    while at < chars.len() {
        chars.splice(at..at, FOLD_BREAK.chars());
        at += FOLD_WIDTH;
    }
    chars.into_iter().collect()
}

/// Removes fold breaks, restoring the logical line.
pub fn unfold(text: &str) -> String {
    text.replace(FOLD_BREAK, "")
}

/// Appends a folded line and its terminator.
pub fn push_line(out: &mut String, line: &str) {
    out.push_str(&fold_line(line));
    out.push_str(CRLF);
}
