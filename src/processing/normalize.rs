//! Text conditioning for raw PDF extraction output.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static HYPHEN_LINEBREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)-\n(\w+)").expect("hyphen linebreak pattern"));
static HYPHEN_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])- ([a-z])").expect("hyphen space pattern"));
static FORM_FEED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\f").expect("form feed pattern"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank lines pattern"));

/// Clean raw text extracted from a PDF.
///
/// A fixed linear sequence of rules, applied in this order:
/// 1. collapse whitespace runs to a single space,
/// 2. rejoin words hyphenated across a line break,
/// 3. rejoin `wrong- fix` style extraction artifacts between lowercase letters,
/// 4. replace form feeds with a space,
/// 5. collapse consecutive blank lines,
/// 6. trim the ends.
///
/// Normalizing already-normalized text is a no-op.
pub fn clean_text(text: &str) -> String {
    let text = WHITESPACE_RUN.replace_all(text, " ");
    let text = HYPHEN_LINEBREAK.replace_all(&text, "$1$2");
    let text = HYPHEN_SPACE.replace_all(&text, "$1$2");
    let text = FORM_FEED.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n");
    text.trim().to_string()
}
