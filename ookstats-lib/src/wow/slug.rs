//! Slug helpers for file names and URL segments.

use regex::Regex;
use std::sync::LazyLock;

static NON_WORD_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s'\W]+").expect("invalid regex"));

/// Turn an arbitrary player name into a safe file name.
///
/// Unicode letters and digits survive (including diacritics), path separators
/// and spaces become `-`, everything else is dropped. Runs of `-` collapse and
/// the result never starts or ends with `-`. Falls back to `"player"`.
#[must_use]
pub fn safe_slug_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut prev_dash = false;
    for c in lowered.chars() {
        let mapped = match c {
            '/' | '\\' | ' ' | '-' => '-',
            '_' => '_',
            c if c.is_alphanumeric() => c,
            _ => continue,
        };

        if mapped == '-' {
            if prev_dash {
                continue;
            }
            prev_dash = true;
        } else {
            prev_dash = false;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "player".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Generic URL slug: lower-case, any whitespace/apostrophe/non-word run becomes one `-`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    NON_WORD_RUN.replace_all(&lowered, "-").trim_matches('-').to_string()
}
