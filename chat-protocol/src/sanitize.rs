//! Makes generated text fit a single DNS TXT character-string.

/// Longest sanitized reply, kept below the 255 byte character-string limit.
pub const MAX_REPLY_LENGTH: usize = 240;
const ELLIPSIS: &str = "...";

pub fn sanitize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => normalized.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => normalized.push('"'),
            '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => normalized.push('-'),
            '\u{2026}' => normalized.push_str(ELLIPSIS),
            ' '..='~' => normalized.push(c),
            _ => {}
        }
    }

    // only spaces are left, newlines and tabs went with the other
    // non-printable characters
    let mut collapsed = normalized
        .split(' ')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.len() > MAX_REPLY_LENGTH {
        collapsed.truncate(MAX_REPLY_LENGTH - ELLIPSIS.len());
        collapsed.push_str(ELLIPSIS);
    }

    collapsed
}
