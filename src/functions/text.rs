//! Subject normalization

/// Reply and forward markers, in the languages mail clients commonly emit
const REPLY_MARKERS: &[&str] = &[
    "re", "fw", "fwd", "aw", "wg", "sv", "vs", "antw", "tr", "rv", "ref", "rif", "r", "res",
    "enc", "odp", "doorst", "vl", "ynt",
];

/// Strip reply/forward prefixes and bracketed list tags from a subject.
///
/// `Re: Fwd: [list] Hello` becomes `Hello`. Applying the function to its own
/// output returns the same string.
#[must_use]
pub(crate) fn thread_name(subject: &str) -> String {
    let mut name = subject.trim();

    loop {
        let before = name.len();

        if let Some(rest) = strip_tag(name).or_else(|| strip_marker(name)) {
            name = rest.trim_start();
        }
        if let Some(rest) = strip_trailing_fwd(name) {
            name = rest.trim_end();
        }

        if name.len() == before {
            break;
        }
    }

    name.to_string()
}

/// `[anything]` at the start of the subject
fn strip_tag(subject: &str) -> Option<&str> {
    let rest = subject.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(&rest[end + 1..])
}

/// `Re:`, `RE[2]:`, `Fwd(3):`, `AW :` and the like
fn strip_marker(subject: &str) -> Option<&str> {
    let word_end = subject
        .find(|ch: char| !ch.is_ascii_alphabetic())
        .unwrap_or(subject.len());
    let word = &subject[..word_end];
    if !REPLY_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(word)) {
        return None;
    }

    let mut rest = &subject[word_end..];
    if let Some(close) = match rest.chars().next() {
        Some('[') => Some(']'),
        Some('(') => Some(')'),
        _ => None,
    } {
        let end = rest.find(close)?;
        if !rest[1..end].chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        rest = &rest[end + 1..];
    }

    let rest = rest.trim_start_matches(' ');
    rest.strip_prefix(':').or_else(|| rest.strip_prefix('\u{ff1a}'))
}

/// `(fwd)` at the end of the subject
fn strip_trailing_fwd(subject: &str) -> Option<&str> {
    let split = subject.len().checked_sub("(fwd)".len())?;
    let tail = subject.get(split..)?;
    tail.eq_ignore_ascii_case("(fwd)").then_some(&subject[..split])
}
