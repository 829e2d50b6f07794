//! Token extraction from free text

use regex::Regex;
use std::sync::LazyLock;

/// Grammar used by `tokenize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// `scheme://...` and bare `www.` links
    Uri,
    /// `local@domain.tld`
    Email,
    /// Runs of letters and digits
    Words,
}

impl TokenKind {
    pub(crate) fn parse(kind: &str) -> Option<Self> {
        match kind {
            "uri" | "url" => Some(Self::Uri),
            "email" => Some(Self::Email),
            "words" => Some(Self::Words),
            _ => None,
        }
    }
}

static URI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:[a-z][a-z0-9+.\-]*://|www\.)[^\s<>"'`{}|\\^\[\]]+"#).unwrap()
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap()
});

/// Split `text` into tokens of `kind`, left to right.
///
/// Matches never overlap and each one is as long as the grammar allows, so
/// the same input always yields the same list.
pub(crate) fn tokenize(text: &str, kind: TokenKind) -> Vec<String> {
    match kind {
        TokenKind::Uri => URI_REGEX
            .find_iter(text)
            .map(|m| trim_uri(m.as_str()))
            .filter(|uri| !uri.ends_with("://") && uri.len() > "www.".len())
            .map(str::to_string)
            .collect(),
        TokenKind::Email => EMAIL_REGEX
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
        TokenKind::Words => text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Drop sentence punctuation glued to the end of a link
fn trim_uri(uri: &str) -> &str {
    let mut uri = uri;
    loop {
        let trimmed = uri.trim_end_matches(['.', ',', ';', ':', '!', '?']);
        let trimmed = match trimmed.strip_suffix(')') {
            Some(inner) if !inner.contains('(') => inner,
            _ => trimmed,
        };
        if trimmed.len() == uri.len() {
            return uri;
        }
        uri = trimmed;
    }
}
