//! Address, domain and URI decomposition

use crate::psl::{PublicSuffixIndex, SuffixMatch};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EmailPart {
    Local,
    Domain,
}

impl EmailPart {
    pub(crate) fn parse(part: &str) -> Option<Self> {
        match part {
            "local" => Some(Self::Local),
            "domain" | "host" => Some(Self::Domain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DomainPart {
    /// Registrable domain: public suffix plus one label
    Sld,
    /// The public suffix itself
    Tld,
}

impl DomainPart {
    pub(crate) fn parse(part: &str) -> Option<Self> {
        match part {
            "sld" => Some(Self::Sld),
            "tld" => Some(Self::Tld),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UriPart {
    Scheme,
    Host,
    Path,
    Query,
}

impl UriPart {
    pub(crate) fn parse(part: &str) -> Option<Self> {
        match part {
            "scheme" => Some(Self::Scheme),
            "host" => Some(Self::Host),
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            _ => None,
        }
    }
}

/// Split at the last `@` that is not backslash-escaped. Without one both
/// parts are empty. Quotes get no special treatment, so a stray `"` never
/// hides the separator.
pub(crate) fn email_part(addr: &str, part: EmailPart) -> &str {
    let mut split = None;
    let mut escaped = false;

    for (pos, ch) in addr.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '@' => split = Some(pos),
            _ => {}
        }
    }

    match (split, part) {
        (Some(pos), EmailPart::Local) => &addr[..pos],
        (Some(pos), EmailPart::Domain) => &addr[pos + 1..],
        (None, _) => "",
    }
}

/// Registrable domain or public suffix of `domain`.
///
/// The lookup ignores case, surrounding whitespace and a trailing dot. When
/// the domain has no registrable part (unknown suffix, or the domain is
/// itself a suffix) `sld` returns the input unchanged and `tld` falls back to
/// the last label.
pub(crate) fn domain_part(psl: &PublicSuffixIndex, domain: &str, part: DomainPart) -> String {
    let normalized = domain.trim().trim_end_matches('.').to_lowercase();
    let found = psl.lookup(&normalized);

    match (part, found) {
        (
            DomainPart::Sld,
            Some(SuffixMatch {
                registrable: Some(registrable),
                ..
            }),
        ) => registrable.to_string(),
        (DomainPart::Sld, _) => domain.to_string(),
        (DomainPart::Tld, Some(found)) => found.suffix.to_string(),
        (DomainPart::Tld, None) => normalized
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Component of a URI; empty when the URI cannot be parsed. Bare `www.`
/// links are read as `http`.
pub(crate) fn uri_part(uri: &str, part: UriPart) -> String {
    let uri = uri.trim();
    let parsed = Url::parse(uri).or_else(|err| {
        if uri.contains("://") {
            Err(err)
        } else {
            Url::parse(&format!("http://{uri}"))
        }
    });
    let Ok(url) = parsed else {
        return String::new();
    };

    match part {
        UriPart::Scheme => url.scheme().to_string(),
        UriPart::Host => url.host_str().unwrap_or_default().to_string(),
        UriPart::Path => url.path().to_string(),
        UriPart::Query => url.query().unwrap_or_default().to_string(),
    }
}
