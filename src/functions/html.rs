//! Attribute extraction from HTML

use crate::parser::decode_entities;

/// Values of the attributes named in `names` on every `tag` element, in
/// document order. An empty `tag` matches any element.
///
/// This is a tolerant scanner, not a parser: it never fails, skips comments,
/// closing tags and the content of `script`/`style`, and reads quoted and
/// unquoted values. Names compare case-insensitively; values are
/// entity-decoded and trimmed.
pub(crate) fn html_attrs(html: &str, tag: &str, names: &[String]) -> Vec<String> {
    let bytes = html.as_bytes();
    let mut values = Vec::new();
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset + 1;

        if html[start..].starts_with("!--") {
            pos = html[start..].find("-->").map_or(html.len(), |end| start + end + 3);
            continue;
        }
        if matches!(bytes.get(start), Some(b'/' | b'!' | b'?')) {
            pos = html[start..].find('>').map_or(html.len(), |end| start + end + 1);
            continue;
        }

        let name_end = scan(bytes, start, |b| b.is_ascii_alphanumeric() || b"-_:".contains(&b));
        if name_end == start {
            // A lone '<' in text
            pos = start;
            continue;
        }
        let element = &html[start..name_end];
        let wanted = tag.is_empty() || element.eq_ignore_ascii_case(tag);

        let (end, self_closing) = read_attributes(html, name_end, |attr, value| {
            if wanted && names.iter().any(|n| n.eq_ignore_ascii_case(attr)) {
                values.push(decode_entities(value.trim()).trim().to_string());
            }
        });
        pos = end;

        if !self_closing
            && (element.eq_ignore_ascii_case("script") || element.eq_ignore_ascii_case("style"))
        {
            pos = find_closing(html, pos, element);
        }
    }

    values
}

/// Read `name=value` pairs up to the end of the tag. Returns the position
/// after the closing `>` and whether the tag ended with `/>`.
fn read_attributes(html: &str, mut pos: usize, mut on_attr: impl FnMut(&str, &str)) -> (usize, bool) {
    let bytes = html.as_bytes();
    let mut self_closing = false;

    loop {
        pos = scan(bytes, pos, |b| b.is_ascii_whitespace());
        match bytes.get(pos) {
            None => return (html.len(), self_closing),
            Some(b'>') => return (pos + 1, self_closing),
            Some(b'/') => {
                self_closing = true;
                pos += 1;
                continue;
            }
            Some(_) => self_closing = false,
        }

        let name_start = pos;
        pos = scan(bytes, pos, |b| {
            !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/')
        });
        let name = &html[name_start..pos];

        pos = scan(bytes, pos, |b| b.is_ascii_whitespace());
        if bytes.get(pos) != Some(&b'=') {
            // Attribute without a value
            continue;
        }
        pos = scan(bytes, pos + 1, |b| b.is_ascii_whitespace());

        let value = match bytes.get(pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                let value_start = pos + 1;
                let value_end = scan(bytes, value_start, |b| b != quote);
                pos = (value_end + 1).min(html.len());
                &html[value_start..value_end]
            }
            _ => {
                let value_start = pos;
                pos = scan(bytes, pos, |b| !b.is_ascii_whitespace() && b != b'>');
                &html[value_start..pos]
            }
        };

        if !name.is_empty() {
            on_attr(name, value);
        }
    }
}

/// First position at or after `pos` whose byte fails `accept`
fn scan(bytes: &[u8], pos: usize, accept: impl Fn(u8) -> bool) -> usize {
    bytes[pos.min(bytes.len())..]
        .iter()
        .position(|b| !accept(*b))
        .map_or(bytes.len(), |offset| pos + offset)
}

/// Position after `</element ...>`, or the end of the document
fn find_closing(html: &str, pos: usize, element: &str) -> usize {
    let lower = html[pos..].to_ascii_lowercase();
    let needle = format!("</{}", element.to_ascii_lowercase());
    lower.find(&needle).map_or(html.len(), |offset| {
        let after = pos + offset + needle.len();
        html[after..].find('>').map_or(html.len(), |end| after + end + 1)
    })
}
