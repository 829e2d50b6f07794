//! Builds the document model from raw RFC 5322 bytes

use crate::error::{ParseError, Result};
use crate::types::{Address, Body, Header, Message, TextRenderer};
use chrono::DateTime;
use mailparse::{MailAddr, MailHeader, ParsedMail};
use tracing::debug;

/// Parse raw email bytes into a [`Message`].
///
/// Envelope and connection data are not part of the message bytes; attach
/// them with [`Message::with_envelope`] and [`Message::with_connection`].
pub fn parse_message(raw: &[u8]) -> Result<Message> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| ParseError::Structure(e.to_string()))?;

    let header = extract_header(&parsed.headers);
    let body = extract_body(&parsed)?;

    debug!("Parsed message: {} from {}", header.subject, header.from.addr);

    Ok(Message::new(header, body))
}

fn extract_header(headers: &[MailHeader]) -> Header {
    let raw: Vec<(String, String)> = headers
        .iter()
        .map(|h| (h.get_key().to_lowercase(), h.get_value()))
        .collect();

    let find = |name: &str| {
        headers
            .iter()
            .find(|h| h.get_key().eq_ignore_ascii_case(name))
    };
    let text = |name: &str| find(name).map(MailHeader::get_value).unwrap_or_default();
    let addresses = |name: &str| find(name).map(extract_addresses).unwrap_or_default();
    let single = |name: &str| addresses(name).into_iter().next().unwrap_or_default();

    Header {
        subject: text("subject"),
        from: single("from"),
        sender: single("sender"),
        to: addresses("to"),
        cc: addresses("cc"),
        bcc: addresses("bcc"),
        reply_to: addresses("reply-to"),
        message_id: text("message-id").trim().to_string(),
        in_reply_to: text("in-reply-to").trim().to_string(),
        references: text("references")
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        date: find("date").map(extract_date).unwrap_or_default(),
        raw,
    }
}

fn extract_addresses(header: &MailHeader) -> Vec<Address> {
    match mailparse::addrparse_header(header) {
        Ok(list) => list
            .iter()
            .flat_map(|addr| match addr {
                MailAddr::Single(info) => vec![Address::new(
                    info.display_name.clone().unwrap_or_default(),
                    info.addr.clone(),
                )],
                MailAddr::Group(group) => group
                    .addrs
                    .iter()
                    .map(|info| {
                        Address::new(info.display_name.clone().unwrap_or_default(), &info.addr)
                    })
                    .collect(),
            })
            .collect(),
        Err(e) => {
            // Keep whatever was there so address functions can fail gracefully
            debug!("Unparseable {} header: {e}", header.get_key());
            header
                .get_value()
                .split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(Address::parse)
                .collect()
        }
    }
}

fn extract_date(header: &MailHeader) -> String {
    let value = header.get_value();
    DateTime::parse_from_rfc2822(value.trim())
        .map_or_else(|_| value.trim().to_string(), |dt| dt.to_rfc3339())
}

fn extract_body(parsed: &ParsedMail) -> Result<Body> {
    let mut text: Option<String> = None;
    let mut html: Option<String> = None;

    if parsed.subparts.is_empty() {
        let content_type = parsed.ctype.mimetype.to_lowercase();
        let body = parsed
            .get_body()
            .map_err(|e| ParseError::Decode(e.to_string()))?;
        if content_type.contains("text/html") {
            html = Some(body);
        } else {
            text = Some(body);
        }
    } else {
        extract_body_recursive(parsed, &mut text, &mut html);
    }

    Ok(Body::new(text, html.unwrap_or_default()))
}

fn extract_body_recursive(parsed: &ParsedMail, text: &mut Option<String>, html: &mut Option<String>) {
    for part in &parsed.subparts {
        let content_type = part.ctype.mimetype.to_lowercase();

        if part.subparts.is_empty() {
            if let Ok(body) = part.get_body() {
                if content_type.contains("text/plain") && text.is_none() {
                    *text = Some(body);
                } else if content_type.contains("text/html") && html.is_none() {
                    *html = Some(body);
                }
            }
        } else {
            extract_body_recursive(part, text, html);
        }
    }
}

/// Default [`TextRenderer`]: drops tags, `<script>` and `<style>` content,
/// and decodes the common entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlStripper;

impl TextRenderer for HtmlStripper {
    fn to_text(&self, html: &str) -> String {
        strip_html(html)
    }
}

fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;
    let mut tag_start_idx: usize = 0;

    let chars: Vec<char> = html.chars().collect();
    let lower_chars: Vec<char> = chars.iter().map(char::to_ascii_lowercase).collect();

    for i in 0..chars.len() {
        if !in_tag && chars[i] == '<' {
            tag_start_idx = i;
            let remaining: String = lower_chars[i..chars.len().min(i + 9)].iter().collect();
            if remaining.starts_with("<script") {
                in_script = true;
            } else if remaining.starts_with("<style") {
                in_style = true;
            } else if remaining.starts_with("</script") {
                in_script = false;
            } else if remaining.starts_with("</style") {
                in_style = false;
            }
            in_tag = true;
        } else if in_tag && chars[i] == '>' {
            in_tag = false;
            // Block elements end a line
            let tag_content: String = lower_chars[tag_start_idx + 1..i].iter().collect();
            if tag_content.starts_with("br")
                || tag_content.starts_with("/p")
                || tag_content.starts_with("/div")
                || tag_content.starts_with("/li")
                || tag_content.starts_with("/h")
                || tag_content.starts_with("/tr")
            {
                result.push('\n');
            }
        } else if !in_tag && !in_script && !in_style {
            result.push(chars[i]);
        }
    }

    decode_entities(&result)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}
