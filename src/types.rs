//! Document model: a read-only view of one parsed message

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A parsed message as seen by feature scripts.
///
/// Built once per message by the MIME layer (or [`crate::parse_message`]) and
/// never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Header fields
    pub header: Header,

    /// Body content
    pub body: Body,

    /// SMTP envelope
    pub envelope: Envelope,

    /// Connection metadata observed by the transport
    pub env: Connection,
}

impl Message {
    #[must_use]
    pub fn new(header: Header, body: Body) -> Self {
        Self {
            header,
            body,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    #[must_use]
    pub fn with_connection(mut self, env: Connection) -> Self {
        self.env = env;
        self
    }
}

/// Email address with display name.
///
/// `addr` is kept exactly as received, even when it is not a valid addr-spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Display name (e.g., "John Doe")
    pub name: String,

    /// Address (e.g., "john@example.com")
    pub addr: String,
}

impl Address {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
        }
    }

    /// Parse a single mailbox, keeping malformed input as the address.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        // Try to match "Name <email@domain.com>" format
        if let Some(start) = s.rfind('<')
            && let Some(end) = s[start..].find('>')
        {
            let name = s[..start].trim().trim_matches('"');
            let addr = s[start + 1..start + end].trim();
            return Self::new(name, addr);
        }

        Self::new("", s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{} <{}>", self.name, self.addr)
        }
    }
}

/// Email headers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    pub subject: String,
    pub from: Address,
    pub sender: Address,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub reply_to: Vec<Address>,
    pub message_id: String,
    pub in_reply_to: String,

    /// Message IDs from the References header
    pub references: Vec<String>,

    /// RFC 3339 when the Date header parsed, raw value otherwise
    pub date: String,

    /// All headers as (lowercase name, value) pairs, in message order
    pub raw: Vec<(String, String)>,
}

impl Header {
    /// Value of the first header named `name`. Case is ignored and `_`
    /// matches `-`, so `x_mailer` finds `X-Mailer`.
    #[must_use]
    pub fn raw_value(&self, name: &str) -> Option<&str> {
        let fold = |b: u8| if b == b'_' { b'-' } else { b.to_ascii_lowercase() };
        self.raw
            .iter()
            .find(|(key, _)| {
                key.len() == name.len()
                    && key.bytes().zip(name.bytes()).all(|(a, b)| fold(a) == fold(b))
            })
            .map(|(_, value)| value.as_str())
    }
}

/// Renders HTML markup as plain text.
///
/// The default is [`crate::HtmlStripper`]; MIME layers with a better renderer
/// plug theirs in through [`crate::Engine::with_renderer`].
pub trait TextRenderer: Send + Sync {
    fn to_text(&self, html: &str) -> String;
}

/// Email body content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Body {
    /// Plain text part, when the message has one
    pub plain: Option<String>,

    /// Raw HTML markup, empty when there is none
    pub html: String,

    #[serde(skip)]
    rendered: OnceLock<String>,
}

impl Body {
    #[must_use]
    pub fn new(plain: Option<String>, html: impl Into<String>) -> Self {
        Self {
            plain,
            html: html.into(),
            rendered: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Some(text.into()), "")
    }

    #[must_use]
    pub fn from_html(html: impl Into<String>) -> Self {
        Self::new(None, html)
    }

    /// Plain text of the body, rendering the HTML part on first use when
    /// there is no text part.
    pub fn text(&self, renderer: &dyn TextRenderer) -> &str {
        match &self.plain {
            Some(text) => text,
            None if self.html.is_empty() => "",
            None => self.rendered.get_or_init(|| renderer.to_text(&self.html)),
        }
    }
}

/// SMTP envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// MAIL FROM address
    pub from: String,

    /// RCPT TO addresses
    pub to: Vec<String>,

    /// Set when the transport could not capture a usable envelope
    pub malformed: Option<String>,
}

impl Envelope {
    pub fn new(from: impl Into<String>, to: Vec<String>) -> Self {
        Self {
            from: from.into(),
            to,
            malformed: None,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            malformed: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Connection metadata observed by the transport
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    pub helo_domain: String,
    pub remote_ip: String,
    pub authenticated_as: String,

    /// Any other transport-observed fields
    pub extra: Vec<(String, String)>,

    /// Set when the connection record is unusable
    pub malformed: Option<String>,
}

impl Connection {
    pub fn new(helo_domain: impl Into<String>, remote_ip: impl Into<String>) -> Self {
        Self {
            helo_domain: helo_domain.into(),
            remote_ip: remote_ip.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "helo_domain" | "helo" => Some(&self.helo_domain),
            "remote_ip" => Some(&self.remote_ip),
            "authenticated_as" => Some(&self.authenticated_as),
            _ => self
                .extra
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
        }
    }
}
