use email_features::{Envelope, parse_message};
use tokio_test::assert_ok;

#[test]
fn test_parse_simple_email() {
    let raw = b"From: John Doe <john@example.com>\r\n\
                To: recipient@proton.me, \"Jane\" <jane@example.org>\r\n\
                Cc: copy@example.net\r\n\
                Subject: Test Email\r\n\
                Date: Wed, 01 Jan 2025 12:00:00 +0000\r\n\
                Message-ID: <test123@example.com>\r\n\
                \r\n\
                Hello, this is a test email.";

    let message = assert_ok!(parse_message(raw));

    assert_eq!(message.header.from.addr, "john@example.com");
    assert_eq!(message.header.from.name, "John Doe");
    assert_eq!(message.header.to.len(), 2);
    assert_eq!(message.header.to[1].addr, "jane@example.org");
    assert_eq!(message.header.to[1].name, "Jane");
    assert_eq!(message.header.cc[0].addr, "copy@example.net");
    assert!(message.header.bcc.is_empty());
    assert_eq!(message.header.subject, "Test Email");
    assert_eq!(message.header.message_id, "<test123@example.com>");
    assert_eq!(message.header.date, "2025-01-01T12:00:00+00:00");
    assert_eq!(message.body.plain.as_deref().map(str::trim), Some("Hello, this is a test email."));
    assert!(message.body.html.is_empty());
}

#[test]
fn test_parse_reply_headers() {
    let raw = b"From: sender@example.com\r\n\
                Subject: Re: Re: Original Subject\r\n\
                In-Reply-To: <original@example.com>\r\n\
                References: <first@example.com> <original@example.com>\r\n\
                X-Mailer: Test Mailer 1.0\r\n\
                Date: not a date\r\n\
                \r\n\
                Reply content";

    let message = assert_ok!(parse_message(raw));

    assert_eq!(message.header.in_reply_to, "<original@example.com>");
    assert_eq!(
        message.header.references,
        vec!["<first@example.com>", "<original@example.com>"]
    );
    assert_eq!(message.header.raw_value("x-mailer"), Some("Test Mailer 1.0"));
    assert_eq!(message.header.raw_value("X-MAILER"), Some("Test Mailer 1.0"));
    assert_eq!(message.header.date, "not a date");
}

#[test]
fn test_parse_group_addresses() {
    let raw = b"From: sender@example.com\r\n\
                To: team: a@example.com, b@example.com;\r\n\
                Subject: Group\r\n\
                \r\n\
                Body";

    let message = assert_ok!(parse_message(raw));
    let addrs: Vec<&str> = message.header.to.iter().map(|a| a.addr.as_str()).collect();

    assert_eq!(addrs, vec!["a@example.com", "b@example.com"]);
}

// --- Body ---

#[test]
fn test_parse_multipart_alternative() {
    let raw = b"From: sender@example.com\r\n\
                Subject: Multipart\r\n\
                MIME-Version: 1.0\r\n\
                Content-Type: multipart/alternative; boundary=\"sep\"\r\n\
                \r\n\
                --sep\r\n\
                Content-Type: text/plain; charset=utf-8\r\n\
                \r\n\
                Plain version\r\n\
                --sep\r\n\
                Content-Type: text/html; charset=utf-8\r\n\
                \r\n\
                <p>HTML <a href=\"https://example.com\">version</a></p>\r\n\
                --sep--\r\n";

    let message = assert_ok!(parse_message(raw));

    assert_eq!(message.body.plain.as_deref().map(str::trim), Some("Plain version"));
    assert!(message.body.html.contains("href=\"https://example.com\""));
}

#[test]
fn test_parse_html_only() {
    let raw = b"From: sender@example.com\r\n\
                Subject: HTML\r\n\
                Content-Type: text/html\r\n\
                \r\n\
                <html><body><p>Hello &amp; welcome</p><script>var x = 1;</script></body></html>";

    let message = assert_ok!(parse_message(raw));

    assert!(message.body.plain.is_none());
    let text = message.body.text(&email_features::HtmlStripper);
    assert!(text.contains("Hello & welcome"));
    assert!(!text.contains("var x"));
}

// --- Transport data ---

#[test]
fn test_attach_envelope_and_connection() {
    let raw = b"From: sender@example.com\r\nSubject: Hi\r\n\r\nBody";

    let message = assert_ok!(parse_message(raw))
        .with_envelope(Envelope::new("bounce@example.com", vec!["rcpt@example.org".into()]))
        .with_connection(email_features::Connection::new("mx.example.com", "192.0.2.1"));

    assert_eq!(message.envelope.from, "bounce@example.com");
    assert_eq!(message.env.field("helo_domain"), Some("mx.example.com"));
    assert_eq!(message.env.field("remote_ip"), Some("192.0.2.1"));
    assert_eq!(message.env.field("unknown"), None);
}
