use email_features::*;

// --- Address ---

#[test]
fn test_address_parse_with_name() {
    let addr = Address::parse("\"John Doe\" <john@example.com>");
    assert_eq!(addr.name, "John Doe");
    assert_eq!(addr.addr, "john@example.com");
}

#[test]
fn test_address_parse_bare() {
    let addr = Address::parse("  john@example.com ");
    assert_eq!(addr.name, "");
    assert_eq!(addr.addr, "john@example.com");
}

#[test]
fn test_address_parse_keeps_malformed() {
    let addr = Address::parse("not an address");
    assert_eq!(addr.addr, "not an address");
}

#[test]
fn test_address_display() {
    assert_eq!(Address::new("Jane", "jane@example.org").to_string(), "Jane <jane@example.org>");
    assert_eq!(Address::new("", "jane@example.org").to_string(), "jane@example.org");
}

// --- Header ---

#[test]
fn test_header_raw_value_is_case_insensitive() {
    let header = Header {
        raw: vec![
            ("x-spam-flag".into(), "YES".into()),
            ("x-spam-flag".into(), "NO".into()),
        ],
        ..Default::default()
    };
    assert_eq!(header.raw_value("X-Spam-Flag"), Some("YES"));
    assert_eq!(header.raw_value("x_spam_flag"), Some("YES"));
    assert_eq!(header.raw_value("x-missing"), None);
}

// --- Body ---

struct Upper;

impl TextRenderer for Upper {
    fn to_text(&self, html: &str) -> String {
        html.to_uppercase()
    }
}

#[test]
fn test_body_prefers_plain_part() {
    let body = Body::new(Some("plain".into()), "<p>html</p>");
    assert_eq!(body.text(&Upper), "plain");
}

#[test]
fn test_body_renders_html_once() {
    let body = Body::from_html("<p>html</p>");
    assert_eq!(body.text(&Upper), "<P>HTML</P>");
    // The first rendering is cached
    assert_eq!(body.text(&HtmlStripper), "<P>HTML</P>");
}

#[test]
fn test_body_empty() {
    assert_eq!(Body::default().text(&Upper), "");
}

// --- Transport records ---

#[test]
fn test_envelope_malformed() {
    let envelope = Envelope::malformed("bad MAIL FROM");
    assert_eq!(envelope.malformed.as_deref(), Some("bad MAIL FROM"));
    assert!(envelope.to.is_empty());
}

#[test]
fn test_connection_extra_fields() {
    let mut env = Connection::new("mx.example.com", "192.0.2.1");
    env.extra.push(("tls_version".into(), "TLSv1.3".into()));

    assert_eq!(env.field("helo"), Some("mx.example.com"));
    assert_eq!(env.field("tls_version"), Some("TLSv1.3"));
    assert_eq!(env.field("authenticated_as"), Some(""));
}

// --- Value ---

#[test]
fn test_value_absent() {
    assert!(Value::default().is_empty());
    assert!(Shape::List.absent().is_empty());
    assert_eq!(Shape::Scalar.absent(), Value::from(""));
    assert_eq!(Shape::List.absent(), Value::List(Vec::new()));
}

#[test]
fn test_value_conversions() {
    assert_eq!(Value::from("a").into_list(), vec!["a"]);
    assert!(Value::from("").into_list().is_empty());
    assert_eq!(Value::from(vec!["a", "b"]).into_string(), "a b");
    assert_eq!(Value::from(vec!["a", "b"]).len(), 2);
    assert_eq!(Value::from(vec!["a"]).shape(), Shape::List);
}

#[test]
fn test_value_serializes_untagged() {
    assert_eq!(serde_json::to_string(&Value::from("a")).unwrap(), r#""a""#);
    assert_eq!(
        serde_json::to_string(&Value::from(vec!["a", "b"])).unwrap(),
        r#"["a","b"]"#
    );
}
