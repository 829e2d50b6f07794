use email_features::{ConfigError, PublicSuffixIndex};
use tokio_test::{assert_err, assert_ok};

fn index() -> PublicSuffixIndex {
    PublicSuffixIndex::from_rules(["com", "uk", "co.uk", "*.ck", "!www.ck", "jp", "*.kobe.jp"])
}

#[test]
fn test_lookup_longest_rule() {
    let psl = index();

    let found = psl.lookup("mail.example.co.uk").unwrap();
    assert_eq!(found.suffix, "co.uk");
    assert_eq!(found.registrable, Some("example.co.uk"));

    let found = psl.lookup("example.com").unwrap();
    assert_eq!(found.suffix, "com");
    assert_eq!(found.registrable, Some("example.com"));
}

#[test]
fn test_lookup_suffix_itself() {
    let found = index().lookup("co.uk").unwrap();
    assert_eq!(found.suffix, "co.uk");
    assert_eq!(found.registrable, None);
}

#[test]
fn test_lookup_wildcard_and_exception() {
    let psl = index();

    let found = psl.lookup("shop.example.ck").unwrap();
    assert_eq!(found.suffix, "example.ck");
    assert_eq!(found.registrable, Some("shop.example.ck"));

    let found = psl.lookup("www.ck").unwrap();
    assert_eq!(found.suffix, "ck");
    assert_eq!(found.registrable, Some("www.ck"));

    let found = psl.lookup("a.b.kobe.jp").unwrap();
    assert_eq!(found.suffix, "b.kobe.jp");
    assert_eq!(found.registrable, Some("a.b.kobe.jp"));
}

#[test]
fn test_lookup_unknown() {
    let psl = index();
    assert!(psl.lookup("example.invalid").is_none());
    assert!(psl.lookup("").is_none());
    assert!(psl.lookup("a..com").is_none());
}

#[test]
fn test_contains() {
    let psl = index();
    assert!(psl.contains("co.uk"));
    assert!(psl.contains("CO.UK."));
    assert!(!psl.contains("example.co.uk"));
}

// --- List format ---

#[test]
fn test_parse_list_format() {
    let list = "// ===BEGIN ICANN DOMAINS===\n\ncom\n// comment\nco.uk\n*.ck\n!www.ck\n";
    let psl = assert_ok!(PublicSuffixIndex::parse(list));
    assert_eq!(psl.len(), 4);
    assert!(!psl.is_empty());
}

#[test]
fn test_parse_rejects_bad_rule() {
    let err = assert_err!(PublicSuffixIndex::parse("com\n.bad\n"));
    assert!(matches!(err, ConfigError::InvalidSuffixRule { line: 2, .. }));
}

#[test]
fn test_from_file_missing() {
    let err = assert_err!(PublicSuffixIndex::from_file("/nonexistent/public_suffix_list.dat"));
    assert!(matches!(err, ConfigError::Io { .. }));
}
