use email_features::*;
use std::ops::ControlFlow;
use tokio_test::{assert_err, assert_ok};

fn engine() -> Engine {
    Engine::new(PublicSuffixIndex::from_rules(["com", "org", "net", "uk", "co.uk"]))
}

// --- Binding order ---

#[test]
fn test_rebinding_is_seen_by_later_statements() {
    let script = assert_ok!(engine().compile(
        r#"
        let "x" "'first'";
        let "y" "x";
        let "x" "'second'";
        let "z" "x";
        "#,
    ));
    let features = script.evaluate(&Message::default());

    assert_eq!(features.get("y"), Some(&Value::from("first")));
    assert_eq!(features.get("z"), Some(&Value::from("second")));
    assert_eq!(features.get("x"), Some(&Value::from("second")));
    assert_eq!(features.names(), vec!["x", "y", "z"]);
}

#[test]
fn test_rebinding_may_change_shape() {
    let script = assert_ok!(engine().compile(
        r#"
        let "x" "'a'";
        let "x" "x + ['b']";
        let "n" "x[1]";
        "#,
    ));
    assert_eq!(script.names(), ["x", "n"]);

    let features = script.evaluate(&Message::default());
    assert_eq!(features.get("x"), Some(&Value::from(vec!["a", "b"])));
    assert_eq!(features.get("n"), Some(&Value::from("b")));

    // The newest binding decides the type seen by later statements
    let err = assert_err!(engine().compile(r#"let "x" "['a']"; let "x" "'b'"; let "y" "x[0]";"#));
    assert_eq!(
        err,
        CompileError::WildcardOnScalar("x[0]".into()).in_statement(2, "y")
    );
}

#[test]
fn test_no_forward_references() {
    let err = assert_err!(engine().compile(
        r#"
        let "a" "b";
        let "b" "'x'";
        "#,
    ));
    assert_eq!(
        err,
        CompileError::UndefinedName("b".into()).in_statement(0, "a")
    );
}

#[test]
fn test_self_reference_sees_previous_value() {
    let script = assert_ok!(engine().compile(
        r#"
        let "list" "['b']";
        let "list" "['a'] + list";
        "#,
    ));
    let features = script.evaluate(&Message::default());
    assert_eq!(features.get("list"), Some(&Value::from(vec!["a", "b"])));
}

// --- Failures ---

#[test]
fn test_failure_binds_absent_and_continues() {
    let message = Message::default().with_envelope(Envelope::malformed("no envelope"));
    let script = assert_ok!(engine().compile(
        r#"
        let "from" "envelope.from";
        let "rcpt" "envelope.to";
        let "joined" "from + '|'";
        "#,
    ));
    let features = script.evaluate(&message);

    assert_eq!(features.len(), 3);
    assert_eq!(features.get("from"), Some(&Value::from("")));
    assert_eq!(features.get("rcpt"), Some(&Value::List(Vec::new())));
    assert_eq!(features.get("joined"), Some(&Value::from("|")));

    let failed: Vec<&str> = features.failures().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["from", "rcpt"]);
    assert_eq!(features.failures()[1].index, 1);
}

// --- Checkpoints ---

#[test]
fn test_checkpoint_sees_every_statement() {
    let message = Message::default().with_envelope(Envelope::malformed("bad"));
    let script = assert_ok!(engine().compile(
        r#"
        let "a" "'x'";
        let "b" "envelope.from";
        let "a" "'y'";
        "#,
    ));

    let mut reports = Vec::new();
    let features = assert_ok!(script.evaluate_with(&message, |report| {
        reports.push((report.index, report.name.to_string(), report.state));
        ControlFlow::Continue(())
    }));

    assert_eq!(
        reports,
        vec![
            (0, "a".to_string(), StatementState::Bound),
            (1, "b".to_string(), StatementState::Failed),
            (2, "a".to_string(), StatementState::Bound),
        ]
    );
    assert_eq!(features.get("a"), Some(&Value::from("y")));
}

#[test]
fn test_checkpoint_interrupts() {
    let script = assert_ok!(engine().compile(
        r#"
        let "a" "'1'";
        let "b" "'2'";
        let "c" "'3'";
        "#,
    ));

    let mut seen = 0;
    let err = assert_err!(script.evaluate_with(&Message::default(), |report| {
        seen += 1;
        if report.index == 1 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }));

    assert_eq!(err, EvalError::Interrupted { after: 1 });
    assert_eq!(seen, 2);
}

// --- Concurrency ---

#[test]
fn test_concurrent_evaluation() {
    let script = assert_ok!(engine().compile(DEFAULT_SCRIPT));

    let messages: Vec<Message> = (0..8)
        .map(|i| {
            let header = Header {
                from: Address::new("", format!("user{i}@mail.example{i}.co.uk")),
                ..Default::default()
            };
            Message::new(header, Body::default())
        })
        .collect();

    let script = &script;
    let results: Vec<FeatureSet> = std::thread::scope(|scope| {
        let handles: Vec<_> = messages
            .iter()
            .map(|message| scope.spawn(move || script.evaluate(message)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, features) in results.iter().enumerate() {
        assert_eq!(
            features.get("sender_domain_sld"),
            Some(&Value::from(format!("example{i}.co.uk")))
        );
    }
}

// --- Bundled script ---

#[test]
fn test_default_script() {
    let raw = b"From: \"Alice\" <Alice@Mail.Example.COM>\r\n\
                To: a@x.com, b@mail.y.co.uk\r\n\
                Cc: A@X.com\r\n\
                Subject: Re: [promo] Fwd: Big sale\r\n\
                Content-Type: text/html\r\n\
                \r\n\
                <p>Visit https://shop.example.com/deal or \
                <a href=\"https://track.example.net/c?id=1\">here</a></p>\
                <img src=\"https://cdn.example.org/pixel.gif\">";

    let message = assert_ok!(parse_message(raw))
        .with_envelope(Envelope::new("Bounce@Lists.Example.com", vec!["a@x.com".into()]))
        .with_connection(Connection::new("MX1.Sender.NET", "192.0.2.7"));

    let script = assert_ok!(engine().compile(DEFAULT_SCRIPT));
    let features = script.evaluate(&message);

    assert!(features.failures().is_empty());
    assert_eq!(
        features.get("recipients"),
        Some(&Value::from(vec!["a@x.com", "b@mail.y.co.uk"]))
    );
    assert_eq!(
        features.get("recipient_domains_sld"),
        Some(&Value::from(vec!["x.com", "y.co.uk"]))
    );
    assert_eq!(features.get("sender"), Some(&Value::from("alice@mail.example.com")));
    assert_eq!(features.get("sender_name"), Some(&Value::from("Alice")));
    assert_eq!(features.get("sender_domain_sld"), Some(&Value::from("example.com")));
    assert_eq!(
        features.get("envelope_from_domain_sld"),
        Some(&Value::from("example.com"))
    );
    assert_eq!(features.get("helo_domain"), Some(&Value::from("mx1.sender.net")));
    assert_eq!(features.get("helo_domain_sld"), Some(&Value::from("sender.net")));
    assert_eq!(features.get("thread_name"), Some(&Value::from("Big sale")));
    assert_eq!(
        features.get("urls"),
        Some(&Value::from(vec![
            "https://shop.example.com/deal",
            "https://track.example.net/c?id=1",
            "https://cdn.example.org/pixel.gif"
        ]))
    );
    assert_eq!(
        features.get("url_domains_sld"),
        Some(&Value::from(vec!["example.com", "example.net", "example.org"]))
    );
    assert_eq!(features.names().first(), Some(&"recipients"));
}

#[test]
fn test_default_script_on_empty_message() {
    let script = assert_ok!(engine().compile(DEFAULT_SCRIPT));
    let features = script.evaluate(&Message::default());

    assert!(features.failures().is_empty());
    assert_eq!(features.len(), script.names().len());
    assert!(features.iter().all(|(_, value)| value.is_empty()));
}

// --- Output ---

#[test]
fn test_feature_set_json() {
    let message = Message::default().with_envelope(Envelope::malformed("bad"));
    let script = assert_ok!(engine().compile(
        r#"
        let "b" "['x']";
        let "a" "envelope.from";
        "#,
    ));
    let features = script.evaluate(&message);

    assert_eq!(assert_ok!(features.to_json()), r#"{"b":["x"],"a":""}"#);

    let full = assert_ok!(serde_json::to_value(&features));
    assert_eq!(full["features"]["b"][0], "x");
    assert_eq!(full["failures"][0]["name"], "a");
    assert_eq!(full["failures"][0]["error"], "Malformed envelope record: bad");
}

// --- Compile errors ---

#[test]
fn test_compile_errors_name_the_statement() {
    let err = assert_err!(engine().compile(
        r#"
        let "ok" "header.subject";
        let "broken" "nope(header.subject)";
        "#,
    ));
    assert_eq!(
        err,
        CompileError::UnknownFunction("nope".into()).in_statement(1, "broken")
    );
    assert_eq!(
        err.to_string(),
        "In statement #1 \"broken\": Unknown function: nope"
    );
}

#[test]
fn test_syntax_errors() {
    let err = assert_err!(engine().compile("let \"a\" \"'x'\"\nlet \"b\" \"'y'\";"));
    assert!(matches!(err, CompileError::Syntax { line: 2, .. }));

    let err = assert_err!(engine().compile("let \"a\" \"dedup(\";"));
    assert!(matches!(err, CompileError::Statement { .. }));

    let script = assert_ok!(engine().compile("# only comments\n\n"));
    assert!(script.is_empty());
}
