//! Script compilation and the evaluation engine

use crate::config::{DEFAULT_MAX_LIST_ITEMS, EngineConfig};
use crate::error::{CompileError, ConfigError, EvalError};
use crate::eval::{BindingLog, Failure, FeatureSet, StatementReport, StatementState};
use crate::expr::Expr;
use crate::functions::{DropEmpty, Runtime, WinnowPolicy};
use crate::parser::HtmlStripper;
use crate::path::{Resolver, Scope};
use crate::psl::PublicSuffixIndex;
use crate::types::{Message, TextRenderer};
use crate::value::Shape;
use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Names that always refer to the document
const RESERVED: &[&str] = &["header", "headers", "body", "envelope", "env"];

/// Shared, read-only services every compiled script evaluates against.
///
/// Cloning is cheap; the suffix index and policies are reference counted.
#[derive(Clone)]
pub struct Engine {
    psl: Arc<PublicSuffixIndex>,
    renderer: Arc<dyn TextRenderer>,
    winnow: Arc<dyn WinnowPolicy>,
    max_list_items: usize,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("suffix_rules", &self.psl.len())
            .field("winnow", &self.winnow)
            .field("max_list_items", &self.max_list_items)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(PublicSuffixIndex::new())
    }
}

impl Engine {
    /// Engine with the HTML stripper, the `DropEmpty` policy and the default
    /// list limit
    #[must_use]
    pub fn new(psl: PublicSuffixIndex) -> Self {
        Self {
            psl: Arc::new(psl),
            renderer: Arc::new(HtmlStripper),
            winnow: Arc::new(DropEmpty),
            max_list_items: DEFAULT_MAX_LIST_ITEMS,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let psl = config.suffix_index()?;
        if psl.is_empty() {
            warn!("No public suffix rules loaded, domain_part will return its input");
        } else {
            debug!("Loaded {} public suffix rule(s)", psl.len());
        }

        Ok(Self {
            psl: Arc::new(psl),
            renderer: Arc::new(HtmlStripper),
            winnow: config.winnow.policy(),
            max_list_items: config.max_list_items,
        })
    }

    /// Replace the HTML to text renderer used by `body.text` and `to_text`
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TextRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_winnow_policy(mut self, winnow: Arc<dyn WinnowPolicy>) -> Self {
        self.winnow = winnow;
        self
    }

    #[must_use]
    pub const fn with_max_list_items(mut self, max_list_items: usize) -> Self {
        self.max_list_items = max_list_items;
        self
    }

    #[must_use]
    pub fn public_suffixes(&self) -> &PublicSuffixIndex {
        &self.psl
    }

    /// Compile a script of `let "<name>" "<expression>";` statements.
    ///
    /// Every path, call and name is checked here; a script that compiles
    /// cannot fail with a load-time error later.
    pub fn compile(&self, source: &str) -> Result<Script, CompileError> {
        let mut slots = Slots::default();
        let mut statements = Vec::new();

        for (index, raw) in parse_statements(source)?.into_iter().enumerate() {
            let expr =
                Expr::compile(&raw.expr, &slots).map_err(|err| err.in_statement(index, &raw.name))?;
            let slot = slots.bind(&raw.name, expr.shape());
            statements.push(Statement {
                name: raw.name,
                slot,
                expr,
            });
        }

        debug!(
            "Compiled script with {} statement(s) binding {} name(s)",
            statements.len(),
            slots.names.len()
        );

        Ok(Script {
            statements,
            names: slots.names,
            engine: self.clone(),
        })
    }
}

#[derive(Debug)]
struct Statement {
    name: String,
    slot: usize,
    expr: Expr,
}

/// A compiled script, ready to be evaluated against any number of messages,
/// from any number of threads.
#[derive(Debug)]
pub struct Script {
    statements: Vec<Statement>,
    /// Binding names by slot, in order of first appearance
    names: Vec<String>,
    engine: Engine,
}

impl Script {
    /// Number of `let` statements
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Names the feature set will contain, in order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Evaluate every statement against `message`.
    ///
    /// Never fails: a statement that hits a run-time error binds the absent
    /// value of its type and is listed in [`FeatureSet::failures`].
    #[must_use]
    pub fn evaluate(&self, message: &Message) -> FeatureSet {
        // Only a checkpoint can interrupt, and this one never does
        self.evaluate_with(message, |_| ControlFlow::Continue(()))
            .unwrap_or_default()
    }

    /// Like [`Script::evaluate`], calling `checkpoint` after each statement.
    /// Returning `ControlFlow::Break` abandons the message with
    /// [`EvalError::Interrupted`].
    pub fn evaluate_with<F>(&self, message: &Message, mut checkpoint: F) -> Result<FeatureSet, EvalError>
    where
        F: FnMut(&StatementReport<'_>) -> ControlFlow<()>,
    {
        let engine = &self.engine;
        let runtime = Runtime {
            psl: &engine.psl,
            renderer: engine.renderer.as_ref(),
            winnow: engine.winnow.as_ref(),
            max_list_items: engine.max_list_items,
        };
        let mut log = BindingLog::with_slots(self.names.len());
        let mut failures = Vec::new();

        for (index, statement) in self.statements.iter().enumerate() {
            trace!("Statement #{index} {}: {:?}", statement.name, StatementState::Resolving);

            let resolver = Resolver {
                message,
                bindings: &log,
                renderer: engine.renderer.as_ref(),
            };
            let state = match statement.expr.eval(&resolver, &runtime) {
                Ok(value) => {
                    trace!("Bound {} to {value}", statement.name);
                    log.push(statement.slot, value);
                    StatementState::Bound
                }
                Err(error) => {
                    debug!("Binding {} failed: {error}", statement.name);
                    log.push(statement.slot, statement.expr.shape().absent());
                    failures.push(Failure {
                        index,
                        name: statement.name.clone(),
                        error,
                    });
                    StatementState::Failed
                }
            };

            let report = StatementReport {
                index,
                name: &statement.name,
                state,
            };
            if checkpoint(&report).is_break() {
                debug!("Evaluation interrupted after statement #{index}");
                return Err(EvalError::Interrupted { after: index });
            }
        }

        let features = self
            .names
            .iter()
            .enumerate()
            .map(|(slot, name)| (name.clone(), log.get(slot).cloned().unwrap_or_default()))
            .collect();
        Ok(FeatureSet::new(features, failures))
    }
}

/// Names bound so far while compiling
#[derive(Default)]
struct Slots {
    names: Vec<String>,
    by_name: HashMap<String, usize>,
    shapes: Vec<Shape>,
}

impl Slots {
    fn bind(&mut self, name: &str, shape: Shape) -> usize {
        if let Some(&slot) = self.by_name.get(name) {
            self.shapes[slot] = shape;
            return slot;
        }
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), slot);
        self.shapes.push(shape);
        slot
    }
}

impl Scope for Slots {
    fn lookup(&self, name: &str) -> Option<(usize, Shape)> {
        let slot = *self.by_name.get(name)?;
        Some((slot, self.shapes[slot]))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct RawStatement {
    name: String,
    expr: String,
}

struct Cursor<'x> {
    source: &'x str,
    pos: usize,
    line: usize,
}

impl<'x> Cursor<'x> {
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn syntax(&self, details: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            line: self.line,
            details: details.into(),
        }
    }

    /// Skip whitespace and `#` comments
    fn skip_blank(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '#' {
                while self.bump().is_some_and(|ch| ch != '\n') {}
            } else if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn word(&mut self) -> &'x str {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    /// `"..."` with `\"` and `\\` escapes
    fn quoted(&mut self, what: &str) -> Result<String, CompileError> {
        if self.peek() != Some('"') {
            return Err(self.syntax(format!("expected quoted {what}")));
        }
        let line = self.line;
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some(ch @ ('"' | '\\')) => value.push(ch),
                    Some(ch) => {
                        value.push('\\');
                        value.push(ch);
                    }
                    None => break,
                },
                Some(ch) => value.push(ch),
                None => break,
            }
        }
        Err(CompileError::Syntax {
            line,
            details: format!("unterminated {what}"),
        })
    }
}

fn parse_statements(source: &str) -> Result<Vec<RawStatement>, CompileError> {
    let mut cursor = Cursor {
        source,
        pos: 0,
        line: 1,
    };
    let mut statements = Vec::new();

    loop {
        cursor.skip_blank();
        if cursor.peek().is_none() {
            return Ok(statements);
        }

        let keyword = cursor.word();
        if keyword != "let" {
            let found = if keyword.is_empty() {
                cursor.peek().map_or_else(String::new, String::from)
            } else {
                keyword.to_string()
            };
            return Err(cursor.syntax(format!("expected 'let', found '{found}'")));
        }

        cursor.skip_blank();
        let name = cursor.quoted("name")?;
        if name.is_empty()
            || !name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(cursor.syntax(format!("invalid name \"{name}\"")));
        }
        if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
            return Err(cursor.syntax(format!("\"{name}\" is reserved")));
        }

        cursor.skip_blank();
        let expr = cursor.quoted("expression")?;

        cursor.skip_blank();
        if cursor.bump() != Some(';') {
            return Err(cursor.syntax("expected ';'"));
        }

        statements.push(RawStatement { name, expr });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statements() {
        let source = r#"
            # comment
            let "a" "header.subject";   # trailing comment
            let "b"
                "to_lowercase(a) + \"x\"";
        "#;
        assert_eq!(
            parse_statements(source).unwrap(),
            vec![
                RawStatement {
                    name: "a".into(),
                    expr: "header.subject".into()
                },
                RawStatement {
                    name: "b".into(),
                    expr: "to_lowercase(a) + \"x\"".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_statements_reports_line() {
        let err = parse_statements("let \"a\" \"b\";\n\nset \"c\" \"d\";").unwrap_err();
        assert_eq!(
            err,
            CompileError::Syntax {
                line: 3,
                details: "expected 'let', found 'set'".into()
            }
        );

        let err = parse_statements("let \"a\" \"b\"\nlet").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 2, .. }));

        let err = parse_statements("let \"a\" \"unterminated;\n").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 1, .. }));

        let err = parse_statements("let \"body\" \"header.subject\";").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn test_script_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Script>();
        assert_send_sync::<Engine>();
    }
}
