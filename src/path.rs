//! Path selectors over the document model.
//!
//! A path starts at a root (`header`, `body`, `envelope`, `env` or the name of
//! an earlier binding) and descends through:
//!
//! - `.field`: a named field; on a list the projection applies to every item
//! - `.a:b:c`: the union of several fields, resolved left to right; a single
//!   value joining list-valued fields counts as a one-item list
//! - `[*]`: maps the rest of the path over every item of a list and flattens
//!   one level
//! - `[n]`: the n-th item of a list, counting from the end when negative;
//!   out of range is absent
//!
//! Paths are type-checked when the script is compiled, so field names are
//! resolved once and a wildcard on a scalar never reaches evaluation.

use crate::error::{CompileError, EvalError};
use crate::eval::BindingLog;
use crate::types::{Address, Message, TextRenderer};
use crate::value::{Shape, Value};
use std::borrow::Cow;

/// Compiled path
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Path {
    text: String,
    root: Root,
    steps: Vec<Step>,
    shape: Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Header,
    Body,
    Envelope,
    Env,
    Binding(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Select(Vec<Selection>),
    Wildcard,
    Index(i64),
}

/// One field of a selection step. `promote` wraps a single value as a
/// one-item list so it can join a union with list-valued fields.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    field: Field,
    promote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Subject,
    From,
    Sender,
    To,
    Cc,
    Bcc,
    ReplyTo,
    MessageId,
    InReplyTo,
    References,
    Date,
    RawHeader(String),
    BodyText,
    BodyHtml,
    EnvelopeFrom,
    EnvelopeTo,
    Env(String),
    Name,
    Addr,
}

/// Static type of a node while a path is checked
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Header,
    Body,
    Envelope,
    Env,
    Text,
    Address,
    List(Box<Kind>),
}

impl Kind {
    fn list(inner: Self) -> Self {
        Self::List(Box::new(inner))
    }

    const fn is_record(&self) -> bool {
        matches!(self, Self::Header | Self::Body | Self::Envelope | Self::Env)
    }
}

/// Bindings visible to a path while it is compiled
pub(crate) trait Scope {
    /// Slot and shape of the newest binding named `name`
    fn lookup(&self, name: &str) -> Option<(usize, Shape)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RawStep {
    Keys(Vec<String>),
    Wildcard,
    Index(i64),
}

impl Path {
    /// Parse and type-check `text` against the document schema and `scope`.
    pub(crate) fn compile(text: &str, scope: &dyn Scope) -> Result<Self, CompileError> {
        let (root_name, raw_steps) = parse(text)?;

        let (root, kind) = match root_name.to_ascii_lowercase().as_str() {
            "header" | "headers" => (Root::Header, Kind::Header),
            "body" => (Root::Body, Kind::Body),
            "envelope" => (Root::Envelope, Kind::Envelope),
            "env" => (Root::Env, Kind::Env),
            _ => {
                let (slot, shape) = scope
                    .lookup(&root_name)
                    .ok_or_else(|| CompileError::UndefinedName(root_name.clone()))?;
                let kind = match shape {
                    Shape::Scalar => Kind::Text,
                    Shape::List => Kind::list(Kind::Text),
                };
                (Root::Binding(slot), kind)
            }
        };

        let (steps, kind) = compile_steps(text, kind, &raw_steps)?;
        let shape = match kind {
            Kind::Text | Kind::Address => Shape::Scalar,
            Kind::List(ref inner) if !contains_record(inner) => Shape::List,
            _ => return Err(CompileError::NotAValue(text.to_string())),
        };

        Ok(Self {
            text: text.to_string(),
            root,
            steps,
            shape,
        })
    }

    #[must_use]
    pub(crate) const fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    /// Resolve against one message
    pub(crate) fn resolve(&self, resolver: &Resolver<'_>) -> Result<Value, EvalError> {
        let node = match self.root {
            Root::Header => Node::Header,
            Root::Body => Node::Body,
            Root::Envelope => Node::Envelope,
            Root::Env => Node::Env,
            Root::Binding(slot) => match resolver.bindings.get(slot) {
                Some(Value::Scalar(s)) => Node::Text(Cow::Borrowed(s)),
                Some(Value::List(l)) => {
                    Node::List(l.iter().map(|s| Node::Text(Cow::Borrowed(s))).collect())
                }
                None => return Ok(self.shape.absent()),
            },
        };

        let node = resolver.apply(node, &self.steps)?;
        Ok(match self.shape {
            Shape::Scalar => Value::Scalar(node.into_text()),
            Shape::List => {
                let mut items = Vec::new();
                node.flatten_into(&mut items);
                Value::List(items)
            }
        })
    }
}

fn contains_record(kind: &Kind) -> bool {
    match kind {
        Kind::List(inner) => contains_record(inner),
        kind => kind.is_record(),
    }
}

fn parse(text: &str) -> Result<(String, Vec<RawStep>), CompileError> {
    let invalid = |details: &str| CompileError::Expression(format!("{details} in path {text}"));
    let is_ident = |ch: char| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-';

    let root_end = text.find(['.', '[']).unwrap_or(text.len());
    let root = &text[..root_end];
    if root.is_empty() || !root.chars().all(is_ident) {
        return Err(invalid("missing root"));
    }

    let mut steps = Vec::new();
    let mut rest = &text[root_end..];
    while let Some(ch) = rest.chars().next() {
        match ch {
            '.' => {
                let end = rest[1..].find(['.', '[']).map_or(rest.len(), |pos| pos + 1);
                let keys: Vec<String> = rest[1..end]
                    .split(':')
                    .map(str::to_ascii_lowercase)
                    .collect();
                if keys.iter().any(|k| k.is_empty() || !k.chars().all(is_ident)) {
                    return Err(invalid("empty or invalid field name"));
                }
                steps.push(RawStep::Keys(keys));
                rest = &rest[end..];
            }
            '[' => {
                let end = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let selector = rest[1..end].trim();
                if selector == "*" {
                    steps.push(RawStep::Wildcard);
                } else {
                    let index = selector
                        .parse::<i64>()
                        .map_err(|_| invalid("invalid index"))?;
                    steps.push(RawStep::Index(index));
                }
                rest = &rest[end + 1..];
            }
            _ => return Err(invalid("unexpected character")),
        }
    }

    Ok((root.to_string(), steps))
}

fn compile_steps(
    path: &str,
    kind: Kind,
    raw_steps: &[RawStep],
) -> Result<(Vec<Step>, Kind), CompileError> {
    let Some((raw, rest)) = raw_steps.split_first() else {
        return Ok((Vec::new(), kind));
    };

    let (step, kind) = match raw {
        RawStep::Keys(keys) => {
            let mut fields = Vec::with_capacity(keys.len());
            let mut kinds = Vec::with_capacity(keys.len());
            for key in keys {
                let (field, field_kind) = select_field(path, &kind, key)?;
                fields.push(field);
                kinds.push(field_kind);
            }
            let (kind, promote) = union_kind(path, kinds)?;
            let selections = fields
                .into_iter()
                .zip(promote)
                .map(|(field, promote)| Selection { field, promote })
                .collect();
            (Step::Select(selections), kind)
        }
        RawStep::Wildcard => {
            let Kind::List(inner) = kind else {
                return Err(CompileError::WildcardOnScalar(path.to_string()));
            };
            // The rest of the path is applied to each item
            let (mut steps, item_kind) = compile_steps(path, *inner, rest)?;
            steps.insert(0, Step::Wildcard);
            let kind = match item_kind {
                list @ Kind::List(_) => list,
                item => Kind::list(item),
            };
            return Ok((steps, kind));
        }
        RawStep::Index(index) => {
            let Kind::List(inner) = kind else {
                return Err(CompileError::WildcardOnScalar(path.to_string()));
            };
            (Step::Index(*index), *inner)
        }
    };

    let (mut steps, kind) = compile_steps(path, kind, rest)?;
    steps.insert(0, step);
    Ok((steps, kind))
}

/// Result kind of selecting fields of `kinds`, plus which of them are single
/// values to be promoted to one-item lists. `from:to` unions an address with a
/// list of addresses; records never mix with leaf values.
fn union_kind(path: &str, mut kinds: Vec<Kind>) -> Result<(Kind, Vec<bool>), CompileError> {
    if kinds.len() == 1 {
        return Ok((kinds.remove(0), vec![false]));
    }
    if kinds.windows(2).all(|w| w[0] == w[1]) {
        let promote = vec![false; kinds.len()];
        return Ok((Kind::list(kinds.remove(0)), promote));
    }

    let promote: Vec<bool> = kinds
        .iter()
        .map(|kind| !matches!(kind, Kind::List(_)))
        .collect();
    let items: Vec<Kind> = kinds
        .into_iter()
        .map(|kind| match kind {
            Kind::List(inner) => *inner,
            kind => kind,
        })
        .collect();
    if contains_record(&items[0]) || !items.windows(2).all(|w| w[0] == w[1]) {
        return Err(CompileError::IncompatibleUnion(path.to_string()));
    }
    Ok((Kind::list(Kind::list(items[0].clone())), promote))
}

fn select_field(path: &str, kind: &Kind, key: &str) -> Result<(Field, Kind), CompileError> {
    let unknown = || CompileError::UnknownField {
        path: path.to_string(),
        field: key.to_string(),
    };
    let key_norm = key.replace('-', "_");

    let selected = match kind {
        Kind::List(inner) => {
            let (field, kind) = select_field(path, inner, key)?;
            return Ok((field, Kind::list(kind)));
        }
        Kind::Header => match key_norm.as_str() {
            "subject" => (Field::Subject, Kind::Text),
            "from" => (Field::From, Kind::Address),
            "sender" => (Field::Sender, Kind::Address),
            "to" => (Field::To, Kind::list(Kind::Address)),
            "cc" => (Field::Cc, Kind::list(Kind::Address)),
            "bcc" => (Field::Bcc, Kind::list(Kind::Address)),
            "reply_to" => (Field::ReplyTo, Kind::list(Kind::Address)),
            "message_id" => (Field::MessageId, Kind::Text),
            "in_reply_to" => (Field::InReplyTo, Kind::Text),
            "references" => (Field::References, Kind::list(Kind::Text)),
            "date" => (Field::Date, Kind::Text),
            _ => (Field::RawHeader(key.to_string()), Kind::Text),
        },
        Kind::Body => match key_norm.as_str() {
            "text" => (Field::BodyText, Kind::Text),
            "html" => (Field::BodyHtml, Kind::Text),
            _ => return Err(unknown()),
        },
        Kind::Envelope => match key_norm.as_str() {
            "from" => (Field::EnvelopeFrom, Kind::Text),
            "to" | "rcpt" => (Field::EnvelopeTo, Kind::list(Kind::Text)),
            _ => return Err(unknown()),
        },
        Kind::Env => (Field::Env(key_norm), Kind::Text),
        Kind::Address => match key_norm.as_str() {
            "name" => (Field::Name, Kind::Text),
            "addr" | "address" => (Field::Addr, Kind::Text),
            _ => return Err(unknown()),
        },
        Kind::Text => return Err(unknown()),
    };

    Ok(selected)
}

/// A resolved node: a record, a leaf or a list of nodes
#[derive(Debug, Clone)]
enum Node<'x> {
    Header,
    Body,
    Envelope,
    Env,
    Text(Cow<'x, str>),
    Address(&'x Address),
    List(Vec<Node<'x>>),
    Absent,
}

impl Node<'_> {
    /// Absent, or a scalar that resolved to the empty string
    fn is_empty_leaf(&self) -> bool {
        match self {
            Node::Absent => true,
            Node::Text(text) => text.is_empty(),
            Node::Address(addr) => addr.addr.is_empty(),
            _ => false,
        }
    }

    fn into_text(self) -> String {
        match self {
            Node::Text(text) => text.into_owned(),
            Node::Address(addr) => addr.addr.clone(),
            Node::List(items) => items
                .into_iter()
                .next()
                .map(Node::into_text)
                .unwrap_or_default(),
            Node::Header | Node::Body | Node::Envelope | Node::Env | Node::Absent => {
                String::new()
            }
        }
    }

    fn flatten_into(self, out: &mut Vec<String>) {
        match self {
            Node::List(items) => items.into_iter().for_each(|item| item.flatten_into(out)),
            Node::Text(text) => out.push(text.into_owned()),
            Node::Address(addr) => out.push(addr.addr.clone()),
            Node::Header | Node::Body | Node::Envelope | Node::Env | Node::Absent => {}
        }
    }
}

/// Read-only view used to resolve paths for one message
pub(crate) struct Resolver<'x> {
    pub message: &'x Message,
    pub bindings: &'x BindingLog,
    pub renderer: &'x dyn TextRenderer,
}

impl<'x> Resolver<'x> {
    fn apply(&self, node: Node<'x>, steps: &[Step]) -> Result<Node<'x>, EvalError> {
        let Some((step, rest)) = steps.split_first() else {
            return Ok(node);
        };

        match step {
            Step::Select(selections) => {
                let next = if let [selection] = selections.as_slice() {
                    self.select(node, &selection.field)?
                } else {
                    Node::List(
                        selections
                            .iter()
                            .map(|selection| self.select_union_member(node.clone(), selection))
                            .collect::<Result<_, _>>()?,
                    )
                };
                self.apply(next, rest)
            }
            Step::Wildcard => {
                let Node::List(items) = node else {
                    return Ok(Node::List(Vec::new()));
                };
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match self.apply(item, rest)? {
                        Node::List(inner) => out.extend(inner),
                        other => out.push(other),
                    }
                }
                Ok(Node::List(out))
            }
            Step::Index(index) => {
                let Node::List(mut items) = node else {
                    return Ok(Node::Absent);
                };
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let pos = if *index < 0 { len + index } else { *index };
                match usize::try_from(pos).ok().filter(|pos| *pos < items.len()) {
                    Some(pos) => self.apply(items.swap_remove(pos), rest),
                    None => Ok(Node::Absent),
                }
            }
        }
    }

    fn select_union_member(
        &self,
        node: Node<'x>,
        selection: &Selection,
    ) -> Result<Node<'x>, EvalError> {
        match node {
            Node::List(items) => Ok(Node::List(
                items
                    .into_iter()
                    .map(|item| self.select_union_member(item, selection))
                    .collect::<Result<_, _>>()?,
            )),
            node => {
                let value = self.select(node, &selection.field)?;
                Ok(match value {
                    value if !selection.promote => value,
                    value if value.is_empty_leaf() => Node::List(Vec::new()),
                    value => Node::List(vec![value]),
                })
            }
        }
    }

    fn select(&self, node: Node<'x>, field: &Field) -> Result<Node<'x>, EvalError> {
        let message = self.message;
        let text = |s: &'x str| Node::Text(Cow::Borrowed(s));
        let addresses = |list: &'x [Address]| Node::List(list.iter().map(Node::Address).collect());

        Ok(match (node, field) {
            (Node::Absent, _) => Node::Absent,
            (Node::List(items), field) => Node::List(
                items
                    .into_iter()
                    .map(|item| self.select(item, field))
                    .collect::<Result<_, _>>()?,
            ),
            (Node::Header, field) => {
                let header = &message.header;
                match field {
                    Field::Subject => text(&header.subject),
                    Field::From => Node::Address(&header.from),
                    Field::Sender => Node::Address(&header.sender),
                    Field::To => addresses(header.to.as_slice()),
                    Field::Cc => addresses(header.cc.as_slice()),
                    Field::Bcc => addresses(header.bcc.as_slice()),
                    Field::ReplyTo => addresses(header.reply_to.as_slice()),
                    Field::MessageId => text(&header.message_id),
                    Field::InReplyTo => text(&header.in_reply_to),
                    Field::References => {
                        Node::List(header.references.iter().map(|r| text(r)).collect())
                    }
                    Field::Date => text(&header.date),
                    Field::RawHeader(name) => text(header.raw_value(name).unwrap_or_default()),
                    _ => text(""),
                }
            }
            (Node::Body, Field::BodyText) => text(message.body.text(self.renderer)),
            (Node::Body, Field::BodyHtml) => text(&message.body.html),
            (Node::Envelope, field) => {
                let envelope = &message.envelope;
                if let Some(reason) = &envelope.malformed {
                    return Err(EvalError::MalformedRecord {
                        record: "envelope",
                        reason: reason.clone(),
                    });
                }
                match field {
                    Field::EnvelopeFrom => text(&envelope.from),
                    Field::EnvelopeTo => {
                        Node::List(envelope.to.iter().map(|r| text(r)).collect())
                    }
                    _ => text(""),
                }
            }
            (Node::Env, Field::Env(name)) => {
                if let Some(reason) = &message.env.malformed {
                    return Err(EvalError::MalformedRecord {
                        record: "connection",
                        reason: reason.clone(),
                    });
                }
                text(message.env.field(name).unwrap_or_default())
            }
            (Node::Address(addr), Field::Name) => text(&addr.name),
            (Node::Address(addr), Field::Addr) => text(&addr.addr),
            _ => text(""),
        })
    }
}
