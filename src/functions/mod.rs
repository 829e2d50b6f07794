//! Built-in function library.
//!
//! Each function is a closed set of typed variants. The variant is picked
//! when the script is compiled, from the shape of the first argument and the
//! literal selector arguments (`'uri'`, `'local'`, `'sld'`, ...), so calls
//! never look anything up by name while a message is evaluated.

mod address;
mod html;
mod list;
mod text;
mod tokenize;

pub use list::{DropEmpty, DropSubsumed, WinnowPolicy};

pub(crate) use address::{domain_part, email_part, uri_part, DomainPart, EmailPart, UriPart};
pub(crate) use html::html_attrs;
pub(crate) use list::{concat, dedup};
pub(crate) use text::thread_name;
pub(crate) use tokenize::{tokenize, TokenKind};

use crate::error::CompileError;
use crate::psl::PublicSuffixIndex;
use crate::types::TextRenderer;
use crate::value::{Shape, Value};

/// Shared services functions need while a message is evaluated
pub(crate) struct Runtime<'x> {
    pub psl: &'x PublicSuffixIndex,
    pub renderer: &'x dyn TextRenderer,
    pub winnow: &'x dyn WinnowPolicy,
    pub max_list_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    ToText,
    Tokenize(TokenKind),
    HtmlAttrs,
    Dedup,
    Winnow,
    ToLowercase,
    ToUppercase,
    Trim,
    TrimStart,
    TrimEnd,
    ThreadName,
    EmailPart(EmailPart),
    DomainPart(DomainPart),
    UriPart(UriPart),
}

/// Argument of a call as seen by the compiler
pub(crate) struct ArgInfo<'x> {
    pub shape: Shape,
    /// Set when the argument is a string literal
    pub literal: Option<&'x str>,
}

impl Builtin {
    /// Resolve `name` for the given arguments. Returns the variant and the
    /// number of leading arguments evaluated at run time; the remaining ones
    /// are selectors already folded into the variant.
    pub(crate) fn compile(name: &str, args: &[ArgInfo<'_>]) -> Result<(Self, usize), CompileError> {
        let (arity, runtime_args) = match name {
            "to_text" | "dedup" | "winnow" | "to_lowercase" | "to_uppercase" | "trim"
            | "trim_start" | "trim_end" | "thread_name" => (1, 1),
            "tokenize" | "email_part" | "domain_part" | "uri_part" => (2, 1),
            "html_attrs" => (3, 3),
            _ => return Err(CompileError::UnknownFunction(name.to_string())),
        };
        if args.len() != arity {
            return Err(CompileError::Arity {
                name: name.to_string(),
                expected: arity,
                got: args.len(),
            });
        }

        let option = |position: usize| {
            args[position]
                .literal
                .ok_or_else(|| CompileError::ArgumentType {
                    name: name.to_string(),
                    position: position + 1,
                    expected: "string literal",
                })
        };
        let invalid = |value: &str| CompileError::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
        };
        let require = |position: usize, shape: Shape| {
            if args[position].shape == shape {
                Ok(())
            } else {
                Err(CompileError::ArgumentType {
                    name: name.to_string(),
                    position: position + 1,
                    expected: shape.name(),
                })
            }
        };

        let builtin = match name {
            "to_text" => Self::ToText,
            "dedup" => {
                require(0, Shape::List)?;
                Self::Dedup
            }
            "winnow" => {
                require(0, Shape::List)?;
                Self::Winnow
            }
            "to_lowercase" => Self::ToLowercase,
            "to_uppercase" => Self::ToUppercase,
            "trim" => Self::Trim,
            "trim_start" => Self::TrimStart,
            "trim_end" => Self::TrimEnd,
            "thread_name" => Self::ThreadName,
            "tokenize" => {
                let kind = option(1)?;
                Self::Tokenize(TokenKind::parse(kind).ok_or_else(|| invalid(kind))?)
            }
            "email_part" => {
                let part = option(1)?;
                Self::EmailPart(EmailPart::parse(part).ok_or_else(|| invalid(part))?)
            }
            "domain_part" => {
                let part = option(1)?;
                Self::DomainPart(DomainPart::parse(part).ok_or_else(|| invalid(part))?)
            }
            "uri_part" => {
                let part = option(1)?;
                Self::UriPart(UriPart::parse(part).ok_or_else(|| invalid(part))?)
            }
            _ => {
                // html_attrs(html, tag, names)
                require(1, Shape::Scalar)?;
                Self::HtmlAttrs
            }
        };

        Ok((builtin, runtime_args))
    }

    /// Shape of the result given the shape of the first argument
    pub(crate) const fn output(self, input: Shape) -> Shape {
        match self {
            Self::Tokenize(_) | Self::HtmlAttrs | Self::Dedup | Self::Winnow => Shape::List,
            _ => input,
        }
    }

    /// Run the call. `args` holds the run-time arguments in order.
    pub(crate) fn call(self, mut args: Vec<Value>, runtime: &Runtime<'_>) -> Value {
        let input = if args.is_empty() {
            Value::default()
        } else {
            args.remove(0)
        };

        match self {
            Self::ToText => input.map(|html| runtime.renderer.to_text(&html)),
            Self::Tokenize(kind) => Value::List(match input {
                Value::Scalar(text) => tokenize(&text, kind),
                Value::List(texts) => texts.iter().flat_map(|t| tokenize(t, kind)).collect(),
            }),
            Self::HtmlAttrs => {
                let mut args = args.into_iter();
                let tag = args.next().unwrap_or_default().into_string();
                let names = args.next().unwrap_or_default().into_list();
                Value::List(match input {
                    Value::Scalar(html) => html_attrs(&html, &tag, &names),
                    Value::List(docs) => docs
                        .iter()
                        .flat_map(|html| html_attrs(html, &tag, &names))
                        .collect(),
                })
            }
            Self::Dedup => Value::List(dedup(input.into_list())),
            Self::Winnow => Value::List(runtime.winnow.winnow(input.into_list())),
            Self::ToLowercase => input.map(|s| s.to_lowercase()),
            Self::ToUppercase => input.map(|s| s.to_uppercase()),
            Self::Trim => input.map(|s| trimmed(s, str::trim)),
            Self::TrimStart => input.map(|s| trimmed(s, str::trim_start)),
            Self::TrimEnd => input.map(|s| trimmed(s, str::trim_end)),
            Self::ThreadName => input.map(|s| thread_name(&s)),
            Self::EmailPart(part) => input.map(|s| email_part(&s, part).to_string()),
            Self::DomainPart(part) => input.map(|s| domain_part(runtime.psl, &s, part)),
            Self::UriPart(part) => input.map(|s| uri_part(&s, part)),
        }
    }
}

fn trimmed(s: String, f: impl Fn(&str) -> &str) -> String {
    let t = f(&s);
    if t.len() == s.len() { s } else { t.to_string() }
}
