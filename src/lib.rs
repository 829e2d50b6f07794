// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

//! Email Feature Scripts
//!
//! Evaluates rule scripts that derive a flat set of named features from an
//! inbound email message (recipients, sender domains, URLs, thread identity)
//! for downstream anti-spam and anti-phishing decisioning.
//!
//! # Features
//!
//! - Typed path selectors over the message: unions, wildcards and indexes
//! - Built-in functions for tokenizing, HTML attributes and address parts
//! - Registrable-domain lookup through a shared public-suffix trie
//! - Scripts compiled once, evaluated concurrently against many messages
//! - Run-time failures degrade a single feature instead of the whole set
//!
//! # Example
//!
//! ```rust
//! use email_features::{parse_message, Engine, PublicSuffixIndex, Value};
//!
//! let engine = Engine::new(PublicSuffixIndex::from_rules(["com", "co.uk"]));
//! let script = engine
//!     .compile(r#"
//!         let "rcpt" "dedup(to_lowercase(header.to:cc:bcc[*].addr[*]))";
//!         let "rcpt_sld" "dedup(domain_part(email_part(rcpt, 'domain'), 'sld'))";
//!     "#)
//!     .unwrap();
//!
//! let raw = b"From: a@example.com\r\nTo: B@mail.Example.co.uk\r\nSubject: Hi\r\n\r\nBody";
//! let message = parse_message(raw).unwrap();
//! let features = script.evaluate(&message);
//!
//! assert_eq!(features.get("rcpt_sld"), Some(&Value::from(vec!["example.co.uk"])));
//! ```

mod config;
mod error;
mod eval;
mod expr;
mod functions;
mod parser;
mod path;
mod psl;
mod script;
mod types;
mod value;

pub use config::{DEFAULT_MAX_LIST_ITEMS, EngineConfig, WinnowKind};
pub use error::{CompileError, ConfigError, EvalError, ParseError, Result};
pub use eval::{BindingLog, Failure, FeatureSet, StatementReport, StatementState};
pub use functions::{DropEmpty, DropSubsumed, WinnowPolicy};
pub use parser::{HtmlStripper, parse_message};
pub use psl::{PublicSuffixIndex, SuffixMatch};
pub use script::{Engine, Script};
pub use types::*;
pub use value::{Shape, Value};

/// Reference feature script: recipients, sender and envelope domains, helo,
/// thread name, and the links found in the body and the HTML.
pub const DEFAULT_SCRIPT: &str = include_str!("../rules/message_features.rules");
