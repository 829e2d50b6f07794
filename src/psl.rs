//! Public-suffix index used to find registrable domains

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Read-only public-suffix classifier.
///
/// Rules are stored in a trie keyed by domain label, right to left, so a
/// lookup costs one step per label of the queried domain whatever the size
/// of the list. Immutable after construction and safe to share between
/// threads.
#[derive(Debug, Clone, Default)]
pub struct PublicSuffixIndex {
    root: Node,
    rules: usize,
}

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<String, Node>,
    is_rule: bool,
    is_exception: bool,
}

/// Parts of a domain split at its public suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixMatch<'x> {
    /// The matched public suffix, e.g. `co.uk`
    pub suffix: &'x str,

    /// Suffix plus the label before it, e.g. `example.co.uk`; `None` when the
    /// domain is itself a public suffix
    pub registrable: Option<&'x str>,
}

impl PublicSuffixIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from rules such as `com`, `co.uk`, `*.ck` or `!www.ck`.
    pub fn from_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for rule in rules {
            index.insert(rule.as_ref());
        }
        index
    }

    /// Parse the public-suffix-list file format: one rule per line, `//`
    /// comments, blank lines ignored.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        let mut index = Self::new();
        for (num, line) in list.lines().enumerate() {
            let rule = line.split_whitespace().next().unwrap_or_default();
            if rule.is_empty() || rule.starts_with("//") {
                continue;
            }
            if rule.starts_with('.') || rule.ends_with('.') || rule.contains("..") {
                return Err(ConfigError::InvalidSuffixRule {
                    line: num + 1,
                    rule: rule.to_string(),
                });
            }
            index.insert(rule);
        }
        Ok(index)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let list = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&list)
    }

    fn insert(&mut self, rule: &str) {
        let rule = rule.trim().to_lowercase();
        let (rule, is_exception) = rule
            .strip_prefix('!')
            .map_or((rule.as_str(), false), |r| (r, true));
        if rule.is_empty() {
            return;
        }

        let mut node = &mut self.root;
        for label in rule.rsplit('.') {
            node = node.children.entry(label.to_string()).or_default();
        }
        if is_exception {
            node.is_exception = true;
        } else {
            node.is_rule = true;
        }
        self.rules += 1;
    }

    /// Number of rules loaded
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rules
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rules == 0
    }

    /// Whether `domain` is exactly a public suffix
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        let domain = domain.trim_end_matches('.').to_lowercase();
        self.lookup(&domain)
            .is_some_and(|m| m.suffix.len() == domain.len())
    }

    /// Longest matching rule for an already lowercased domain.
    pub fn lookup<'x>(&self, domain: &'x str) -> Option<SuffixMatch<'x>> {
        let labels: Vec<&str> = domain.rsplit('.').collect();
        if labels.iter().any(|l| l.is_empty()) {
            return None;
        }

        // Number of rightmost labels covered by the longest rule
        let mut matched: Option<usize> = None;
        walk(&self.root, &labels, 0, &mut matched);

        let count = matched?;
        let suffix = tail(domain, count);
        let registrable = (labels.len() > count).then(|| tail(domain, count + 1));
        Some(SuffixMatch {
            suffix,
            registrable,
        })
    }
}

fn walk(node: &Node, labels: &[&str], depth: usize, matched: &mut Option<usize>) {
    let Some(label) = labels.get(depth) else {
        return;
    };

    if let Some(child) = node.children.get(*label) {
        if child.is_exception {
            // An exception rule makes its parent the public suffix
            *matched = Some(depth);
            return;
        }
        if child.is_rule && matched.is_none_or(|m| m < depth + 1) {
            *matched = Some(depth + 1);
        }
        walk(child, labels, depth + 1, matched);
    }

    if let Some(wildcard) = node.children.get("*") {
        if wildcard.is_rule && matched.is_none_or(|m| m < depth + 1) {
            *matched = Some(depth + 1);
        }
        walk(wildcard, labels, depth + 1, matched);
    }
}

/// Last `count` labels of `domain`
fn tail(domain: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    domain
        .rmatch_indices('.')
        .nth(count - 1)
        .map_or(domain, |(pos, _)| &domain[pos + 1..])
}
