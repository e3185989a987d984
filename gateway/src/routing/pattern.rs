//! Comma-separated uri patterns with `*` wildcards and `-` negation.
//!
//! `"/a/*,-/a/b"` accepts `/a/c` but not `/a/b`: a negated entry always beats
//! a positive one. Leading slashes are ignored on both sides, so `echo` and
//! `/echo` name the same uri.

use regex::Regex;
use std::fmt;

use super::RouteError;

#[derive(Debug, Clone)]
struct Entry {
    negated: bool,
    text: String,
    regex: Regex,
}

impl Entry {
    fn is_literal(&self) -> bool {
        !self.text.contains('*')
    }
}

/// Compiled uri pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    entries: Vec<Entry>,
}

pub(crate) fn normalize(uri: &str) -> &str {
    uri.trim().trim_start_matches('/')
}

impl Pattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] when the pattern has no positive entry.
    pub fn parse(source: &str) -> Result<Self, RouteError> {
        let mut entries = Vec::new();
        for raw in source.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (negated, body) = match raw.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            let text = normalize(body).to_string();
            let expr = format!("^{}$", regex::escape(&text).replace(r"\*", ".*"));
            let regex = Regex::new(&expr)
                .map_err(|e| RouteError::InvalidPattern(format!("{source}: {e}")))?;
            entries.push(Entry {
                negated,
                text,
                regex,
            });
        }
        if !entries.iter().any(|e| !e.negated) {
            return Err(RouteError::InvalidPattern(format!(
                "'{source}' has no positive entry"
            )));
        }
        Ok(Self {
            source: source.trim().to_string(),
            entries,
        })
    }

    /// Original pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` when some positive entry accepts `uri` and no negated one does.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        let uri = normalize(uri);
        let mut accepted = false;
        for entry in &self.entries {
            if entry.regex.is_match(uri) {
                if entry.negated {
                    return false;
                }
                accepted = true;
            }
        }
        accepted
    }

    /// Positive entries without wildcards.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.negated && e.is_literal())
            .map(|e| e.text.as_str())
    }

    /// Returns `true` when both patterns have the same entries, ignoring order and slashes.
    #[must_use]
    pub fn same_as(&self, other: &Pattern) -> bool {
        fn key(p: &Pattern) -> Vec<(bool, &str)> {
            let mut entries: Vec<(bool, &str)> = p
                .entries
                .iter()
                .map(|e| (e.negated, e.text.as_str()))
                .collect();
            entries.sort_unstable();
            entries
        }
        key(self) == key(other)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Ordered lookup table keyed by pattern; the first match wins.
#[derive(Debug, Clone)]
pub struct PatternTable<T> {
    entries: Vec<(Pattern, T)>,
}

impl<T> Default for PatternTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> PatternTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] when the pattern does not compile.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), RouteError> {
        self.entries.push((Pattern::parse(pattern)?, value));
        Ok(())
    }

    /// First value whose pattern accepts `uri`.
    #[must_use]
    pub fn lookup(&self, uri: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(p, _)| p.matches(uri))
            .map(|(_, v)| v)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
