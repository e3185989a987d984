//! Opaque session credential carried across hops.

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;

/// Session token propagated read-only with every call.
///
/// The gateway never interprets a token; it only forwards it. A blank code
/// means "anonymous", which is modelled as the absence of a token, so
/// [`Token::new`] returns `None` in that case.
#[derive(Debug, Clone)]
pub struct Token {
    code: SecretString,
    timeout: u64,
    attributes: BTreeMap<String, String>,
}

impl Token {
    /// Creates a token, or `None` when `code` is blank.
    #[must_use]
    pub fn new(code: impl Into<String>, timeout: u64) -> Option<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return None;
        }
        Some(Self {
            code: SecretString::from(code),
            timeout,
            attributes: BTreeMap::new(),
        })
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Adds every attribute from an iterator.
    #[must_use]
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The credential itself. Only transports should call this.
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.expose_secret()
    }

    /// Session timeout in seconds, as supplied by the issuer.
    #[must_use]
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// All attributes, sorted by key.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}
