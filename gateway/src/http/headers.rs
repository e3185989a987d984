//! Header names carrying call context between gateways.

/// Token code.
pub const TOKEN: &str = "x-token";
/// Token timeout in seconds.
pub const TOKEN_TIMEOUT: &str = "x-token-timeout";
/// Prefix of token attribute headers; the remainder is the attribute name.
pub const TOKEN_ATTR_PREFIX: &str = "x-token-attr-";
/// Explicit client identity, preferred over the peer address.
pub const CLIENT_ID: &str = "x-client-id";
