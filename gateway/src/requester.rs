//! Per-call request context.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::channel::Channel;
use crate::content::Content;
use crate::envelope::Fault;
use crate::params::Params;
use crate::token::Token;

const DEFAULT_LOCALE: &str = "en";

struct RequesterInner {
    uri: String,
    params: Params,
    token: Option<Token>,
    client: String,
    host: String,
    locale: String,
    created: DateTime<Utc>,
    parent: Option<Requester>,
    channel: Arc<dyn Channel>,
}

/// Immutable context of one call: who asked, for what, with which parameters.
///
/// Cloning is cheap. Children made with [`Requester::build`] share channel,
/// token, locale, client and host with their parent and keep a link to it for
/// tracing; they never modify it.
#[derive(Clone)]
pub struct Requester {
    inner: Arc<RequesterInner>,
}

impl Requester {
    /// Starts building a root requester arriving on `channel`.
    pub fn builder(channel: Arc<dyn Channel>, uri: impl Into<String>) -> RequesterBuilder {
        RequesterBuilder {
            channel,
            uri: uri.into(),
            params: Params::new(),
            token: None,
            client: String::new(),
            host: String::new(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    /// Target uri.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    /// Call parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    /// Propagated session token, `None` for anonymous calls.
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.inner.token.as_ref()
    }

    /// Client identity.
    #[must_use]
    pub fn client(&self) -> &str {
        &self.inner.client
    }

    /// Host the call arrived at.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Caller locale.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.inner.locale
    }

    /// Creation time.
    #[must_use]
    pub fn created(&self) -> DateTime<Utc> {
        self.inner.created
    }

    /// Requester that spawned this one, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Requester> {
        self.inner.parent.as_ref()
    }

    /// Channel the call arrived on.
    #[must_use]
    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.inner.channel
    }

    /// Number of ancestors; zero for a root call.
    #[must_use]
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |r| r.parent()).count()
    }

    /// Uris from the root call down to this one, joined with `" > "`.
    #[must_use]
    pub fn path(&self) -> String {
        let mut uris: Vec<&str> = std::iter::successors(Some(self), |r| r.parent())
            .map(Requester::uri)
            .collect();
        uris.reverse();
        uris.join(" > ")
    }

    /// Dispatches this requester through its channel.
    ///
    /// # Errors
    ///
    /// Returns the fault raised while resolving or executing the resource.
    pub async fn execute(&self) -> Result<Content, Fault> {
        let channel = Arc::clone(&self.inner.channel);
        channel.dispatch(self).await
    }

    /// Creates a child requester for a nested server-side invocation.
    #[must_use]
    pub fn build(&self, uri: impl Into<String>, params: Params) -> Requester {
        Requester {
            inner: Arc::new(RequesterInner {
                uri: uri.into(),
                params,
                token: self.inner.token.clone(),
                client: self.inner.client.clone(),
                host: self.inner.host.clone(),
                locale: self.inner.locale.clone(),
                created: Utc::now(),
                parent: Some(self.clone()),
                channel: Arc::clone(&self.inner.channel),
            }),
        }
    }
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester")
            .field("uri", &self.inner.uri)
            .field("client", &self.inner.client)
            .field("channel", &self.inner.channel.name())
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

/// Builder for root [`Requester`]s.
pub struct RequesterBuilder {
    channel: Arc<dyn Channel>,
    uri: String,
    params: Params,
    token: Option<Token>,
    client: String,
    host: String,
    locale: String,
}

impl RequesterBuilder {
    /// Sets the parameters.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the token.
    #[must_use]
    pub fn token(mut self, token: Option<Token>) -> Self {
        self.token = token;
        self
    }

    /// Sets the client identity.
    #[must_use]
    pub fn client(mut self, client: impl Into<String>) -> Self {
        self.client = client.into();
        self
    }

    /// Sets the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the locale; blank values keep the default.
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        let locale = locale.into();
        if !locale.trim().is_empty() {
            self.locale = locale;
        }
        self
    }

    /// Finishes the requester, stamping its creation time.
    #[must_use]
    pub fn build(self) -> Requester {
        Requester {
            inner: Arc::new(RequesterInner {
                uri: self.uri,
                params: self.params,
                token: self.token,
                client: self.client,
                host: self.host,
                locale: self.locale,
                created: Utc::now(),
                parent: None,
                channel: self.channel,
            }),
        }
    }
}
