//! HTTP channel: request decoding, views, converters and redirects.
//!
//! Every path below the context path is a resource uri. Per request the
//! channel:
//!
//! 1. strips the context path and decodes parameters, token and identity,
//! 2. renders a view when the uri matches the view table,
//! 3. otherwise dispatches through the [`Gateway`],
//! 4. lets the first [`Redirector`] with a target replace the response,
//! 5. streams binary results, or serializes the envelope through the
//!    [`Converter`] matched by uri (JSON envelope by default).

pub mod convert;
mod decode;
pub mod headers;
pub mod redirect;
mod respond;
pub mod view;

pub use convert::{Converter, JsonConverter, TextConverter};
pub use redirect::{FaultRedirector, Redirector, SuccessRedirector};
pub use view::{PlaceholderRender, Render};

use async_trait::async_trait;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::response::Response;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tracing::{debug, info_span, Instrument};

use crate::channel::Channel;
use crate::content::Content;
use crate::envelope::{Envelope, Fault};
use crate::gateway::Gateway;
use crate::requester::Requester;
use crate::routing::{PatternTable, RouteError};

const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Axum-facing channel in front of a [`Gateway`].
pub struct HttpChannel {
    gateway: Arc<Gateway>,
    context_path: String,
    body_limit: usize,
    views: PatternTable<String>,
    converters: PatternTable<Arc<dyn Converter>>,
    default_converter: Arc<dyn Converter>,
    redirectors: Vec<Arc<dyn Redirector>>,
    render: Arc<dyn Render>,
    this: Weak<HttpChannel>,
}

impl HttpChannel {
    /// Starts configuring a channel for `gateway`.
    #[must_use]
    pub fn builder(gateway: Arc<Gateway>) -> HttpChannelBuilder {
        HttpChannelBuilder {
            gateway,
            context_path: String::new(),
            body_limit: DEFAULT_BODY_LIMIT,
            views: PatternTable::new(),
            converters: PatternTable::new(),
            default_converter: Arc::new(JsonConverter),
            redirectors: Vec::new(),
            render: Arc::new(PlaceholderRender::new("templates")),
        }
    }

    /// Normalized context path: empty, or `/name` without trailing slash.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Axum router serving every path through this channel.
    pub fn router(self: &Arc<Self>) -> axum::Router {
        axum::Router::new()
            .fallback(serve)
            .layer(DefaultBodyLimit::max(self.body_limit))
            .with_state(Arc::clone(self))
    }

    /// Handles one HTTP request end to end.
    pub async fn handle(&self, request: Request) -> Response {
        let Some(uri) = decode::strip_context(request.uri().path(), &self.context_path) else {
            let fault = Fault::ResourceNotFound(request.uri().path().to_string());
            return respond::converted(self.default_converter.as_ref(), &self.gateway.envelope(Err(fault)));
        };
        let uri = uri.to_string();
        let span = info_span!("http_request", method = %request.method(), uri = %uri);
        self.handle_uri(request, uri).instrument(span).await
    }

    async fn handle_uri(&self, request: Request, uri: String) -> Response {
        let converter = self.converters.lookup(&uri).cloned();
        let inbound = match decode::decode(request, uri, self.body_limit).await {
            Ok(inbound) => inbound,
            Err(fault) => {
                let converter = converter.unwrap_or_else(|| Arc::clone(&self.default_converter));
                return respond::converted(converter.as_ref(), &self.gateway.envelope(Err(fault)));
            }
        };
        let Some(channel) = self.this.upgrade() else {
            let fault = Fault::invocation("http channel is shutting down");
            return respond::converted(self.default_converter.as_ref(), &self.gateway.envelope(Err(fault)));
        };
        let requester = Requester::builder(channel, inbound.uri)
            .params(inbound.params)
            .token(inbound.token)
            .client(inbound.client)
            .host(inbound.host)
            .locale(inbound.locale)
            .build();

        if let Some(template) = self.views.lookup(requester.uri()) {
            debug!(%template, "Rendering view");
            let model = requester.params().to_json();
            let rendered = self.render.render(template, &requester, &model).await;
            return match (rendered, converter) {
                (Ok(body), None) => respond::html(body),
                (rendered, converter) => {
                    let converter = converter.unwrap_or_else(|| Arc::clone(&self.default_converter));
                    let envelope = self.gateway.envelope(rendered.map(Content::text));
                    respond::converted(converter.as_ref(), &envelope)
                }
            };
        }

        let result = requester.execute().await;

        if let Some(target) = self
            .redirectors
            .iter()
            .find_map(|r| r.redirect(&requester, &result))
        {
            debug!(%target, "Redirecting");
            if !target.contains('.') {
                return respond::redirect(&self.context_path, &target);
            }
            let model = self.redirect_model(&requester, result);
            return match self.render.render(&target, &requester, &model).await {
                Ok(body) => respond::html(body),
                Err(fault) => respond::converted(
                    self.default_converter.as_ref(),
                    &self.gateway.envelope(Err(fault)),
                ),
            };
        }

        let converter = converter.unwrap_or_else(|| Arc::clone(&self.default_converter));
        match result {
            Ok(content) if content.is_streamable() => match respond::binary(content).await {
                Ok(response) => response,
                Err(fault) => respond::converted(converter.as_ref(), &self.gateway.envelope(Err(fault))),
            },
            other => respond::converted(converter.as_ref(), &self.gateway.envelope(other)),
        }
    }

    /// Parameters plus the envelope fields `code`, `error` and `content`.
    fn redirect_model(&self, requester: &Requester, result: Result<Content, Fault>) -> Value {
        let mut model = match requester.params().to_json() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let envelope = self.gateway.envelope(result);
        model.insert("code".into(), Value::from(envelope.code.as_str()));
        model.insert("error".into(), envelope.error.map_or(Value::Null, Value::from));
        model.insert("content".into(), envelope.content);
        Value::Object(model)
    }
}

async fn serve(State(channel): State<Arc<HttpChannel>>, request: Request) -> Response {
    channel.handle(request).await
}

#[async_trait]
impl Channel for HttpChannel {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn dispatch(&self, requester: &Requester) -> Result<Content, Fault> {
        self.gateway.dispatch(requester).await
    }
}

impl std::fmt::Debug for HttpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChannel")
            .field("context_path", &self.context_path)
            .field("views", &self.views.len())
            .field("converters", &self.converters.len())
            .field("redirectors", &self.redirectors.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpChannel`].
pub struct HttpChannelBuilder {
    gateway: Arc<Gateway>,
    context_path: String,
    body_limit: usize,
    views: PatternTable<String>,
    converters: PatternTable<Arc<dyn Converter>>,
    default_converter: Arc<dyn Converter>,
    redirectors: Vec<Arc<dyn Redirector>>,
    render: Arc<dyn Render>,
}

impl HttpChannelBuilder {
    /// Application prefix stripped from every request path.
    #[must_use]
    pub fn context_path(mut self, path: &str) -> Self {
        let trimmed = path.trim().trim_matches('/');
        self.context_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    /// Maximum accepted request body in bytes.
    #[must_use]
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Renders `template` for uris matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] for a malformed pattern.
    pub fn view(mut self, pattern: &str, template: impl Into<String>) -> Result<Self, RouteError> {
        self.views.insert(pattern, template.into())?;
        Ok(self)
    }

    /// Serializes results of uris matching `pattern` with `converter`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] for a malformed pattern.
    pub fn converter<C: Converter + 'static>(mut self, pattern: &str, converter: C) -> Result<Self, RouteError> {
        self.converters.insert(pattern, Arc::new(converter))?;
        Ok(self)
    }

    /// Converter used when no pattern matches.
    #[must_use]
    pub fn default_converter<C: Converter + 'static>(mut self, converter: C) -> Self {
        self.default_converter = Arc::new(converter);
        self
    }

    /// Appends a redirector; earlier ones take precedence.
    #[must_use]
    pub fn redirector<R: Redirector + 'static>(mut self, redirector: R) -> Self {
        self.redirectors.push(Arc::new(redirector));
        self
    }

    /// Template engine for views and template redirects.
    #[must_use]
    pub fn render<R: Render + 'static>(mut self, render: R) -> Self {
        self.render = Arc::new(render);
        self
    }

    /// Finishes the channel.
    #[must_use]
    pub fn build(self) -> Arc<HttpChannel> {
        Arc::new_cyclic(|this| HttpChannel {
            gateway: self.gateway,
            context_path: self.context_path,
            body_limit: self.body_limit,
            views: self.views,
            converters: self.converters,
            default_converter: self.default_converter,
            redirectors: self.redirectors,
            render: self.render,
            this: this.clone(),
        })
    }
}
