//! Forwarding to another gateway's HTTP channel.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_DISPOSITION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use super::failover::first_success;
use super::{expect_endpoint, Invoker};
use crate::content::{file_name, Content};
use crate::endpoint::Node;
use crate::envelope::{Envelope, Fault};
use crate::http::headers;
use crate::params::{Param, Params};
use crate::requester::Requester;
use crate::resource::Resource;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts the call to each endpoint node in turn until one answers.
///
/// Plain parameters travel as a JSON object; calls carrying files switch to
/// `multipart/form-data`. The token rides in the `x-token*` headers.
#[derive(Debug, Clone)]
pub struct HttpBridgeInvoker {
    client: Client,
}

impl HttpBridgeInvoker {
    /// Creates an invoker with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Invocation`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, Fault> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Fault::Invocation(format!("http client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Uses a preconfigured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn call(&self, node: &Node, uri: &str, requester: &Requester) -> Result<Content, Fault> {
        let url = format!("{}/{}", node.base_url(), uri.trim_start_matches('/'));
        debug!(%url, "Bridging call");

        let request = self.client.post(&url).headers(forward_headers(requester));
        let params = requester.params();
        let request = if params.has_binary() {
            request.multipart(multipart(params).await?)
        } else {
            request.json(&params.to_json())
        };

        let response = request
            .send()
            .await
            .map_err(|e| Fault::Invocation(format!("{node} unreachable: {e}")))?;
        read_response(response).await
    }
}

#[async_trait]
impl Invoker for HttpBridgeInvoker {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn invoke(&self, resource: &Resource, requester: &Requester) -> Result<Content, Fault> {
        let endpoint = expect_endpoint(self.kind(), resource)?;
        let uri = endpoint.target_uri(requester.uri());
        first_success(endpoint.nodes(), |node| self.call(node, uri, requester)).await
    }
}

fn forward_headers(requester: &Requester) -> HeaderMap {
    let mut map = HeaderMap::new();
    let mut put = |name: &str, value: &str| {
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            map.insert(name, value);
        }
    };
    if let Some(token) = requester.token() {
        put(headers::TOKEN, token.code());
        put(headers::TOKEN_TIMEOUT, &token.timeout().to_string());
        for (key, value) in token.attributes() {
            put(&format!("{}{key}", headers::TOKEN_ATTR_PREFIX), value);
        }
    }
    if !requester.client().is_empty() {
        put(headers::CLIENT_ID, requester.client());
    }
    put(ACCEPT_LANGUAGE.as_str(), requester.locale());
    map
}

async fn multipart(params: &Params) -> Result<Form, Fault> {
    let mut form = Form::new();
    for (name, param) in params.iter() {
        form = match param {
            Param::Value(serde_json::Value::String(s)) => form.text(name.clone(), s.clone()),
            Param::Value(other) => form.text(name.clone(), other.to_string()),
            Param::File(path) => {
                let data = tokio::fs::read(path).await?;
                form.part(name.clone(), Part::bytes(data).file_name(file_name(path)))
            }
            Param::Part { file_name, data } => form.part(
                name.clone(),
                Part::bytes(data.to_vec()).file_name(file_name.clone()),
            ),
        };
    }
    Ok(form)
}

async fn read_response(response: Response) -> Result<Content, Fault> {
    let status = response.status();
    if let Some(disposition) = response.headers().get(CONTENT_DISPOSITION) {
        let name = disposition_name(disposition.to_str().unwrap_or_default());
        let data = response
            .bytes()
            .await
            .map_err(|e| Fault::Invocation(format!("reading body: {e}")))?;
        return Ok(Content::Bytes { name, data });
    }

    let text = response
        .text()
        .await
        .map_err(|e| Fault::Invocation(format!("reading body: {e}")))?;
    match Envelope::from_json(&text) {
        Ok(envelope) => envelope.unwrap().map(Content::from),
        Err(_) if status.is_success() => Ok(Content::text(text)),
        Err(_) => Err(Fault::Invocation(format!("HTTP {status}: {text}"))),
    }
}

fn disposition_name(value: &str) -> String {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .next()
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_name_is_extracted() {
        assert_eq!(disposition_name(r#"attachment; filename="a b.txt""#), "a b.txt");
        assert_eq!(disposition_name("attachment; filename=x.bin"), "x.bin");
        assert_eq!(disposition_name("inline"), "download");
    }
}
