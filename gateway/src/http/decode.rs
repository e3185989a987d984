use axum::extract::{ConnectInfo, FromRequest, Multipart, Query, Request};
use axum::http::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::Form;
use serde_json::Value;
use std::net::SocketAddr;

use super::headers;
use crate::envelope::Fault;
use crate::params::{Param, Params};
use crate::token::Token;

/// Call context extracted from an HTTP request.
#[derive(Debug)]
pub(crate) struct Inbound {
    pub uri: String,
    pub params: Params,
    pub token: Option<Token>,
    pub client: String,
    pub host: String,
    pub locale: String,
}

/// Strips `context_path` from `path`. `None` when the path lies outside it.
pub(crate) fn strip_context<'a>(path: &'a str, context_path: &str) -> Option<&'a str> {
    if context_path.is_empty() {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(context_path)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest.trim_start_matches('/'))
    } else {
        None
    }
}

/// Decodes `request` into call context.
///
/// Query parameters are always read. The body is decoded by content type:
/// `multipart/*` fields become parameters (file parts as [`Param::Part`]),
/// `application/json` object fields become parameters, and anything else is
/// read as a URL-encoded form. Body values override query values.
pub(crate) async fn decode(request: Request, uri: String, body_limit: usize) -> Result<Inbound, Fault> {
    let (mut parts, body) = request.into_parts();
    let mut params = Params::new();

    let query: Query<Vec<(String, String)>> = Query::try_from_uri(&parts.uri)
        .map_err(|e| Fault::invalid_parameter("query", e.body_text()))?;
    for (name, value) in query.0 {
        params.insert(name, value);
    }

    let token = token_from(&parts.headers);
    let client = header(&parts.headers, headers::CLIENT_ID)
        .map(str::to_string)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_default();
    let host = header(&parts.headers, HOST.as_str()).unwrap_or_default().to_string();
    let locale = header(&parts.headers, ACCEPT_LANGUAGE.as_str())
        .and_then(primary_language)
        .unwrap_or_default();

    let content_type = header(&parts.headers, CONTENT_TYPE.as_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/") {
        let mut multipart = Multipart::from_request(Request::from_parts(parts, body), &())
            .await
            .map_err(|e| Fault::RequestHandling(e.body_text()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Fault::RequestHandling(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| Fault::invalid_parameter(name.clone(), e.to_string()))?;
            let param = match file_name {
                Some(file_name) => Param::Part { file_name, data },
                None => Param::from(String::from_utf8_lossy(&data).into_owned()),
            };
            params.insert(name, param);
        }
    } else if content_type.starts_with("application/json") {
        let bytes = axum::body::to_bytes(body, body_limit)
            .await
            .map_err(|e| Fault::RequestHandling(format!("reading body: {e}")))?;
        if !bytes.is_empty() {
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|e| Fault::invalid_parameter("params", format!("malformed JSON: {e}")))?;
            for (name, param) in Params::from_json(value)? {
                params.insert(name, param);
            }
        }
    } else if parts.method != Method::GET && parts.method != Method::HEAD {
        parts.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let Form(fields): Form<Vec<(String, String)>> =
            Form::from_request(Request::from_parts(parts, body), &())
                .await
                .map_err(|e| Fault::invalid_parameter("form", e.body_text()))?;
        for (name, value) in fields {
            params.insert(name, value);
        }
    }

    Ok(Inbound {
        uri,
        params,
        token,
        client,
        host,
        locale,
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn token_from(map: &HeaderMap) -> Option<Token> {
    let code = header(map, headers::TOKEN)?;
    let timeout = header(map, headers::TOKEN_TIMEOUT)
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);
    let attributes = map.iter().filter_map(|(name, value)| {
        let key = name.as_str().strip_prefix(headers::TOKEN_ATTR_PREFIX)?;
        Some((key.to_string(), value.to_str().ok()?.to_string()))
    });
    Token::new(code, timeout).map(|t| t.with_attributes(attributes))
}

fn primary_language(value: &str) -> Option<String> {
    value
        .split(',')
        .next()
        .and_then(|tag| tag.split(';').next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn context_path_is_stripped() {
        assert_eq!(strip_context("/app/users/list", "/app"), Some("users/list"));
        assert_eq!(strip_context("/app", "/app"), Some(""));
        assert_eq!(strip_context("/application/x", "/app"), None);
        assert_eq!(strip_context("/other", "/app"), None);
        assert_eq!(strip_context("/users", ""), Some("users"));
    }

    #[test]
    fn language_takes_first_tag() {
        assert_eq!(primary_language("fr-CH, fr;q=0.9, en;q=0.8").as_deref(), Some("fr-CH"));
        assert_eq!(primary_language("de;q=0.5").as_deref(), Some("de"));
        assert_eq!(primary_language("*"), None);
    }

    #[tokio::test]
    async fn query_and_form_are_merged() {
        let req = request(
            "POST",
            "/x?a=1&b=2",
            Some("application/x-www-form-urlencoded"),
            "b=3&c=4",
        );
        let inbound = decode(req, "x".into(), 1024).await.unwrap();
        assert_eq!(inbound.params.get_str("a"), Some("1"));
        assert_eq!(inbound.params.get_str("b"), Some("3"));
        assert_eq!(inbound.params.get_str("c"), Some("4"));
    }

    #[tokio::test]
    async fn json_body_fields_become_params() {
        let req = request("POST", "/x", Some("application/json"), r#"{"n":5,"s":"v"}"#);
        let inbound = decode(req, "x".into(), 1024).await.unwrap();
        assert_eq!(inbound.params.get("n"), Some(&Param::Value(Value::from(5))));
        assert_eq!(inbound.params.get_str("s"), Some("v"));
    }

    #[tokio::test]
    async fn json_array_body_is_invalid_parameter() {
        let req = request("POST", "/x", Some("application/json"), "[1,2]");
        let err = decode(req, "x".into(), 1024).await.unwrap_err();
        assert_eq!(err.parameter(), Some("params"));
    }

    #[tokio::test]
    async fn unknown_content_type_is_read_as_form() {
        let req = request("POST", "/x", Some("text/plain"), "k=v");
        let inbound = decode(req, "x".into(), 1024).await.unwrap();
        assert_eq!(inbound.params.get_str("k"), Some("v"));
    }

    #[tokio::test]
    async fn multipart_file_parts_are_bytes() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"note\"\r\n\r\n\
            hello\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            file body\r\n\
            --XYZ--\r\n";
        let req = request("POST", "/x", Some("multipart/form-data; boundary=XYZ"), body);
        let inbound = decode(req, "x".into(), 4096).await.unwrap();

        assert_eq!(inbound.params.get_str("note"), Some("hello"));
        match inbound.params.get("doc") {
            Some(Param::Part { file_name, data }) => {
                assert_eq!(file_name, "a.txt");
                assert_eq!(&data[..], b"file body");
            }
            other => panic!("expected a part, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn token_and_identity_headers() {
        let req = Request::builder()
            .uri("/x")
            .header(headers::TOKEN, "secret")
            .header(headers::TOKEN_TIMEOUT, "30")
            .header("x-token-attr-role", "admin")
            .header(headers::CLIENT_ID, "client-7")
            .header(ACCEPT_LANGUAGE, "pt-BR")
            .header(HOST, "gw.local")
            .body(Body::empty())
            .unwrap();
        let inbound = decode(req, "x".into(), 1024).await.unwrap();

        let token = inbound.token.unwrap();
        assert_eq!(token.code(), "secret");
        assert_eq!(token.timeout(), 30);
        assert_eq!(token.attribute("role"), Some("admin"));
        assert_eq!(inbound.client, "client-7");
        assert_eq!(inbound.locale, "pt-BR");
        assert_eq!(inbound.host, "gw.local");
    }
}
