//! Binary response helpers.

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use bytes::Bytes;
use futures_util::stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::error;

use super::convert::Converter;
use crate::content::Content;
use crate::envelope::{Envelope, Fault};

const READ_CHUNK: usize = 64 * 1024;

/// Streams a binary result as the response body.
pub(crate) async fn binary(content: Content) -> Result<Response, Fault> {
    let name = content.name().unwrap_or_else(|| "download".to_string());
    let (body, length) = match content {
        Content::File(path) => {
            let file = tokio::fs::File::open(&path).await?;
            let length = file.metadata().await?.len();
            (Body::from_stream(read_stream(file)), Some(length))
        }
        Content::Bytes { data, .. } => {
            let length = data.len() as u64;
            (Body::from(data), Some(length))
        }
        Content::Reader { reader, .. } => (Body::from_stream(read_stream(reader)), None),
        Content::Channel { receiver, .. } => {
            let chunks = stream::unfold(receiver, |mut rx| async move {
                rx.recv().await.map(|chunk| (Ok::<_, std::io::Error>(chunk), rx))
            });
            (Body::from_stream(chunks), None)
        }
        Content::Empty | Content::Json(_) => {
            return Err(Fault::invocation("inline result cannot be streamed"))
        }
    };

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    if let Ok(value) = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        name.replace(['"', '\\'], "_")
    )) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    if let Some(length) = length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}

/// Serializes `envelope` through `converter`.
pub(crate) fn converted(converter: &dyn Converter, envelope: &Envelope) -> Response {
    match converter.convert(envelope) {
        Ok(body) => (
            converter.status(envelope),
            [(CONTENT_TYPE, converter.content_type())],
            body,
        )
            .into_response(),
        Err(fault) => {
            error!(error = %fault, "Converter failed");
            (StatusCode::INTERNAL_SERVER_ERROR, fault.to_string()).into_response()
        }
    }
}

/// Rendered template as an HTML body.
pub(crate) fn html(body: String) -> Response {
    (
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

/// `303 See Other` to `target` below `context_path`.
pub(crate) fn redirect(context_path: &str, target: &str) -> Response {
    let location = format!("{context_path}/{}", target.trim_start_matches('/'));
    Redirect::to(&location).into_response()
}

fn read_stream<R>(reader: R) -> impl futures_util::Stream<Item = std::io::Result<Bytes>> + Send
where
    R: AsyncRead + Send + Unpin + 'static,
{
    stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        let mut buf = vec![0u8; READ_CHUNK];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[tokio::test]
    async fn bytes_get_disposition_and_length() {
        let response = binary(Content::Bytes {
            name: "report.csv".into(),
            data: Bytes::from_static(b"a,b\n1,2\n"),
        })
        .await
        .unwrap();

        let headers = response.headers();
        assert_eq!(headers[CONTENT_DISPOSITION], "attachment; filename=\"report.csv\"");
        assert_eq!(headers[CONTENT_LENGTH], "8");

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn reader_streams_without_length() {
        let reader: crate::content::ByteReader = Box::new(std::io::Cursor::new(vec![9u8; 200_000]));
        let response = binary(Content::Reader {
            name: "blob".into(),
            reader,
        })
        .await
        .unwrap();
        assert!(response.headers().get(CONTENT_LENGTH).is_none());

        let body = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        assert_eq!(body.len(), 200_000);
    }

    #[test]
    fn redirect_is_context_prefixed() {
        let response = redirect("/app", "/login");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/app/login");
    }
}
