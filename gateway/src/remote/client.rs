//! Client side of the remote channel: chunked uploads, invoke, windowed downloads.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::transport::{InvokeCall, InvokeReply, RemoteTransport, StreamDescriptor};
use super::upload::{artifact_name, clean_file_name};
use super::window::Window;
use crate::content::{file_name, Content};
use crate::envelope::Fault;
use crate::infrastructure::config::StreamingSettings;
use crate::params::Param;
use crate::requester::Requester;

/// Client side of the remote channel.
///
/// Uploads binary parameters in windowed chunks, invokes, and fetches streamed
/// results into `download_dir`.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn RemoteTransport>,
    settings: StreamingSettings,
    download_dir: PathBuf,
}

impl RemoteClient {
    /// Creates a client over `transport`.
    pub fn new(
        transport: Arc<dyn RemoteTransport>,
        settings: StreamingSettings,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            settings: settings.normalized(),
            download_dir: download_dir.into(),
        }
    }

    /// Forwards `requester` to `uri` on the remote side.
    ///
    /// File and part parameters are uploaded first and replaced by their
    /// artifact names. Streamed results come back as [`Content::File`] for
    /// ranged streams and [`Content::Bytes`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns the remote resource's fault or any transfer fault.
    pub async fn invoke(&self, requester: &Requester, uri: &str) -> Result<Content, Fault> {
        let span = info_span!("remote_call", uri = %uri);
        async {
            let mut params = Map::new();
            for (name, param) in requester.params().iter() {
                let value = match param {
                    Param::Value(value) => value.clone(),
                    Param::File(path) => Value::from(self.upload_file(path).await?),
                    Param::Part { file_name, data } => {
                        Value::from(self.upload_bytes(file_name, data.clone()).await?)
                    }
                };
                params.insert(name.clone(), value);
            }

            let call = InvokeCall {
                client: requester.client().to_string(),
                token: requester.token().cloned(),
                uri: uri.to_string(),
                params: Value::Object(params),
                locale: requester.locale().to_string(),
            };
            match self.transport.invoke(call).await? {
                InvokeReply::Inline(envelope) => envelope.unwrap().map(Content::from),
                InvokeReply::Stream(descriptor) => self.download(&descriptor).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Uploads a local file and returns its artifact name.
    ///
    /// # Errors
    ///
    /// Returns an internal fault on read failure or the first failed chunk's fault.
    pub async fn upload_file(&self, path: &Path) -> Result<String, Fault> {
        let name = artifact_name(&file_name(path));
        let mut file = File::open(path).await?;
        let chunk = self.settings.chunk_size as u64;
        let mut window = Window::new(self.settings.window);
        let mut offset = 0u64;

        loop {
            let mut buf = Vec::new();
            (&mut file).take(chunk).read_to_end(&mut buf).await?;
            if buf.is_empty() && offset > 0 {
                break;
            }
            let len = buf.len() as u64;
            window.push(self.upload_chunk(&name, offset, Bytes::from(buf))).await?;
            offset += len;
            if len < chunk {
                break;
            }
        }
        window.drain().await?;
        debug!(artifact = %name, bytes = offset, "Upload complete");
        Ok(name)
    }

    /// Uploads an in-memory part and returns its artifact name.
    ///
    /// # Errors
    ///
    /// Returns the first failed chunk's fault.
    pub async fn upload_bytes(&self, file_name: &str, data: Bytes) -> Result<String, Fault> {
        let name = artifact_name(file_name);
        let chunk = self.settings.chunk_size;
        let mut window = Window::new(self.settings.window);

        if data.is_empty() {
            window.push(self.upload_chunk(&name, 0, data)).await?;
            window.drain().await?;
            return Ok(name);
        }
        let mut start = 0usize;
        while start < data.len() {
            let end = (start + chunk).min(data.len());
            window
                .push(self.upload_chunk(&name, start as u64, data.slice(start..end)))
                .await?;
            start = end;
        }
        window.drain().await?;
        Ok(name)
    }

    /// Fetches a streamed result.
    ///
    /// Ranged streams are read in chunks of the configured size, with at most
    /// `window` calls in flight, into a new file under `download_dir`. The
    /// loop runs while `offset < size` and the last call asks for
    /// `min(chunk, size - offset)` bytes. Other streams take a single call.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StreamNotFound`] if the stream was evicted, or any
    /// transfer fault.
    pub async fn download(&self, descriptor: &StreamDescriptor) -> Result<Content, Fault> {
        let chunk = self.settings.chunk_size as u64;
        if !descriptor.is_file {
            let data = self.transport.download(&descriptor.id, 0, chunk).await?;
            return Ok(Content::Bytes {
                name: descriptor.name.clone(),
                data,
            });
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            clean_file_name(&descriptor.name)
        ));
        let mut file = File::create(&path).await?;
        let mut window = Window::new(self.settings.window);
        let mut written = 0u64;
        let mut offset = 0u64;

        while offset < descriptor.size {
            let length = chunk.min(descriptor.size - offset);
            if let Some(data) = window.push(self.download_chunk(descriptor, offset, length)).await? {
                file.write_all(&data).await?;
                written += data.len() as u64;
            }
            offset += chunk;
        }
        for data in window.drain().await? {
            file.write_all(&data).await?;
            written += data.len() as u64;
        }
        file.flush().await?;

        if written != descriptor.size {
            return Err(Fault::Invocation(format!(
                "stream {} ended after {written} of {} bytes",
                descriptor.id, descriptor.size
            )));
        }
        debug!(stream_id = %descriptor.id, bytes = written, path = %path.display(), "Download complete");
        Ok(Content::File(path))
    }

    fn upload_chunk(
        &self,
        name: &str,
        offset: u64,
        data: Bytes,
    ) -> impl std::future::Future<Output = Result<(), Fault>> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let name = name.to_string();
        async move { transport.upload(&name, offset, data).await }
    }

    fn download_chunk(
        &self,
        descriptor: &StreamDescriptor,
        offset: u64,
        length: u64,
    ) -> impl std::future::Future<Output = Result<Bytes, Fault>> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let id = descriptor.id.clone();
        async move { transport.download(&id, offset, length).await }
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("settings", &self.settings)
            .field("download_dir", &self.download_dir)
            .finish_non_exhaustive()
    }
}
