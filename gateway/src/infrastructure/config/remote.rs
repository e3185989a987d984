//! Remote channel configuration.
//!
//! This module defines the gRPC listener and the local directories used by the
//! streaming protocol.

use serde::Deserialize;
use std::path::PathBuf;

/// Remote channel settings.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteSettings {
    /// Identifier reported by `Ping`.
    pub node_id: Option<String>,
    /// Host address to bind the gRPC server to.
    pub host: String,
    /// Port for the gRPC server.
    pub port: u16,
    /// Where uploaded artifacts are stored.
    pub upload_dir: PathBuf,
    /// Where downloaded stream results are written by the remote invoker.
    pub download_dir: PathBuf,
}
