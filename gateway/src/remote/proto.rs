//! Generated protobuf code for the `conduit.ResourceGateway` service.

#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::too_many_lines)]
tonic::include_proto!("conduit");
