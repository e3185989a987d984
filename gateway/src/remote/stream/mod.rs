//! Registry of binary results awaiting chunked download.

mod handle;
mod registry;

pub use handle::StreamHandle;
pub use registry::StreamRegistry;
