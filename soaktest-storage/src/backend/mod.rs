use std::fmt::Debug;

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::Result;

pub(crate) mod in_memory;
pub(crate) mod s3_compatible;

/// A type-erased [`Backend`] instance.
pub type BoxedBackend = Box<dyn Backend>;

/// A lazy stream of listing pages.
pub type PageStream = BoxStream<'static, Result<ObjectPage>>;

/// One bounded batch of listing results.
#[derive(Debug, Clone)]
pub struct ObjectPage {
    /// The entries of this page, in lexicographic key order.
    pub items: Vec<ObjectEntry>,
    /// Opaque token for requesting the next page, if any pages remain.
    pub next_continuation: Option<String>,
}

/// A single listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// The object key within its container.
    pub key: String,
    /// The payload size in bytes.
    pub size: u64,
}

/// Capabilities the soak test needs from a storage service.
#[async_trait::async_trait]
pub trait Backend: Debug + Send + Sync + 'static {
    /// The backend name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Creates a new, empty container.
    ///
    /// Name collisions are reported as errors; callers decide whether to
    /// retry under a different name.
    async fn create_container(&self, container: &str) -> Result<()>;

    /// Stores a small object under the given key.
    async fn put_object(&self, container: &str, key: &str, payload: Bytes) -> Result<()>;

    /// Fetches one page of the container listing.
    ///
    /// Passing the previous page's continuation token resumes the listing;
    /// `None` starts over from the first key.
    async fn list_page(
        &self,
        container: &str,
        page_size: usize,
        continuation: Option<String>,
    ) -> Result<ObjectPage>;
}
