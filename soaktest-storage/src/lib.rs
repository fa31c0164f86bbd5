//! Storage capability layer for the soak test.
//!
//! This crate provides the minimal storage surface the runner needs:
//! container creation, object upload, and paginated listing, behind the
//! [`BlobStore`] facade. The production backend talks to any S3-compatible
//! service; an in-memory backend backs the test suites.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod backend;
mod error;

pub use backend::in_memory::InMemoryBackend;
pub use backend::s3_compatible::S3CompatibleBackend;
pub use backend::{Backend, BoxedBackend, ObjectEntry, ObjectPage, PageStream};
pub use error::{BackendError, Result};

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;

/// High-level asynchronous handle for the storage service.
#[derive(Clone, Debug)]
pub struct BlobStore(Arc<BlobStoreInner>);

#[derive(Debug)]
struct BlobStoreInner {
    backend: BoxedBackend,
}

impl BlobStore {
    /// Creates a store talking to an S3-compatible service.
    ///
    /// Ambient credentials are resolved once, here, and failure to resolve
    /// them is an error. The endpoint itself is not validated until the
    /// first request is made.
    pub fn s3_compatible(endpoint: &str, region: &str, path_style: bool) -> Result<Self> {
        let backend = S3CompatibleBackend::new(endpoint, region, path_style)?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Creates a store backed by memory, returning the backend handle for
    /// direct inspection in tests.
    pub fn in_memory() -> (Self, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        (Self::with_backend(Box::new(backend.clone())), backend)
    }

    /// Wraps an arbitrary [`Backend`] implementation.
    pub fn with_backend(backend: BoxedBackend) -> Self {
        Self(Arc::new(BlobStoreInner { backend }))
    }

    /// Creates a new, empty container.
    pub async fn create_container(&self, container: &str) -> Result<()> {
        self.0.backend.create_container(container).await
    }

    /// Stores a small object under the given key.
    pub async fn put_object(&self, container: &str, key: &str, payload: Bytes) -> Result<()> {
        self.0.backend.put_object(container, key, payload).await
    }

    /// Fetches a single listing page.
    pub async fn list_page(
        &self,
        container: &str,
        page_size: usize,
        continuation: Option<String>,
    ) -> Result<ObjectPage> {
        self.0.backend.list_page(container, page_size, continuation).await
    }

    /// Returns a lazy stream over all listing pages of a container.
    ///
    /// Pages are fetched on demand as the stream is polled. Every call
    /// starts a fresh listing from the first key.
    pub fn list_pages(&self, container: &str, page_size: usize) -> PageStream {
        let store = self.clone();
        let container = container.to_owned();
        let pages = async_stream::try_stream! {
            let mut continuation = None;
            loop {
                let page = store.list_page(&container, page_size, continuation.take()).await?;
                continuation = page.next_continuation.clone();
                let more = continuation.is_some();
                yield page;
                if !more {
                    break;
                }
            }
        };
        pages.boxed()
    }
}
