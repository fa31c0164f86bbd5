//! In-memory backend for tests.
//!
//! This provides a [`Backend`] backed by `BTreeMap`s, so listings come back
//! in lexicographic key order like the real service. The backend is
//! [`Clone`] so tests can hold a handle for direct inspection and failure
//! injection while the store owns a boxed copy.

use std::collections::BTreeMap;
use std::io;
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::{Backend, ObjectEntry, ObjectPage};
use crate::error::{BackendError, Result};

type Containers = BTreeMap<String, BTreeMap<String, Bytes>>;

/// A [`Backend`] holding all containers and objects in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    containers: Arc<Mutex<Containers>>,
    failing_lists: Arc<Mutex<u32>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` listing requests fail with an injected error.
    ///
    /// Useful for exercising the recoverable-error branch of callers.
    pub fn fail_next_lists(&self, count: u32) {
        *self.failing_lists.lock().unwrap() = count;
    }

    /// Returns the names of all containers.
    pub fn containers(&self) -> Vec<String> {
        self.containers.lock().unwrap().keys().cloned().collect()
    }

    /// Returns `true` if the container holds an object under `key`.
    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .is_some_and(|objects| objects.contains_key(key))
    }

    /// Returns a clone of the stored payload, if present.
    pub fn get_stored(&self, container: &str, key: &str) -> Option<Bytes> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .and_then(|objects| objects.get(key).cloned())
    }

    /// Number of objects in the container, or `None` if it does not exist.
    pub fn object_count(&self, container: &str) -> Option<usize> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .map(|objects| objects.len())
    }
}

#[async_trait::async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        let mut containers = self.containers.lock().unwrap();
        if containers.contains_key(container) {
            return Err(BackendError::ContainerExists(container.to_owned()));
        }
        containers.insert(container.to_owned(), BTreeMap::new());
        Ok(())
    }

    async fn put_object(&self, container: &str, key: &str, payload: Bytes) -> Result<()> {
        let mut containers = self.containers.lock().unwrap();
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| BackendError::MissingContainer(container.to_owned()))?;
        objects.insert(key.to_owned(), payload);
        Ok(())
    }

    async fn list_page(
        &self,
        container: &str,
        page_size: usize,
        continuation: Option<String>,
    ) -> Result<ObjectPage> {
        {
            let mut failing = self.failing_lists.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(BackendError::Generic {
                    context: "injected listing failure".to_owned(),
                    cause: Box::new(io::Error::other("injected")),
                });
            }
        }

        let containers = self.containers.lock().unwrap();
        let objects = containers
            .get(container)
            .ok_or_else(|| BackendError::MissingContainer(container.to_owned()))?;

        let start = match &continuation {
            Some(after) => Bound::Excluded(after.as_str()),
            None => Bound::Unbounded,
        };
        let mut items: Vec<_> = objects
            .range::<str, _>((start, Bound::Unbounded))
            .take(page_size + 1)
            .map(|(key, payload)| ObjectEntry {
                key: key.clone(),
                size: payload.len() as u64,
            })
            .collect();

        // Fetching one entry past the page tells us whether a next page exists.
        let next_continuation = if items.len() > page_size {
            items.truncate(page_size);
            items.last().map(|entry| entry.key.clone())
        } else {
            None
        };

        Ok(ObjectPage { items, next_continuation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_backend(count: usize) -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend.create_container("c").await.unwrap();
        for i in 0..count {
            let payload = Bytes::from(format!("content{i}"));
            backend.put_object("c", &format!("blob{i}"), payload).await.unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn paginates_with_continuation_tokens() {
        let backend = seeded_backend(20).await;

        let mut continuation = None;
        let mut pages = Vec::new();
        loop {
            let page = backend.list_page("c", 3, continuation.take()).await.unwrap();
            continuation = page.next_continuation.clone();
            pages.push(page);
            if continuation.is_none() {
                break;
            }
        }

        assert_eq!(pages.len(), 7);
        assert_eq!(pages.last().unwrap().items.len(), 2);
        assert_eq!(pages.iter().map(|page| page.items.len()).sum::<usize>(), 20);
    }

    #[tokio::test]
    async fn keys_are_listed_in_lexicographic_order() {
        let backend = InMemoryBackend::new();
        backend.create_container("c").await.unwrap();
        for key in ["b", "a", "c"] {
            backend.put_object("c", key, Bytes::from_static(b"x")).await.unwrap();
        }

        let page = backend.list_page("c", 10, None).await.unwrap();

        let keys: Vec<_> = page.items.iter().map(|entry| entry.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert!(page.next_continuation.is_none());
    }

    #[tokio::test]
    async fn duplicate_container_is_an_error() {
        let backend = InMemoryBackend::new();
        backend.create_container("c").await.unwrap();

        let result = backend.create_container("c").await;

        assert!(matches!(result, Err(BackendError::ContainerExists(_))));
    }

    #[tokio::test]
    async fn upload_requires_the_container() {
        let backend = InMemoryBackend::new();

        let result = backend.put_object("nope", "blob0", Bytes::from_static(b"x")).await;

        assert!(matches!(result, Err(BackendError::MissingContainer(_))));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let backend = seeded_backend(3).await;
        backend.fail_next_lists(1);

        assert!(backend.list_page("c", 3, None).await.is_err());
        assert!(backend.list_page("c", 3, None).await.is_ok());
    }

    #[tokio::test]
    async fn stored_payloads_are_inspectable() {
        let backend = seeded_backend(3).await;

        assert_eq!(backend.containers(), ["c"]);
        assert_eq!(backend.object_count("c"), Some(3));
        assert!(backend.contains("c", "blob1"));
        assert_eq!(backend.get_stored("c", "blob2"), Some(Bytes::from_static(b"content2")));
        assert_eq!(backend.object_count("missing"), None);
    }
}
