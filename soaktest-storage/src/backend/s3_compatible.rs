//! S3-compatible storage backend.
//!
//! Containers map to buckets. Credentials are resolved once from the
//! ambient environment when the backend is constructed; the endpoint is
//! handed to the client as-is and only validated by the service itself.

use std::fmt;

use bytes::Bytes;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};

use super::{Backend, ObjectEntry, ObjectPage};
use crate::error::{BackendError, Result};

/// A [`Backend`] talking to an S3-compatible service.
pub struct S3CompatibleBackend {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3CompatibleBackend {
    /// Creates a backend bound to the given endpoint.
    ///
    /// Resolves credentials from the environment/profile chain. This is the
    /// single point of credential resolution for the process lifetime.
    pub fn new(endpoint: &str, region: &str, path_style: bool) -> Result<Self> {
        let credentials = Credentials::default()?;
        let region = Region::Custom {
            region: region.to_owned(),
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        };

        Ok(Self { region, credentials, path_style })
    }

    fn bucket(&self, container: &str) -> Result<Box<Bucket>> {
        let mut bucket = Bucket::new(container, self.region.clone(), self.credentials.clone())
            .map_err(|cause| BackendError::S3 {
                context: format!("failed to open bucket {container}"),
                cause,
            })?;
        if self.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(bucket)
    }
}

impl fmt::Debug for S3CompatibleBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3CompatibleBackend")
            .field("endpoint", &self.region.endpoint())
            .field("path_style", &self.path_style)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Backend for S3CompatibleBackend {
    fn name(&self) -> &'static str {
        "s3-compatible"
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn create_container(&self, container: &str) -> Result<()> {
        let config = BucketConfiguration::default();
        let response = if self.path_style {
            Bucket::create_with_path_style(
                container,
                self.region.clone(),
                self.credentials.clone(),
                config,
            )
            .await
        } else {
            Bucket::create(container, self.region.clone(), self.credentials.clone(), config).await
        }
        .map_err(|cause| BackendError::S3 {
            context: format!("failed to create container {container}"),
            cause,
        })?;

        match response.response_code {
            200..=299 => Ok(()),
            409 => Err(BackendError::ContainerExists(container.to_owned())),
            code => Err(BackendError::Http {
                context: format!("failed to create container {container}"),
                code,
            }),
        }
    }

    #[tracing::instrument(level = "trace", skip(self, payload))]
    async fn put_object(&self, container: &str, key: &str, payload: Bytes) -> Result<()> {
        let response = self
            .bucket(container)?
            .put_object(key, &payload)
            .await
            .map_err(|cause| BackendError::S3 {
                context: format!("failed to upload {key}"),
                cause,
            })?;

        match response.status_code() {
            200..=299 => Ok(()),
            code => Err(BackendError::Http {
                context: format!("failed to upload {key}"),
                code,
            }),
        }
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn list_page(
        &self,
        container: &str,
        page_size: usize,
        continuation: Option<String>,
    ) -> Result<ObjectPage> {
        let (result, code) = self
            .bucket(container)?
            .list_page(String::new(), None, continuation, None, Some(page_size))
            .await
            .map_err(|cause| BackendError::S3 {
                context: format!("failed to list container {container}"),
                cause,
            })?;

        if !(200..=299).contains(&code) {
            return Err(BackendError::Http {
                context: format!("failed to list container {container}"),
                code,
            });
        }

        let items = result
            .contents
            .into_iter()
            .map(|object| ObjectEntry { key: object.key, size: object.size })
            .collect();
        let next_continuation = result.is_truncated.then(|| result.next_continuation_token).flatten();

        Ok(ObjectPage { items, next_continuation })
    }
}
