//! §4.C Release Resolver / §6.2 `ReleaseProvider`: metadata lookup for a
//! release image. The concrete registry/container-metadata implementation
//! is out of scope for this core (§1) — only the trait boundary is shipped.

use std::collections::HashMap;
use std::future::Future;

use semver::Version;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseImage {
    pub image: String,
    pub version: Version,
    pub digest: Option<String>,
    pub component_versions: HashMap<String, String>,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum ReleaseLookupError {
    #[error("pull secret missing docker config key")]
    MissingPullSecretKey,
    #[error("release image {0} not found")]
    NotFound(String),
    #[error("transient registry error: {0}")]
    Transient(String),
}

#[allow(async_fn_in_trait)]
pub trait ReleaseProvider: Send + Sync {
    fn lookup(
        &self,
        image: &str,
        pull_secret: &[u8],
    ) -> impl Future<Output = Result<ReleaseImage, ReleaseLookupError>> + Send;

    fn registry_overrides(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// A fixed image→metadata table, for use in reconciler unit tests and as a
/// fixture for scenarios S1-S8 that don't exercise a live registry.
#[derive(Clone, Debug, Default)]
pub struct StaticReleaseProvider {
    images: HashMap<String, ReleaseImage>,
}

impl StaticReleaseProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, image: ReleaseImage) -> Self {
        self.images.insert(image.image.clone(), image);
        self
    }
}

impl ReleaseProvider for StaticReleaseProvider {
    async fn lookup(
        &self,
        image: &str,
        _pull_secret: &[u8],
    ) -> Result<ReleaseImage, ReleaseLookupError> {
        self.images
            .get(image)
            .cloned()
            .ok_or_else(|| ReleaseLookupError::NotFound(image.to_string()))
    }
}
