//! S3-compatible object store access.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;

/// Key prefix render workers upload finished results under.
pub const OUTPUT_KEY_PREFIX: &str = "outputs/";

/// Connection settings for the media bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2). `None`
    /// means AWS proper.
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Static credentials. When absent the default provider chain is
    /// used (env vars, instance profile).
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub signed_url_ttl: Duration,
}

/// Errors from object-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("presigning failed: {0}")]
    Presign(String),
}

/// Handle to one S3-compatible bucket.
pub struct ObjectStore {
    client: aws_sdk_s3::Client,
    config: S3Config,
}

impl ObjectStore {
    /// Build a client for the configured bucket.
    pub async fn connect(config: S3Config) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                "shotforge-config",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if config.force_path_style {
            builder = builder.set_force_path_style(Some(true));
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());

        Self { client, config }
    }

    /// Name of the configured bucket.
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Plain, un-signed URL for an object key.
    ///
    /// Works as-is for public buckets and for local S3-compatible
    /// stores; private buckets answer 403 and callers fall back to
    /// [`presign_get`](ObjectStore::presign_get).
    pub fn public_url(&self, key: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket,
                key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket, self.config.region, key
            ),
        }
    }

    /// Time-limited signed GET URL for an object key.
    pub async fn presign_get(&self, key: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(self.config.signed_url_ttl)
            .map_err(|e| StorageError::Presign(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}

/// The one alternate location probed when an asset's recorded key
/// cannot be fetched.
///
/// Render workers write flat into `outputs/` while some records carry a
/// nested path (or the bare filename). A key with a path component is
/// probed as the bare filename at the bucket root; a bare key is probed
/// under [`OUTPUT_KEY_PREFIX`]. Returns `None` when no distinct
/// alternate can be derived.
pub fn alternate_key(current_key: &str, filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }
    let candidate = if current_key.contains('/') {
        filename.to_string()
    } else {
        format!("{OUTPUT_KEY_PREFIX}{filename}")
    };
    if candidate == current_key {
        None
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- alternate_key --

    #[test]
    fn nested_key_probes_bucket_root() {
        let alt = alternate_key(
            "renders/2024/u1_p1_gabc_s0_sf0_df60_fps24_00001.mp4",
            "u1_p1_gabc_s0_sf0_df60_fps24_00001.mp4",
        );
        assert_eq!(alt.as_deref(), Some("u1_p1_gabc_s0_sf0_df60_fps24_00001.mp4"));
    }

    #[test]
    fn bare_key_probes_output_prefix() {
        let alt = alternate_key("clip.mp4", "clip.mp4");
        assert_eq!(alt.as_deref(), Some("outputs/clip.mp4"));
    }

    #[test]
    fn identical_alternate_is_suppressed() {
        // A nested key whose filename is the key itself has nowhere
        // else to point.
        assert_eq!(alternate_key("a/clip.mp4", "a/clip.mp4"), None);
        assert_eq!(alternate_key("clip.mp4", ""), None);
    }
}
