use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Thumbnails,
    Avatars,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Thumbnails => "thumbnails",
            Bucket::Avatars => "avatars",
        }
    }
}

/// Where uploaded images end up.
pub enum ObjectStore {
    /// Files under `dir/<bucket>/`, served back at `/media/<bucket>/...`.
    Local { dir: PathBuf, public_url: String },
    /// A Supabase-compatible storage API.
    Supabase {
        client: reqwest::Client,
        url: String,
        service_key: String,
    },
}

impl ObjectStore {
    pub fn local(dir: impl Into<PathBuf>, public_url: &str) -> Result<Self> {
        let dir = dir.into();
        for bucket in [Bucket::Thumbnails, Bucket::Avatars] {
            let path = dir.join(bucket.as_str());
            std::fs::create_dir_all(&path)
                .with_context(|| format!("creating storage directory {}", path.display()))?;
        }
        info!("Local object storage at {}", dir.display());
        Ok(Self::Local {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn supabase(url: &str, service_key: &str) -> Self {
        Self::Supabase {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    /// Directory to mount at `/media`, for the local backend only.
    pub fn media_dir(&self) -> Option<&Path> {
        match self {
            ObjectStore::Local { dir, .. } => Some(dir),
            ObjectStore::Supabase { .. } => None,
        }
    }

    /// Store `data` and return its public URL.
    pub async fn put(&self, bucket: Bucket, name: &str, content_type: &str, data: Bytes) -> Result<String> {
        match self {
            ObjectStore::Local { dir, public_url } => {
                let path = dir.join(bucket.as_str()).join(name);
                tokio::fs::write(&path, &data)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                debug!("Stored {} ({} bytes)", path.display(), data.len());
                Ok(format!("{}/media/{}/{}", public_url, bucket.as_str(), name))
            }
            ObjectStore::Supabase {
                client,
                url,
                service_key,
            } => {
                let endpoint = format!("{}/storage/v1/object/{}/{}", url, bucket.as_str(), name);
                client
                    .post(&endpoint)
                    .bearer_auth(service_key)
                    .header("apikey", service_key.as_str())
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .header("x-upsert", "false")
                    .body(data)
                    .send()
                    .await
                    .with_context(|| format!("uploading to {}", endpoint))?
                    .error_for_status()
                    .context("storage backend rejected upload")?;
                Ok(format!("{}/storage/v1/object/public/{}/{}", url, bucket.as_str(), name))
            }
        }
    }
}
