use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::dataset::loader::parse_dataset;
use crate::dataset::store::DatasetStore;
use crate::errors::DatasetError;

const GCS_PUBLIC_HOST: &str = "https://storage.googleapis.com";

/// Where the dataset file lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetSource {
    Path(PathBuf),
    Url(String),
}

impl DatasetSource {
    /// Accepts a filesystem path, an `http(s)://` URL, or a `gs://bucket/object`
    /// location, which is rewritten to its public storage URL.
    pub fn parse(raw: &str) -> Result<Self, DatasetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DatasetError::InvalidSource(raw.to_string()));
        }

        if let Some(object_path) = trimmed.strip_prefix("gs://") {
            let (bucket, object) = object_path
                .split_once('/')
                .filter(|(bucket, object)| !bucket.is_empty() && !object.is_empty())
                .ok_or_else(|| DatasetError::InvalidSource(raw.to_string()))?;
            return Ok(Self::Url(format!("{GCS_PUBLIC_HOST}/{bucket}/{object}")));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(Self::Url(trimmed.to_string()));
        }

        Ok(Self::Path(PathBuf::from(trimmed)))
    }

    pub async fn fetch(&self, timeout: Duration) -> Result<String, DatasetError> {
        match self {
            Self::Path(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| DatasetError::ReadFile { path: path.clone(), source }),
            Self::Url(url) => fetch_url(url, timeout).await,
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Fetches and parses the dataset in one step.
pub async fn load(source: &DatasetSource, timeout: Duration) -> Result<DatasetStore, DatasetError> {
    let result = match source.fetch(timeout).await {
        Ok(raw) => parse_dataset(&raw),
        Err(error) => Err(error),
    };

    match &result {
        Ok(store) => {
            let columns = store.columns().map(|column| column.source_name()).collect::<Vec<_>>();
            if store.is_empty() {
                warn!(
                    event_name = "dataset.loaded_empty",
                    correlation_id = "bootstrap",
                    source = %source,
                    "recipe dataset loaded but contains no records"
                );
            }
            info!(
                event_name = "dataset.loaded",
                correlation_id = "bootstrap",
                source = %source,
                records = store.len(),
                columns = ?columns,
                "recipe dataset loaded"
            );
        }
        Err(error) => {
            warn!(
                event_name = "dataset.load_failed",
                correlation_id = "bootstrap",
                source = %source,
                error = %error,
                "recipe dataset could not be loaded"
            );
        }
    }

    result
}

async fn fetch_url(url: &str, timeout: Duration) -> Result<String, DatasetError> {
    let fetch_error =
        |message: String| DatasetError::Fetch { url: url.to_string(), message };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| fetch_error(format!("failed to build HTTP client: {error}")))?;

    let response =
        client.get(url).send().await.map_err(|error| fetch_error(error.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("server returned {status}")));
    }

    response.text().await.map_err(|error| fetch_error(error.to_string()))
}
