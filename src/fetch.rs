//! Retrieval of cube documents.

use std::time::Duration;

use crate::error::EtlError;
use crate::models::CubeDocument;

use url::Url;

/// Cube fetcher trait.
///
/// This trait provides an interface for retrieving a cube document from a URL.
pub trait CubeFetcher {
    /// Fetch the cube document at `url`.
    ///
    /// # Arguments
    ///
    /// * `url`: Source URL of the dataset
    fn fetch(&self, url: &Url) -> impl std::future::Future<Output = Result<CubeDocument, EtlError>>;
}

/// HTTP cube fetcher.
///
/// Implements [CubeFetcher] for HTTP with a client-level timeout.
#[derive(Debug)]
pub struct HttpCubeFetcher {
    reqwest_client: reqwest::Client,
}

impl HttpCubeFetcher {
    /// Create a new HTTP cube fetcher.
    ///
    /// # Arguments
    ///
    /// * `timeout`: Bound on each request, from connection to end of body
    pub fn new(timeout: Duration) -> Result<Self, EtlError> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EtlError::HttpClient)?;
        Ok(Self { reqwest_client })
    }
}

impl CubeFetcher for HttpCubeFetcher {
    /// Fetch the cube document at `url`.
    ///
    /// Any non-success status is an error. Redirects are followed.
    #[tracing::instrument(level = "DEBUG", skip(self, url), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<CubeDocument, EtlError> {
        let fetch_error = |source| EtlError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = self
            .reqwest_client
            .get(url.as_str())
            .send()
            .await
            .map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(fetch_error)?;
        tracing::debug!(bytes = body.len(), "fetched cube");
        serde_json::from_slice(&body).map_err(|source| EtlError::CubeParse {
            url: url.to_string(),
            source,
        })
    }
}
