//! Page fetchers: where a sweep gets its pages from.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::FetchError;
use crate::api::FacilityPageResponse;
use crate::db::{services, FullRepository};
use crate::models::QueryFilter;

/// Source of facility pages.
///
/// Implementations must be `Send + Sync`; a single fetcher is shared by every
/// sweep a controller runs.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, request: &QueryFilter) -> Result<FacilityPageResponse, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch_page(&self, request: &QueryFilter) -> Result<FacilityPageResponse, FetchError> {
        (**self).fetch_page(request).await
    }
}

/// Query-string parameters understood by the facilities endpoint.
pub fn query_pairs(request: &QueryFilter) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::with_capacity(5);
    if let Some(bounds) = request.filter.bounds {
        pairs.push(("bounds", bounds.to_string()));
    }
    if let Some(country) = &request.filter.country {
        pairs.push(("country", country.clone()));
    }
    if let Some(fuel) = request.filter.fuel {
        pairs.push(("fuel", fuel.as_str().to_string()));
    }
    pairs.push(("limit", request.limit.to_string()));
    pairs.push(("offset", request.offset.to_string()));
    pairs
}

/// In-process fetcher that reads straight from a repository.
#[derive(Clone)]
pub struct RepositoryPageFetcher {
    repo: Arc<dyn FullRepository>,
}

impl RepositoryPageFetcher {
    pub fn new(repo: Arc<dyn FullRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl PageFetcher for RepositoryPageFetcher {
    async fn fetch_page(&self, request: &QueryFilter) -> Result<FacilityPageResponse, FetchError> {
        let page = services::query_facilities(self.repo.as_ref(), request).await?;
        Ok(FacilityPageResponse::from(page))
    }
}

#[cfg(feature = "http-client")]
pub use http::HttpPageFetcher;

#[cfg(feature = "http-client")]
mod http {
    use super::*;
    use std::time::Duration;

    use crate::client::MapConfig;

    /// Fetches pages from a running server's `/v1/facilities` endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpPageFetcher {
        client: reqwest::Client,
        endpoint: String,
    }

    impl HttpPageFetcher {
        /// `base_url` is the server root, e.g. `http://localhost:8080`.
        pub fn new(base_url: &str, config: &MapConfig) -> Result<Self, FetchError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
            Ok(Self::with_client(client, base_url))
        }

        pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
            Self {
                client,
                endpoint: format!("{}/v1/facilities", base_url.trim_end_matches('/')),
            }
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[async_trait]
    impl PageFetcher for HttpPageFetcher {
        async fn fetch_page(
            &self,
            request: &QueryFilter,
        ) -> Result<FacilityPageResponse, FetchError> {
            let resp = self
                .client
                .get(&self.endpoint)
                .query(&query_pairs(request))
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            resp.json::<FacilityPageResponse>()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))
        }
    }

}
