use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Lookup against the external movie catalog
#[async_trait]
pub trait MovieCatalog: Send + Sync + 'static {
    /// `true` only when the catalog positively confirms the movie.
    /// Not-found, error statuses, network failures and timeouts all read as `false`.
    async fn exists(&self, movie_id: i64) -> bool;
}

/// Catalog client issuing `GET {base_url}/{movie_id}`
#[derive(Debug, Clone)]
pub struct HttpMovieCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMovieCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build movie catalog HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn movie_url(&self, movie_id: i64) -> String {
        format!("{}/{}", self.base_url, movie_id)
    }
}

#[async_trait]
impl MovieCatalog for HttpMovieCatalog {
    async fn exists(&self, movie_id: i64) -> bool {
        let url = self.movie_url(movie_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match response {
            Ok(_) => {
                debug!(movie_id, "Movie confirmed by catalog");
                true
            }
            Err(e) if e.is_timeout() => {
                warn!(movie_id, %url, "Movie catalog lookup timed out");
                false
            }
            Err(e) => {
                warn!(movie_id, %url, error = %e, "Movie catalog lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn catalog_for(server: &MockServer) -> HttpMovieCatalog {
        HttpMovieCatalog::new(&format!("{}/api/movies/", server.uri()), Duration::from_millis(500))
            .unwrap()
    }

    #[test]
    fn builds_url_without_double_slash() {
        let catalog =
            HttpMovieCatalog::new("http://catalog.local/api/movies/", Duration::from_secs(1)).unwrap();
        assert_eq!(catalog.movie_url(42), "http://catalog.local/api/movies/42");
    }

    #[tokio::test]
    async fn ok_response_means_movie_exists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/movies/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(catalog_for(&server).await.exists(1).await);
    }

    #[tokio::test]
    async fn not_found_means_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/movies/999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(!catalog_for(&server).await.exists(999).await);
    }

    #[tokio::test]
    async fn server_error_means_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(!catalog_for(&server).await.exists(1).await);
    }

    #[tokio::test]
    async fn slow_catalog_times_out_as_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        assert!(!catalog_for(&server).await.exists(1).await);
    }

    #[tokio::test]
    async fn unreachable_catalog_means_missing() {
        let server = MockServer::start().await;
        let catalog = catalog_for(&server).await;
        drop(server);

        assert!(!catalog.exists(1).await);
    }
}
