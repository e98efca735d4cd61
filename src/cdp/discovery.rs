//! Target discovery
//!
//! Resolves a local debugging port into a connectable WebSocket address by
//! querying the browser's HTTP introspection endpoints.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::traits::TargetInfo;
use crate::{Error, Result};

/// Entry of the `/json` target list
#[derive(Debug, Clone, Deserialize)]
struct TargetDescriptor {
    #[serde(default, rename = "type")]
    target_type: String,
    #[serde(default)]
    id: String,
    #[serde(default, rename = "webSocketDebuggerUrl")]
    ws_url: Option<String>,
}

/// Body of `/json/version`
#[derive(Debug, Clone, Deserialize)]
struct VersionInfo {
    #[serde(default, rename = "Browser")]
    browser: String,
    #[serde(default, rename = "webSocketDebuggerUrl")]
    ws_url: Option<String>,
}

/// HTTP-based target discovery
#[derive(Debug, Clone)]
pub struct TargetDiscovery {
    base_url: String,
    http: reqwest::Client,
}

impl TargetDiscovery {
    /// Discovery against `http://{host}:{port}`
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_base_url(format!("http://{}:{}", host, port))
    }

    /// Discovery against an explicit base URL
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::discovery(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL queried by this discovery
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve the first page target, falling back to the version endpoint
    #[instrument(skip(self), fields(endpoint = %self.base_url))]
    pub async fn discover(&self) -> Result<TargetInfo> {
        match self.list_targets().await {
            Ok(targets) => {
                let page = targets
                    .into_iter()
                    .find(|t| t.target_type == "page" && t.ws_url.is_some());
                if let Some(TargetDescriptor {
                    id,
                    ws_url: Some(ws_url),
                    ..
                }) = page
                {
                    info!("Discovered page target {} at {}", id, ws_url);
                    return Ok(TargetInfo {
                        target_id: id,
                        ws_url,
                    });
                }
                debug!("No page target listed, trying version endpoint");
            }
            Err(e) => {
                warn!("Target list unavailable: {}", e);
            }
        }

        let version = self.version().await?;
        let ws_url = version.ws_url.filter(|u| !u.is_empty()).ok_or_else(|| {
            Error::discovery(format!("No usable target at {}", self.base_url))
        })?;

        info!("Using {} endpoint from version info: {}", version.browser, ws_url);
        Ok(TargetInfo {
            target_id: String::new(),
            ws_url,
        })
    }

    async fn list_targets(&self) -> Result<Vec<TargetDescriptor>> {
        let url = format!("{}/json", self.base_url);
        debug!("Fetching targets from {}", url);
        self.get_json(&url).await
    }

    async fn version(&self) -> Result<VersionInfo> {
        let url = format!("{}/json/version", self.base_url);
        debug!("Fetching browser version from {}", url);
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).send().await.map_err(|e| {
            Error::discovery(format!(
                "Debugging endpoint {} unreachable: {}. Start Chrome with --remote-debugging-port",
                self.base_url, e
            ))
        })?;

        if !response.status().is_success() {
            return Err(Error::discovery(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::discovery(format!("Failed to parse {}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_prefers_first_page_target() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "worker-1",
                    "type": "service_worker",
                    "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/worker-1"
                },
                {
                    "id": "page-1",
                    "type": "page",
                    "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/page-1"
                },
                {
                    "id": "page-2",
                    "type": "page",
                    "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/page-2"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let discovery = TargetDiscovery::with_base_url(server.uri()).unwrap();
        let target = discovery.discover().await.unwrap();
        assert_eq!(target.target_id, "page-1");
        assert_eq!(target.ws_url, "ws://127.0.0.1:9222/devtools/page/page-1");
    }

    #[tokio::test]
    async fn test_falls_back_to_version_endpoint() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Browser": "Chrome/120.0.6099.109",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let discovery = TargetDiscovery::with_base_url(server.uri()).unwrap();
        let target = discovery.discover().await.unwrap();
        assert_eq!(target.target_id, "");
        assert_eq!(target.ws_url, "ws://127.0.0.1:9222/devtools/browser/abc");
    }

    #[tokio::test]
    async fn test_no_usable_target() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "x", "type": "page" }
            ])))
            .mount(&server)
            .await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Browser": "Chrome/120.0.6099.109"
            })))
            .mount(&server)
            .await;

        let discovery = TargetDiscovery::with_base_url(server.uri()).unwrap();
        let result = discovery.discover().await;
        assert!(matches!(result, Err(Error::Discovery(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let discovery = TargetDiscovery::with_base_url(uri).unwrap();
        let result = discovery.discover().await;
        assert!(matches!(result, Err(Error::Discovery(_))));
    }
}
